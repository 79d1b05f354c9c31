use super::config::EngineConfig;
use shakmaty::fen::Fen;
use shakmaty::{Chess, EnPassantMode};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Magnitude substituted for forced-mate scores.
pub const MATE_SCORE: i32 = 3000;

/// Extra wait for `bestmove` beyond the requested search time.
const BESTMOVE_GRACE: Duration = Duration::from_millis(1000);
const SHUTDOWN_WAIT: Duration = Duration::from_millis(300);

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to start engine '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("engine I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("engine did not answer '{0}' in time")]
    Timeout(&'static str),

    #[error("engine closed its output")]
    Disconnected,

    #[error("engine reported no score")]
    NoScore,
}

impl OracleError {
    /// Whether the session is unusable after this error. Only a search
    /// overrun or a missing score is confined to the queried position.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, Self::Timeout("go") | Self::NoScore)
    }
}

/// Engine evaluation from the point of view of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Cp(i32),
    /// Mate in N moves; negative when the side to move gets mated.
    Mate(i32),
}

impl Score {
    /// Single ordering key for the score.
    ///
    /// Mates saturate at [`MATE_SCORE`] signed by the mate distance. Mate in
    /// zero means the side to move is already mated, which ranks as a loss.
    pub fn rank_value(self) -> i32 {
        match self {
            Self::Cp(cp) => cp,
            Self::Mate(n) if n > 0 => MATE_SCORE,
            Self::Mate(_) => -MATE_SCORE,
        }
    }
}

/// Anything that can judge a position for the side to move.
pub trait MoveOracle {
    fn evaluate(&mut self, position: &Chess, budget: Duration) -> Result<Score, OracleError>;
}

/// Long-lived UCI engine process.
///
/// The session is reused across queries and closed with [`UciEngine::quit`];
/// dropping it performs the same shutdown.
pub struct UciEngine {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    name: Option<String>,
    handshake_timeout: Duration,
}

impl UciEngine {
    pub fn spawn(config: &EngineConfig) -> Result<Self, OracleError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| OracleError::Spawn {
                path: config.path.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(OracleError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(OracleError::Disconnected)?;

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut engine = Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            name: None,
            handshake_timeout: config.handshake_timeout,
        };

        engine.write_line("uci")?;
        loop {
            let line = engine.read_line(engine.handshake_timeout, "uci")?;
            if let Some(rest) = line.strip_prefix("id name ") {
                engine.name = Some(rest.trim().to_string());
            } else if line.trim() == "uciok" {
                break;
            }
        }

        for (name, value) in &config.options {
            engine.write_line(&format!("setoption name {name} value {value}"))?;
        }

        engine.sync_ready()?;
        engine.write_line("ucinewgame")?;
        engine.sync_ready()?;

        log::info!(
            "Engine '{}' ready",
            engine.name.as_deref().unwrap_or("unknown")
        );
        Ok(engine)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn write_line(&mut self, line: &str) -> Result<(), OracleError> {
        self.stdin.write_all(line.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&self, timeout: Duration, waiting_for: &'static str) -> Result<String, OracleError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => OracleError::Timeout(waiting_for),
            RecvTimeoutError::Disconnected => OracleError::Disconnected,
        })
    }

    fn sync_ready(&mut self) -> Result<(), OracleError> {
        self.write_line("isready")?;
        loop {
            if self.read_line(self.handshake_timeout, "isready")?.trim() == "readyok" {
                return Ok(());
            }
        }
    }

    /// Stops a search that overran its deadline and resynchronizes.
    fn abort_search(&mut self) -> Result<(), OracleError> {
        self.write_line("stop")?;
        let deadline = Instant::now() + BESTMOVE_GRACE;
        while let Some(remain) = deadline.checked_duration_since(Instant::now()) {
            match self.rx.recv_timeout(remain) {
                Ok(line) if line.starts_with("bestmove") => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        self.sync_ready()
    }

    /// Sends `quit` and waits for the process, killing it if it lingers.
    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.write_line("quit");
        let deadline = Instant::now() + SHUTDOWN_WAIT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl MoveOracle for UciEngine {
    fn evaluate(&mut self, position: &Chess, budget: Duration) -> Result<Score, OracleError> {
        let fen = Fen::from_position(position, EnPassantMode::Legal);
        self.write_line(&format!("position fen {fen}"))?;
        self.write_line(&format!("go movetime {}", budget.as_millis().max(1)))?;

        let deadline = Instant::now() + budget + BESTMOVE_GRACE;
        let mut score = None;
        loop {
            let Some(remain) = deadline.checked_duration_since(Instant::now()) else {
                self.abort_search()?;
                return Err(OracleError::Timeout("go"));
            };
            let line = match self.read_line(remain, "go") {
                Ok(line) => line,
                Err(OracleError::Timeout(_)) => {
                    self.abort_search()?;
                    return Err(OracleError::Timeout("go"));
                }
                Err(e) => return Err(e),
            };

            if line.starts_with("info ") {
                if let Some(s) = parse_info_score(&line) {
                    score = Some(s);
                }
            } else if line.starts_with("bestmove") {
                return score.ok_or(OracleError::NoScore);
            }
        }
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.shutdown();
        }
    }
}

/// Extracts `score cp N` / `score mate N` from a UCI `info` line. Bound
/// markers following the value are ignored.
pub fn parse_info_score(line: &str) -> Option<Score> {
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok != "score" {
            continue;
        }
        let kind = tokens.next()?;
        let value = tokens.next()?.parse::<i32>().ok()?;
        return match kind {
            "cp" => Some(Score::Cp(value)),
            "mate" => Some(Score::Mate(value)),
            _ => None,
        };
    }
    None
}
