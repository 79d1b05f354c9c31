use super::error::{CorpusError, Result};
use super::types::GameRecord;
use super::visitor::{PgnInput, PgnReaderState};
use std::fs::File;
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") || normalized.eq_ignore_ascii_case("zst") {
            Ok(Self::Zstd)
        } else if normalized.eq_ignore_ascii_case("none") || normalized.eq_ignore_ascii_case("plain")
        {
            Ok(Self::Plain)
        } else {
            Err(CorpusError::Config(format!(
                "Invalid compression value '{normalized}'. Supported values: 'zstd' or 'plain'."
            )))
        }
    }

    /// Zstd for `*.zst` paths, plain otherwise.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Expands `pattern` into the archive paths to read. Glob patterns may match
/// several files; a plain path must exist.
pub fn resolve_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .map_err(|source| CorpusError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        matched.sort();
        matched
    } else {
        let path = PathBuf::from(pattern);
        if path.is_file() { vec![path] } else { Vec::new() }
    };

    if paths.is_empty() {
        return Err(CorpusError::SourceNotFound(pattern.to_string()));
    }
    Ok(paths)
}

pub fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput> {
    let file = File::open(path).map_err(|source| CorpusError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as PgnInput)
            .map_err(|source| CorpusError::Open {
                path: path.to_path_buf(),
                source,
            }),
    }
}

/// Parser errors tolerated in a row before a stream is abandoned. An I/O
/// error repeats forever on the same stream.
const MAX_CONSECUTIVE_PARSER_ERRORS: usize = 16;

#[derive(Debug, Default)]
struct ErrorStreak(usize);

impl ErrorStreak {
    /// Counts one more failure; true once the streak exceeds the limit.
    fn fail(&mut self) -> bool {
        self.0 += 1;
        self.0 > MAX_CONSECUTIVE_PARSER_ERRORS
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}

enum ReadNextGameOutcome {
    GameReady(GameRecord),
    Skipped,
    ReaderFinished,
}

fn read_next_game(reader: &mut PgnReaderState, source_path: &Path) -> ReadNextGameOutcome {
    let game_index = reader.next_game_index;

    match reader.pgn_reader.read_game(&mut reader.visitor) {
        Ok(Some(_)) => {
            reader.next_game_index += 1;
            match reader.visitor.current_game.take() {
                Some(game) => ReadNextGameOutcome::GameReady(game),
                None => ReadNextGameOutcome::ReaderFinished,
            }
        }
        Ok(None) => ReadNextGameOutcome::ReaderFinished,
        Err(error) => {
            reader.next_game_index += 1;
            log::warn!(
                "Parser-stage error: stage=read_game; file='{}'; game_index={}; error={}",
                source_path.display(),
                game_index,
                error
            );
            ReadNextGameOutcome::Skipped
        }
    }
}

/// Reads games from every path in order, stopping after `limit` games.
///
/// A game the parser rejects is logged and skipped. An unreadable file is
/// fatal when it is the only input and logged otherwise.
pub fn read_games(
    paths: &[PathBuf],
    compression: Option<CompressionMode>,
    limit: Option<usize>,
) -> Result<Vec<GameRecord>> {
    let mut games = Vec::new();
    let limit = limit.unwrap_or(usize::MAX);

    for path in paths {
        if games.len() >= limit {
            break;
        }

        let mode = compression.unwrap_or_else(|| CompressionMode::detect(path));
        let input = match open_input_stream(path, mode) {
            Ok(input) => input,
            Err(e) if paths.len() > 1 => {
                log::warn!("{e}");
                continue;
            }
            Err(e) => return Err(e),
        };

        let mut reader = PgnReaderState::new(input);
        let mut streak = ErrorStreak::default();
        while games.len() < limit {
            match read_next_game(&mut reader, path) {
                ReadNextGameOutcome::GameReady(game) => {
                    streak.reset();
                    if let Some(diagnostic) = &game.parse_error {
                        log::warn!(
                            "file='{}'; game_index={}; {}",
                            path.display(),
                            reader.next_game_index - 1,
                            diagnostic
                        );
                    }
                    games.push(game);
                }
                ReadNextGameOutcome::Skipped => {
                    if streak.fail() {
                        log::warn!("Giving up on '{}' after repeated errors", path.display());
                        break;
                    }
                }
                ReadNextGameOutcome::ReaderFinished => break,
            }
        }

        log::info!("Read {} games so far (after '{}')", games.len(), path.display());
    }

    Ok(games)
}
