//! Reorders the `Legal Moves:` field of rendered training records by engine
//! evaluation.
//!
//! Records only exist as text, so the move history is recovered from the
//! `Game Sequence:` line written by [`sample_to_readable`]. The extraction
//! helpers here and the renderer there form one protocol and are tested
//! against each other.
//!
//! [`sample_to_readable`]: super::readable::sample_to_readable

use super::config::EngineConfig;
use super::error::{CorpusError, Result};
use super::oracle::{MoveOracle, OracleError, UciEngine};
use super::readable::LEGAL_MOVES_LABEL;
use super::samples::parse_san;
use super::types::ReadableSample;
use regex::Regex;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, Position};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static GAME_SEQUENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Game Sequence: \[([^\]]*)\]").expect("valid regex"));

static LEGAL_MOVES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Legal Moves: \[.*\]").expect("valid regex"));

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c| c == ' ' || c == '\'')
}

/// Moves listed after `Game Sequence: `, or `None` if the section is missing.
pub fn extract_game_sequence(input: &str) -> Option<Vec<String>> {
    let body = GAME_SEQUENCE_RE.captures(input)?.get(1)?.as_str();
    Some(
        body.split(',')
            .map(clean_token)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Byte range of the whole `Legal Moves: [...]` section.
pub fn legal_moves_span(input: &str) -> Option<Range<usize>> {
    LEGAL_MOVES_RE.find(input).map(|m| m.range())
}

/// Moves listed in the bracketed `Legal Moves: ` section.
pub fn extract_legal_moves(input: &str) -> Option<Vec<String>> {
    let span = legal_moves_span(input)?;
    let section = &input[span];
    let body = section
        .strip_prefix(LEGAL_MOVES_LABEL)?
        .strip_prefix('[')?
        .strip_suffix(']')?;
    Some(
        body.split(',')
            .map(clean_token)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Replays `moves` from the initial position, skipping any move that does
/// not apply. Returns the position and the number of skipped moves.
pub fn replay_tolerant<S: AsRef<str>>(moves: &[S]) -> (Chess, usize) {
    let mut pos = Chess::default();
    let mut skipped = 0;

    for (ply, token) in moves.iter().enumerate() {
        let token = token.as_ref();
        match parse_san(&pos, token) {
            Some((m, _)) => pos.play_unchecked(m),
            None => {
                log::warn!("Skipping unplayable move '{}' at ply {}", token, ply + 1);
                skipped += 1;
            }
        }
    }

    (pos, skipped)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedMoves {
    /// Best first for the side to move.
    pub moves: Vec<String>,
    /// Moves the oracle failed on.
    pub dropped: usize,
}

/// Evaluates every legal move after `history` and orders them ascending by
/// the opponent's score, i.e. best move first. Ties keep generator order.
///
/// A history with an unplayable move yields no moves at all. Errors that
/// leave the oracle session unusable abort the ranking.
pub fn rank_moves<S: AsRef<str>>(
    history: &[S],
    oracle: &mut dyn MoveOracle,
    budget: Duration,
) -> Result<RankedMoves, OracleError> {
    let (pos, skipped) = replay_tolerant(history);
    if skipped > 0 {
        return Ok(RankedMoves::default());
    }

    let mut scored: Vec<(String, i32)> = Vec::new();
    let mut dropped = 0;

    for m in pos.legal_moves() {
        let san = SanPlus::from_move(pos.clone(), m).to_string();
        let mut child = pos.clone();
        child.play_unchecked(m);

        match oracle.evaluate(&child, budget) {
            Ok(score) => scored.push((san, score.rank_value())),
            Err(e) if e.is_session_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Dropping move {}: {}", san, e);
                dropped += 1;
            }
        }
    }

    scored.sort_by_key(|(_, score)| *score);

    Ok(RankedMoves {
        moves: scored.into_iter().map(|(san, _)| san).collect(),
        dropped,
    })
}

/// Outcome of reranking one record's input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RerankOutcome {
    Reranked { input: String, dropped: usize },
    /// The record lacks the named section.
    PassedThrough { missing: &'static str },
}

impl RerankOutcome {
    pub fn into_input(self, original: &str) -> String {
        match self {
            Self::Reranked { input, .. } => input,
            Self::PassedThrough { .. } => original.to_string(),
        }
    }
}

/// Rewrites the `Legal Moves: [...]` section of `input` as a plain
/// comma-separated list ordered by `oracle`.
pub fn rerank_input(
    input: &str,
    oracle: &mut dyn MoveOracle,
    budget: Duration,
) -> Result<RerankOutcome, OracleError> {
    let Some(history) = extract_game_sequence(input) else {
        return Ok(RerankOutcome::PassedThrough {
            missing: "Game Sequence",
        });
    };
    let Some(span) = legal_moves_span(input) else {
        return Ok(RerankOutcome::PassedThrough {
            missing: "Legal Moves",
        });
    };

    let ranked = rank_moves(&history, oracle, budget)?;

    let mut rewritten = String::with_capacity(input.len());
    rewritten.push_str(&input[..span.start]);
    rewritten.push_str(LEGAL_MOVES_LABEL);
    rewritten.push_str(&ranked.moves.join(", "));
    rewritten.push_str(&input[span.end..]);

    Ok(RerankOutcome::Reranked {
        input: rewritten,
        dropped: ranked.dropped,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RerankStats {
    pub records: usize,
    pub reranked: usize,
    pub passed_through: usize,
    pub dropped_moves: usize,
}

/// Streams a JSONL corpus through [`rerank_input`]. Only the `input` field
/// of reranked records changes and passed-through lines are copied as read;
/// blank lines are skipped. A session-fatal oracle error ends the pass.
pub fn rerank_jsonl<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    oracle: &mut dyn MoveOracle,
    budget: Duration,
) -> Result<RerankStats> {
    let mut stats = RerankStats::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut record: ReadableSample = serde_json::from_str(&line).map_err(|source| {
            CorpusError::Json {
                line: idx + 1,
                source,
            }
        })?;

        stats.records += 1;
        match rerank_input(&record.input, oracle, budget)? {
            RerankOutcome::Reranked { input, dropped } => {
                log::debug!("Record {}: reranked, {} moves dropped", idx + 1, dropped);
                stats.reranked += 1;
                stats.dropped_moves += dropped;
                record.input = input;
                serde_json::to_writer(&mut writer, &record).map_err(|source| {
                    CorpusError::Json {
                        line: idx + 1,
                        source,
                    }
                })?;
            }
            RerankOutcome::PassedThrough { missing } => {
                log::warn!(
                    "Record {} passed through: {}",
                    idx + 1,
                    CorpusError::MalformedRecord(missing)
                );
                stats.passed_through += 1;
                writer.write_all(line.as_bytes())?;
            }
        }
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    log::info!(
        "Reranked {} of {} records ({} passed through, {} moves dropped)",
        stats.reranked,
        stats.records,
        stats.passed_through,
        stats.dropped_moves
    );
    Ok(stats)
}

/// Reranks the corpus at `input` into `output` with one engine session.
///
/// The engine is started before `output` is created, so a launch failure
/// leaves no file behind. The session is closed on every path.
pub fn rerank_file(input: &Path, output: &Path, engine: &EngineConfig) -> Result<RerankStats> {
    let reader = File::open(input).map_err(|source| CorpusError::Open {
        path: input.to_path_buf(),
        source,
    })?;

    let mut session = UciEngine::spawn(engine)?;
    let writer = File::create(output).map_err(|source| CorpusError::Open {
        path: output.to_path_buf(),
        source,
    })?;

    let stats = rerank_jsonl(
        BufReader::new(reader),
        BufWriter::new(writer),
        &mut session,
        engine.move_time,
    );
    session.quit();
    stats
}
