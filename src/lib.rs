//! Builds move-prediction training corpora from PGN archives and reorders
//! their legal-move lists by engine evaluation.

pub mod chess;

pub use chess::{
    CorpusConfig, CorpusError, EloBand, EngineConfig, GameRecord, MoveOracle, PositionSample,
    ReadableSample, UciEngine,
};
