pub mod board;
pub mod config;
pub mod corpus;
pub mod error;
pub mod jsonl;
pub mod oracle;
pub mod readable;
pub mod reader;
pub mod rerank;
pub mod samples;
pub mod types;
pub mod visitor;

pub use config::{CorpusConfig, EloBand, EngineConfig};
pub use error::{CorpusError, ErrorAccumulator, Result};
pub use oracle::{MoveOracle, OracleError, Score, UciEngine};
pub use types::{GameRecord, PositionSample, ReadableSample, Side};
