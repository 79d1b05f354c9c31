use super::error::{CorpusError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inclusive average-rating window used to select games.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EloBand {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl EloBand {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
        }
    }

    pub fn contains(&self, elo: f64) -> bool {
        self.min <= elo && elo <= self.max
    }
}

fn default_bands() -> Vec<EloBand> {
    vec![
        EloBand::new("low", 1300.0, 1650.0),
        EloBand::new("medium", 1551.0, 1800.0),
        EloBand::new("high", 1801.0, 3000.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorpusConfig {
    pub bands: Vec<EloBand>,
    /// Games reserved from the end of the filtered list for validation.
    pub validation_games: usize,
    pub max_train_samples: usize,
    pub max_val_samples: usize,
    /// Random plies appended after each game's last move.
    pub random_extension: usize,
    /// Upper bound on games read from the archive, `None` for all.
    pub max_games: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            validation_games: 20,
            max_train_samples: 10_000,
            max_val_samples: 300,
            random_extension: 0,
            max_games: Some(500),
            seed: None,
        }
    }
}

impl CorpusConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| CorpusError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CorpusError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        for band in &self.bands {
            if band.min > band.max {
                return Err(CorpusError::Config(format!(
                    "band '{}' has min {} above max {}",
                    band.name, band.min, band.max
                )));
            }
        }
        Ok(())
    }

    pub fn band(&self, name: &str) -> Result<&EloBand> {
        self.bands
            .iter()
            .find(|band| band.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| CorpusError::Config(format!("unknown Elo band '{name}'")))
    }
}

/// Launch and search settings for the UCI oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// `setoption` pairs applied before the first query.
    pub options: Vec<(String, String)>,
    pub move_time: Duration,
    /// Time allowed for handshakes (`uciok`, `readyok`).
    pub handshake_timeout: Duration,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
            options: Vec::new(),
            move_time: Duration::from_millis(50),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Parses `NAME=VALUE` as given on the command line.
pub fn parse_engine_option(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| CorpusError::Config(format!("engine option '{raw}' is not NAME=VALUE")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CorpusError::Config(format!("engine option '{raw}' has no name")));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let config = CorpusConfig::default();

        let low = config.band("low").unwrap();
        assert_eq!((low.min, low.max), (1300.0, 1650.0));
        assert!(config.band("HIGH").is_ok());
        assert!(config.band("master").is_err());
    }

    #[test]
    fn test_band_bounds_are_inclusive() {
        let band = EloBand::new("low", 1300.0, 1650.0);

        assert!(band.contains(1300.0));
        assert!(band.contains(1650.0));
        assert!(!band.contains(1299.0));
        assert!(!band.contains(1651.0));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = CorpusConfig::from_toml_str(
            r#"
validation_games = 5
max_train_samples = 100
seed = 9

[[bands]]
name = "club"
min = 1400
max = 1900
"#,
        )
        .unwrap();

        assert_eq!(config.validation_games, 5);
        assert_eq!(config.max_train_samples, 100);
        assert_eq!(config.max_val_samples, 300);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.bands, vec![EloBand::new("club", 1400.0, 1900.0)]);
    }

    #[test]
    fn test_toml_rejects_inverted_band() {
        let err = CorpusConfig::from_toml_str(
            r#"
[[bands]]
name = "bad"
min = 2000
max = 1000
"#,
        )
        .unwrap_err();

        assert!(matches!(err, CorpusError::Config(_)));
    }

    #[test]
    fn test_toml_rejects_unknown_key() {
        assert!(CorpusConfig::from_toml_str("validation = 3").is_err());
    }

    #[test]
    fn test_parse_engine_option() {
        assert_eq!(
            parse_engine_option("Threads=4").unwrap(),
            ("Threads".to_string(), "4".to_string())
        );
        assert_eq!(
            parse_engine_option("Skill Level = 5").unwrap(),
            ("Skill Level".to_string(), "5".to_string())
        );
        assert!(parse_engine_option("Threads").is_err());
        assert!(parse_engine_option("=4").is_err());
    }
}
