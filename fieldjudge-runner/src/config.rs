//! Session configuration loaded from TOML.
//!
//! ```toml
//! event_id = "hj-women"
//! discipline = "vertical"
//! roster = "roster.toml"
//! store = "attempts.jsonl"
//! max_retries = 3
//!
//! [vertical]
//! start_height = 150
//! increment = 4
//! heights = [155, 159, 163]
//! ```
//!
//! Relative `roster` and `store` paths are resolved against the directory of
//! the config file.

use fieldjudge_core::domain::EventId;
use fieldjudge_core::engine::VerticalConfig;
use fieldjudge_core::horizontal::MAX_ROUNDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// High jump and pole vault: height ladder with carried failures.
    #[default]
    Vertical,
    /// Throws, long and triple jump: fixed number of rounds.
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub event_id: EventId,

    #[serde(default)]
    pub discipline: Discipline,

    /// Roster TOML file.
    pub roster: PathBuf,

    /// JSONL attempt log.
    pub store: PathBuf,

    /// Save attempts per dirty entry before `flush_dirty` gives up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Rounds of a horizontal event.
    #[serde(default = "default_rounds")]
    pub rounds: u8,

    #[serde(default)]
    pub vertical: VerticalConfig,
}

fn default_max_retries() -> u32 {
    3
}

fn default_rounds() -> u8 {
    6
}

impl SessionConfig {
    pub fn new(event_id: EventId, roster: PathBuf, store: PathBuf) -> Self {
        Self {
            event_id,
            discipline: Discipline::default(),
            roster,
            store,
            max_retries: default_max_retries(),
            rounds: default_rounds(),
            vertical: VerticalConfig::default(),
        }
    }

    /// Load and validate a config file, resolving relative paths against it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_id.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid("event_id is empty".into()));
        }
        match self.discipline {
            Discipline::Vertical => {
                self.vertical
                    .ladder()
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
            }
            Discipline::Horizontal if self.rounds == 0 || self.rounds > MAX_ROUNDS => {
                return Err(ConfigError::Invalid(format!(
                    "rounds must be between 1 and {MAX_ROUNDS}"
                )));
            }
            Discipline::Horizontal => {}
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.roster.is_relative() {
            self.roster = base.join(&self.roster);
        }
        if self.store.is_relative() {
            self.store = base.join(&self.store);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldjudge_core::domain::Height;

    const SAMPLE: &str = r#"
event_id = "hj-women"
roster = "roster.toml"
store = "attempts.jsonl"

[vertical]
start_height = 150
increment = 4
heights = [155, 159]
"#;

    #[test]
    fn parses_with_defaults() {
        let config = SessionConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.event_id, EventId::from("hj-women"));
        assert_eq!(config.discipline, Discipline::Vertical);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.rounds, 6);
        assert_eq!(config.vertical.start_height, Height(150));
        assert_eq!(config.vertical.heights, vec![Height(155), Height(159)]);
        assert!(config.vertical.auto_advance);
    }

    #[test]
    fn rejects_bad_ladder() {
        let bad = SAMPLE.replace("heights = [155, 159]", "heights = [140]");
        assert!(matches!(
            SessionConfig::from_toml(&bad),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_rounds() {
        for rounds in [0, 255] {
            let toml = format!(
                r#"
event_id = "sp"
discipline = "horizontal"
roster = "r.toml"
store = "s.jsonl"
rounds = {rounds}
"#
            );
            assert!(matches!(
                SessionConfig::from_toml(&toml),
                Err(ConfigError::Invalid(_))
            ));
        }
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SessionConfig::from_toml(SAMPLE).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(SessionConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn relative_paths_follow_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = SessionConfig::from_file(&path).unwrap();
        assert_eq!(config.roster, dir.path().join("roster.toml"));
        assert_eq!(config.store, dir.path().join("attempts.jsonl"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SessionConfig::from_file(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/session.toml"));
    }
}
