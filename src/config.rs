// ⚙️ Runtime configuration from the environment
//
// A `.env` file in the working directory is loaded first if present.
// Unset variables fall back to defaults; set but invalid values are errors.

use crate::driver::{DriverOptions, InvalidRecordPolicy};
use crate::error::{LeagueError, Result};
use crate::standings::TieBreak;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/league.db";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueConfig {
    /// SQLite file (LEAGUE_DB_PATH)
    pub db_path: PathBuf,

    /// Directory holding championship{year}.json archives (LEAGUE_DATA_DIR)
    pub data_dir: PathBuf,

    /// LEAGUE_TIE_BREAK: enumeration | goal-difference
    pub tie_break: TieBreak,

    /// LEAGUE_MAX_MATCHDAYS: overrides the season calendar length
    pub max_matchdays: Option<u32>,

    /// LEAGUE_SKIP_INVALID: skip invalid records instead of failing the batch
    pub skip_invalid: bool,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        LeagueConfig {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            tie_break: TieBreak::default(),
            max_matchdays: None,
            skip_invalid: false,
        }
    }
}

impl LeagueConfig {
    /// Load `.env` (if any), then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = LeagueConfig::default();

        if let Some(path) = non_empty(lookup("LEAGUE_DB_PATH")) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(dir) = non_empty(lookup("LEAGUE_DATA_DIR")) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(value) = non_empty(lookup("LEAGUE_TIE_BREAK")) {
            config.tie_break = value.parse().map_err(|message| LeagueError::Config {
                key: "LEAGUE_TIE_BREAK",
                value: value.clone(),
                message,
            })?;
        }

        if let Some(value) = non_empty(lookup("LEAGUE_MAX_MATCHDAYS")) {
            let parsed = value.trim().parse::<u32>().ok().filter(|n| *n >= 1);
            config.max_matchdays = Some(parsed.ok_or_else(|| LeagueError::Config {
                key: "LEAGUE_MAX_MATCHDAYS",
                value: value.clone(),
                message: "expected a positive integer".to_string(),
            })?);
        }

        if let Some(value) = non_empty(lookup("LEAGUE_SKIP_INVALID")) {
            config.skip_invalid = parse_flag(&value).ok_or_else(|| LeagueError::Config {
                key: "LEAGUE_SKIP_INVALID",
                value: value.clone(),
                message: "expected true or false".to_string(),
            })?;
        }

        Ok(config)
    }

    /// Driver options implied by this configuration
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            max_matchdays: self.max_matchdays,
            invalid_records: if self.skip_invalid {
                InvalidRecordPolicy::SkipRecord
            } else {
                InvalidRecordPolicy::FailBatch
            },
            ..DriverOptions::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<LeagueConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LeagueConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config, LeagueConfig::default());
        assert_eq!(config.db_path, PathBuf::from("data/league.db"));
        assert_eq!(config.tie_break, TieBreak::EnumerationOrder);

        let options = config.driver_options();
        assert!(options.skip_ingested_matchdays);
        assert_eq!(options.invalid_records, InvalidRecordPolicy::FailBatch);
        assert_eq!(options.max_matchdays, None);
    }

    #[test]
    fn test_reads_every_variable() {
        let config = load(&[
            ("LEAGUE_DB_PATH", "/tmp/serie_a.db"),
            ("LEAGUE_DATA_DIR", "/srv/archives"),
            ("LEAGUE_TIE_BREAK", "goal-difference"),
            ("LEAGUE_MAX_MATCHDAYS", "10"),
            ("LEAGUE_SKIP_INVALID", "true"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/serie_a.db"));
        assert_eq!(config.data_dir, PathBuf::from("/srv/archives"));
        assert_eq!(config.tie_break, TieBreak::GoalDifference);
        assert_eq!(config.max_matchdays, Some(10));

        let options = config.driver_options();
        assert_eq!(options.invalid_records, InvalidRecordPolicy::SkipRecord);
        assert_eq!(options.max_matchdays, Some(10));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("LEAGUE_DB_PATH", "  "), ("LEAGUE_TIE_BREAK", "")]).unwrap();
        assert_eq!(config, LeagueConfig::default());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for (key, value) in [
            ("LEAGUE_TIE_BREAK", "alphabetical"),
            ("LEAGUE_MAX_MATCHDAYS", "0"),
            ("LEAGUE_MAX_MATCHDAYS", "many"),
            ("LEAGUE_SKIP_INVALID", "perhaps"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            match err {
                LeagueError::Config { key: k, value: v, .. } => {
                    assert_eq!(k, key);
                    assert_eq!(v, value);
                }
                other => panic!("expected config error, got {other}"),
            }
        }
    }
}
