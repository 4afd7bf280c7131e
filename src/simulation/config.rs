use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid simulation configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session-level switches of a simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub debug: bool,
    pub trace: bool,
    /// Enables `cache_blacklist`.
    pub opt_out_cache: bool,
    pub cache_blacklist: BTreeSet<String>,
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn traced() -> Self {
        Self { trace: true, ..Self::default() }
    }

    /// Whether writes for `variable` skip the persistent cache.
    pub fn is_cache_excluded(&self, variable: &str) -> bool {
        self.opt_out_cache && self.cache_blacklist.contains(variable)
    }

    pub fn records_trace(&self) -> bool {
        self.debug || self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_with_defaults() {
        let config = SimulationConfig::from_json(r#"{"trace": true}"#).unwrap();
        assert!(config.records_trace());
        assert!(!config.opt_out_cache);
        assert!(config.cache_blacklist.is_empty());
    }

    #[test]
    fn test_blacklist_needs_opt_out_flag() {
        let mut config =
            SimulationConfig::from_json(r#"{"cache_blacklist": ["salary"]}"#).unwrap();
        assert!(!config.is_cache_excluded("salary"));
        config.opt_out_cache = true;
        assert!(config.is_cache_excluded("salary"));
        assert!(!config.is_cache_excluded("rent"));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        assert!(matches!(SimulationConfig::from_json(r#"{"verbose": 1}"#), Err(ConfigError::Json(_))));
    }
}
