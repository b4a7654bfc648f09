//! Bus configuration

use crate::catalog;
use crate::types::EventClass;
use serde::{Deserialize, Serialize};

/// Per-bus settings
///
/// Fixed when the bus is created; see [`BusRegistry::configure`](crate::BusRegistry::configure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusConfig {
    /// Dispatch every event sequentially on the publishing task,
    /// regardless of its declared discipline (deterministic replay/testing)
    pub force_sequential: bool,

    /// Event class whose publication starts a new simulation step and
    /// clears the timestep set
    pub step_begin: EventClass,

    /// Log events with no subscribers at warn level (debug otherwise)
    pub warn_unobserved: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            force_sequential: false,
            step_begin: catalog::model::STEP,
            warn_unobserved: true,
        }
    }
}

impl BusConfig {
    /// Default configuration with sequential dispatch forced
    pub fn sequential() -> Self {
        Self {
            force_sequential: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BusConfig::default();
        assert!(!config.force_sequential);
        assert_eq!(config.step_begin.as_str(), "model.step");
        assert!(config.warn_unobserved);
        assert!(BusConfig::sequential().force_sequential);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: BusConfig = serde_json::from_str(r#"{"forceSequential": true}"#).unwrap();
        assert!(config.force_sequential);
        assert_eq!(config.step_begin, catalog::model::STEP);
        assert!(config.warn_unobserved);
    }

    #[test]
    fn test_config_serialization() {
        let config = BusConfig {
            force_sequential: true,
            step_begin: EventClass::from_static("clock.tick"),
            warn_unobserved: false,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"forceSequential\":true"));
        assert!(json.contains("\"stepBegin\":\"clock.tick\""));
        assert!(json.contains("\"warnUnobserved\":false"));

        let parsed: BusConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
