//! Loading game configuration.

use stepvillage_logic::config::{validate_config, GameConfig};

use crate::error::ConfigLoadError;

/// Parse a JSON config (missing fields take their defaults) and validate it.
pub fn load_config(json: &str) -> Result<GameConfig, ConfigLoadError> {
    let config: GameConfig = serde_json::from_str(json)?;
    check_config(config)
}

/// Validate an already built config, reporting every problem at once.
pub fn check_config(config: GameConfig) -> Result<GameConfig, ConfigLoadError> {
    let errors = validate_config(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigLoadError::Invalid(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepvillage_logic::config::ConfigError;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(load_config("{}").unwrap(), GameConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = load_config(r#"{"walk_goal": 8000, "rng_seed": 7}"#).unwrap();
        assert_eq!(config.walk_goal, 8000);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.milestone_interval, 1000);
    }

    #[test]
    fn test_collects_all_problems() {
        let err = load_config(r#"{"walk_goal": 0, "milestone_interval": 0}"#).unwrap_err();
        match err {
            ConfigLoadError::Invalid(errors) => {
                assert!(errors.contains(&ConfigError::ZeroWalkGoal));
                assert!(errors.contains(&ConfigError::ZeroMilestoneInterval));
            }
            other => panic!("unexpected error {}", other),
        }
    }

    #[test]
    fn test_bad_level_table_fails_to_parse() {
        let err = load_config(r#"{"level_table": [0, 100]}"#).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse(_)));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(load_config("{"), Err(ConfigLoadError::Parse(_))));
    }
}
