//! Tunable game configuration.
//!
//! Reward numbers, the walk goal, the quiz interval, and UI delays are
//! policy, not logic. This module provides the data model and validation
//! for them, independent of how the configuration is loaded.
//!
//! ```
//! use stepvillage_logic::config::{validate_config, GameConfig};
//!
//! let config = GameConfig::default();
//! assert!(validate_config(&config).is_empty());
//! assert_eq!(config.walk_goal, 5000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::level::LevelTable;
use crate::rewards::RewardPolicy;

/// Game configuration. Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Steps between walking quizzes.
    pub milestone_interval: u32,
    /// Session steps that complete a walk and grant the walk reward.
    pub walk_goal: u32,
    /// How long a quiz result stays on screen before walking resumes.
    pub result_delay_ms: u64,
    /// How long café feedback stays on screen before the next round.
    pub feedback_delay_ms: u64,
    /// Rounds per café session.
    pub cafe_rounds: u8,
    /// Café score per correct answer.
    pub cafe_points_per_correct: u32,
    /// Random seed for quiz and café selection (None = entropy).
    pub rng_seed: Option<u64>,
    pub level_table: LevelTable,
    pub rewards: RewardPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            milestone_interval: 1000,
            walk_goal: 5000,
            result_delay_ms: 3000,
            feedback_delay_ms: 2000,
            cafe_rounds: 3,
            cafe_points_per_correct: 10,
            rng_seed: None,
            level_table: LevelTable::default(),
            rewards: RewardPolicy::default(),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Milestone interval must be positive.
    ZeroMilestoneInterval,
    /// Walk goal must be positive.
    ZeroWalkGoal,
    /// A café session needs at least one round.
    ZeroCafeRounds,
    /// Level table must list one threshold per level.
    LevelCountMismatch(usize),
    /// Level 1 must start at zero experience.
    FirstLevelNotZero(u32),
    /// Threshold for this level does not exceed the previous one.
    LevelThresholdsNotAscending(u8),
    /// Diet tier outside [0, 10] or not ordered highest first.
    InvalidDietTiers,
    /// Walk tiers not ordered highest first.
    InvalidWalkTiers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroMilestoneInterval => write!(f, "milestone_interval must be > 0"),
            ConfigError::ZeroWalkGoal => write!(f, "walk_goal must be > 0"),
            ConfigError::ZeroCafeRounds => write!(f, "cafe_rounds must be > 0"),
            ConfigError::LevelCountMismatch(n) => {
                write!(f, "level table needs 10 thresholds, got {}", n)
            }
            ConfigError::FirstLevelNotZero(t) => {
                write!(f, "level 1 threshold must be 0, got {}", t)
            }
            ConfigError::LevelThresholdsNotAscending(level) => {
                write!(f, "threshold for level {} must exceed the previous level", level)
            }
            ConfigError::InvalidDietTiers => {
                write!(f, "diet tiers must lie in [0, 10] ordered highest first")
            }
            ConfigError::InvalidWalkTiers => write!(f, "walk tiers must be ordered highest first"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &GameConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.milestone_interval == 0 {
        errors.push(ConfigError::ZeroMilestoneInterval);
    }
    if config.walk_goal == 0 {
        errors.push(ConfigError::ZeroWalkGoal);
    }
    if config.cafe_rounds == 0 {
        errors.push(ConfigError::ZeroCafeRounds);
    }

    // Level tables are validated on construction; re-check in case one
    // was assembled field by field.
    if let Err(e) = LevelTable::from_thresholds(config.level_table.thresholds().to_vec()) {
        errors.push(e);
    }

    let diet = &config.rewards.diet_tiers;
    let diet_in_range = diet
        .iter()
        .all(|t| t.min_score.is_finite() && (0.0..=10.0).contains(&t.min_score));
    let diet_descending = diet.windows(2).all(|w| w[0].min_score > w[1].min_score);
    if !diet_in_range || !diet_descending {
        errors.push(ConfigError::InvalidDietTiers);
    }

    let walk = &config.rewards.walk_tiers;
    if !walk.windows(2).all(|w| w[0].min_steps > w[1].min_steps) {
        errors.push(ConfigError::InvalidWalkTiers);
    }

    errors
}
