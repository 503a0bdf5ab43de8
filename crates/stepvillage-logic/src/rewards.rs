//! Domain score → resource grant mappings.
//!
//! Every mapping is a step function over a bounded domain. Tiers are
//! inclusive at their lower bound and evaluated from the highest threshold
//! downward, so the first tier whose minimum is met decides the grant.
//!
//! | Function | Thresholds → grant |
//! |----------|--------------------|
//! | [`diet_reward`] | ≥8 → 5, ≥6 → 3, ≥4 → 2, ≥2 → 1, else 0 |
//! | [`walk_reward`] | ≥10000 → 3, ≥7000 → 2, ≥5000 → 1, else 0 |
//! | [`cafe_reward`] | all correct → 2, at least half → 1, else 0 |
//!
//! The free functions use the default tables. [`RewardPolicy`] carries the
//! same tables plus experience grants as tunable configuration.

use serde::{Deserialize, Serialize};

/// One diet tier: scores at or above `min_score` grant `fertilizer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DietTier {
    pub min_score: f32,
    pub fertilizer: u32,
}

/// One walk tier: sessions at or above `min_steps` grant `fertilizer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkTier {
    pub min_steps: u32,
    pub fertilizer: u32,
}

/// Tunable reward policy. Tier lists are ordered highest threshold first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    pub diet_tiers: Vec<DietTier>,
    pub walk_tiers: Vec<WalkTier>,
    /// Landscape items for a café session with every round correct.
    pub cafe_perfect_items: u32,
    /// Landscape items for a café session with at least half correct.
    pub cafe_half_items: u32,
    /// Experience for a correctly answered walking quiz.
    pub quiz_correct_exp: u32,
    /// Experience for reaching the walk goal.
    pub walk_goal_exp: u32,
    /// Experience for logging a meal.
    pub meal_logged_exp: u32,
    /// Experience per correct café answer, granted when the session ends.
    pub cafe_exp_per_correct: u32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            diet_tiers: default_diet_tiers(),
            walk_tiers: default_walk_tiers(),
            cafe_perfect_items: 2,
            cafe_half_items: 1,
            quiz_correct_exp: 10,
            walk_goal_exp: 50,
            meal_logged_exp: 10,
            cafe_exp_per_correct: 20,
        }
    }
}

fn default_diet_tiers() -> Vec<DietTier> {
    vec![
        DietTier { min_score: 8.0, fertilizer: 5 },
        DietTier { min_score: 6.0, fertilizer: 3 },
        DietTier { min_score: 4.0, fertilizer: 2 },
        DietTier { min_score: 2.0, fertilizer: 1 },
    ]
}

fn default_walk_tiers() -> Vec<WalkTier> {
    vec![
        WalkTier { min_steps: 10_000, fertilizer: 3 },
        WalkTier { min_steps: 7_000, fertilizer: 2 },
        WalkTier { min_steps: 5_000, fertilizer: 1 },
    ]
}

impl RewardPolicy {
    /// Fertilizer for a diet score in [0, 10].
    pub fn diet_reward(&self, score: f32) -> u32 {
        self.diet_tiers
            .iter()
            .find(|tier| score >= tier.min_score)
            .map_or(0, |tier| tier.fertilizer)
    }

    /// Fertilizer for a walking session's step count.
    pub fn walk_reward(&self, steps: u32) -> u32 {
        self.walk_tiers
            .iter()
            .find(|tier| steps >= tier.min_steps)
            .map_or(0, |tier| tier.fertilizer)
    }

    /// Landscape items for a finished café session.
    pub fn cafe_reward(&self, correct: u32, total: u32) -> u32 {
        if total == 0 {
            0
        } else if correct >= total {
            self.cafe_perfect_items
        } else if correct * 2 >= total {
            self.cafe_half_items
        } else {
            0
        }
    }

    /// Experience for a finished café session.
    pub fn cafe_exp(&self, correct: u32) -> u32 {
        correct.saturating_mul(self.cafe_exp_per_correct)
    }
}

/// Fertilizer for a diet score using the default tiers.
pub fn diet_reward(score: f32) -> u32 {
    RewardPolicy::default().diet_reward(score)
}

/// Fertilizer for a walking session using the default tiers.
pub fn walk_reward(steps: u32) -> u32 {
    RewardPolicy::default().walk_reward(steps)
}

/// Landscape items for a café session using the default policy.
pub fn cafe_reward(correct: u32, total: u32) -> u32 {
    RewardPolicy::default().cafe_reward(correct, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diet_reward_tiers() {
        assert_eq!(diet_reward(10.0), 5);
        assert_eq!(diet_reward(8.0), 5);
        assert_eq!(diet_reward(7.9), 3);
        assert_eq!(diet_reward(6.0), 3);
        assert_eq!(diet_reward(5.9), 2);
        assert_eq!(diet_reward(4.0), 2);
        assert_eq!(diet_reward(2.0), 1);
        assert_eq!(diet_reward(1.9), 0);
        assert_eq!(diet_reward(0.0), 0);
    }

    #[test]
    fn test_walk_reward_tiers() {
        assert_eq!(walk_reward(0), 0);
        assert_eq!(walk_reward(4999), 0);
        assert_eq!(walk_reward(5000), 1);
        assert_eq!(walk_reward(6999), 1);
        assert_eq!(walk_reward(7000), 2);
        assert_eq!(walk_reward(9999), 2);
        assert_eq!(walk_reward(10000), 3);
        assert_eq!(walk_reward(u32::MAX), 3);
    }

    #[test]
    fn test_cafe_reward() {
        assert_eq!(cafe_reward(3, 3), 2);
        assert_eq!(cafe_reward(2, 3), 1);
        assert_eq!(cafe_reward(2, 4), 1);
        assert_eq!(cafe_reward(1, 3), 0);
        assert_eq!(cafe_reward(0, 0), 0);
    }

    #[test]
    fn test_cafe_exp_scales_with_correct() {
        let policy = RewardPolicy::default();
        assert_eq!(policy.cafe_exp(0), 0);
        assert_eq!(policy.cafe_exp(3), 60);
    }

    #[test]
    fn test_custom_policy_tiers() {
        let policy = RewardPolicy {
            walk_tiers: vec![WalkTier { min_steps: 3000, fertilizer: 4 }],
            ..RewardPolicy::default()
        };
        assert_eq!(policy.walk_reward(2999), 0);
        assert_eq!(policy.walk_reward(3000), 4);
    }
}
