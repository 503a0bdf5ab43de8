//! Composite daily health score (0–100).
//!
//! Weighted blend of three daily ratios:
//!
//! | Component | Ratio | Weight |
//! |-----------|-------|--------|
//! | Walking | `min(steps / goal, 1)` | 40 |
//! | Diet | `diet_score / 10` | 40 |
//! | Café | `min(cafe_score / 30, 1)` | 20 |
//!
//! ```
//! use stepvillage_logic::score::composite_score;
//!
//! assert_eq!(composite_score(5000, 5000, 8.0, 15), 82);
//! ```

use serde::{Deserialize, Serialize};

pub const WALK_WEIGHT: f32 = 40.0;
pub const DIET_WEIGHT: f32 = 40.0;
pub const CAFE_WEIGHT: f32 = 20.0;

/// Café score at which the café component saturates.
pub const CAFE_SCORE_FULL: u32 = 30;

/// Per-component contribution to the composite score, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub walk_points: f32,
    pub diet_points: f32,
    pub cafe_points: f32,
    /// Rounded, clamped total (0–100).
    pub total: u8,
}

/// Compute the breakdown. A zero walk goal counts as met.
pub fn score_breakdown(
    walk_steps: u32,
    walk_goal: u32,
    diet_score: f32,
    cafe_score: u32,
) -> ScoreBreakdown {
    let walk_ratio = if walk_goal == 0 {
        1.0
    } else {
        (walk_steps as f32 / walk_goal as f32).min(1.0)
    };
    let diet_ratio = if diet_score.is_finite() {
        diet_score.clamp(0.0, 10.0) / 10.0
    } else {
        0.0
    };
    let cafe_ratio = (cafe_score as f32 / CAFE_SCORE_FULL as f32).min(1.0);

    let walk_points = walk_ratio * WALK_WEIGHT;
    let diet_points = diet_ratio * DIET_WEIGHT;
    let cafe_points = cafe_ratio * CAFE_WEIGHT;
    let total = (walk_points + diet_points + cafe_points).round().clamp(0.0, 100.0) as u8;

    ScoreBreakdown {
        walk_points,
        diet_points,
        cafe_points,
        total,
    }
}

/// Composite 0–100 daily health score.
pub fn composite_score(walk_steps: u32, walk_goal: u32, diet_score: f32, cafe_score: u32) -> u8 {
    score_breakdown(walk_steps, walk_goal, diet_score, cafe_score).total
}
