//! Diet scoring from recognized foods.
//!
//! Each recognized healthy food contributes a fixed positive weight, each
//! disallowed food a fixed penalty, and unknown foods nothing. The sum is
//! clamped to [0, 10] with one decimal of precision.
//!
//! Weights are stored in integer tenths so the score is exactly the same
//! for any ordering of the input, and duplicate entries each count.
//!
//! ```
//! use stepvillage_logic::diet::diet_score;
//!
//! assert_eq!(diet_score(&["salad", "brown rice"]), 3.5);
//! assert_eq!(diet_score(&["brown rice", "salad"]), 3.5);
//! assert_eq!(diet_score(&["soda"]), 0.0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Highest diet score.
pub const MAX_DIET_SCORE: f32 = 10.0;

/// Penalty, in tenths, for each disallowed food.
pub const DISALLOWED_PENALTY_TENTHS: i32 = -20;

/// Built-in healthy foods and their weights in tenths of a point.
const HEALTHY_FOODS: &[(&str, i32)] = &[
    ("salad", 20),
    ("broccoli", 20),
    ("grilled fish", 20),
    ("mackerel", 20),
    ("chicken breast", 20),
    ("brown rice", 15),
    ("mixed grains", 15),
    ("tofu", 15),
    ("spinach", 15),
    ("sweet potato", 15),
    ("beans", 15),
    ("seaweed soup", 15),
    ("kimchi", 10),
    ("egg", 10),
    ("apple", 10),
    ("banana", 10),
    ("yogurt", 10),
    ("nuts", 10),
];

/// Built-in disallowed foods.
const DISALLOWED_FOODS: &[&str] = &[
    "fried chicken",
    "instant noodles",
    "soda",
    "pizza",
    "donut",
    "french fries",
    "cake",
];

/// How a food name scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodClass {
    /// Recognized healthy food with its weight in tenths.
    Healthy(i32),
    /// Disallowed food; scores the fixed penalty.
    Disallowed,
    /// Not in the table; scores 0.
    Unknown,
}

/// Food point table. Names are matched case-insensitively after trimming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodTable {
    healthy: BTreeMap<String, i32>,
    disallowed: BTreeSet<String>,
    penalty_tenths: i32,
}

impl Default for FoodTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl FoodTable {
    /// The built-in local table, used when no remote analysis is available.
    pub fn builtin() -> Self {
        Self {
            healthy: HEALTHY_FOODS
                .iter()
                .map(|(name, tenths)| (name.to_string(), *tenths))
                .collect(),
            disallowed: DISALLOWED_FOODS.iter().map(|name| name.to_string()).collect(),
            penalty_tenths: DISALLOWED_PENALTY_TENTHS,
        }
    }

    /// Add or replace a healthy food; `points` is rounded to one decimal.
    pub fn with_food(mut self, name: &str, points: f32) -> Self {
        let key = normalize(name);
        self.disallowed.remove(&key);
        self.healthy.insert(key, (points * 10.0).round() as i32);
        self
    }

    /// Mark a food as disallowed.
    pub fn with_disallowed(mut self, name: &str) -> Self {
        let key = normalize(name);
        self.healthy.remove(&key);
        self.disallowed.insert(key);
        self
    }

    pub fn classify(&self, food: &str) -> FoodClass {
        let key = normalize(food);
        if let Some(&tenths) = self.healthy.get(&key) {
            FoodClass::Healthy(tenths)
        } else if self.disallowed.contains(&key) {
            FoodClass::Disallowed
        } else {
            FoodClass::Unknown
        }
    }

    /// Contribution of one food, in tenths.
    pub fn points_tenths(&self, food: &str) -> i32 {
        match self.classify(food) {
            FoodClass::Healthy(tenths) => tenths,
            FoodClass::Disallowed => self.penalty_tenths,
            FoodClass::Unknown => 0,
        }
    }

    /// Diet score for a meal: clamped sum, one decimal.
    pub fn score<S: AsRef<str>>(&self, foods: &[S]) -> f32 {
        let total: i32 = foods
            .iter()
            .map(|food| self.points_tenths(food.as_ref()))
            .sum();
        total.clamp(0, (MAX_DIET_SCORE * 10.0) as i32) as f32 / 10.0
    }

    /// All known food names (healthy first, then disallowed), sorted.
    pub fn known_foods(&self) -> Vec<&str> {
        self.healthy
            .keys()
            .chain(self.disallowed.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Diet score using the built-in table.
pub fn diet_score<S: AsRef<str>>(foods: &[S]) -> f32 {
    FoodTable::builtin().score(foods)
}

/// Clamp an externally supplied score to [0, 10] and round to one decimal.
pub fn normalize_diet_score(score: f32) -> f32 {
    if !score.is_finite() {
        return 0.0;
    }
    (score.clamp(0.0, MAX_DIET_SCORE) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_meal_scores_zero() {
        let empty: [&str; 0] = [];
        assert_eq!(diet_score(&empty), 0.0);
    }

    #[test]
    fn test_order_independent() {
        let a = diet_score(&["salad", "kimchi", "soda", "tofu"]);
        let b = diet_score(&["soda", "tofu", "salad", "kimchi"]);
        assert_eq!(a, b);
        assert_eq!(a, 2.5);
    }

    #[test]
    fn test_duplicates_each_count() {
        assert_eq!(diet_score(&["egg"]), 1.0);
        assert_eq!(diet_score(&["egg", "egg", "egg"]), 3.0);
    }

    #[test]
    fn test_unknown_foods_score_zero() {
        assert_eq!(diet_score(&["mystery stew", "salad"]), 2.0);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        assert_eq!(diet_score(&["  Salad ", "BROWN RICE"]), 3.5);
    }

    #[test]
    fn test_clamped_to_range() {
        let feast = ["salad"; 8];
        assert_eq!(diet_score(&feast), MAX_DIET_SCORE);
        assert_eq!(diet_score(&["pizza", "soda", "cake"]), 0.0);
    }

    #[test]
    fn test_custom_table_overrides() {
        let table = FoodTable::builtin()
            .with_food("pizza", 0.5)
            .with_disallowed("banana");
        assert_eq!(table.classify("pizza"), FoodClass::Healthy(5));
        assert_eq!(table.classify("banana"), FoodClass::Disallowed);
        assert_eq!(table.score(&["pizza", "salad"]), 2.5);
    }

    #[test]
    fn test_normalize_external_score() {
        assert_eq!(normalize_diet_score(7.94), 7.9);
        assert_eq!(normalize_diet_score(12.0), 10.0);
        assert_eq!(normalize_diet_score(-1.0), 0.0);
        assert_eq!(normalize_diet_score(f32::NAN), 0.0);
    }

    #[test]
    fn test_known_foods_covers_table() {
        let table = FoodTable::builtin();
        let known = table.known_foods();
        assert_eq!(known.len(), HEALTHY_FOODS.len() + DISALLOWED_FOODS.len());
        assert!(known.contains(&"salad"));
        assert!(known.contains(&"soda"));
    }
}
