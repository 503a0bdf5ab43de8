//! Integration tests for the progression rule pipeline.
//!
//! Exercises: steps → milestones → walk reward, meal → diet score → diet
//! reward, experience → level, and the composite daily score.
//!
//! All tests are pure logic with no sensors, speech or timers.

use stepvillage_logic::config::{validate_config, GameConfig};
use stepvillage_logic::diet::{diet_score, FoodTable};
use stepvillage_logic::level::{level_for, LevelTable, MAX_LEVEL};
use stepvillage_logic::milestone::MilestoneScheduler;
use stepvillage_logic::rewards::{diet_reward, walk_reward, RewardPolicy};
use stepvillage_logic::score::composite_score;

// ── Level ──────────────────────────────────────────────────────────────

#[test]
fn level_is_monotonic_and_bounded() {
    assert_eq!(level_for(0), 1);
    let mut prev = 1;
    for exp in (0..=10_000).step_by(13) {
        let level = level_for(exp);
        assert!(level >= prev);
        assert!(level <= MAX_LEVEL);
        prev = level;
    }
    assert_eq!(level_for(u32::MAX), MAX_LEVEL);
}

// ── Milestones ─────────────────────────────────────────────────────────

#[test]
fn milestones_fire_once_per_boundary_over_a_walk() {
    let mut scheduler = MilestoneScheduler::new(1000);
    let readings = [0, 250, 999, 999, 1000, 1000, 1400, 2600, 2600, 2999, 3000, 4999, 5000];

    let fired: Vec<u32> = readings
        .iter()
        .filter_map(|&steps| scheduler.observe(steps))
        .map(|m| m.steps)
        .collect();

    assert_eq!(fired, vec![1000, 2000, 3000, 4000, 5000]);
}

#[test]
fn burst_reports_skipped_boundaries() {
    let mut scheduler = MilestoneScheduler::new(1000);
    let m = scheduler.observe(4200).expect("burst fires");
    assert_eq!(m.steps, 4000);
    assert_eq!(m.skipped, 3);
}

// ── Rewards ────────────────────────────────────────────────────────────

#[test]
fn reward_reference_values() {
    assert_eq!(diet_reward(7.9), 3);
    assert_eq!(diet_reward(8.0), 5);
    assert_eq!(walk_reward(4999), 0);
    assert_eq!(walk_reward(5000), 1);
    assert_eq!(walk_reward(10000), 3);
}

#[test]
fn meal_pipeline_scores_and_rewards() {
    let foods = ["grilled fish", "brown rice", "spinach", "kimchi", "apple"];
    let score = diet_score(&foods);
    assert_eq!(score, 7.0);
    assert_eq!(diet_reward(score), 3);

    let mut reversed = foods;
    reversed.reverse();
    assert_eq!(diet_score(&reversed), score);
}

#[test]
fn default_policy_matches_free_functions() {
    let policy = RewardPolicy::default();
    for score in [0.0, 1.9, 2.0, 4.5, 6.0, 7.9, 8.0, 10.0] {
        assert_eq!(policy.diet_reward(score), diet_reward(score));
    }
    for steps in [0, 4999, 5000, 7000, 9999, 10000, 25000] {
        assert_eq!(policy.walk_reward(steps), walk_reward(steps));
    }
}

// ── Composite score ────────────────────────────────────────────────────

#[test]
fn composite_reference_day() {
    assert_eq!(composite_score(5000, 5000, 8.0, 15), 82);
}

#[test]
fn composite_uses_real_diet_pipeline() {
    let score = FoodTable::builtin().score(&["salad", "salad", "tofu", "soda"]);
    assert_eq!(score, 3.5);
    // 2500/5000 → 20, 3.5 → 14, 30/30 → 20
    assert_eq!(composite_score(2500, 5000, score, 30), 54);
}

// ── Config ─────────────────────────────────────────────────────────────

#[test]
fn config_defaults_agree_with_rule_defaults() {
    let config = GameConfig::default();
    assert!(validate_config(&config).is_empty());
    assert_eq!(config.level_table, LevelTable::default());
    assert_eq!(config.rewards, RewardPolicy::default());
    assert_eq!(config.milestone_interval, 1000);
}
