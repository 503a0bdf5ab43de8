//! Progression ledger: the single mutable game-state aggregate.
//!
//! Every change to steps, resources, experience, residents, or histories
//! goes through a method here, and each method leaves these invariants
//! intact:
//!
//! - resources are never negative (spends clamp at zero)
//! - `village_level` always equals the level table's level for `village_exp`
//! - `village_exp` only grows, except through [`ProgressionLedger::reset_all`]
//! - quiz history timestamps never go backwards in append order
//!
//! The ledger holds no derived state other than the level, which is
//! recomputed on every experience change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepvillage_logic::diet::normalize_diet_score;
use stepvillage_logic::level::LevelTable;
use stepvillage_logic::score::{score_breakdown, ScoreBreakdown};

/// One answered walking quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizRecord {
    pub prompt: String,
    pub chosen_answer: String,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

/// A villager who moved in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resident {
    pub id: String,
    pub display_name: String,
    pub icon: String,
    pub arrived_at: DateTime<Utc>,
}

/// Level before and after an experience grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub from: u8,
    pub to: u8,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.to > self.from
    }
}

/// Serializable copy of the ledger for external persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub steps: u32,
    pub diet_score: f32,
    pub last_foods: Vec<String>,
    pub fertilizer: u32,
    pub landscape_items: u32,
    pub village_exp: u32,
    /// Informational; recomputed from `village_exp` on restore.
    pub village_level: u8,
    pub residents: Vec<Resident>,
    pub cafe_score: u32,
    pub cafe_streak: u32,
    pub streak_days: u32,
    pub quiz_history: Vec<QuizRecord>,
}

/// Authoritative game state.
#[derive(Debug, Clone)]
pub struct ProgressionLedger {
    level_table: LevelTable,
    steps: u32,
    diet_score: f32,
    last_foods: Vec<String>,
    fertilizer: u32,
    landscape_items: u32,
    village_exp: u32,
    village_level: u8,
    residents: Vec<Resident>,
    cafe_score: u32,
    cafe_streak: u32,
    streak_days: u32,
    quiz_history: Vec<QuizRecord>,
}

impl Default for ProgressionLedger {
    fn default() -> Self {
        Self::new(LevelTable::default())
    }
}

impl ProgressionLedger {
    pub fn new(level_table: LevelTable) -> Self {
        let village_level = level_table.level_for(0);
        Self {
            level_table,
            steps: 0,
            diet_score: 0.0,
            last_foods: Vec::new(),
            fertilizer: 0,
            landscape_items: 0,
            village_exp: 0,
            village_level,
            residents: Vec::new(),
            cafe_score: 0,
            cafe_streak: 0,
            streak_days: 0,
            quiz_history: Vec::new(),
        }
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn diet_score(&self) -> f32 {
        self.diet_score
    }

    pub fn last_foods(&self) -> &[String] {
        &self.last_foods
    }

    pub fn fertilizer(&self) -> u32 {
        self.fertilizer
    }

    pub fn landscape_items(&self) -> u32 {
        self.landscape_items
    }

    pub fn village_exp(&self) -> u32 {
        self.village_exp
    }

    pub fn village_level(&self) -> u8 {
        self.village_level
    }

    pub fn level_table(&self) -> &LevelTable {
        &self.level_table
    }

    pub fn residents(&self) -> &[Resident] {
        &self.residents
    }

    pub fn cafe_score(&self) -> u32 {
        self.cafe_score
    }

    pub fn cafe_streak(&self) -> u32 {
        self.cafe_streak
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn quiz_history(&self) -> &[QuizRecord] {
        &self.quiz_history
    }

    /// Composite 0–100 daily score, computed on read.
    pub fn health_score(&self, walk_goal: u32) -> u8 {
        self.score_breakdown(walk_goal).total
    }

    pub fn score_breakdown(&self, walk_goal: u32) -> ScoreBreakdown {
        score_breakdown(self.steps, walk_goal, self.diet_score, self.cafe_score)
    }

    // ── Mutations ──────────────────────────────────────────────────────

    /// Today's step count, as reported by the sensor or manual entry.
    pub fn set_steps(&mut self, steps: u32) {
        self.steps = steps;
    }

    /// Append a quiz answer. A timestamp earlier than the previous record's
    /// is raised to it so history stays ordered.
    pub fn add_quiz_record(
        &mut self,
        prompt: &str,
        chosen_answer: &str,
        is_correct: bool,
        timestamp: DateTime<Utc>,
    ) -> &QuizRecord {
        let timestamp = match self.quiz_history.last() {
            Some(last) if timestamp < last.timestamp => {
                log::warn!(
                    "quiz record timestamp {} precedes previous {}, clamping",
                    timestamp,
                    last.timestamp
                );
                last.timestamp
            }
            _ => timestamp,
        };

        self.quiz_history.push(QuizRecord {
            prompt: prompt.to_string(),
            chosen_answer: chosen_answer.to_string(),
            is_correct,
            timestamp,
        });
        &self.quiz_history[self.quiz_history.len() - 1]
    }

    /// Record today's diet score (clamped to [0, 10], one decimal) and the
    /// foods it was computed from.
    pub fn set_diet_score(&mut self, score: f32, foods: Vec<String>) {
        self.diet_score = normalize_diet_score(score);
        self.last_foods = foods;
    }

    pub fn add_fertilizer(&mut self, amount: u32) {
        self.fertilizer = self.fertilizer.saturating_add(amount);
    }

    /// Spend fertilizer, flooring at zero. Returns the amount actually spent.
    pub fn use_fertilizer(&mut self, amount: u32) -> u32 {
        let spent = amount.min(self.fertilizer);
        if spent < amount {
            log::warn!(
                "tried to use {} fertilizer with only {} available",
                amount,
                self.fertilizer
            );
        }
        self.fertilizer -= spent;
        spent
    }

    pub fn add_landscape_items(&mut self, amount: u32) {
        self.landscape_items = self.landscape_items.saturating_add(amount);
    }

    /// Spend landscape items, flooring at zero. Returns the amount spent.
    pub fn use_landscape_items(&mut self, amount: u32) -> u32 {
        let spent = amount.min(self.landscape_items);
        self.landscape_items -= spent;
        spent
    }

    /// Welcome a resident. Returns false if the id already lives here.
    pub fn add_resident(&mut self, resident: Resident) -> bool {
        if self.residents.iter().any(|r| r.id == resident.id) {
            return false;
        }
        log::info!("{} moved into the village", resident.display_name);
        self.residents.push(resident);
        true
    }

    /// Grant experience and recompute the level.
    pub fn add_village_exp(&mut self, amount: u32) -> LevelChange {
        let from = self.village_level;
        self.village_exp = self.village_exp.saturating_add(amount);
        self.village_level = self.level_table.level_for(self.village_exp);
        if self.village_level > from {
            log::info!(
                "village reached level {} ({} exp)",
                self.village_level,
                self.village_exp
            );
        }
        LevelChange {
            from,
            to: self.village_level,
        }
    }

    /// Add café points. A scoring answer extends the café streak, a miss
    /// breaks it.
    pub fn add_cafe_score(&mut self, points: u32) {
        self.cafe_score = self.cafe_score.saturating_add(points);
        if points > 0 {
            self.cafe_streak += 1;
        } else {
            self.cafe_streak = 0;
        }
    }

    pub fn reset_cafe_session(&mut self) {
        self.cafe_score = 0;
        self.cafe_streak = 0;
    }

    pub fn increment_streak(&mut self) {
        self.streak_days += 1;
    }

    pub fn reset_streak(&mut self) {
        self.streak_days = 0;
    }

    /// Clear per-day figures. Resources, experience, level, residents and
    /// the day streak are kept.
    pub fn reset_daily_stats(&mut self) {
        self.steps = 0;
        self.diet_score = 0.0;
        self.last_foods.clear();
        self.quiz_history.clear();
        self.cafe_score = 0;
        self.cafe_streak = 0;
    }

    /// Full reset to a new village. The only operation that lowers experience.
    pub fn reset_all(&mut self) {
        *self = Self::new(self.level_table.clone());
    }

    // ── Snapshots ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            steps: self.steps,
            diet_score: self.diet_score,
            last_foods: self.last_foods.clone(),
            fertilizer: self.fertilizer,
            landscape_items: self.landscape_items,
            village_exp: self.village_exp,
            village_level: self.village_level,
            residents: self.residents.clone(),
            cafe_score: self.cafe_score,
            cafe_streak: self.cafe_streak,
            streak_days: self.streak_days,
            quiz_history: self.quiz_history.clone(),
        }
    }

    /// Rebuild a ledger from a snapshot. The level is recomputed from
    /// experience and the diet score is re-normalized.
    pub fn restore(snapshot: LedgerSnapshot, level_table: LevelTable) -> Self {
        let village_level = level_table.level_for(snapshot.village_exp);
        if village_level != snapshot.village_level {
            log::warn!(
                "snapshot level {} disagrees with {} exp, using level {}",
                snapshot.village_level,
                snapshot.village_exp,
                village_level
            );
        }
        Self {
            level_table,
            steps: snapshot.steps,
            diet_score: normalize_diet_score(snapshot.diet_score),
            last_foods: snapshot.last_foods,
            fertilizer: snapshot.fertilizer,
            landscape_items: snapshot.landscape_items,
            village_exp: snapshot.village_exp,
            village_level,
            residents: snapshot.residents,
            cafe_score: snapshot.cafe_score,
            cafe_streak: snapshot.cafe_streak,
            streak_days: snapshot.streak_days,
            quiz_history: snapshot.quiz_history,
        }
    }
}
