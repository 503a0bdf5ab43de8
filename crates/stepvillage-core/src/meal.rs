//! Meal logging: recognize foods, score the diet, grant fertilizer.
//!
//! Foods come from the remote analyzer when it answers with at least one
//! name, otherwise from the foods the player declared. Either way the
//! score is computed locally from the food table, so a remote service can
//! never hand out an out-of-range score.

use serde::{Deserialize, Serialize};
use stepvillage_logic::diet::FoodTable;
use stepvillage_logic::rewards::RewardPolicy;

use crate::capabilities::{Clock, RemoteService};
use crate::ledger::ProgressionLedger;
use crate::remote::DataSource;
use crate::village::{grant_exp, ExpGrant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealAssessment {
    pub foods: Vec<String>,
    pub score: f32,
    pub source: DataSource,
}

/// What logging a meal earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealReward {
    pub diet_score: f32,
    pub fertilizer: u32,
    pub exp: ExpGrant,
}

/// Work out which foods are on the plate and score them.
pub fn assess_meal(
    remote: &mut dyn RemoteService,
    table: &FoodTable,
    photo: &[u8],
    declared_foods: &[String],
) -> MealAssessment {
    let remote_foods = match remote.analyze_meal(photo) {
        Ok(foods) => {
            let foods: Vec<String> = foods
                .into_iter()
                .map(|food| food.trim().to_lowercase())
                .filter(|food| !food.is_empty())
                .collect();
            if foods.is_empty() {
                log::warn!("meal analysis recognized nothing, using declared foods");
                None
            } else {
                Some(foods)
            }
        }
        Err(e) => {
            log::warn!("meal analysis unavailable, using declared foods: {}", e);
            None
        }
    };

    let (foods, source) = match remote_foods {
        Some(foods) => (foods, DataSource::Remote),
        None => (declared_foods.to_vec(), DataSource::Local),
    };
    let score = table.score(&foods);
    log::debug!("meal {:?} scored {}", foods, score);

    MealAssessment {
        foods,
        score,
        source,
    }
}

/// Record an assessed meal in the ledger and grant its rewards.
pub fn apply_meal(
    ledger: &mut ProgressionLedger,
    policy: &RewardPolicy,
    clock: &dyn Clock,
    assessment: MealAssessment,
) -> MealReward {
    ledger.set_diet_score(assessment.score, assessment.foods);
    let diet_score = ledger.diet_score();
    let fertilizer = policy.diet_reward(diet_score);
    ledger.add_fertilizer(fertilizer);
    let exp = grant_exp(ledger, policy.meal_logged_exp, clock.now());
    log::info!(
        "meal logged: diet score {}, +{} fertilizer",
        diet_score,
        fertilizer
    );

    MealReward {
        diet_score,
        fertilizer,
        exp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cafe::CafeRound;
    use crate::capabilities::OfflineRemote;
    use crate::error::RemoteError;
    use crate::headless::FixedClock;
    use crate::quiz::QuizItem;
    use chrono::{TimeZone, Utc};

    struct Analyzer(Vec<String>);

    impl RemoteService for Analyzer {
        fn analyze_meal(&mut self, _photo: &[u8]) -> Result<Vec<String>, RemoteError> {
            Ok(self.0.clone())
        }

        fn fetch_quiz_catalog(&mut self) -> Result<Vec<QuizItem>, RemoteError> {
            Err(RemoteError::Timeout)
        }

        fn create_cafe_session(&mut self, _rounds: u8) -> Result<Vec<CafeRound>, RemoteError> {
            Err(RemoteError::Timeout)
        }
    }

    fn declared() -> Vec<String> {
        vec!["salad".to_string(), "tofu".to_string(), "soda".to_string()]
    }

    #[test]
    fn test_offline_uses_declared_foods() {
        let assessment = assess_meal(&mut OfflineRemote, &FoodTable::builtin(), &[], &declared());
        assert_eq!(assessment.source, DataSource::Local);
        assert_eq!(assessment.foods, declared());
        assert_eq!(assessment.score, 1.5);
    }

    #[test]
    fn test_remote_foods_are_normalized() {
        let mut remote = Analyzer(vec![
            " Grilled Fish ".to_string(),
            "".to_string(),
            "BROCCOLI".to_string(),
        ]);
        let assessment = assess_meal(&mut remote, &FoodTable::builtin(), &[0xff], &declared());
        assert_eq!(assessment.source, DataSource::Remote);
        assert_eq!(assessment.foods, ["grilled fish", "broccoli"]);
        assert_eq!(assessment.score, 4.0);
    }

    #[test]
    fn test_empty_analysis_falls_back() {
        let mut remote = Analyzer(vec!["  ".to_string()]);
        let assessment = assess_meal(&mut remote, &FoodTable::builtin(), &[1], &declared());
        assert_eq!(assessment.source, DataSource::Local);
    }

    #[test]
    fn test_apply_meal_grants_reward_and_exp() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 12, 30, 0).unwrap());
        let mut ledger = ProgressionLedger::default();
        let assessment = MealAssessment {
            foods: vec!["salad".to_string()],
            score: 7.0,
            source: DataSource::Local,
        };
        let reward = apply_meal(&mut ledger, &RewardPolicy::default(), &clock, assessment);
        assert_eq!(reward.diet_score, 7.0);
        assert_eq!(reward.fertilizer, 3);
        assert_eq!(reward.exp.amount, 10);
        assert_eq!(ledger.fertilizer(), 3);
        assert_eq!(ledger.last_foods(), ["salad".to_string()]);
    }
}
