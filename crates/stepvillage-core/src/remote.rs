//! Remote data with local fallback.
//!
//! The remote service is optional. Anything it returns is validated, and
//! any failure, including a payload that doesn't validate, is logged and
//! replaced by local data. Callers always get something usable.

use rand::Rng;

use crate::cafe::{generate_rounds, CafeRound};
use crate::capabilities::RemoteService;
use crate::error::RemoteError;
use crate::quiz::QuizCatalog;

/// Where a piece of data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataSource {
    Remote,
    Local,
}

/// Fetch the quiz catalog remotely, falling back to `local`.
pub fn resolve_quiz_catalog(
    remote: &mut dyn RemoteService,
    local: &QuizCatalog,
) -> (QuizCatalog, DataSource) {
    let fetched = remote.fetch_quiz_catalog().and_then(|items| {
        QuizCatalog::new(items).map_err(|e| RemoteError::InvalidPayload(e.to_string()))
    });
    match fetched {
        Ok(catalog) => {
            log::info!("using remote quiz catalog ({} items)", catalog.len());
            (catalog, DataSource::Remote)
        }
        Err(e) => {
            log::warn!("remote quiz catalog unavailable, using built-in: {}", e);
            (local.clone(), DataSource::Local)
        }
    }
}

/// Ask the remote service for café rounds, generating them locally if it
/// fails or returns anything other than `count` playable rounds.
pub fn resolve_cafe_rounds<R: Rng>(
    remote: &mut dyn RemoteService,
    count: u8,
    rng: &mut R,
) -> (Vec<CafeRound>, DataSource) {
    let fetched = remote.create_cafe_session(count).and_then(|rounds| {
        if rounds.len() != usize::from(count) {
            Err(RemoteError::InvalidPayload(format!(
                "expected {} rounds, got {}",
                count,
                rounds.len()
            )))
        } else if let Some(bad) = rounds.iter().find(|round| !round.is_valid()) {
            Err(RemoteError::InvalidPayload(format!(
                "order '{}' is not among its choices",
                bad.order
            )))
        } else {
            Ok(rounds)
        }
    });
    match fetched {
        Ok(rounds) => (rounds, DataSource::Remote),
        Err(e) => {
            log::warn!("remote café session unavailable, generating locally: {}", e);
            (generate_rounds(rng, usize::from(count)), DataSource::Local)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::OfflineRemote;
    use crate::quiz::QuizItem;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Remote that answers with canned payloads.
    struct CannedRemote {
        quiz: Vec<QuizItem>,
        rounds: Vec<CafeRound>,
    }

    impl RemoteService for CannedRemote {
        fn analyze_meal(&mut self, _photo: &[u8]) -> Result<Vec<String>, RemoteError> {
            Err(RemoteError::Timeout)
        }

        fn fetch_quiz_catalog(&mut self) -> Result<Vec<QuizItem>, RemoteError> {
            Ok(self.quiz.clone())
        }

        fn create_cafe_session(&mut self, _rounds: u8) -> Result<Vec<CafeRound>, RemoteError> {
            Ok(self.rounds.clone())
        }
    }

    fn remote_item() -> QuizItem {
        QuizItem {
            id: "remote-1".to_string(),
            prompt: "What is 2 + 2?".to_string(),
            choices: ["3", "4", "5", "6"].map(String::from),
            correct_choice: "4".to_string(),
            explanation: None,
        }
    }

    #[test]
    fn test_offline_falls_back_to_builtin() {
        let local = QuizCatalog::builtin().unwrap();
        let (catalog, source) = resolve_quiz_catalog(&mut OfflineRemote, &local);
        assert_eq!(source, DataSource::Local);
        assert_eq!(catalog, local);
    }

    #[test]
    fn test_valid_remote_catalog_is_used() {
        let local = QuizCatalog::builtin().unwrap();
        let mut remote = CannedRemote {
            quiz: vec![remote_item()],
            rounds: vec![],
        };
        let (catalog, source) = resolve_quiz_catalog(&mut remote, &local);
        assert_eq!(source, DataSource::Remote);
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_invalid_remote_catalog_is_replaced() {
        let local = QuizCatalog::builtin().unwrap();
        let mut broken = remote_item();
        broken.correct_choice = "seven".to_string();
        let mut remote = CannedRemote {
            quiz: vec![broken],
            rounds: vec![],
        };
        let (_, source) = resolve_quiz_catalog(&mut remote, &local);
        assert_eq!(source, DataSource::Local);

        remote.quiz.clear();
        let (_, source) = resolve_quiz_catalog(&mut remote, &local);
        assert_eq!(source, DataSource::Local);
    }

    #[test]
    fn test_cafe_rounds_fallback() {
        let mut rng = StdRng::seed_from_u64(2);
        let (rounds, source) = resolve_cafe_rounds(&mut OfflineRemote, 3, &mut rng);
        assert_eq!(source, DataSource::Local);
        assert_eq!(rounds.len(), 3);
    }

    #[test]
    fn test_remote_rounds_must_match_count_and_be_playable() {
        let mut rng = StdRng::seed_from_u64(2);
        let good = generate_rounds(&mut rng, 2);
        let mut remote = CannedRemote {
            quiz: vec![],
            rounds: good.clone(),
        };
        assert_eq!(
            resolve_cafe_rounds(&mut remote, 2, &mut rng),
            (good.clone(), DataSource::Remote)
        );

        let (_, source) = resolve_cafe_rounds(&mut remote, 3, &mut rng);
        assert_eq!(source, DataSource::Local);

        remote.rounds[0].order = "espresso tonic".to_string();
        let (rounds, source) = resolve_cafe_rounds(&mut remote, 2, &mut rng);
        assert_eq!(source, DataSource::Local);
        assert!(rounds.iter().all(CafeRound::is_valid));
    }
}
