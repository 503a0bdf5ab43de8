//! Cognitive quiz catalog and non-repeating dispenser.
//!
//! A [`QuizCatalog`] is a validated, immutable list of four-choice items.
//! A [`QuizBank`] hands items out uniformly at random, never repeating one
//! until every item of the catalog has been dispensed in the current cycle.
//! When the cycle is exhausted it starts over, so dispensing never blocks.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::CatalogError;

/// Built-in catalog, used when the remote catalog is unavailable.
const BUILTIN_CATALOG_JSON: &str = include_str!("../../../data/quiz_catalog.json");

/// One four-choice quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub id: String,
    pub prompt: String,
    pub choices: [String; 4],
    pub correct_choice: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizItem {
    /// Exact string match against the correct choice.
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_choice
    }
}

/// Validated quiz items: non-empty, unique ids, answer among choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizCatalog {
    items: Vec<QuizItem>,
}

impl QuizCatalog {
    pub fn new(items: Vec<QuizItem>) -> Result<Self, CatalogError> {
        if items.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
            if item.prompt.trim().is_empty() {
                return Err(CatalogError::EmptyPrompt(item.id.clone()));
            }
            if !item.choices.contains(&item.correct_choice) {
                return Err(CatalogError::UnknownCorrectChoice {
                    id: item.id.clone(),
                    choice: item.correct_choice.clone(),
                });
            }
        }

        Ok(Self { items })
    }

    /// Parse and validate a JSON array of quiz items.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let items: Vec<QuizItem> = serde_json::from_str(json)?;
        Self::new(items)
    }

    /// The catalog shipped with the engine.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG_JSON)
    }

    pub fn items(&self) -> &[QuizItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&QuizItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Random dispenser that covers the whole catalog before repeating.
#[derive(Debug, Clone)]
pub struct QuizBank<R> {
    catalog: QuizCatalog,
    used_ids: HashSet<String>,
    rng: R,
}

impl<R: Rng> QuizBank<R> {
    pub fn new(catalog: QuizCatalog, rng: R) -> Self {
        Self {
            catalog,
            used_ids: HashSet::new(),
            rng,
        }
    }

    /// Dispense the next item.
    ///
    /// Picks uniformly among items not yet used in this cycle. When every
    /// item has been used, the cycle is cleared first.
    pub fn next(&mut self) -> QuizItem {
        let exhausted = self
            .catalog
            .items
            .iter()
            .all(|item| self.used_ids.contains(&item.id));
        if exhausted {
            log::debug!(
                "quiz bank exhausted after {} items, starting a new cycle",
                self.used_ids.len()
            );
            self.used_ids.clear();
        }

        let available: Vec<usize> = self
            .catalog
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| !self.used_ids.contains(&item.id))
            .map(|(index, _)| index)
            .collect();
        // The catalog is never empty, so after a clear `available` isn't either.
        let index = available.choose(&mut self.rng).copied().unwrap_or(0);

        let item = self.catalog.items[index].clone();
        self.used_ids.insert(item.id.clone());
        item
    }

    /// Items left before the current cycle wraps.
    pub fn remaining(&self) -> usize {
        self.catalog.len() - self.used_ids.len()
    }

    pub fn used_ids(&self) -> &HashSet<String> {
        &self.used_ids
    }

    pub fn catalog(&self) -> &QuizCatalog {
        &self.catalog
    }

    /// Swap in a new catalog (e.g. fetched remotely) and start a fresh cycle.
    pub fn replace_catalog(&mut self, catalog: QuizCatalog) {
        self.catalog = catalog;
        self.used_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn item(id: &str, correct: &str) -> QuizItem {
        QuizItem {
            id: id.to_string(),
            prompt: format!("Question {}", id),
            choices: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            correct_choice: correct.to_string(),
            explanation: None,
        }
    }

    fn small_catalog(n: usize) -> QuizCatalog {
        QuizCatalog::new((0..n).map(|i| item(&format!("q{}", i), "a")).collect()).unwrap()
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = QuizCatalog::builtin().expect("builtin catalog parses");
        assert!(catalog.len() >= 10);
        for item in catalog.items() {
            assert!(item.is_correct(&item.correct_choice));
        }
    }

    #[test]
    fn test_covers_catalog_before_repeating() {
        let catalog = QuizCatalog::builtin().unwrap();
        let n = catalog.len();
        for seed in 0..20 {
            let mut bank = QuizBank::new(catalog.clone(), StdRng::seed_from_u64(seed));
            let ids: HashSet<String> = (0..n).map(|_| bank.next().id).collect();
            assert_eq!(ids.len(), n, "duplicate within first cycle (seed {})", seed);
            assert_eq!(bank.remaining(), 0);
        }
    }

    #[test]
    fn test_wraps_after_exhaustion() {
        let mut bank = QuizBank::new(small_catalog(3), StdRng::seed_from_u64(7));
        for _ in 0..3 {
            bank.next();
        }
        assert_eq!(bank.used_ids().len(), 3);

        let wrapped = bank.next();
        assert!(bank.catalog().get(&wrapped.id).is_some());
        assert_eq!(bank.used_ids().len(), 1);
        assert_eq!(bank.remaining(), 2);
    }

    #[test]
    fn test_single_item_catalog_never_starves() {
        let mut bank = QuizBank::new(small_catalog(1), StdRng::seed_from_u64(1));
        for _ in 0..5 {
            assert_eq!(bank.next().id, "q0");
        }
    }

    #[test]
    fn test_used_ids_subset_of_catalog() {
        let mut bank = QuizBank::new(small_catalog(4), StdRng::seed_from_u64(3));
        for _ in 0..11 {
            bank.next();
            assert!(bank
                .used_ids()
                .iter()
                .all(|id| bank.catalog().get(id).is_some()));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let catalog = QuizCatalog::builtin().unwrap();
        let mut a = QuizBank::new(catalog.clone(), StdRng::seed_from_u64(99));
        let mut b = QuizBank::new(catalog, StdRng::seed_from_u64(99));
        for _ in 0..30 {
            assert_eq!(a.next().id, b.next().id);
        }
    }

    #[test]
    fn test_replace_catalog_resets_cycle() {
        let mut bank = QuizBank::new(small_catalog(2), StdRng::seed_from_u64(5));
        bank.next();
        bank.replace_catalog(small_catalog(4));
        assert_eq!(bank.remaining(), 4);
    }

    #[test]
    fn test_catalog_validation() {
        assert!(matches!(QuizCatalog::new(vec![]), Err(CatalogError::Empty)));
        assert!(matches!(
            QuizCatalog::new(vec![item("x", "a"), item("x", "b")]),
            Err(CatalogError::DuplicateId(id)) if id == "x"
        ));
        assert!(matches!(
            QuizCatalog::new(vec![item("y", "z")]),
            Err(CatalogError::UnknownCorrectChoice { .. })
        ));
        let mut blank = item("w", "a");
        blank.prompt = "  ".to_string();
        assert!(matches!(
            QuizCatalog::new(vec![blank]),
            Err(CatalogError::EmptyPrompt(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_wrong_choice_count() {
        let json = r#"[{"id":"q","prompt":"p","choices":["a","b","c"],"correct_choice":"a"}]"#;
        assert!(matches!(
            QuizCatalog::from_json(json),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_exact_match_only() {
        let q = item("q", "a");
        assert!(q.is_correct("a"));
        assert!(!q.is_correct("A"));
        assert!(!q.is_correct(" a"));
    }
}
