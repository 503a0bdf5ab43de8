//! Village level from cumulative experience.
//!
//! Levels run from 1 to [`MAX_LEVEL`]. Each level has a minimum experience
//! threshold; level 1 starts at 0 and the thresholds ascend strictly. The
//! level for an experience total is the greatest level whose threshold is
//! met, so the mapping is monotonic and capped at the top plateau.
//!
//! ```
//! use stepvillage_logic::level::{level_for, LevelTable};
//!
//! assert_eq!(level_for(0), 1);
//! assert_eq!(level_for(100), 2);
//! assert_eq!(LevelTable::default().level_for(u32::MAX), 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Highest reachable village level.
pub const MAX_LEVEL: u8 = 10;

/// Default experience thresholds for levels 1..=10.
pub const DEFAULT_LEVEL_THRESHOLDS: [u32; MAX_LEVEL as usize] =
    [0, 100, 250, 450, 700, 1000, 1400, 1900, 2500, 3200];

/// Level for `exp` using the default thresholds.
pub fn level_for(exp: u32) -> u8 {
    level_in(&DEFAULT_LEVEL_THRESHOLDS, exp)
}

/// Greatest level whose threshold is ≤ `exp`. Thresholds must ascend and
/// start at 0; the result is clamped to `1..=MAX_LEVEL`.
fn level_in(thresholds: &[u32], exp: u32) -> u8 {
    let met = thresholds.partition_point(|&t| t <= exp);
    (met.max(1) as u8).min(MAX_LEVEL)
}

/// Validated, ascending experience thresholds indexed by level − 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct LevelTable {
    thresholds: Vec<u32>,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_LEVEL_THRESHOLDS.to_vec(),
        }
    }
}

impl LevelTable {
    /// Build a table from exactly [`MAX_LEVEL`] strictly ascending
    /// thresholds, the first of which must be 0.
    pub fn from_thresholds(thresholds: Vec<u32>) -> Result<Self, ConfigError> {
        if thresholds.len() != MAX_LEVEL as usize {
            return Err(ConfigError::LevelCountMismatch(thresholds.len()));
        }
        if thresholds[0] != 0 {
            return Err(ConfigError::FirstLevelNotZero(thresholds[0]));
        }
        if let Some(pos) = thresholds.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ConfigError::LevelThresholdsNotAscending(pos as u8 + 2));
        }
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &[u32] {
        &self.thresholds
    }

    pub fn level_for(&self, exp: u32) -> u8 {
        level_in(&self.thresholds, exp)
    }

    /// Minimum experience for `level`, or `None` outside `1..=MAX_LEVEL`.
    pub fn threshold(&self, level: u8) -> Option<u32> {
        if level == 0 {
            return None;
        }
        self.thresholds.get(level as usize - 1).copied()
    }

    /// Experience still needed to reach the next level (`None` at the cap).
    pub fn exp_to_next_level(&self, exp: u32) -> Option<u32> {
        let level = self.level_for(exp);
        self.threshold(level + 1).map(|next| next - exp)
    }

    /// Fraction of the way through the current level (1.0 at the cap).
    pub fn progress_in_level(&self, exp: u32) -> f32 {
        let level = self.level_for(exp);
        let (Some(floor), Some(next)) = (self.threshold(level), self.threshold(level + 1)) else {
            return 1.0;
        };
        ((exp - floor) as f32 / (next - floor) as f32).clamp(0.0, 1.0)
    }
}

impl TryFrom<Vec<u32>> for LevelTable {
    type Error = ConfigError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_thresholds(value)
    }
}

impl From<LevelTable> for Vec<u32> {
    fn from(table: LevelTable) -> Self {
        table.thresholds
    }
}
