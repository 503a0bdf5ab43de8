//! Step milestones: quiz triggers at fixed step intervals.
//!
//! A walking session reports a monotonically non-decreasing step count.
//! Every time the count crosses a multiple of the configured interval the
//! scheduler emits exactly one [`Milestone`]. Repeated observations of the
//! same (or a lower) count never fire twice.
//!
//! # Bursts
//!
//! When one observation jumps across several boundaries (e.g. 400 → 2600
//! with an interval of 1000) only the highest boundary fires. The skipped
//! boundaries are not queued; the milestone reports how many were skipped
//! so callers can log or surface it.
//!
//! ```
//! use stepvillage_logic::milestone::MilestoneScheduler;
//!
//! let mut scheduler = MilestoneScheduler::new(1000);
//! assert!(scheduler.observe(999).is_none());
//! assert_eq!(scheduler.observe(1000).map(|m| m.steps), Some(1000));
//! assert!(scheduler.observe(1000).is_none());
//! ```

use serde::{Deserialize, Serialize};

/// A crossed step boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// The boundary that fired (a positive multiple of the interval).
    pub steps: u32,
    /// Ordinal of the boundary (`steps / interval`).
    pub ordinal: u32,
    /// Boundaries crossed by this observation that did not fire.
    pub skipped: u32,
}

/// Tracks the largest boundary already fired for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneScheduler {
    interval: u32,
    last_fired: u32,
}

impl MilestoneScheduler {
    /// Create a scheduler. A zero interval is treated as 1.
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
            last_fired: 0,
        }
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Largest boundary already fired (0 if none).
    pub fn last_fired(&self) -> u32 {
        self.last_fired
    }

    /// Forget all fired boundaries (new session).
    pub fn reset(&mut self) {
        self.last_fired = 0;
    }

    /// Observe the current session step count.
    ///
    /// Returns a milestone iff the highest boundary at or below
    /// `current_steps` is positive and above the last fired one.
    pub fn observe(&mut self, current_steps: u32) -> Option<Milestone> {
        let candidate = (current_steps / self.interval) * self.interval;
        if candidate == 0 || candidate <= self.last_fired {
            return None;
        }

        let crossed = (candidate - self.last_fired) / self.interval;
        self.last_fired = candidate;

        Some(Milestone {
            steps: candidate,
            ordinal: candidate / self.interval,
            skipped: crossed.saturating_sub(1),
        })
    }
}
