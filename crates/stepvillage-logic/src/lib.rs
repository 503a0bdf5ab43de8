//! Pure progression logic for StepVillage.
//!
//! This crate contains every rule of the game that is independent of
//! sensors, speech playback, timers, or stored state. Functions take plain
//! data and return results, so the walk/café orchestrators, the headless
//! harness, and any future frontend all agree on the same numbers.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Tunable game configuration and validation |
//! | [`diet`] | Per-food point table and diet score (0–10) |
//! | [`level`] | Village level from cumulative experience |
//! | [`milestone`] | Step-interval milestones that trigger quizzes |
//! | [`rewards`] | Diet / walk / café scores → resource grants |
//! | [`score`] | Composite 0–100 daily health score |

pub mod config;
pub mod diet;
pub mod level;
pub mod milestone;
pub mod rewards;
pub mod score;
