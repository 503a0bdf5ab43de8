//! StepVillage Core - session and progression engine
//!
//! Turns real-world health signals into village progression: step readings
//! drive walking sessions with quizzes at fixed intervals, meals and the
//! café memory game grant resources, and experience levels the village up.
//!
//! # Architecture
//!
//! - **Ledger**: the single mutable game state ([`ledger::ProgressionLedger`])
//! - **Orchestrators**: walk and café state machines that own only their
//!   session state and borrow the ledger per event
//! - **Capabilities**: sensor, speech, timers, clock and remote service are
//!   injected traits; completions come back as token-tagged callbacks
//!
//! Pure rules (levels, rewards, milestones, scoring) live in
//! `stepvillage-logic`.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cafe`] | Memory café mini-game |
//! | [`capabilities`] | Collaborator traits and callback tokens |
//! | [`config`] | Loading and validating game config |
//! | [`engine`] | [`VillageEngine`](engine::VillageEngine) facade |
//! | [`headless`] | In-process fakes for tests and simulation |
//! | [`ledger`] | Progression ledger and snapshots |
//! | [`meal`] | Meal assessment and diet rewards |
//! | [`quiz`] | Quiz catalog and non-repeating bank |
//! | [`remote`] | Remote data with local fallback |
//! | [`walk`] | Walking session orchestrator |
//! | [`village`] | Experience grants and residents |
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use stepvillage_core::prelude::*;
//!
//! let (caps, handles) = headless::capabilities(SensorStatus::available(), Utc::now());
//! let mut engine = VillageEngine::new(GameConfig::default(), caps).unwrap();
//!
//! engine.start_walk().unwrap();
//! handles.sensor.deliver(0);
//! handles.sensor.deliver(1_000);
//! engine.pump_sensor();
//! assert_eq!(engine.walk_phase(), WalkPhase::Quiz);
//! ```

pub mod cafe;
pub mod capabilities;
pub mod config;
pub mod engine;
pub mod error;
pub mod headless;
pub mod ledger;
pub mod meal;
pub mod quiz;
pub mod remote;
pub mod session;
pub mod village;
pub mod walk;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::cafe::{CafeEvent, CafePhase, CafeRound};
    pub use crate::capabilities::{
        Clock, RemoteService, SensorStatus, SessionKind, SpeechCapability, SpeechOutcome,
        StepSensor, TimerCapability, TimerId, UtteranceId,
    };
    pub use crate::engine::{Capabilities, DayReport, EngineEvent, VillageEngine};
    pub use crate::error::{EngineError, SessionError};
    pub use crate::headless;
    pub use crate::ledger::{LedgerSnapshot, ProgressionLedger, QuizRecord, Resident};
    pub use crate::walk::{WalkEvent, WalkPhase};
    pub use stepvillage_logic::config::GameConfig;
}
