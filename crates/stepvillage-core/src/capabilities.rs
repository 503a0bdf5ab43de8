//! Collaborator interfaces the engine consumes.
//!
//! Sensors, speech playback, timers, the wall clock, and the optional
//! remote scoring service are injected, never reached through globals.
//! Completion of asynchronous work (an utterance finishing, a timer
//! expiring) is reported back to the orchestrators as a token-tagged
//! event; a token that is no longer pending is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cafe::CafeRound;
use crate::error::RemoteError;
use crate::quiz::QuizItem;

/// Which orchestrator owns a callback token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Walk,
    Cafe,
}

/// Identifies one `speak` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId {
    pub session: SessionKind,
    pub seq: u64,
}

/// Identifies one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId {
    pub session: SessionKind,
    pub seq: u64,
}

/// Source of monotonically increasing callback tokens for one session kind.
#[derive(Debug, Clone)]
pub(crate) struct TokenSource {
    session: SessionKind,
    next: u64,
}

impl TokenSource {
    pub(crate) fn new(session: SessionKind) -> Self {
        Self { session, next: 1 }
    }

    pub(crate) fn utterance(&mut self) -> UtteranceId {
        let seq = self.bump();
        UtteranceId {
            session: self.session,
            seq,
        }
    }

    pub(crate) fn timer(&mut self) -> TimerId {
        let seq = self.bump();
        TimerId {
            session: self.session,
            seq,
        }
    }

    fn bump(&mut self) -> u64 {
        let seq = self.next;
        self.next += 1;
        seq
    }
}

// ── Sensor ─────────────────────────────────────────────────────────────

/// Result of initializing the step sensor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorStatus {
    pub available: bool,
    pub error: Option<String>,
}

impl SensorStatus {
    pub fn available() -> Self {
        Self {
            available: true,
            error: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(reason.into()),
        }
    }
}

/// Handle returned by [`StepSensor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Pedometer. Ticks carry today's cumulative step count.
pub trait StepSensor {
    /// Report availability instead of failing.
    fn initialize(&mut self) -> SensorStatus;
    fn subscribe(&mut self, on_tick: Box<dyn FnMut(u32)>) -> SubscriptionHandle;
    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

// ── Speech ─────────────────────────────────────────────────────────────

/// How an utterance ended. Errors advance sessions like completions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechOutcome {
    Done,
    Error(String),
}

/// Text-to-speech playback.
///
/// Every `speak` must eventually be answered with exactly one
/// `on_speech_finished` for its id, unless `stop` was called first.
pub trait SpeechCapability {
    fn speak(&mut self, utterance: UtteranceId, text: &str);
    fn stop(&mut self);
}

// ── Timers & clock ─────────────────────────────────────────────────────

/// Fixed-delay countdowns. Expiry is reported back with the same id.
pub trait TimerCapability {
    fn schedule(&mut self, timer: TimerId, delay: Duration);
    fn cancel(&mut self, timer: TimerId);
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ── Remote service ─────────────────────────────────────────────────────

/// Optional remote scoring/record service. Every failure is replaced by
/// local data by the caller.
pub trait RemoteService {
    /// Recognize the foods in a meal photo.
    fn analyze_meal(&mut self, photo: &[u8]) -> Result<Vec<String>, RemoteError>;
    fn fetch_quiz_catalog(&mut self) -> Result<Vec<QuizItem>, RemoteError>;
    fn create_cafe_session(&mut self, rounds: u8) -> Result<Vec<CafeRound>, RemoteError>;
}

/// Remote service that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

impl RemoteService for OfflineRemote {
    fn analyze_meal(&mut self, _photo: &[u8]) -> Result<Vec<String>, RemoteError> {
        Err(RemoteError::Unavailable("offline".to_string()))
    }

    fn fetch_quiz_catalog(&mut self) -> Result<Vec<QuizItem>, RemoteError> {
        Err(RemoteError::Unavailable("offline".to_string()))
    }

    fn create_cafe_session(&mut self, _rounds: u8) -> Result<Vec<CafeRound>, RemoteError> {
        Err(RemoteError::Unavailable("offline".to_string()))
    }
}
