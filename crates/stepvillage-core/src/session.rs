//! Shared plumbing for the walk and café orchestrators.

use std::time::Duration;

use stepvillage_logic::config::GameConfig;

use crate::capabilities::{Clock, SpeechCapability, TimerCapability, TimerId, UtteranceId};
use crate::ledger::ProgressionLedger;
use crate::village::{grant_exp, ExpGrant};

/// Everything an orchestrator may touch while handling one event.
///
/// Orchestrators own only their session state. The ledger, configuration
/// and capabilities are lent to them per call.
pub struct SessionContext<'a> {
    pub ledger: &'a mut ProgressionLedger,
    pub config: &'a GameConfig,
    pub speech: &'a mut dyn SpeechCapability,
    pub timers: &'a mut dyn TimerCapability,
    pub clock: &'a dyn Clock,
}

impl SessionContext<'_> {
    /// Grant experience, welcoming residents for any levels gained.
    pub fn grant_exp(&mut self, amount: u32) -> ExpGrant {
        let now = self.clock.now();
        grant_exp(self.ledger, amount, now)
    }

    pub(crate) fn speak(&mut self, utterance: UtteranceId, text: &str) {
        log::debug!("speak #{}: {}", utterance.seq, text);
        self.speech.speak(utterance, text);
    }

    pub(crate) fn schedule_ms(&mut self, timer: TimerId, delay_ms: u64) {
        self.timers.schedule(timer, Duration::from_millis(delay_ms));
    }
}
