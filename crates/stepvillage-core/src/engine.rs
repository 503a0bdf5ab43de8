//! Village engine - main entry point for a StepVillage frontend.
//!
//! The engine owns the ledger, the configuration, the injected capabilities
//! and both session orchestrators. A frontend forwards user actions and
//! capability callbacks to it and renders the events it returns.
//!
//! Sensor readings arrive through a channel: the sensor callback only
//! enqueues, and [`VillageEngine::pump_sensor`] applies queued readings in
//! delivery order, each one fully processed before the next is read.

use std::sync::mpsc::{self, Receiver, Sender};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use stepvillage_logic::config::GameConfig;
use stepvillage_logic::diet::FoodTable;
use stepvillage_logic::score::ScoreBreakdown;

use crate::cafe::{CafeEvent, CafeOrchestrator, CafePhase};
use crate::capabilities::{
    Clock, OfflineRemote, RemoteService, SensorStatus, SessionKind, SpeechCapability,
    SpeechOutcome, StepSensor, SubscriptionHandle, SystemClock, TimerCapability, TimerId,
    UtteranceId,
};
use crate::config::check_config;
use crate::error::{EngineError, SessionError};
use crate::ledger::{LedgerSnapshot, ProgressionLedger};
use crate::meal::{apply_meal, assess_meal, MealReward};
use crate::quiz::{QuizBank, QuizCatalog};
use crate::remote::{resolve_cafe_rounds, resolve_quiz_catalog, DataSource};
use crate::session::SessionContext;
use crate::walk::{WalkEvent, WalkOrchestrator, WalkPhase};

/// Builds a [`SessionContext`] from disjoint engine fields, so the
/// orchestrators can be borrowed mutably alongside it.
macro_rules! session_ctx {
    ($engine:expr) => {
        SessionContext {
            ledger: &mut $engine.ledger,
            config: &$engine.config,
            speech: &mut *$engine.caps.speech,
            timers: &mut *$engine.caps.timers,
            clock: &*$engine.caps.clock,
        }
    };
}

/// The collaborators an engine runs against.
pub struct Capabilities {
    pub sensor: Box<dyn StepSensor>,
    pub speech: Box<dyn SpeechCapability>,
    pub timers: Box<dyn TimerCapability>,
    pub clock: Box<dyn Clock>,
    pub remote: Box<dyn RemoteService>,
}

impl Capabilities {
    /// Capabilities with the wall clock and no remote service.
    pub fn new(
        sensor: impl StepSensor + 'static,
        speech: impl SpeechCapability + 'static,
        timers: impl TimerCapability + 'static,
    ) -> Self {
        Self {
            sensor: Box::new(sensor),
            speech: Box::new(speech),
            timers: Box::new(timers),
            clock: Box::new(SystemClock),
            remote: Box::new(OfflineRemote),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_remote(mut self, remote: impl RemoteService + 'static) -> Self {
        self.remote = Box::new(remote);
        self
    }
}

/// A session event, tagged with the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Walk(WalkEvent),
    Cafe(CafeEvent),
}

/// Summary of a day, produced when it is closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub steps: u32,
    pub walk_goal_met: bool,
    pub score: ScoreBreakdown,
    pub quizzes_answered: usize,
    pub quizzes_correct: usize,
    /// Streak after this day was counted.
    pub streak_days: u32,
}

/// Main engine.
pub struct VillageEngine {
    config: GameConfig,
    ledger: ProgressionLedger,
    food_table: FoodTable,
    local_catalog: QuizCatalog,
    walk: WalkOrchestrator<StdRng>,
    cafe: CafeOrchestrator,
    cafe_rng: StdRng,
    caps: Capabilities,
    sensor_tx: Sender<u32>,
    sensor_rx: Receiver<u32>,
    subscription: Option<SubscriptionHandle>,
    sensor_status: Option<SensorStatus>,
    catalog_source: DataSource,
}

fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
        None => StdRng::from_entropy(),
    }
}

impl VillageEngine {
    /// Validate the config and assemble an engine with a fresh ledger.
    ///
    /// The quiz catalog is fetched from the remote service if one answers,
    /// otherwise the built-in catalog is used.
    pub fn new(config: GameConfig, mut caps: Capabilities) -> Result<Self, EngineError> {
        let config = check_config(config)?;
        let local_catalog = QuizCatalog::builtin()?;
        let (catalog, catalog_source) = resolve_quiz_catalog(&mut *caps.remote, &local_catalog);

        let bank = QuizBank::new(catalog, seeded_rng(config.rng_seed, 0));
        let (sensor_tx, sensor_rx) = mpsc::channel();
        log::info!(
            "village engine ready: goal {} steps, quiz every {} steps",
            config.walk_goal,
            config.milestone_interval
        );

        Ok(Self {
            ledger: ProgressionLedger::new(config.level_table.clone()),
            food_table: FoodTable::builtin(),
            local_catalog,
            walk: WalkOrchestrator::new(bank, config.milestone_interval),
            cafe: CafeOrchestrator::new(),
            cafe_rng: seeded_rng(config.rng_seed, 1),
            caps,
            sensor_tx,
            sensor_rx,
            subscription: None,
            sensor_status: None,
            catalog_source,
            config,
        })
    }

    /// Use a custom food table for meal scoring.
    pub fn with_food_table(mut self, table: FoodTable) -> Self {
        self.food_table = table;
        self
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ProgressionLedger {
        &self.ledger
    }

    pub fn walk(&self) -> &WalkOrchestrator<StdRng> {
        &self.walk
    }

    pub fn walk_phase(&self) -> WalkPhase {
        self.walk.phase()
    }

    pub fn cafe(&self) -> &CafeOrchestrator {
        &self.cafe
    }

    pub fn cafe_phase(&self) -> CafePhase {
        self.cafe.phase()
    }

    /// Last sensor status seen, if a walk was ever started.
    pub fn sensor_status(&self) -> Option<&SensorStatus> {
        self.sensor_status.as_ref()
    }

    pub fn catalog_source(&self) -> DataSource {
        self.catalog_source
    }

    pub fn health_score(&self) -> u8 {
        self.ledger.health_score(self.config.walk_goal)
    }

    pub fn score_breakdown(&self) -> ScoreBreakdown {
        self.ledger.score_breakdown(self.config.walk_goal)
    }

    // ── Walk ───────────────────────────────────────────────────────────

    /// Start a walk. Without a working sensor the walk runs in manual mode
    /// and is fed through [`VillageEngine::add_manual_steps`].
    pub fn start_walk(&mut self) -> Result<Vec<WalkEvent>, SessionError> {
        let status = match &self.sensor_status {
            Some(status) if status.available => status.clone(),
            _ => self.caps.sensor.initialize(),
        };
        let manual = !status.available;
        if manual {
            log::warn!(
                "step sensor unavailable ({}), walking in manual mode",
                status.error.as_deref().unwrap_or("no reason given")
            );
        }
        self.sensor_status = Some(status);

        let events = self.walk.start(&mut session_ctx!(self), manual)?;
        if !manual && self.subscription.is_none() {
            let tx = self.sensor_tx.clone();
            let handle = self.caps.sensor.subscribe(Box::new(move |steps| {
                if tx.send(steps).is_err() {
                    log::debug!("engine gone, dropping reading {}", steps);
                }
            }));
            self.subscription = Some(handle);
        }
        Ok(events)
    }

    /// Apply every queued sensor reading in delivery order.
    pub fn pump_sensor(&mut self) -> Vec<WalkEvent> {
        let mut events = Vec::new();
        while let Ok(reading) = self.sensor_rx.try_recv() {
            events.extend(self.walk.on_steps(&mut session_ctx!(self), reading));
        }
        if !self.walk.phase().is_active() {
            self.release_sensor();
        }
        events
    }

    pub fn add_manual_steps(&mut self, delta: u32) -> Result<Vec<WalkEvent>, SessionError> {
        self.walk.add_manual_steps(&mut session_ctx!(self), delta)
    }

    pub fn answer_quiz(&mut self, answer: &str) -> Result<Vec<WalkEvent>, SessionError> {
        self.walk.select_choice(&mut session_ctx!(self), answer)
    }

    pub fn stop_walk(&mut self) -> Result<Vec<WalkEvent>, SessionError> {
        let events = self.walk.stop(&mut session_ctx!(self))?;
        self.release_sensor();
        Ok(events)
    }

    /// Unsubscribe and drop queued readings, which belong to the walk that
    /// just ended.
    fn release_sensor(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.caps.sensor.unsubscribe(handle);
        }
        let dropped = self.sensor_rx.try_iter().count();
        if dropped > 0 {
            log::debug!("dropped {} reading(s) queued for a finished walk", dropped);
        }
    }

    /// End whichever sessions are still open.
    fn end_open_sessions(&mut self) {
        if self.walk.phase().is_active() {
            if let Err(e) = self.stop_walk() {
                log::warn!("could not stop the open walk: {}", e);
            }
        }
        if self.cafe.phase().in_progress() {
            if let Err(e) = self.cancel_cafe() {
                log::warn!("could not cancel the open café session: {}", e);
            }
        }
    }

    // ── Café ───────────────────────────────────────────────────────────

    /// Start a café session with rounds from the remote service, or local
    /// ones if it fails.
    pub fn start_cafe(&mut self) -> Result<Vec<CafeEvent>, SessionError> {
        let phase = self.cafe.phase();
        if phase.in_progress() {
            return Err(SessionError::InvalidTransition {
                session: SessionKind::Cafe,
                action: "start",
                phase: phase.name(),
            });
        }

        let (rounds, source) = resolve_cafe_rounds(
            &mut *self.caps.remote,
            self.config.cafe_rounds,
            &mut self.cafe_rng,
        );
        log::debug!("café rounds from {:?}", source);
        self.cafe.start(&mut session_ctx!(self), rounds)
    }

    pub fn cafe_select(&mut self, choice: &str) -> Result<Vec<CafeEvent>, SessionError> {
        self.cafe.select(&mut session_ctx!(self), choice)
    }

    pub fn cancel_cafe(&mut self) -> Result<Vec<CafeEvent>, SessionError> {
        self.cafe.cancel(&mut session_ctx!(self))
    }

    // ── Callbacks ──────────────────────────────────────────────────────

    /// A timer scheduled by either session expired.
    pub fn on_timer(&mut self, timer: TimerId) -> Vec<EngineEvent> {
        match timer.session {
            SessionKind::Walk => {
                let events = self.walk.on_timer(&mut session_ctx!(self), timer);
                if !self.walk.phase().is_active() {
                    self.release_sensor();
                }
                events.into_iter().map(EngineEvent::Walk).collect()
            }
            SessionKind::Cafe => self
                .cafe
                .on_timer(&mut session_ctx!(self), timer)
                .into_iter()
                .map(EngineEvent::Cafe)
                .collect(),
        }
    }

    /// An utterance finished playing, or failed to.
    pub fn on_speech_finished(
        &mut self,
        utterance: UtteranceId,
        outcome: SpeechOutcome,
    ) -> Vec<EngineEvent> {
        match utterance.session {
            SessionKind::Walk => {
                self.walk.on_speech_finished(utterance, &outcome);
                Vec::new()
            }
            SessionKind::Cafe => self
                .cafe
                .on_speech_finished(&mut session_ctx!(self), utterance, &outcome)
                .into_iter()
                .map(EngineEvent::Cafe)
                .collect(),
        }
    }

    // ── Meals ──────────────────────────────────────────────────────────

    /// Log a meal from a photo, falling back to the declared foods when
    /// the photo can't be analyzed.
    pub fn log_meal(&mut self, photo: &[u8], declared_foods: &[String]) -> MealReward {
        let assessment = assess_meal(
            &mut *self.caps.remote,
            &self.food_table,
            photo,
            declared_foods,
        );
        apply_meal(
            &mut self.ledger,
            &self.config.rewards,
            &*self.caps.clock,
            assessment,
        )
    }

    // ── Day & lifecycle ────────────────────────────────────────────────

    /// Close the day: end open sessions, count the streak, and clear the
    /// daily figures.
    pub fn close_day(&mut self) -> DayReport {
        self.end_open_sessions();

        let steps = self.ledger.steps();
        let walk_goal_met = steps >= self.config.walk_goal;
        let score = self.score_breakdown();
        let history = self.ledger.quiz_history();
        let quizzes_answered = history.len();
        let quizzes_correct = history.iter().filter(|r| r.is_correct).count();

        if walk_goal_met {
            self.ledger.increment_streak();
        } else {
            self.ledger.reset_streak();
        }
        self.ledger.reset_daily_stats();
        log::info!(
            "day closed: {} steps, score {}, streak {}",
            steps,
            score.total,
            self.ledger.streak_days()
        );

        DayReport {
            steps,
            walk_goal_met,
            score,
            quizzes_answered,
            quizzes_correct,
            streak_days: self.ledger.streak_days(),
        }
    }

    /// Try the remote quiz catalog again, keeping the built-in one on failure.
    pub fn refresh_quiz_catalog(&mut self) -> DataSource {
        let (catalog, source) =
            resolve_quiz_catalog(&mut *self.caps.remote, &self.local_catalog);
        self.walk.bank_mut().replace_catalog(catalog);
        self.catalog_source = source;
        source
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    /// Replace the ledger with a restored one. Open sessions are ended first.
    pub fn restore(&mut self, snapshot: LedgerSnapshot) {
        self.end_open_sessions();
        self.ledger = ProgressionLedger::restore(snapshot, self.config.level_table.clone());
    }

    /// Start a brand new village.
    pub fn reset_all(&mut self) {
        log::warn!("resetting all village progress");
        self.ledger.reset_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{self, HeadlessHandles};
    use chrono::{TimeZone, Utc};

    fn engine(status: SensorStatus) -> (VillageEngine, HeadlessHandles) {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 6, 30, 0).unwrap();
        let (caps, handles) = headless::capabilities(status, now);
        let config = GameConfig {
            rng_seed: Some(17),
            ..GameConfig::default()
        };
        let engine = VillageEngine::new(config, caps).unwrap();
        (engine, handles)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 6, 30, 0).unwrap();
        let (caps, _) = headless::capabilities(SensorStatus::available(), now);
        let config = GameConfig {
            walk_goal: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            VillageEngine::new(config, caps),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_sensor_walk_subscribes_and_pumps() {
        let (mut engine, handles) = engine(SensorStatus::available());
        assert_eq!(engine.catalog_source(), DataSource::Local);
        engine.start_walk().unwrap();
        assert!(handles.sensor.is_subscribed());

        handles.sensor.deliver(400);
        handles.sensor.deliver(1400);
        let events = engine.pump_sensor();
        assert!(events
            .iter()
            .any(|e| matches!(e, WalkEvent::QuizPresented(_))));
        assert_eq!(engine.walk_phase(), WalkPhase::Quiz);
        assert_eq!(engine.walk().session().unwrap().start_snapshot, Some(400));
        assert_eq!(engine.ledger().steps(), 1400);
    }

    #[test]
    fn test_walk_finished_by_timer_drops_queued_readings() {
        let (mut engine, handles) = engine(SensorStatus::available());
        engine.start_walk().unwrap();
        handles.sensor.deliver(0);
        handles.sensor.deliver(4000);
        engine.pump_sensor();
        assert_eq!(engine.walk_phase(), WalkPhase::Quiz);
        handles.sensor.deliver(5000);
        engine.pump_sensor();

        let answer = engine.walk().current_quiz().unwrap().correct_choice.clone();
        engine.answer_quiz(&answer).unwrap();
        handles.sensor.deliver(9000);
        let timer = handles.timers.pop_next().unwrap();
        let events = engine.on_timer(timer);
        assert!(matches!(&events[0], EngineEvent::Walk(WalkEvent::Completed { .. })));
        assert!(!handles.sensor.is_subscribed());

        engine.start_walk().unwrap();
        assert!(engine.pump_sensor().is_empty());
        let session = engine.walk().session().unwrap();
        assert_eq!(session.start_snapshot, None);
        assert_eq!(session.session_steps, 0);
    }

    #[test]
    fn test_unavailable_sensor_means_manual_mode() {
        let (mut engine, handles) = engine(SensorStatus::unavailable("permission denied"));
        engine.start_walk().unwrap();
        assert!(!handles.sensor.is_subscribed());
        assert!(engine.walk().session().unwrap().manual);
        engine.add_manual_steps(1000).unwrap();
        assert_eq!(engine.walk_phase(), WalkPhase::Quiz);
    }

    #[test]
    fn test_stop_walk_unsubscribes() {
        let (mut engine, handles) = engine(SensorStatus::available());
        engine.start_walk().unwrap();
        handles.sensor.deliver(300);
        engine.stop_walk().unwrap();
        assert!(!handles.sensor.is_subscribed());
        assert!(engine.pump_sensor().is_empty());
    }

    #[test]
    fn test_callbacks_route_by_session() {
        let (mut engine, handles) = engine(SensorStatus::available());
        engine.start_cafe().unwrap();
        let (utterance, _) = handles.speech.last().unwrap();
        assert_eq!(utterance.session, SessionKind::Cafe);
        let events = engine.on_speech_finished(utterance, SpeechOutcome::Done);
        assert!(matches!(&events[0], EngineEvent::Cafe(CafeEvent::Distraction(_))));
    }

    #[test]
    fn test_close_day_ends_open_sessions() {
        let (mut engine, handles) = engine(SensorStatus::available());
        engine.start_cafe().unwrap();
        engine.start_walk().unwrap();
        handles.sensor.deliver(2_000);
        engine.pump_sensor();
        handles.sensor.deliver(2_300);

        engine.close_day();
        assert_eq!(engine.walk_phase(), WalkPhase::Idle);
        assert_eq!(engine.cafe_phase(), CafePhase::Ready);
        assert!(!handles.sensor.is_subscribed());
        assert!(engine.pump_sensor().is_empty());
    }

    #[test]
    fn test_close_day_counts_streak() {
        let (mut engine, _handles) = engine(SensorStatus::unavailable("none"));
        engine.start_walk().unwrap();
        engine.add_manual_steps(5200).unwrap();
        let report = engine.close_day();
        assert!(report.walk_goal_met);
        assert_eq!(report.streak_days, 1);
        assert_eq!(engine.walk_phase(), WalkPhase::Idle);
        assert_eq!(engine.ledger().steps(), 0);

        let report = engine.close_day();
        assert!(!report.walk_goal_met);
        assert_eq!(report.streak_days, 0);
    }
}
