//! Walking session orchestrator.
//!
//! ```text
//! Idle ──start──▶ Walking ──milestone──▶ Quiz ──select──▶ Result
//!   ▲               │  ▲                                    │
//!   │               │  └───────────── result timer ─────────┘
//!   │             goal                                      │ (goal reached)
//!   │               ▼                                       ▼
//!   └──start──── Complete ◀─────────────────────────────────┘
//! ```
//!
//! Step readings are cumulative for the day. A sensor-fed session takes its
//! baseline from the first reading delivered after start, measures steps
//! relative to it, ignores readings lower than the last one seen, and grants
//! the walk reward the first time the session reaches the goal. Manual
//! sessions start from the ledger's step count. Readings are tracked in every active phase, but milestones are
//! only observed while walking, so a quiz is never interrupted by another.

use rand::Rng;
use serde::{Deserialize, Serialize};
use stepvillage_logic::milestone::{Milestone, MilestoneScheduler};

use crate::capabilities::{SessionKind, SpeechOutcome, TimerId, TokenSource, UtteranceId};
use crate::error::SessionError;
use crate::ledger::QuizRecord;
use crate::quiz::{QuizBank, QuizItem};
use crate::session::SessionContext;
use crate::village::ExpGrant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalkPhase {
    Idle,
    Walking,
    Quiz,
    Result,
    Complete,
}

impl WalkPhase {
    pub fn name(&self) -> &'static str {
        match self {
            WalkPhase::Idle => "idle",
            WalkPhase::Walking => "walking",
            WalkPhase::Quiz => "quiz",
            WalkPhase::Result => "result",
            WalkPhase::Complete => "complete",
        }
    }

    /// Walking, Quiz or Result.
    pub fn is_active(&self) -> bool {
        matches!(self, WalkPhase::Walking | WalkPhase::Quiz | WalkPhase::Result)
    }
}

/// Ephemeral counters of the current walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSession {
    /// Reading at session start. `None` until the sensor delivers one.
    pub start_snapshot: Option<u32>,
    pub last_reading: u32,
    pub session_steps: u32,
    pub goal_reached: bool,
    pub reward_granted: bool,
    /// Fed by manual entry instead of the sensor.
    pub manual: bool,
}

/// Something the UI should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkEvent {
    Started {
        start_snapshot: Option<u32>,
        manual: bool,
    },
    StepsUpdated {
        session_steps: u32,
        total_steps: u32,
    },
    MilestoneReached(Milestone),
    QuizPresented(QuizItem),
    Answered {
        record: QuizRecord,
        exp: Option<ExpGrant>,
    },
    GoalReached {
        session_steps: u32,
        fertilizer: u32,
        exp: ExpGrant,
    },
    ResumedWalking,
    Completed {
        session_steps: u32,
    },
    Stopped {
        session_steps: u32,
    },
}

pub struct WalkOrchestrator<R> {
    phase: WalkPhase,
    session: Option<WalkSession>,
    scheduler: MilestoneScheduler,
    bank: QuizBank<R>,
    current_quiz: Option<QuizItem>,
    tokens: TokenSource,
    pending_speech: Option<UtteranceId>,
    pending_timer: Option<TimerId>,
}

impl<R: Rng> WalkOrchestrator<R> {
    pub fn new(bank: QuizBank<R>, milestone_interval: u32) -> Self {
        Self {
            phase: WalkPhase::Idle,
            session: None,
            scheduler: MilestoneScheduler::new(milestone_interval),
            bank,
            current_quiz: None,
            tokens: TokenSource::new(SessionKind::Walk),
            pending_speech: None,
            pending_timer: None,
        }
    }

    pub fn phase(&self) -> WalkPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&WalkSession> {
        self.session.as_ref()
    }

    /// The quiz on screen during Quiz and Result.
    pub fn current_quiz(&self) -> Option<&QuizItem> {
        self.current_quiz.as_ref()
    }

    pub fn bank(&self) -> &QuizBank<R> {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut QuizBank<R> {
        &mut self.bank
    }

    fn reject(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            session: SessionKind::Walk,
            action,
            phase: self.phase.name(),
        }
    }

    /// Begin a walk. A manual walk starts from the ledger's step count; a
    /// sensor walk waits for its first reading.
    pub fn start(
        &mut self,
        ctx: &mut SessionContext<'_>,
        manual: bool,
    ) -> Result<Vec<WalkEvent>, SessionError> {
        if !matches!(self.phase, WalkPhase::Idle | WalkPhase::Complete) {
            return Err(self.reject("start"));
        }

        let start_snapshot = manual.then(|| ctx.ledger.steps());
        self.scheduler.reset();
        self.current_quiz = None;
        self.session = Some(WalkSession {
            start_snapshot,
            last_reading: start_snapshot.unwrap_or(0),
            session_steps: 0,
            goal_reached: false,
            reward_granted: false,
            manual,
        });
        self.phase = WalkPhase::Walking;
        match start_snapshot {
            Some(steps) => log::info!("walk started at {} steps (manual entry)", steps),
            None => log::info!("walk started, waiting for the first step reading"),
        }

        Ok(vec![WalkEvent::Started {
            start_snapshot,
            manual,
        }])
    }

    /// Handle one cumulative step reading.
    pub fn on_steps(&mut self, ctx: &mut SessionContext<'_>, reading: u32) -> Vec<WalkEvent> {
        let mut events = Vec::new();
        if !self.phase.is_active() {
            return events;
        }
        let Some(session) = self.session.as_mut() else {
            return events;
        };
        let Some(start_snapshot) = session.start_snapshot else {
            session.start_snapshot = Some(reading);
            session.last_reading = reading;
            ctx.ledger.set_steps(reading);
            log::debug!("walk baseline set at {} steps", reading);
            events.push(WalkEvent::StepsUpdated {
                session_steps: 0,
                total_steps: reading,
            });
            return events;
        };
        if reading < session.last_reading {
            log::debug!(
                "ignoring stale reading {} (last {})",
                reading,
                session.last_reading
            );
            return events;
        }

        session.last_reading = reading;
        session.session_steps = reading.saturating_sub(start_snapshot);
        let session_steps = session.session_steps;
        ctx.ledger.set_steps(reading);
        events.push(WalkEvent::StepsUpdated {
            session_steps,
            total_steps: reading,
        });

        if self.phase == WalkPhase::Walking {
            if let Some(milestone) = self.scheduler.observe(session_steps) {
                if milestone.skipped > 0 {
                    log::info!(
                        "milestone {} reached in a burst, {} earlier milestone(s) skipped",
                        milestone.steps,
                        milestone.skipped
                    );
                }
                events.push(WalkEvent::MilestoneReached(milestone));
                events.push(self.present_quiz(ctx));
            }
        }

        if let Some(event) = self.check_goal(ctx) {
            events.push(event);
            if self.phase == WalkPhase::Walking {
                events.push(self.complete());
            }
        }

        events
    }

    /// Add estimated steps to a manual-mode session.
    pub fn add_manual_steps(
        &mut self,
        ctx: &mut SessionContext<'_>,
        delta: u32,
    ) -> Result<Vec<WalkEvent>, SessionError> {
        let reading = match &self.session {
            Some(session) if self.phase.is_active() && session.manual => {
                session.last_reading.saturating_add(delta)
            }
            Some(_) if self.phase.is_active() => {
                return Err(SessionError::InvalidTransition {
                    session: SessionKind::Walk,
                    action: "add manual steps",
                    phase: "following the step sensor",
                })
            }
            _ => return Err(self.reject("add manual steps")),
        };
        Ok(self.on_steps(ctx, reading))
    }

    /// Answer the open quiz.
    pub fn select_choice(
        &mut self,
        ctx: &mut SessionContext<'_>,
        answer: &str,
    ) -> Result<Vec<WalkEvent>, SessionError> {
        if self.phase != WalkPhase::Quiz {
            return Err(self.reject("answer a quiz"));
        }
        let Some(quiz) = self.current_quiz.as_ref() else {
            return Err(self.reject("answer a quiz"));
        };

        let is_correct = quiz.is_correct(answer);
        let feedback = if is_correct {
            "Correct!".to_string()
        } else {
            format!("The answer was {}.", quiz.correct_choice)
        };
        let record = ctx
            .ledger
            .add_quiz_record(&quiz.prompt, answer, is_correct, ctx.clock.now())
            .clone();
        let exp = is_correct.then(|| ctx.grant_exp(ctx.config.rewards.quiz_correct_exp));
        log::info!(
            "quiz '{}' answered {}",
            quiz.id,
            if is_correct { "correctly" } else { "incorrectly" }
        );

        self.stop_speech(ctx);
        let utterance = self.tokens.utterance();
        self.pending_speech = Some(utterance);
        ctx.speak(utterance, &feedback);

        let timer = self.tokens.timer();
        self.pending_timer = Some(timer);
        ctx.schedule_ms(timer, ctx.config.result_delay_ms);
        self.phase = WalkPhase::Result;

        Ok(vec![WalkEvent::Answered { record, exp }])
    }

    /// End the walk from any active phase.
    pub fn stop(&mut self, ctx: &mut SessionContext<'_>) -> Result<Vec<WalkEvent>, SessionError> {
        if !self.phase.is_active() {
            return Err(self.reject("stop"));
        }

        self.stop_speech(ctx);
        if let Some(timer) = self.pending_timer.take() {
            ctx.timers.cancel(timer);
        }
        let session_steps = self.session.take().map_or(0, |s| s.session_steps);
        self.current_quiz = None;
        self.phase = WalkPhase::Idle;
        log::info!("walk stopped after {} steps", session_steps);

        Ok(vec![WalkEvent::Stopped { session_steps }])
    }

    /// A timer expired. Only the pending result timer has any effect.
    pub fn on_timer(&mut self, _ctx: &mut SessionContext<'_>, timer: TimerId) -> Vec<WalkEvent> {
        if self.pending_timer != Some(timer) {
            log::debug!("ignoring stale walk timer #{}", timer.seq);
            return Vec::new();
        }
        self.pending_timer = None;
        if self.phase != WalkPhase::Result {
            return Vec::new();
        }

        self.current_quiz = None;
        let goal_reached = self.session.as_ref().is_some_and(|s| s.goal_reached);
        if goal_reached {
            vec![self.complete()]
        } else {
            self.phase = WalkPhase::Walking;
            vec![WalkEvent::ResumedWalking]
        }
    }

    /// An utterance ended. Walk phases don't wait on speech, so this only
    /// clears the pending token.
    pub fn on_speech_finished(&mut self, utterance: UtteranceId, outcome: &SpeechOutcome) {
        if self.pending_speech != Some(utterance) {
            return;
        }
        self.pending_speech = None;
        if let SpeechOutcome::Error(reason) = outcome {
            log::warn!("walk speech failed: {}", reason);
        }
    }

    fn present_quiz(&mut self, ctx: &mut SessionContext<'_>) -> WalkEvent {
        let quiz = self.bank.next();
        self.stop_speech(ctx);
        let utterance = self.tokens.utterance();
        self.pending_speech = Some(utterance);
        ctx.speak(utterance, &quiz.prompt);
        self.current_quiz = Some(quiz.clone());
        self.phase = WalkPhase::Quiz;
        WalkEvent::QuizPresented(quiz)
    }

    fn check_goal(&mut self, ctx: &mut SessionContext<'_>) -> Option<WalkEvent> {
        let session = self.session.as_mut()?;
        if session.reward_granted || session.session_steps < ctx.config.walk_goal {
            return None;
        }

        session.reward_granted = true;
        session.goal_reached = true;
        let session_steps = session.session_steps;
        let fertilizer = ctx.config.rewards.walk_reward(session_steps);
        ctx.ledger.add_fertilizer(fertilizer);
        let exp = ctx.grant_exp(ctx.config.rewards.walk_goal_exp);
        log::info!(
            "walk goal reached at {} steps: +{} fertilizer, +{} exp",
            session_steps,
            fertilizer,
            exp.amount
        );

        Some(WalkEvent::GoalReached {
            session_steps,
            fertilizer,
            exp,
        })
    }

    fn complete(&mut self) -> WalkEvent {
        self.phase = WalkPhase::Complete;
        let session_steps = self.session.as_ref().map_or(0, |s| s.session_steps);
        log::info!("walk complete with {} steps", session_steps);
        WalkEvent::Completed { session_steps }
    }

    fn stop_speech(&mut self, ctx: &mut SessionContext<'_>) {
        if self.pending_speech.take().is_some() {
            ctx.speech.stop();
        }
    }
}
