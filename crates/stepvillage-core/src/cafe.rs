//! Memory café mini-game.
//!
//! A customer speaks an order, then some small talk meant to distract, and
//! only then the menu is shown. Picking the ordered item scores points.
//!
//! ```text
//! Ready ──start──▶ Ordering ──speech done──▶ Distracted ──speech done──▶ Choosing
//!   ▲                 ▲                                                     │
//!   │                 └────── feedback timer (more rounds) ── Feedback ◀────┘ select
//!   │                                                            │
//!   └──────────────── start ─────── Result ◀── feedback timer ───┘ (last round)
//! ```
//!
//! Speech failures advance the game exactly like completed utterances.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::capabilities::{SessionKind, SpeechOutcome, TimerId, TokenSource, UtteranceId};
use crate::error::SessionError;
use crate::session::SessionContext;
use crate::village::ExpGrant;

/// Choices shown per round.
pub const CHOICES_PER_ROUND: usize = 4;

const MENU: [&str; 12] = [
    "iced americano",
    "cafe latte",
    "green tea",
    "hot chocolate",
    "lemonade",
    "vanilla latte",
    "citron tea",
    "strawberry smoothie",
    "cappuccino",
    "barley tea",
    "banana milk",
    "ginger tea",
];

const ORDER_LINES: [&str; 4] = [
    "Hello! One {}, please.",
    "Could I get a {}?",
    "I'd like a {} today.",
    "A {} for me, thank you.",
];

const SMALL_TALK: [&str; 6] = [
    "The weather is lovely today, isn't it?",
    "My grandson started school this spring.",
    "I walked here along the river, the ducks were out.",
    "Did you hear the bakery is opening a second shop?",
    "I've been trying to go to bed earlier this week.",
    "The festival lanterns are going up on the main street.",
];

/// One order-and-choose round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CafeRound {
    pub order: String,
    /// What the customer says.
    pub order_line: String,
    pub distractor: String,
    pub choices: Vec<String>,
}

impl CafeRound {
    /// A round is playable if its order is among its choices.
    pub fn is_valid(&self) -> bool {
        !self.order.trim().is_empty() && self.choices.contains(&self.order)
    }
}

/// Build `count` rounds from the local menu.
///
/// Orders don't repeat until the menu runs out. Each round offers the order
/// plus three other menu items, shuffled.
pub fn generate_rounds<R: Rng>(rng: &mut R, count: usize) -> Vec<CafeRound> {
    let mut orders: Vec<&str> = Vec::with_capacity(count);
    while orders.len() < count {
        let mut menu = MENU.to_vec();
        menu.shuffle(rng);
        orders.extend(menu.into_iter().take(count - orders.len()));
    }

    orders
        .into_iter()
        .map(|order| {
            let mut choices: Vec<String> = MENU
                .iter()
                .filter(|item| **item != order)
                .copied()
                .collect::<Vec<_>>()
                .choose_multiple(rng, CHOICES_PER_ROUND - 1)
                .map(|item| item.to_string())
                .collect();
            choices.push(order.to_string());
            choices.shuffle(rng);

            let template = ORDER_LINES.choose(rng).copied().unwrap_or("One {}, please.");
            let distractor = SMALL_TALK.choose(rng).copied().unwrap_or_default();
            CafeRound {
                order: order.to_string(),
                order_line: template.replace("{}", order),
                distractor: distractor.to_string(),
                choices,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CafePhase {
    Ready,
    Ordering,
    Distracted,
    Choosing,
    Feedback,
    Result,
}

impl CafePhase {
    pub fn name(&self) -> &'static str {
        match self {
            CafePhase::Ready => "ready",
            CafePhase::Ordering => "ordering",
            CafePhase::Distracted => "distracted",
            CafePhase::Choosing => "choosing",
            CafePhase::Feedback => "feedback",
            CafePhase::Result => "result",
        }
    }

    pub fn in_progress(&self) -> bool {
        !matches!(self, CafePhase::Ready | CafePhase::Result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CafeEvent {
    RoundStarted {
        round: usize,
        total: usize,
        order_line: String,
    },
    Distraction(String),
    ChoicesShown(Vec<String>),
    Answered {
        round: usize,
        choice: String,
        correct: bool,
        points: u32,
    },
    Finished {
        correct: u32,
        total: u32,
        landscape_items: u32,
        exp: ExpGrant,
    },
    Cancelled,
}

pub struct CafeOrchestrator {
    phase: CafePhase,
    rounds: Vec<CafeRound>,
    current: usize,
    correct: u32,
    tokens: TokenSource,
    pending_speech: Option<UtteranceId>,
    pending_timer: Option<TimerId>,
}

impl Default for CafeOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl CafeOrchestrator {
    pub fn new() -> Self {
        Self {
            phase: CafePhase::Ready,
            rounds: Vec::new(),
            current: 0,
            correct: 0,
            tokens: TokenSource::new(SessionKind::Cafe),
            pending_speech: None,
            pending_timer: None,
        }
    }

    pub fn phase(&self) -> CafePhase {
        self.phase
    }

    pub fn current_round(&self) -> Option<&CafeRound> {
        self.rounds.get(self.current)
    }

    /// Zero-based index of the round being played.
    pub fn round_index(&self) -> usize {
        self.current
    }

    pub fn total_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    fn reject(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            session: SessionKind::Cafe,
            action,
            phase: self.phase.name(),
        }
    }

    /// Open a new session with the given rounds.
    ///
    /// Only the session tally is reset. The ledger's café score is not
    /// touched here: it accumulates over the day and feeds the composite
    /// score, and is cleared by `reset_daily_stats` at day close.
    /// `ProgressionLedger::reset_cafe_session` stays available to callers that
    /// want per-session scoring.
    pub fn start(
        &mut self,
        ctx: &mut SessionContext<'_>,
        rounds: Vec<CafeRound>,
    ) -> Result<Vec<CafeEvent>, SessionError> {
        if self.phase.in_progress() {
            return Err(self.reject("start"));
        }
        if rounds.is_empty() {
            return Err(SessionError::NoRounds);
        }

        log::info!("café session started with {} rounds", rounds.len());
        self.rounds = rounds;
        self.current = 0;
        self.correct = 0;
        Ok(vec![self.begin_round(ctx)])
    }

    /// Pick an item from the menu.
    pub fn select(
        &mut self,
        ctx: &mut SessionContext<'_>,
        choice: &str,
    ) -> Result<Vec<CafeEvent>, SessionError> {
        if self.phase != CafePhase::Choosing {
            return Err(self.reject("select"));
        }
        let Some(round) = self.rounds.get(self.current) else {
            return Err(self.reject("select"));
        };

        let correct = choice == round.order;
        let points = if correct {
            ctx.config.cafe_points_per_correct
        } else {
            0
        };
        ctx.ledger.add_cafe_score(points);
        if correct {
            self.correct += 1;
        }
        log::debug!(
            "café round {}: chose '{}', wanted '{}'",
            self.current + 1,
            choice,
            round.order
        );

        let timer = self.tokens.timer();
        self.pending_timer = Some(timer);
        ctx.schedule_ms(timer, ctx.config.feedback_delay_ms);
        self.phase = CafePhase::Feedback;

        Ok(vec![CafeEvent::Answered {
            round: self.current,
            choice: choice.to_string(),
            correct,
            points,
        }])
    }

    /// Abandon the session. Points already scored stay in the ledger.
    pub fn cancel(&mut self, ctx: &mut SessionContext<'_>) -> Result<Vec<CafeEvent>, SessionError> {
        if !self.phase.in_progress() {
            return Err(self.reject("cancel"));
        }

        if self.pending_speech.take().is_some() {
            ctx.speech.stop();
        }
        if let Some(timer) = self.pending_timer.take() {
            ctx.timers.cancel(timer);
        }
        self.rounds.clear();
        self.current = 0;
        self.correct = 0;
        self.phase = CafePhase::Ready;
        log::info!("café session cancelled");

        Ok(vec![CafeEvent::Cancelled])
    }

    /// An utterance ended. Order and small talk each advance the phase.
    pub fn on_speech_finished(
        &mut self,
        ctx: &mut SessionContext<'_>,
        utterance: UtteranceId,
        outcome: &SpeechOutcome,
    ) -> Vec<CafeEvent> {
        if self.pending_speech != Some(utterance) {
            log::debug!("ignoring stale café utterance #{}", utterance.seq);
            return Vec::new();
        }
        self.pending_speech = None;
        if let SpeechOutcome::Error(reason) = outcome {
            log::warn!("café speech failed, continuing: {}", reason);
        }

        let Some(round) = self.rounds.get(self.current) else {
            return Vec::new();
        };
        match self.phase {
            CafePhase::Ordering => {
                let distractor = round.distractor.clone();
                let utterance = self.tokens.utterance();
                self.pending_speech = Some(utterance);
                ctx.speak(utterance, &distractor);
                self.phase = CafePhase::Distracted;
                vec![CafeEvent::Distraction(distractor)]
            }
            CafePhase::Distracted => {
                self.phase = CafePhase::Choosing;
                vec![CafeEvent::ChoicesShown(round.choices.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// A timer expired. The feedback timer moves to the next round or ends
    /// the session.
    pub fn on_timer(&mut self, ctx: &mut SessionContext<'_>, timer: TimerId) -> Vec<CafeEvent> {
        if self.pending_timer != Some(timer) {
            log::debug!("ignoring stale café timer #{}", timer.seq);
            return Vec::new();
        }
        self.pending_timer = None;
        if self.phase != CafePhase::Feedback {
            return Vec::new();
        }

        self.current += 1;
        if self.current < self.rounds.len() {
            vec![self.begin_round(ctx)]
        } else {
            vec![self.finish(ctx)]
        }
    }

    fn begin_round(&mut self, ctx: &mut SessionContext<'_>) -> CafeEvent {
        let order_line = self
            .rounds
            .get(self.current)
            .map(|round| round.order_line.clone())
            .unwrap_or_default();
        let utterance = self.tokens.utterance();
        self.pending_speech = Some(utterance);
        ctx.speak(utterance, &order_line);
        self.phase = CafePhase::Ordering;
        CafeEvent::RoundStarted {
            round: self.current,
            total: self.rounds.len(),
            order_line,
        }
    }

    fn finish(&mut self, ctx: &mut SessionContext<'_>) -> CafeEvent {
        let total = self.rounds.len() as u32;
        let landscape_items = ctx.config.rewards.cafe_reward(self.correct, total);
        ctx.ledger.add_landscape_items(landscape_items);
        let exp = ctx.grant_exp(ctx.config.rewards.cafe_exp(self.correct));
        self.phase = CafePhase::Result;
        log::info!(
            "café session finished {}/{}: +{} landscape items, +{} exp",
            self.correct,
            total,
            landscape_items,
            exp.amount
        );

        CafeEvent::Finished {
            correct: self.correct,
            total,
            landscape_items,
            exp,
        }
    }
}
