//! In-process capability implementations for tests and the simulation harness.
//!
//! Each fake comes with a cloneable handle that shares its state, so a test
//! can hand the capability to the engine and keep driving or inspecting it:
//!
//! | Capability | Handle | Use |
//! |------------|--------|-----|
//! | [`ScriptedSensor`] | [`SensorFeed`] | deliver step readings |
//! | [`RecordingSpeech`] | [`SpeechLog`] | inspect what was said |
//! | [`ManualTimers`] | [`TimerQueue`] | fire timers on demand |
//! | [`FixedClock`] | itself (clone) | set or advance time |
//!
//! Nothing here sleeps or spawns; time only moves when a handle moves it.
//! [`capabilities`] wires all four into an engine-ready [`Capabilities`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::capabilities::{
    Clock, SensorStatus, SpeechCapability, StepSensor, SubscriptionHandle, TimerCapability,
    TimerId, UtteranceId,
};
use crate::engine::Capabilities;

// ── Sensor ─────────────────────────────────────────────────────────────

type TickCallback = Box<dyn FnMut(u32)>;

#[derive(Default)]
struct SensorState {
    subscriber: Option<(SubscriptionHandle, TickCallback)>,
    next_handle: u64,
}

/// Step sensor whose readings are pushed through a [`SensorFeed`].
pub struct ScriptedSensor {
    status: SensorStatus,
    state: Rc<RefCell<SensorState>>,
}

/// Delivers readings to whoever subscribed to the paired sensor.
#[derive(Clone)]
pub struct SensorFeed {
    state: Rc<RefCell<SensorState>>,
}

impl ScriptedSensor {
    pub fn new(status: SensorStatus) -> (Self, SensorFeed) {
        let state = Rc::new(RefCell::new(SensorState::default()));
        let feed = SensorFeed {
            state: Rc::clone(&state),
        };
        (Self { status, state }, feed)
    }

    pub fn available() -> (Self, SensorFeed) {
        Self::new(SensorStatus::available())
    }

    pub fn unavailable(reason: &str) -> (Self, SensorFeed) {
        Self::new(SensorStatus::unavailable(reason))
    }
}

impl StepSensor for ScriptedSensor {
    fn initialize(&mut self) -> SensorStatus {
        self.status.clone()
    }

    fn subscribe(&mut self, on_tick: Box<dyn FnMut(u32)>) -> SubscriptionHandle {
        let mut state = self.state.borrow_mut();
        state.next_handle += 1;
        let handle = SubscriptionHandle(state.next_handle);
        state.subscriber = Some((handle, on_tick));
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        let mut state = self.state.borrow_mut();
        if matches!(&state.subscriber, Some((current, _)) if *current == handle) {
            state.subscriber = None;
        }
    }
}

impl SensorFeed {
    /// Deliver one cumulative reading. Returns false if nobody is subscribed.
    pub fn deliver(&self, steps: u32) -> bool {
        let mut state = self.state.borrow_mut();
        match state.subscriber.as_mut() {
            Some((_, on_tick)) => {
                on_tick(steps);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.borrow().subscriber.is_some()
    }
}

// ── Speech ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SpeechState {
    spoken: Vec<(UtteranceId, String)>,
    stops: usize,
}

/// Speech capability that records every utterance instead of playing it.
pub struct RecordingSpeech {
    state: Rc<RefCell<SpeechState>>,
}

/// Read side of a [`RecordingSpeech`].
#[derive(Clone)]
pub struct SpeechLog {
    state: Rc<RefCell<SpeechState>>,
}

impl RecordingSpeech {
    pub fn new() -> (Self, SpeechLog) {
        let state = Rc::new(RefCell::new(SpeechState::default()));
        let log = SpeechLog {
            state: Rc::clone(&state),
        };
        (Self { state }, log)
    }
}

impl SpeechCapability for RecordingSpeech {
    fn speak(&mut self, utterance: UtteranceId, text: &str) {
        self.state
            .borrow_mut()
            .spoken
            .push((utterance, text.to_string()));
    }

    fn stop(&mut self) {
        self.state.borrow_mut().stops += 1;
    }
}

impl SpeechLog {
    pub fn spoken(&self) -> Vec<(UtteranceId, String)> {
        self.state.borrow().spoken.clone()
    }

    /// The most recent utterance, if any.
    pub fn last(&self) -> Option<(UtteranceId, String)> {
        self.state.borrow().spoken.last().cloned()
    }

    pub fn stop_count(&self) -> usize {
        self.state.borrow().stops
    }
}

// ── Timers ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TimerState {
    pending: Vec<(TimerId, Duration)>,
    cancelled: Vec<TimerId>,
}

/// Timers that only expire when the paired [`TimerQueue`] pops them.
pub struct ManualTimers {
    state: Rc<RefCell<TimerState>>,
}

/// Control side of [`ManualTimers`].
#[derive(Clone)]
pub struct TimerQueue {
    state: Rc<RefCell<TimerState>>,
}

impl ManualTimers {
    pub fn new() -> (Self, TimerQueue) {
        let state = Rc::new(RefCell::new(TimerState::default()));
        let queue = TimerQueue {
            state: Rc::clone(&state),
        };
        (Self { state }, queue)
    }
}

impl TimerCapability for ManualTimers {
    fn schedule(&mut self, timer: TimerId, delay: Duration) {
        self.state.borrow_mut().pending.push((timer, delay));
    }

    fn cancel(&mut self, timer: TimerId) {
        let mut state = self.state.borrow_mut();
        state.pending.retain(|(id, _)| *id != timer);
        state.cancelled.push(timer);
    }
}

impl TimerQueue {
    pub fn pending(&self) -> Vec<(TimerId, Duration)> {
        self.state.borrow().pending.clone()
    }

    /// Remove and return the oldest pending timer, to be reported as expired.
    pub fn pop_next(&self) -> Option<TimerId> {
        let mut state = self.state.borrow_mut();
        if state.pending.is_empty() {
            None
        } else {
            Some(state.pending.remove(0).0)
        }
    }

    pub fn cancelled(&self) -> Vec<TimerId> {
        self.state.borrow().cancelled.clone()
    }
}

// ── Clock ──────────────────────────────────────────────────────────────

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

// ── Wiring ─────────────────────────────────────────────────────────────

/// Handles to the fakes inside a headless [`Capabilities`].
#[derive(Clone)]
pub struct HeadlessHandles {
    pub sensor: SensorFeed,
    pub speech: SpeechLog,
    pub timers: TimerQueue,
    pub clock: FixedClock,
}

/// Headless capabilities (offline remote) plus the handles that drive them.
pub fn capabilities(sensor: SensorStatus, now: DateTime<Utc>) -> (Capabilities, HeadlessHandles) {
    let (sensor, sensor_feed) = ScriptedSensor::new(sensor);
    let (speech, speech_log) = RecordingSpeech::new();
    let (timers, timer_queue) = ManualTimers::new();
    let clock = FixedClock::new(now);
    let caps = Capabilities::new(sensor, speech, timers).with_clock(clock.clone());
    (
        caps,
        HeadlessHandles {
            sensor: sensor_feed,
            speech: speech_log,
            timers: timer_queue,
            clock,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::SessionKind;
    use chrono::TimeZone;

    #[test]
    fn test_feed_reaches_subscriber() {
        let (mut sensor, feed) = ScriptedSensor::available();
        assert!(sensor.initialize().available);
        assert!(!feed.deliver(10));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let handle = sensor.subscribe(Box::new(move |steps| sink.borrow_mut().push(steps)));
        assert!(feed.deliver(10));
        assert!(feed.deliver(20));
        sensor.unsubscribe(handle);
        assert!(!feed.is_subscribed());
        assert_eq!(*seen.borrow(), vec![10, 20]);
    }

    #[test]
    fn test_unavailable_sensor_reports_reason() {
        let (mut sensor, _feed) = ScriptedSensor::unavailable("no permission");
        let status = sensor.initialize();
        assert!(!status.available);
        assert_eq!(status.error.as_deref(), Some("no permission"));
    }

    #[test]
    fn test_cancelled_timer_never_pops() {
        let (mut timers, queue) = ManualTimers::new();
        let a = TimerId {
            session: SessionKind::Walk,
            seq: 1,
        };
        let b = TimerId {
            session: SessionKind::Cafe,
            seq: 2,
        };
        timers.schedule(a, Duration::from_millis(10));
        timers.schedule(b, Duration::from_millis(10));
        timers.cancel(a);
        assert_eq!(queue.pop_next(), Some(b));
        assert_eq!(queue.pop_next(), None);
        assert_eq!(queue.cancelled(), vec![a]);
    }

    #[test]
    fn test_clock_clones_share_time() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let view = clock.clone();
        clock.advance(chrono::Duration::minutes(5));
        assert_eq!(view.now(), start + chrono::Duration::minutes(5));
    }
}
