//! Nullable scheduler: a recording event sink with manual time.
//!
//! Timers only fire when the test advances the clock; raised events are
//! retained for inspection.

use lattice_consensus::event::{Event, EventPayload, EventSink, RoundOutcome, TimerEvent};
use lattice_consensus::message::{Data, Vote};
use std::cell::RefCell;
use std::rc::Rc;

/// A deterministic scheduler for testing.
///
/// Clones share state: give one clone to the consensus core as its sink and
/// keep another as the inspection handle.
#[derive(Clone, Default)]
pub struct NullScheduler {
    state: Rc<RefCell<State>>,
}

#[derive(Default)]
struct State {
    now: u64,
    seq: u64,
    events: Vec<Event>,
    /// (due tick, insertion order, timer)
    timers: Vec<(u64, u64, TimerEvent)>,
}

impl EventSink for NullScheduler {
    fn raise(&mut self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }

    fn schedule(&mut self, delay: u64, timer: TimerEvent) {
        let mut state = self.state.borrow_mut();
        let due = state.now + delay;
        let seq = state.seq;
        state.seq += 1;
        state.timers.push((due, seq, timer));
    }
}

impl NullScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.state.borrow().now
    }

    /// Advance time and return the timers that came due, in (due, request)
    /// order. The caller feeds them back through `handle_timeout`.
    pub fn advance(&self, ticks: u64) -> Vec<TimerEvent> {
        let mut state = self.state.borrow_mut();
        state.now += ticks;
        let now = state.now;
        let mut due: Vec<(u64, u64, TimerEvent)> = Vec::new();
        state.timers.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        due.into_iter().map(|(_, _, timer)| timer).collect()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    /// Every round-end notification raised so far.
    pub fn round_outcomes(&self) -> Vec<RoundOutcome> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::RoundEnded(outcome) => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every proposal the core asked to broadcast.
    pub fn broadcast_data(&self) -> Vec<Data> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::BroadcastData(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every ballot the core asked to broadcast.
    pub fn broadcast_votes(&self) -> Vec<Vote> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::BroadcastVote(vote) => Some(vote.clone()),
                _ => None,
            })
            .collect()
    }
}
