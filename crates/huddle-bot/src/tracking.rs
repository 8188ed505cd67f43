//! The set of calls the bot is joining, joined to, or leaving.

use crate::monitor::{MonitorHandle, SilenceDetector};
use crate::settings::CallMode;
use chrono::{DateTime, Utc};
use huddle_types::{CallId, CallState, InvalidTransition};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// One conference the bot knows about.
#[derive(Debug)]
pub struct Call {
    call_id: CallId,
    state: CallState,
    epoch: u64,
    tracked_at: DateTime<Utc>,
    pub(crate) participant_count: usize,
    pub(crate) silence: SilenceDetector,
    pub(crate) monitor: Option<MonitorHandle>,
}

impl Call {
    fn new(call_id: CallId, epoch: u64, silence: SilenceDetector) -> Self {
        Self {
            call_id,
            state: CallState::Idle,
            epoch,
            tracked_at: Utc::now(),
            participant_count: 0,
            silence,
            monitor: None,
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    pub fn silence_counter(&self) -> u32 {
        self.silence.count()
    }

    /// Moves the call forward and returns the state it left.
    pub(crate) fn advance(&mut self, next: CallState) -> Result<CallState, InvalidTransition> {
        let previous = self.state;
        self.state = previous.advance(next)?;
        Ok(previous)
    }

    /// Stops the silence monitor, if any, and clears the counter.
    pub(crate) fn stop_monitor(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.stop();
        }
        self.silence.reset();
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            call_id: self.call_id.clone(),
            state: self.state,
            epoch: self.epoch,
            participant_count: self.participant_count,
            silence_counter: self.silence.count(),
            monitoring: self.monitor.is_some(),
            tracked_at: self.tracked_at,
        }
    }
}

/// Read-only view of a tracked call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSnapshot {
    #[serde(rename = "callId")]
    pub call_id: CallId,
    pub state: CallState,
    pub epoch: u64,
    #[serde(rename = "participantCount")]
    pub participant_count: usize,
    #[serde(rename = "silenceCounter")]
    pub silence_counter: u32,
    pub monitoring: bool,
    #[serde(rename = "trackedAt")]
    pub tracked_at: DateTime<Utc>,
}

/// Why a call could not be tracked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    #[error("call {0} is already tracked")]
    AlreadyTracked(CallId),
    #[error("tracking set is full (serving {occupant})")]
    Full { occupant: CallId },
}

/// Capacity-bounded map of tracked calls keyed by call id.
#[derive(Debug)]
pub struct TrackingSet {
    mode: CallMode,
    calls: HashMap<CallId, Call>,
}

impl TrackingSet {
    pub fn new(mode: CallMode) -> Self {
        Self {
            mode,
            calls: HashMap::new(),
        }
    }

    fn capacity(&self) -> Option<usize> {
        match self.mode {
            CallMode::Single => Some(1),
            CallMode::Multi => None,
        }
    }

    /// Checks capacity and inserts a fresh `Idle` record in one step.
    pub fn try_track(
        &mut self,
        call_id: CallId,
        epoch: u64,
        silence: SilenceDetector,
    ) -> Result<&mut Call, TrackError> {
        if self.calls.contains_key(&call_id) {
            return Err(TrackError::AlreadyTracked(call_id));
        }
        if let Some(capacity) = self.capacity() {
            let mut occupants = self.calls.values().filter(|c| c.state.occupies_slot());
            if let Some(occupant) = occupants.next() {
                if 1 + occupants.count() >= capacity {
                    return Err(TrackError::Full {
                        occupant: occupant.call_id.clone(),
                    });
                }
            }
        }

        Ok(self
            .calls
            .entry(call_id.clone())
            .or_insert_with(|| Call::new(call_id, epoch, silence)))
    }

    pub fn get(&self, call_id: &CallId) -> Option<&Call> {
        self.calls.get(call_id)
    }

    pub fn get_mut(&mut self, call_id: &CallId) -> Option<&mut Call> {
        self.calls.get_mut(call_id)
    }

    /// Removes a call that has reached `Ended`. Calls in any other state stay.
    pub fn remove_ended(&mut self, call_id: &CallId) -> Option<Call> {
        match self.calls.get(call_id) {
            Some(call) if call.state == CallState::Ended => self.calls.remove(call_id),
            Some(call) => {
                tracing::warn!(
                    call_id = %call_id,
                    state = %call.state,
                    "refusing to untrack a call that has not ended"
                );
                None
            }
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Snapshots of all tracked calls, ordered by call id.
    pub fn snapshot(&self) -> Vec<CallSnapshot> {
        let mut calls: Vec<CallSnapshot> = self.calls.values().map(Call::snapshot).collect();
        calls.sort_by(|a, b| a.call_id.cmp(&b.call_id));
        calls
    }
}
