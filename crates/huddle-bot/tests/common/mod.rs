//! Shared fixtures for state machine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use huddle_bot::{
    BotHandle, BotInput, BotSettings, CallMode, CallStateMachine, Platform, PlatformError,
    Transition,
};
use huddle_types::{AnnouncementRequest, AudioLevel, CallId, CallState, ConversationId};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

/// A command the fake platform received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Join(CallId),
    Leave(CallId),
    AttachRemoteAudio(CallId),
    SendText(ConversationId, String),
}

/// Scriptable in-memory platform.
pub struct FakePlatform {
    calls: mpsc::UnboundedSender<PlatformCall>,
    pub join_result: Mutex<Result<(), PlatformError>>,
    pub levels: Mutex<VecDeque<Option<AudioLevel>>>,
    /// Leave commands wait for a permit.
    pub leave_gate: Semaphore,
}

#[async_trait]
impl Platform for FakePlatform {
    async fn join(&self, call_id: &CallId) -> Result<(), PlatformError> {
        let _ = self.calls.send(PlatformCall::Join(call_id.clone()));
        self.join_result.lock().unwrap().clone()
    }

    async fn leave(&self, call_id: &CallId) -> Result<(), PlatformError> {
        let _ = self.calls.send(PlatformCall::Leave(call_id.clone()));
        self.leave_gate
            .acquire()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?
            .forget();
        Ok(())
    }

    async fn audio_level(&self, _call_id: &CallId) -> Result<Option<AudioLevel>, PlatformError> {
        Ok(self.levels.lock().unwrap().pop_front().flatten())
    }

    async fn attach_remote_audio(&self, call_id: &CallId) -> Result<(), PlatformError> {
        let _ = self
            .calls
            .send(PlatformCall::AttachRemoteAudio(call_id.clone()));
        Ok(())
    }

    async fn send_text(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<(), PlatformError> {
        let _ = self.calls.send(PlatformCall::SendText(
            conversation_id.clone(),
            text.to_string(),
        ));
        Ok(())
    }
}

pub struct Harness {
    pub machine: CallStateMachine,
    pub handle: BotHandle,
    pub platform: Arc<FakePlatform>,
    pub platform_calls: mpsc::UnboundedReceiver<PlatformCall>,
    pub announcements: mpsc::UnboundedReceiver<AnnouncementRequest>,
}

pub fn harness(mode: CallMode) -> Harness {
    let (calls_tx, platform_calls) = mpsc::unbounded_channel();
    let platform = Arc::new(FakePlatform {
        calls: calls_tx,
        join_result: Mutex::new(Ok(())),
        levels: Mutex::new(VecDeque::new()),
        leave_gate: Semaphore::new(1024),
    });

    let mut settings = BotSettings::new("bot-1");
    settings.mode = mode;

    let (announce_tx, announcements) = mpsc::unbounded_channel();
    let (machine, handle) = CallStateMachine::new(settings, platform.clone(), announce_tx);

    Harness {
        machine,
        handle,
        platform,
        platform_calls,
        announcements,
    }
}

pub fn id(s: &str) -> CallId {
    CallId::new(s)
}

pub fn started(call_id: &str) -> BotInput {
    BotInput::Transition(Transition::CallStarted {
        call_id: id(call_id),
    })
}

impl Harness {
    /// Starts `call_id` and processes its join result.
    pub async fn activate(&mut self, call_id: &str) {
        self.machine.apply(started(call_id));
        assert!(self.machine.step().await, "queue closed before join result");
        assert_eq!(self.machine.state_of(&id(call_id)), Some(CallState::Active));
    }

    pub fn set_levels(&self, levels: &[Option<AudioLevel>]) {
        *self.platform.levels.lock().unwrap() = levels.iter().copied().collect();
    }

    pub fn silence_counter(&self, call_id: &str) -> u32 {
        self.machine
            .snapshot()
            .into_iter()
            .find(|c| c.call_id == id(call_id))
            .map(|c| c.silence_counter)
            .expect("call should be tracked")
    }
}
