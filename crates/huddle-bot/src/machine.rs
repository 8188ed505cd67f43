//! The call state machine.
//!
//! A single task owns every [`Call`] record and applies inputs one at a time
//! from one queue: routed transitions, completions of platform commands, and
//! audio samples from silence monitors. Platform commands run as spawned
//! tasks that post their result back into the queue, so a slow call never
//! holds up another one.
//!
//! Per call id:
//!
//! | From | Input | To | Side effect |
//! |------|-------|----|-------------|
//! | - | `CallStarted`, slot free | Joining | join |
//! | Joining | join ok | Active | start monitor |
//! | Joining | join failed | Ended, removed | |
//! | Active | `ParticipantJoined` | Active | welcome announcement |
//! | Active | `ParticipantsAllLeft` | Leaving | stop monitor, leave |
//! | Leaving | leave done | Ended, removed | |
//! | any | `CallEnded` | Ended, removed | stop monitor |
//! | Active | silence signal | Active | nudge announcement |

use crate::announce::{silence_nudge_text, welcome_text};
use crate::error::{BotError, PlatformError};
use crate::monitor::{AudioSample, SilenceDetector, SilenceMonitor};
use crate::platform::Platform;
use crate::router::{EventRouter, Transition};
use crate::settings::BotSettings;
use crate::tracking::{Call, CallSnapshot, TrackError, TrackingSet};
use huddle_types::{
    AnnouncementKind, AnnouncementRequest, CallId, CallState, ConversationId, Notification,
    Participant,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Default capacity for the call transition broadcast channel.
const DEFAULT_TRANSITION_BROADCAST_CAPACITY: usize = 256;

/// Everything the state machine consumes, in observation order.
#[derive(Debug)]
pub enum BotInput {
    Transition(Transition),
    JoinCompleted {
        call_id: CallId,
        epoch: u64,
        result: Result<(), PlatformError>,
    },
    LeaveCompleted {
        call_id: CallId,
        epoch: u64,
        result: Result<(), PlatformError>,
    },
    Sample(AudioSample),
    Snapshot(oneshot::Sender<Vec<CallSnapshot>>),
}

/// A state change of one call, published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallTransition {
    #[serde(rename = "callId")]
    pub call_id: CallId,
    pub from: CallState,
    pub to: CallState,
}

/// Cloneable front door to a running [`CallStateMachine`].
#[derive(Debug, Clone)]
pub struct BotHandle {
    router: EventRouter,
    inbox: mpsc::UnboundedSender<BotInput>,
    transitions: broadcast::Sender<CallTransition>,
}

impl BotHandle {
    /// Routes a platform notification and queues the resulting transition.
    ///
    /// Returns the transition, or `None` if the notification was dropped.
    pub fn notify(&self, notification: &Notification) -> Result<Option<Transition>, BotError> {
        let Some(transition) = self.router.route(notification) else {
            return Ok(None);
        };
        self.submit(transition.clone())?;
        Ok(Some(transition))
    }

    /// Queues an already-typed transition.
    pub fn submit(&self, transition: Transition) -> Result<(), BotError> {
        self.inbox
            .send(BotInput::Transition(transition))
            .map_err(|_| BotError::Stopped)
    }

    /// Current contents of the tracking set.
    pub async fn snapshot(&self) -> Result<Vec<CallSnapshot>, BotError> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(BotInput::Snapshot(tx))
            .map_err(|_| BotError::Stopped)?;
        rx.await.map_err(|_| BotError::Stopped)
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<CallTransition> {
        self.transitions.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.inbox.is_closed()
    }
}

/// Owner of all call records.
pub struct CallStateMachine {
    settings: BotSettings,
    platform: Arc<dyn Platform>,
    tracking: TrackingSet,
    announcements: mpsc::UnboundedSender<AnnouncementRequest>,
    inbox: mpsc::UnboundedReceiver<BotInput>,
    /// Handed to spawned commands and monitors; they never keep the
    /// machine alive on their own.
    inbox_tx: mpsc::WeakUnboundedSender<BotInput>,
    transitions: broadcast::Sender<CallTransition>,
    /// Conversations already greeted. Kept for the process lifetime so a
    /// re-add never greets twice; one id per conversation the bot joins.
    greeted: HashSet<ConversationId>,
    next_epoch: u64,
}

impl CallStateMachine {
    /// Creates the machine and its handle. The machine stops once every
    /// handle is dropped.
    pub fn new(
        settings: BotSettings,
        platform: Arc<dyn Platform>,
        announcements: mpsc::UnboundedSender<AnnouncementRequest>,
    ) -> (Self, BotHandle) {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let (transitions, _) = broadcast::channel(DEFAULT_TRANSITION_BROADCAST_CAPACITY);

        let handle = BotHandle {
            router: EventRouter::new(settings.user_id.clone()),
            inbox: inbox_tx.clone(),
            transitions: transitions.clone(),
        };

        let machine = Self {
            tracking: TrackingSet::new(settings.mode),
            settings,
            platform,
            announcements,
            inbox,
            inbox_tx: inbox_tx.downgrade(),
            transitions,
            greeted: HashSet::new(),
            next_epoch: 1,
        };

        (machine, handle)
    }

    /// Processes inputs until every handle is gone.
    pub async fn run(mut self) {
        tracing::info!(
            mode = ?self.settings.mode,
            user_id = %self.settings.user_id,
            "call state machine started"
        );
        while self.step().await {}

        let remaining = self.tracking.len();
        tracing::info!(remaining, "call state machine stopped");
    }

    /// Waits for one input and applies it. Returns `false` once the queue is
    /// closed.
    pub async fn step(&mut self) -> bool {
        match self.inbox.recv().await {
            Some(input) => {
                self.apply(input);
                true
            }
            None => false,
        }
    }

    pub fn state_of(&self, call_id: &CallId) -> Option<CallState> {
        self.tracking.get(call_id).map(Call::state)
    }

    pub fn snapshot(&self) -> Vec<CallSnapshot> {
        self.tracking.snapshot()
    }

    /// Applies one input synchronously. Platform commands it triggers are
    /// spawned and report back through the queue.
    pub fn apply(&mut self, input: BotInput) {
        match input {
            BotInput::Transition(transition) => self.on_transition(transition),
            BotInput::JoinCompleted {
                call_id,
                epoch,
                result,
            } => self.on_join_completed(call_id, epoch, result),
            BotInput::LeaveCompleted {
                call_id,
                epoch,
                result,
            } => self.on_leave_completed(call_id, epoch, result),
            BotInput::Sample(sample) => self.on_sample(sample),
            BotInput::Snapshot(reply) => {
                let _ = reply.send(self.tracking.snapshot());
            }
        }
    }

    fn on_transition(&mut self, transition: Transition) {
        tracing::debug!(
            transition = transition.name(),
            call_id = ?transition.call_id(),
            "applying transition"
        );
        match transition {
            Transition::BotAddedToConversation { conversation_id } => {
                self.on_bot_added(conversation_id)
            }
            Transition::CallStarted { call_id } => self.on_call_started(call_id),
            Transition::ParticipantJoined {
                call_id,
                participant,
            } => self.on_participant_joined(call_id, participant),
            Transition::ParticipantsAllLeft { call_id } => self.on_all_left(call_id),
            Transition::ParticipantCountUpdated { call_id, count } => {
                if let Some(call) = self.tracking.get_mut(&call_id) {
                    call.participant_count = count;
                }
            }
            Transition::RemoteAudioAttachRequested { call_id } => {
                self.on_remote_audio_requested(call_id)
            }
            Transition::CallEnded { call_id } => self.on_call_ended(call_id),
        }
    }

    fn on_bot_added(&mut self, conversation_id: ConversationId) {
        if !self.greeted.insert(conversation_id.clone()) {
            tracing::debug!(conversation_id = %conversation_id, "conversation already greeted");
            return;
        }
        tracing::info!(conversation_id = %conversation_id, "bot added to conversation");

        let platform = self.platform.clone();
        let greeting = self.settings.greeting.clone();
        tokio::spawn(async move {
            if let Err(e) = platform.send_text(&conversation_id, &greeting).await {
                tracing::error!(
                    conversation_id = %conversation_id,
                    "failed to send greeting: {}",
                    e
                );
            }
        });
    }

    fn on_call_started(&mut self, call_id: CallId) {
        let epoch = self.next_epoch;
        let silence = SilenceDetector::new(&self.settings.silence);

        let call = match self.tracking.try_track(call_id.clone(), epoch, silence) {
            Ok(call) => call,
            Err(TrackError::AlreadyTracked(_)) => {
                tracing::debug!(call_id = %call_id, "call already tracked, ignoring start");
                return;
            }
            Err(TrackError::Full { occupant }) => {
                tracing::info!(
                    call_id = %call_id,
                    occupant = %occupant,
                    "already serving a call, ignoring new call"
                );
                return;
            }
        };
        self.next_epoch += 1;

        advance(call, CallState::Joining, &self.transitions);

        let platform = self.platform.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = platform.join(&call_id).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(BotInput::JoinCompleted {
                    call_id,
                    epoch,
                    result,
                });
            }
        });
    }

    fn on_join_completed(
        &mut self,
        call_id: CallId,
        epoch: u64,
        result: Result<(), PlatformError>,
    ) {
        let Some(call) = self.tracking.get_mut(&call_id) else {
            tracing::debug!(call_id = %call_id, "join result for untracked call discarded");
            return;
        };
        if call.epoch() != epoch || call.state() != CallState::Joining {
            tracing::debug!(
                call_id = %call_id,
                state = %call.state(),
                "stale join result discarded"
            );
            return;
        }

        match result {
            Ok(()) => {
                advance(call, CallState::Active, &self.transitions);
                call.monitor = Some(SilenceMonitor::start(
                    self.platform.clone(),
                    call_id.clone(),
                    epoch,
                    self.settings.silence.sampling_period,
                    self.inbox_tx.clone(),
                ));
                tracing::info!(call_id = %call_id, "joined call");
            }
            Err(e) => {
                tracing::error!(call_id = %call_id, "failed to join call: {}", e);
                advance(call, CallState::Ended, &self.transitions);
                self.tracking.remove_ended(&call_id);
            }
        }
    }

    fn on_participant_joined(&mut self, call_id: CallId, participant: Participant) {
        let Some(call) = self.tracking.get_mut(&call_id) else {
            return;
        };
        if call.state() != CallState::Active {
            tracing::debug!(
                call_id = %call_id,
                state = %call.state(),
                "participant joined before bot was active"
            );
            return;
        }
        call.participant_count += 1;

        tracing::info!(
            call_id = %call_id,
            first_name = %participant.first_name,
            last_name = %participant.last_name,
            "new participant on call"
        );
        self.announce(call_id, AnnouncementKind::Welcome, welcome_text(&participant));
    }

    fn on_all_left(&mut self, call_id: CallId) {
        let Some(call) = self.tracking.get_mut(&call_id) else {
            return;
        };
        if call.state() != CallState::Active {
            tracing::debug!(
                call_id = %call_id,
                state = %call.state(),
                "ignoring empty call outside active state"
            );
            return;
        }

        call.stop_monitor();
        call.participant_count = 0;
        advance(call, CallState::Leaving, &self.transitions);
        let epoch = call.epoch();

        let platform = self.platform.clone();
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = platform.leave(&call_id).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(BotInput::LeaveCompleted {
                    call_id,
                    epoch,
                    result,
                });
            }
        });
    }

    fn on_leave_completed(
        &mut self,
        call_id: CallId,
        epoch: u64,
        result: Result<(), PlatformError>,
    ) {
        let Some(call) = self.tracking.get_mut(&call_id) else {
            tracing::debug!(call_id = %call_id, "leave result for untracked call discarded");
            return;
        };
        if call.epoch() != epoch || call.state() != CallState::Leaving {
            tracing::debug!(
                call_id = %call_id,
                state = %call.state(),
                "stale leave result discarded"
            );
            return;
        }

        match result {
            Ok(()) => tracing::info!(call_id = %call_id, "left call"),
            Err(e) => tracing::error!(call_id = %call_id, "failed to leave call: {}", e),
        }
        advance(call, CallState::Ended, &self.transitions);
        self.tracking.remove_ended(&call_id);
    }

    fn on_call_ended(&mut self, call_id: CallId) {
        let Some(call) = self.tracking.get_mut(&call_id) else {
            return;
        };
        call.stop_monitor();
        advance(call, CallState::Ended, &self.transitions);
        self.tracking.remove_ended(&call_id);
        tracing::info!(call_id = %call_id, "call ended");
    }

    fn on_remote_audio_requested(&mut self, call_id: CallId) {
        let Some(call) = self.tracking.get(&call_id) else {
            return;
        };
        if !matches!(call.state(), CallState::Joining | CallState::Active) {
            return;
        }

        let platform = self.platform.clone();
        tokio::spawn(async move {
            if let Err(e) = platform.attach_remote_audio(&call_id).await {
                tracing::error!(call_id = %call_id, "failed to attach remote audio: {}", e);
            }
        });
    }

    fn on_sample(&mut self, sample: AudioSample) {
        let Some(call) = self.tracking.get_mut(&sample.call_id) else {
            return;
        };
        if call.epoch() != sample.epoch
            || call.state() != CallState::Active
            || call.monitor.is_none()
        {
            tracing::trace!(call_id = %sample.call_id, "sample from stopped monitor discarded");
            return;
        }

        if call.silence.observe(sample.level) {
            tracing::info!(call_id = %sample.call_id, "call is silent, nudging");
            let text = silence_nudge_text(&mut rand::thread_rng());
            self.announce(sample.call_id, AnnouncementKind::SilenceNudge, text.to_string());
        }
    }

    fn announce(&self, call_id: CallId, kind: AnnouncementKind, text: String) {
        let request = AnnouncementRequest::new(call_id, kind, text, self.settings.voice.clone());
        if let Err(e) = self.announcements.send(request) {
            tracing::warn!(
                call_id = %e.0.call_id,
                kind = kind.as_str(),
                "announcement pipeline is gone, dropping announcement"
            );
        }
    }
}

/// Moves `call` forward and publishes the change.
fn advance(call: &mut Call, next: CallState, transitions: &broadcast::Sender<CallTransition>) {
    match call.advance(next) {
        Ok(from) => {
            tracing::debug!(call_id = %call.call_id(), %from, to = %next, "call state changed");
            let _ = transitions.send(CallTransition {
                call_id: call.call_id().clone(),
                from,
                to: next,
            });
        }
        Err(e) => {
            tracing::warn!(call_id = %call.call_id(), "{}", e);
        }
    }
}
