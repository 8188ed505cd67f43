//! Normalizes raw platform notifications into typed transitions.

use huddle_types::notification::{
    CallStatusReason, ConversationItem, ItemType, RemoteCallState, SystemItemType,
};
use huddle_types::{CallId, ConversationId, Notification, Participant};

/// A typed input for the call state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The bot was added to a conversation (or a conversation was created
    /// with it). Triggers the one-time greeting text.
    BotAddedToConversation { conversation_id: ConversationId },
    /// A conference started.
    CallStarted { call_id: CallId },
    /// A participant joined a conference.
    ParticipantJoined {
        call_id: CallId,
        participant: Participant,
    },
    /// The last remote participant left.
    ParticipantsAllLeft { call_id: CallId },
    /// The remote participant count changed for another reason.
    ParticipantCountUpdated { call_id: CallId, count: usize },
    /// The remote stream changed and needs to be attached so inbound audio
    /// statistics are collected.
    RemoteAudioAttachRequested { call_id: CallId },
    /// The conference is over.
    CallEnded { call_id: CallId },
}

impl Transition {
    /// The call this transition concerns, if any.
    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            Self::BotAddedToConversation { .. } => None,
            Self::CallStarted { call_id }
            | Self::ParticipantJoined { call_id, .. }
            | Self::ParticipantsAllLeft { call_id }
            | Self::ParticipantCountUpdated { call_id, .. }
            | Self::RemoteAudioAttachRequested { call_id }
            | Self::CallEnded { call_id } => Some(call_id),
        }
    }

    /// Short name for logs and API responses.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BotAddedToConversation { .. } => "bot_added_to_conversation",
            Self::CallStarted { .. } => "call_started",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::ParticipantsAllLeft { .. } => "participants_all_left",
            Self::ParticipantCountUpdated { .. } => "participant_count_updated",
            Self::RemoteAudioAttachRequested { .. } => "remote_audio_attach_requested",
            Self::CallEnded { .. } => "call_ended",
        }
    }
}

/// Classifies notifications on behalf of one bot identity.
#[derive(Debug, Clone)]
pub struct EventRouter {
    bot_user_id: String,
}

impl EventRouter {
    pub fn new(bot_user_id: impl Into<String>) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Returns the transition a notification stands for, or `None` when the
    /// bot has nothing to do with it.
    pub fn route(&self, notification: &Notification) -> Option<Transition> {
        let transition = match notification {
            Notification::ItemAdded { item } => self.route_item(item),
            Notification::CallStatus {
                reason,
                call,
                participant,
            } => {
                let call_id = call.call_id.clone();
                match reason {
                    CallStatusReason::CallStateChanged
                        if call.state == RemoteCallState::Started =>
                    {
                        Some(Transition::CallStarted { call_id })
                    }
                    CallStatusReason::ParticipantAdded => {
                        participant
                            .clone()
                            .map(|participant| Transition::ParticipantJoined {
                                call_id,
                                participant,
                            })
                    }
                    CallStatusReason::ParticipantRemoved if call.participants.is_empty() => {
                        Some(Transition::ParticipantsAllLeft { call_id })
                    }
                    CallStatusReason::ParticipantRemoved | CallStatusReason::ParticipantUpdated => {
                        Some(Transition::ParticipantCountUpdated {
                            call_id,
                            count: call.participants.len(),
                        })
                    }
                    CallStatusReason::RemoteStreamUpdated => {
                        Some(Transition::RemoteAudioAttachRequested { call_id })
                    }
                    _ => None,
                }
            }
            Notification::CallEnded { call } => Some(Transition::CallEnded {
                call_id: call.call_id.clone(),
            }),
            Notification::Unknown => None,
        };

        if transition.is_none() {
            tracing::debug!(?notification, "notification dropped");
        }
        transition
    }

    fn route_item(&self, item: &ConversationItem) -> Option<Transition> {
        if item.item_type != ItemType::System {
            return None;
        }
        let system = item.system.as_ref()?;
        let relevant = matches!(
            system.system_type,
            SystemItemType::ParticipantAdded | SystemItemType::ConversationCreated
        );
        let names_bot = system
            .affected_participants
            .iter()
            .any(|id| id == &self.bot_user_id);

        (relevant && names_bot).then(|| Transition::BotAddedToConversation {
            conversation_id: item.conv_id.clone(),
        })
    }
}
