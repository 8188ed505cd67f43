//! Platform notification wire format.
//!
//! The conferencing platform pushes three kinds of notifications: a
//! conversation item was added, a call's status changed, or a call ended.
//! Unknown kinds, reasons, and item types deserialize into catch-all
//! variants so the router can drop them without failing the request.

use crate::{CallId, ConversationId, Participant};
use serde::{Deserialize, Serialize};

/// A raw notification from the conferencing platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// A new item appeared in a conversation.
    ItemAdded { item: ConversationItem },
    /// Something about a call changed; `reason` says what.
    CallStatus {
        reason: CallStatusReason,
        call: CallInfo,
        /// The participant the change concerns, when there is one.
        #[serde(default)]
        participant: Option<Participant>,
    },
    /// The call is over for everyone.
    CallEnded { call: CallInfo },
    /// Any notification kind the bot does not understand.
    #[serde(other)]
    Unknown,
}

/// A conversation item (text message, system message, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(rename = "convId")]
    pub conv_id: ConversationId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Present for system items.
    #[serde(default)]
    pub system: Option<SystemContent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Text,
    System,
    #[serde(other)]
    Other,
}

/// Body of a system item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContent {
    #[serde(rename = "type")]
    pub system_type: SystemItemType,
    /// User ids the system event applies to.
    #[serde(rename = "affectedParticipants", default)]
    pub affected_participants: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemItemType {
    ParticipantAdded,
    ConversationCreated,
    #[serde(other)]
    Other,
}

/// Reason code attached to a call-status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallStatusReason {
    CallStateChanged,
    ParticipantAdded,
    ParticipantRemoved,
    ParticipantUpdated,
    RemoteStreamUpdated,
    #[serde(other)]
    Other,
}

/// The platform's own view of a call's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemoteCallState {
    Initiated,
    Started,
    Waiting,
    Active,
    Terminated,
    #[default]
    #[serde(other)]
    Other,
}

/// Call snapshot carried by call-status and call-ended notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallInfo {
    #[serde(rename = "callId")]
    pub call_id: CallId,
    #[serde(default)]
    pub state: RemoteCallState,
    /// Remote participants currently in the call.
    #[serde(default)]
    pub participants: Vec<Participant>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_status() {
        let raw = r#"{
            "type": "callStatus",
            "reason": "participantAdded",
            "call": {"callId": "c1", "state": "Active", "participants": [{"userId": "u1", "firstName": "Alice"}]},
            "participant": {"userId": "u1", "firstName": "Alice", "lastName": "Smith"}
        }"#;
        let n: Notification = serde_json::from_str(raw).unwrap();
        match n {
            Notification::CallStatus {
                reason,
                call,
                participant,
            } => {
                assert_eq!(reason, CallStatusReason::ParticipantAdded);
                assert_eq!(call.call_id.as_str(), "c1");
                assert_eq!(call.state, RemoteCallState::Active);
                assert_eq!(call.participants.len(), 1);
                assert_eq!(participant.unwrap().last_name, "Smith");
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn parses_system_item() {
        let raw = r#"{
            "type": "itemAdded",
            "item": {
                "convId": "conv-9",
                "type": "SYSTEM",
                "system": {"type": "CONVERSATION_CREATED", "affectedParticipants": ["bot", "u2"]}
            }
        }"#;
        let n: Notification = serde_json::from_str(raw).unwrap();
        let Notification::ItemAdded { item } = n else {
            panic!("expected item notification");
        };
        assert_eq!(item.item_type, ItemType::System);
        let system = item.system.unwrap();
        assert_eq!(system.system_type, SystemItemType::ConversationCreated);
        assert_eq!(system.affected_participants, vec!["bot", "u2"]);
    }

    #[test]
    fn unknown_values_fall_back() {
        let n: Notification =
            serde_json::from_str(r#"{"type": "presenceChanged", "user": "u1"}"#).unwrap();
        assert_eq!(n, Notification::Unknown);

        let raw = r#"{"type": "callStatus", "reason": "mediaRenegotiated", "call": {"callId": "c1", "state": "Ringing"}}"#;
        let Notification::CallStatus { reason, call, .. } =
            serde_json::from_str::<Notification>(raw).unwrap()
        else {
            panic!("expected call status");
        };
        assert_eq!(reason, CallStatusReason::Other);
        assert_eq!(call.state, RemoteCallState::Other);
        assert!(call.participants.is_empty());
    }
}
