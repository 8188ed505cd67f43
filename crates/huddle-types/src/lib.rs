//! Shared types, error definitions, and constants for the Huddle bot.
//!
//! This crate provides the foundational types used across all Huddle crates:
//! call and conversation identifiers, the call lifecycle states, participant
//! records, the platform notification wire format, voice profiles, and
//! announcement requests.
//!
//! No crate in the workspace depends on anything *except* `huddle-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod announcement;
pub mod notification;
pub mod voice;

pub use announcement::{AnnouncementKind, AnnouncementRequest};
pub use notification::Notification;
pub use voice::VoiceProfile;

/// Inbound audio level as reported by the platform's RTP statistics.
pub type AudioLevel = u32;

/// Opaque platform-assigned identifier of a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque platform-assigned identifier of a text conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a call tracked by the bot.
///
/// States are ordered: a call only ever moves forward through
/// `Idle -> Joining -> Active -> Leaving -> Ended`, possibly skipping steps
/// (a failed join or an authoritative call end jumps straight to `Ended`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    /// Record created, no command issued yet.
    Idle,
    /// Join command issued, awaiting the platform.
    Joining,
    /// Bot is in the call; the silence monitor runs.
    Active,
    /// Leave command issued, awaiting the platform.
    Leaving,
    /// Terminal. The record is removed from tracking.
    Ended,
}

impl CallState {
    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Joining => 1,
            Self::Active => 2,
            Self::Leaving => 3,
            Self::Ended => 4,
        }
    }

    /// Returns the string label for this state.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Joining => "JOINING",
            Self::Active => "ACTIVE",
            Self::Leaving => "LEAVING",
            Self::Ended => "ENDED",
        }
    }

    /// Whether the call occupies a slot in the tracking set. A fresh `Idle`
    /// record already holds its slot.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, Self::Ended)
    }

    /// Returns `next` if it lies strictly ahead of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for self-loops and backward moves.
    pub fn advance(self, next: CallState) -> Result<CallState, InvalidTransition> {
        if next.rank() > self.rank() {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A rejected backward or self-loop state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid call state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: CallState,
    pub to: CallState,
}

/// A remote participant as described by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
}

impl Participant {
    /// The name used to address the participant in speech.
    ///
    /// Prefers the first name, then the display name, then "there".
    pub fn spoken_name(&self) -> &str {
        if !self.first_name.trim().is_empty() {
            self.first_name.trim()
        } else if !self.display_name.trim().is_empty() {
            self.display_name.trim()
        } else {
            "there"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_state_moves_forward_only() {
        assert_eq!(
            CallState::Idle.advance(CallState::Joining),
            Ok(CallState::Joining)
        );
        assert_eq!(
            CallState::Joining.advance(CallState::Ended),
            Ok(CallState::Ended)
        );
        assert!(CallState::Active.advance(CallState::Joining).is_err());
        assert!(CallState::Ended.advance(CallState::Leaving).is_err());
        assert!(CallState::Active.advance(CallState::Active).is_err());
    }

    #[test]
    fn slot_occupancy() {
        assert!(CallState::Idle.occupies_slot());
        assert!(CallState::Joining.occupies_slot());
        assert!(CallState::Active.occupies_slot());
        assert!(CallState::Leaving.occupies_slot());
        assert!(!CallState::Ended.occupies_slot());
    }

    #[test]
    fn call_state_labels() {
        assert_eq!(CallState::Idle.label(), "IDLE");
        assert_eq!(CallState::Active.to_string(), "ACTIVE");
        assert_eq!(
            serde_json::to_string(&CallState::Leaving).unwrap(),
            "\"LEAVING\""
        );
    }

    #[test]
    fn spoken_name_fallbacks() {
        let mut p = Participant {
            first_name: "Alice".to_string(),
            display_name: "Alice Smith".to_string(),
            ..Default::default()
        };
        assert_eq!(p.spoken_name(), "Alice");

        p.first_name = "  ".to_string();
        assert_eq!(p.spoken_name(), "Alice Smith");

        p.display_name.clear();
        assert_eq!(p.spoken_name(), "there");
    }

    #[test]
    fn call_id_is_transparent_in_json() {
        let id = CallId::new("c-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c-1\"");
        let back: CallId = serde_json::from_str("\"c-1\"").unwrap();
        assert_eq!(back, id);
    }
}
