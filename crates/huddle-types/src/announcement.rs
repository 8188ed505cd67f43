//! Announcement requests handed from the call state machine to the speech
//! pipeline.

use crate::{CallId, VoiceProfile};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why an announcement is being spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
    /// Greets a participant who just joined.
    Welcome,
    /// Prompts a call that has gone quiet.
    SilenceNudge,
}

impl AnnouncementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::SilenceNudge => "silence_nudge",
        }
    }
}

/// A pending request to speak into a call.
///
/// Ephemeral: created by the state machine, consumed by one synthesis and
/// injection run, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementRequest {
    /// Correlation id for logs.
    pub id: Uuid,
    pub call_id: CallId,
    pub kind: AnnouncementKind,
    pub text: String,
    pub voice: VoiceProfile,
}

impl AnnouncementRequest {
    pub fn new(
        call_id: CallId,
        kind: AnnouncementKind,
        text: impl Into<String>,
        voice: VoiceProfile,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            call_id,
            kind,
            text: text.into(),
            voice,
        }
    }
}
