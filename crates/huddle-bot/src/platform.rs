use crate::error::PlatformError;
use async_trait::async_trait;
use huddle_types::{AudioLevel, CallId, ConversationId};

/// Commands the bot issues to the conferencing platform.
///
/// Every method is a single request/response exchange. The state machine
/// never retries a failed command.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Joins the conference. Joining also starts it if nobody else has.
    async fn join(&self, call_id: &CallId) -> Result<(), PlatformError>;

    async fn leave(&self, call_id: &CallId) -> Result<(), PlatformError>;

    /// Most recent inbound audio level, or `None` when no statistic is
    /// available yet.
    async fn audio_level(&self, call_id: &CallId) -> Result<Option<AudioLevel>, PlatformError>;

    /// Attaches the remote audio stream so inbound level statistics are
    /// collected for the call.
    async fn attach_remote_audio(&self, call_id: &CallId) -> Result<(), PlatformError>;

    /// Posts a text item into a conversation.
    async fn send_text(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<(), PlatformError>;
}
