//! Runtime settings for the call state machine.

use huddle_types::{AudioLevel, VoiceProfile};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default greeting posted when the bot is added to a conversation.
pub const DEFAULT_GREETING: &str = "Thanks for adding me to the conversation.";

/// How many calls the bot may be part of at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallMode {
    /// One call at a time; further calls are ignored while one is tracked.
    #[default]
    Single,
    /// Any number of concurrent calls.
    Multi,
}

impl std::str::FromStr for CallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            other => Err(format!("unknown call mode: {}", other)),
        }
    }
}

/// Silence detection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilenceSettings {
    /// Consecutive silent samples that make a call "silent".
    pub threshold_samples: u32,
    /// Samples strictly above this level count as speech.
    pub loudness_threshold: AudioLevel,
    /// Time between two audio-level samples.
    pub sampling_period: Duration,
}

impl Default for SilenceSettings {
    fn default() -> Self {
        Self {
            threshold_samples: 5,
            loudness_threshold: 50,
            sampling_period: Duration::from_millis(1000),
        }
    }
}

/// Everything the state machine needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotSettings {
    /// The bot's own platform user id.
    pub user_id: String,
    pub mode: CallMode,
    /// Text item posted into conversations the bot is added to.
    pub greeting: String,
    pub silence: SilenceSettings,
    /// Voice used for every announcement.
    pub voice: VoiceProfile,
}

impl BotSettings {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            mode: CallMode::default(),
            greeting: DEFAULT_GREETING.to_string(),
            silence: SilenceSettings::default(),
            voice: VoiceProfile::default(),
        }
    }
}
