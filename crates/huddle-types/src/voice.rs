//! Voice profile definitions.
//!
//! A `VoiceProfile` selects the synthesis voice and the audio encoding the
//! speech service should return for an announcement.

use serde::{Deserialize, Serialize};

fn default_voice() -> String {
    "en-US_MichaelVoice".to_string()
}

fn default_accept() -> String {
    "audio/wav".to_string()
}

/// Voice parameters attached to every announcement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Voice name understood by the speech service.
    #[serde(default = "default_voice")]
    pub voice: String,
    /// MIME type requested from the speech service (e.g. `audio/wav`).
    #[serde(default = "default_accept")]
    pub accept: String,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            voice: default_voice(),
            accept: default_accept(),
        }
    }
}
