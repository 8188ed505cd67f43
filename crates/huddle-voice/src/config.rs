use huddle_types::VoiceProfile;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_timeout_seconds() -> u64 {
    30
}

/// Connection settings for the external speech synthesis service.
#[derive(Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Synthesis endpoint. Empty disables announcements.
    #[serde(default)]
    pub url: String,
    /// Voice and encoding requested for every announcement.
    #[serde(flatten)]
    pub profile: VoiceProfile,
    /// Sent as a bearer token when present.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds. Default: 30.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            profile: VoiceProfile::default(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("url", &self.url)
            .field("profile", &self.profile)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl SpeechConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let mut config = SpeechConfig::new("http://tts.local/synthesize");
        config.api_key = Some("super-secret".to_string());
        let printed = format!("{:?}", config);
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn deserializes_flattened_profile() {
        let config: SpeechConfig = toml::from_str(
            r#"
            url = "http://tts.local/synthesize"
            voice = "en-GB_KateVoice"
            "#,
        )
        .unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.profile.voice, "en-GB_KateVoice");
        assert_eq!(config.profile.accept, "audio/wav");
        assert_eq!(config.timeout_seconds, 30);
        assert!(config.api_key.is_none());
    }
}
