use crate::config::SpeechConfig;
use crate::error::VoiceError;
use bytes::Bytes;
use huddle_types::VoiceProfile;
use std::time::Duration;

/// Maximum text input size for synthesis (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Client for the external speech synthesis service.
///
/// Sends `GET {url}?accept=..&voice=..&text=..` and returns the encoded audio
/// bytes. No retries: a failed request drops the announcement.
#[derive(Debug, Clone)]
pub struct AnnouncementSynthesizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl AnnouncementSynthesizer {
    /// Creates a synthesizer with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Config` if the HTTP client cannot be built.
    pub fn new(config: SpeechConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Fetches synthesized audio for `text` spoken with `profile`.
    pub async fn synthesize(
        &self,
        text: &str,
        profile: &VoiceProfile,
    ) -> Result<Bytes, VoiceError> {
        if !self.is_enabled() {
            return Err(VoiceError::Config(
                "speech service url is not configured".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(VoiceError::Synthesis("text is empty".to_string()));
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let mut request = self.client.get(&self.config.url).query(&[
            ("accept", profile.accept.as_str()),
            ("voice", profile.voice.as_str()),
            ("text", text),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Synthesis(format!(
                "speech service returned {}: {}",
                status, body
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(format!("failed to read audio body: {}", e)))?;

        if audio.is_empty() {
            return Err(VoiceError::Synthesis(
                "speech service returned no audio".to_string(),
            ));
        }

        tracing::debug!(bytes = audio.len(), voice = %profile.voice, "synthesized announcement");
        Ok(audio)
    }
}
