//! REST gateway client for the conferencing platform.
//!
//! One client serves both the bot's session commands ([`Platform`]) and the
//! voice pipeline's media output ([`MediaOutput`]).

use crate::config::PlatformConfig;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use huddle_bot::{Platform, PlatformError};
use huddle_types::{AudioLevel, CallId, ConversationId};
use huddle_voice::{AudioFrame, MediaOutput, OutboundStream, VoiceError};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(rename = "audioOutputLevel", default)]
    audio_output_level: Option<AudioLevel>,
}

/// Platform client speaking to the HTTP gateway.
#[derive(Clone)]
pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpPlatform {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PlatformError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                PlatformError::Transport(format!("invalid platform base url: {}", config.base_url))
            })?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    /// Gateway URL for `segments`. Each segment is percent-encoded, so ids
    /// never change the path structure.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.client.request(method, self.url(segments));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(PlatformError::CallNotFound(body))
        } else {
            Err(PlatformError::Rejected(format!("{}: {}", status, body)))
        }
    }

    async fn call_command(&self, call_id: &CallId, command: &str) -> Result<(), PlatformError> {
        let segments = ["calls", call_id.as_str(), command];
        self.send(self.request(Method::POST, &segments)).await?;
        Ok(())
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn join(&self, call_id: &CallId) -> Result<(), PlatformError> {
        self.call_command(call_id, "join").await
    }

    async fn leave(&self, call_id: &CallId) -> Result<(), PlatformError> {
        self.call_command(call_id, "leave").await
    }

    async fn audio_level(&self, call_id: &CallId) -> Result<Option<AudioLevel>, PlatformError> {
        let segments = ["calls", call_id.as_str(), "stats"];
        let response = self.send(self.request(Method::GET, &segments)).await?;
        let stats: StatsResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Transport(format!("invalid stats response: {}", e)))?;
        Ok(stats.audio_output_level)
    }

    async fn attach_remote_audio(&self, call_id: &CallId) -> Result<(), PlatformError> {
        self.call_command(call_id, "remote-audio").await
    }

    async fn send_text(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<(), PlatformError> {
        let segments = ["conversations", conversation_id.as_str(), "items"];
        self.send(self.request(Method::POST, &segments).json(&json!({ "text": text })))
            .await?;
        Ok(())
    }
}

/// Little-endian 16-bit PCM, the gateway's outbound wire format.
fn frame_bytes(frame: &AudioFrame) -> Bytes {
    let mut buf = BytesMut::with_capacity(frame.samples.len() * 2);
    for sample in &frame.samples {
        buf.put_i16_le(*sample);
    }
    buf.freeze()
}

#[async_trait]
impl MediaOutput for HttpPlatform {
    async fn set_outbound_audio(
        &self,
        call_id: &CallId,
        stream: OutboundStream,
    ) -> Result<(), VoiceError> {
        let segments = ["calls", call_id.as_str(), "outbound-audio"];
        let format = stream.format;

        self.send(self.request(Method::POST, &segments).json(&json!({
            "encoding": "s16le",
            "sampleRate": format.sample_rate,
            "channels": format.channels,
        })))
        .await
        .map_err(|e| match e {
            PlatformError::CallNotFound(body) => {
                VoiceError::CallGone(format!("{}: {}", call_id, body))
            }
            other => VoiceError::Injection(other.to_string()),
        })?;

        let frames = ReceiverStream::new(stream.into_receiver())
            .map(|frame| Ok::<_, std::io::Error>(frame_bytes(&frame)));
        let upload = self
            .request(Method::PUT, &segments)
            .header(reqwest::header::CONTENT_TYPE, "audio/L16")
            .body(reqwest::Body::wrap_stream(frames));

        // Playback feeds the body; dropping the upload closes the sink.
        let platform = self.clone();
        let call_id = call_id.clone();
        tokio::spawn(async move {
            if let Err(e) = platform.send(upload).await {
                tracing::warn!(call_id = %call_id, "outbound audio upload failed: {}", e);
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_little_endian() {
        let frame = AudioFrame {
            samples: vec![1, -2, 0x1234],
        };
        assert_eq!(
            frame_bytes(&frame).as_ref(),
            &[0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12]
        );
    }

    fn platform(base_url: &str) -> HttpPlatform {
        HttpPlatform::new(&PlatformConfig {
            base_url: base_url.to_string(),
            ..PlatformConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn trailing_slash_is_ignored() {
        for base in ["http://gateway.local/v1", "http://gateway.local/v1/"] {
            assert_eq!(
                platform(base).url(&["calls", "c1", "join"]).as_str(),
                "http://gateway.local/v1/calls/c1/join"
            );
        }
    }

    #[test]
    fn ids_are_encoded_as_single_segments() {
        let url = platform("http://gateway.local/v1").url(&["calls", "room?x=1#frag/2", "leave"]);
        assert_eq!(url.path(), "/v1/calls/room%3Fx=1%23frag%2F2/leave");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn rejects_unusable_base_url() {
        for base in ["not a url", "mailto:gateway@example.com"] {
            let config = PlatformConfig {
                base_url: base.to_string(),
                ..PlatformConfig::default()
            };
            assert!(matches!(
                HttpPlatform::new(&config),
                Err(PlatformError::Transport(_))
            ));
        }
    }
}
