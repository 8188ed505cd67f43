use crate::decoder::decode_clip;
use crate::error::VoiceError;
use crate::injector::AudioInjector;
use crate::synthesizer::AnnouncementSynthesizer;
use huddle_types::AnnouncementRequest;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Turns announcement requests into audio played into calls.
///
/// Every request runs its own synthesize -> decode -> inject task, so two
/// announcements for the same call are not ordered relative to each other.
pub struct AnnouncementPipeline {
    synthesizer: AnnouncementSynthesizer,
    injector: AudioInjector,
}

impl AnnouncementPipeline {
    pub fn new(synthesizer: AnnouncementSynthesizer, injector: AudioInjector) -> Self {
        Self {
            synthesizer,
            injector,
        }
    }

    /// Speaks one announcement. Returns the number of frames played.
    pub async fn announce(&self, request: &AnnouncementRequest) -> Result<usize, VoiceError> {
        let audio = self
            .synthesizer
            .synthesize(&request.text, &request.voice)
            .await?;

        let clip = tokio::task::spawn_blocking(move || decode_clip(&audio))
            .await
            .map_err(|e| VoiceError::Decode(format!("decode task failed: {}", e)))??;

        self.injector.inject(&request.call_id, clip).await
    }

    /// Drains `requests` until every sender is gone, spawning one task per
    /// request.
    pub async fn run(self: Arc<Self>, mut requests: mpsc::UnboundedReceiver<AnnouncementRequest>) {
        tracing::info!(
            enabled = self.synthesizer.is_enabled(),
            "announcement pipeline started"
        );

        while let Some(request) = requests.recv().await {
            let pipeline = self.clone();
            tokio::spawn(async move {
                pipeline.process(request).await;
            });
        }

        tracing::info!("announcement pipeline stopped");
    }

    async fn process(&self, request: AnnouncementRequest) {
        match self.announce(&request).await {
            Ok(frames) => {
                tracing::info!(
                    request_id = %request.id,
                    call_id = %request.call_id,
                    kind = request.kind.as_str(),
                    frames,
                    "announcement delivered"
                );
            }
            Err(VoiceError::CallGone(reason)) => {
                tracing::debug!(
                    request_id = %request.id,
                    call_id = %request.call_id,
                    "announcement discarded, call is gone: {}",
                    reason
                );
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request.id,
                    call_id = %request.call_id,
                    kind = request.kind.as_str(),
                    "announcement dropped: {}",
                    e
                );
            }
        }
    }
}
