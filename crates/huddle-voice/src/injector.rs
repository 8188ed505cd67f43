//! Sending decoded clips as a call's outbound audio.

use crate::decoder::{AudioClip, ClipFormat};
use crate::error::VoiceError;
use async_trait::async_trait;
use huddle_types::CallId;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Length of one outbound frame.
pub const FRAME_DURATION_MS: u32 = 20;

/// Frames buffered between the source and the platform before playback
/// waits for the platform to catch up.
const OUTBOUND_BUFFER_FRAMES: usize = 50;

/// One chunk of outbound PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
}

/// Receiving half of an outbound sink, handed to the platform.
#[derive(Debug)]
pub struct OutboundStream {
    pub call_id: CallId,
    pub format: ClipFormat,
    frames: mpsc::Receiver<AudioFrame>,
}

impl OutboundStream {
    /// Next frame, or `None` once playback has finished.
    pub async fn recv(&mut self) -> Option<AudioFrame> {
        self.frames.recv().await
    }

    pub fn into_receiver(self) -> mpsc::Receiver<AudioFrame> {
        self.frames
    }
}

/// The bot's outbound media for one call.
#[derive(Debug)]
pub struct OutboundSink {
    call_id: CallId,
    frames: mpsc::Sender<AudioFrame>,
}

impl OutboundSink {
    /// Opens a sink and the stream the platform reads from.
    pub fn open(call_id: CallId, format: ClipFormat) -> (Self, OutboundStream) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER_FRAMES);
        let stream = OutboundStream {
            call_id: call_id.clone(),
            format,
            frames: rx,
        };
        (
            Self {
                call_id,
                frames: tx,
            },
            stream,
        )
    }
}

/// Plays a clip into a sink in fixed-size frames.
#[derive(Debug, Clone)]
pub struct AudioSource {
    clip: Arc<AudioClip>,
}

impl AudioSource {
    pub fn new(clip: AudioClip) -> Self {
        Self {
            clip: Arc::new(clip),
        }
    }

    /// Samples per frame, all channels included.
    fn frame_len(&self) -> usize {
        let format = self.clip.format;
        let per_channel =
            (u64::from(format.sample_rate) * u64::from(FRAME_DURATION_MS) / 1000).max(1);
        let channels = u64::from(format.channels.max(1));
        usize::try_from(per_channel.saturating_mul(channels)).unwrap_or(usize::MAX)
    }

    /// Sends the whole clip from sample 0 and returns the number of frames sent.
    ///
    /// The sink is dropped at the end, which closes the platform's stream.
    pub async fn start(&self, sink: OutboundSink) -> Result<usize, VoiceError> {
        let mut sent = 0;
        for chunk in self.clip.samples.chunks(self.frame_len()) {
            let frame = AudioFrame {
                samples: chunk.to_vec(),
            };
            if sink.frames.send(frame).await.is_err() {
                return Err(VoiceError::CallGone(format!(
                    "outbound stream for {} closed after {} frames",
                    sink.call_id, sent
                )));
            }
            sent += 1;
        }
        Ok(sent)
    }
}

/// Platform media API used to replace a call's outbound audio.
#[async_trait]
pub trait MediaOutput: Send + Sync {
    /// Makes `stream` the call's outbound audio.
    ///
    /// Implementations return `VoiceError::CallGone` when the call no longer
    /// exists.
    async fn set_outbound_audio(
        &self,
        call_id: &CallId,
        stream: OutboundStream,
    ) -> Result<(), VoiceError>;
}

/// Arranges for a clip to be sent as a call's outbound audio.
#[derive(Clone)]
pub struct AudioInjector {
    output: Arc<dyn MediaOutput>,
}

impl AudioInjector {
    pub fn new(output: Arc<dyn MediaOutput>) -> Self {
        Self { output }
    }

    /// Points the call's outbound audio at a fresh sink and plays `clip`
    /// into it from the beginning.
    pub async fn inject(&self, call_id: &CallId, clip: AudioClip) -> Result<usize, VoiceError> {
        let (sink, stream) = OutboundSink::open(call_id.clone(), clip.format);
        let source = AudioSource::new(clip);

        self.output.set_outbound_audio(call_id, stream).await?;

        let frames = source.start(sink).await?;
        tracing::debug!(call_id = %call_id, frames, "announcement played");
        Ok(frames)
    }
}
