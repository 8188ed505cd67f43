//! Voice output for the Huddle bot.
//!
//! Turns announcement text into audio the bot speaks into a call: the
//! synthesizer fetches encoded speech from an external service, the decoder
//! turns it into PCM, and the injector hands it to the platform as the call's
//! outbound audio. The pipeline ties the three together and runs each
//! announcement as an independent, best-effort task.

pub mod config;
pub mod decoder;
pub mod error;
pub mod injector;
pub mod pipeline;
pub mod synthesizer;

pub use config::SpeechConfig;
pub use decoder::{decode_clip, AudioClip, ClipFormat};
pub use error::VoiceError;
pub use injector::{
    AudioFrame, AudioInjector, AudioSource, MediaOutput, OutboundSink, OutboundStream,
    FRAME_DURATION_MS,
};
pub use pipeline::AnnouncementPipeline;
pub use synthesizer::AnnouncementSynthesizer;
