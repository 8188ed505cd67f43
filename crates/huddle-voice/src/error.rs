use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Audio injection error: {0}")]
    Injection(String),

    /// The call the audio was meant for no longer exists on the platform.
    #[error("Call no longer exists: {0}")]
    CallGone(String),
}

impl From<hound::Error> for VoiceError {
    fn from(e: hound::Error) -> Self {
        VoiceError::Decode(e.to_string())
    }
}
