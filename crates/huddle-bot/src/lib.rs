//! Call lifecycle and silence detection for the Huddle bot.
//!
//! The bot joins conferences as they start, welcomes participants, nudges
//! calls that have gone quiet, and leaves when everyone else has. This crate
//! holds the logic that makes those decisions:
//!
//! - [`EventRouter`] turns raw platform notifications into [`Transition`]s.
//! - [`CallStateMachine`] owns the [`TrackingSet`] and applies transitions,
//!   command results, and audio samples one at a time.
//! - [`SilenceMonitor`] polls a call's inbound audio level while the call is
//!   active; [`SilenceDetector`] decides when the call counts as silent.
//!
//! The conferencing platform itself is reached through the [`Platform`]
//! trait. Announcements leave the machine as
//! [`huddle_types::AnnouncementRequest`]s on a channel; speaking them is the
//! job of `huddle-voice`.

pub mod announce;
pub mod error;
pub mod machine;
pub mod monitor;
pub mod platform;
pub mod router;
pub mod settings;
pub mod tracking;

pub use error::{BotError, PlatformError};
pub use machine::{BotHandle, BotInput, CallStateMachine, CallTransition};
pub use monitor::{AudioSample, MonitorHandle, SilenceDetector, SilenceMonitor};
pub use platform::Platform;
pub use router::{EventRouter, Transition};
pub use settings::{BotSettings, CallMode, SilenceSettings, DEFAULT_GREETING};
pub use tracking::{Call, CallSnapshot, TrackError, TrackingSet};
