//! Policy-enforcing playback controller for proctored video sessions.
//!
//! A [`player::PlaybackController`] binds one stream to a media sink, enforces the
//! session's seek and speed policy on every signal the sink reports, and keeps the
//! backend session alive through a [`backends::PlaybackBackend`].

pub mod backends;
pub mod config;
pub mod constants;
pub mod models;
pub mod player;
pub mod services;
pub mod ui;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use models::{FatalReason, PlaybackBootstrap, Policy, VideoMeta};
pub use player::{HostCallbacks, PlaybackController, PlaybackOptions, PlayerHandle};
