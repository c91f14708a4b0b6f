use anyhow::Result;
use url::Url;

use crate::config::StreamConfig;

/// Output media element the controller drives.
///
/// Calls are synchronous so that policy corrections land inside the same callback that
/// observed the offending change. Sinks report their own signals back through
/// [`SinkEvent`](super::types::SinkEvent)s.
pub trait MediaSink: Send {
    /// Whether the sink can play the given MIME type natively.
    fn can_play_type(&self, mime: &str) -> bool;
    /// Points the sink at `url`, or clears its source when `None`.
    fn set_source(&mut self, url: Option<&Url>) -> Result<()>;
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64) -> Result<()>;
    fn duration(&self) -> Option<f64>;
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64) -> Result<()>;
    fn set_volume(&mut self, volume: f64) -> Result<()>;
    fn set_muted(&mut self, muted: bool) -> Result<()>;
}

/// Software adaptive-streaming demuxer bound to a sink.
pub trait Demuxer: Send {
    fn load_source(&mut self, url: &Url) -> Result<()>;
    fn attach_media(&mut self, sink: &mut dyn MediaSink) -> Result<()>;
    /// Releases decode contexts. Called exactly once before the instance is dropped.
    fn destroy(&mut self);
}

pub trait DemuxerFactory: Send {
    fn is_supported(&self) -> bool;
    fn create(&self, config: &StreamConfig) -> Result<Box<dyn Demuxer>>;
}

/// Factory for hosts that only have native playback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeOnly;

impl DemuxerFactory for NativeOnly {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(&self, _config: &StreamConfig) -> Result<Box<dyn Demuxer>> {
        Err(anyhow::anyhow!("No software demuxer available"))
    }
}
