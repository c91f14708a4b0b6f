use tracing::{debug, info, warn};
use url::Url;

use super::traits::{Demuxer, DemuxerFactory, MediaSink};
use super::types::{AttachError, AttachMode};
use crate::config::StreamConfig;
use crate::constants::NATIVE_HLS_MIME_TYPES;

/// Makes `raw` absolute. Relative paths are joined onto `api_base`.
pub fn resolve_play_url(raw: Option<&str>, api_base: &str) -> Result<Url, AttachError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AttachError::MissingUrl);
    }

    if let Ok(url) = Url::parse(raw) {
        return Ok(url);
    }

    let base = api_base.trim().trim_end_matches('/');
    let joined = if raw.starts_with('/') {
        format!("{}{}", base, raw)
    } else {
        format!("{}/{}", base, raw)
    };

    Url::parse(&joined).map_err(|_| AttachError::InvalidUrl(joined))
}

/// Binds a stream URL to the sink, natively when possible.
///
/// Owns at most one demuxer. Every attach tears the previous demuxer down first.
pub struct StreamAttacher {
    api_base: String,
    stream: StreamConfig,
    demuxers: Box<dyn DemuxerFactory>,
    demuxer: Option<Box<dyn Demuxer>>,
    mode: Option<AttachMode>,
    url: Option<Url>,
}

impl std::fmt::Debug for StreamAttacher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAttacher")
            .field("mode", &self.mode)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("has_demuxer", &self.demuxer.is_some())
            .finish()
    }
}

impl StreamAttacher {
    pub fn new(
        api_base: impl Into<String>,
        stream: StreamConfig,
        demuxers: Box<dyn DemuxerFactory>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            stream,
            demuxers,
            demuxer: None,
            mode: None,
            url: None,
        }
    }

    pub fn mode(&self) -> Option<AttachMode> {
        self.mode
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn has_demuxer(&self) -> bool {
        self.demuxer.is_some()
    }

    pub fn attach(
        &mut self,
        sink: &mut dyn MediaSink,
        raw_url: Option<&str>,
    ) -> Result<AttachMode, AttachError> {
        self.detach(sink);

        let url = resolve_play_url(raw_url, &self.api_base)?;

        let native = NATIVE_HLS_MIME_TYPES
            .iter()
            .any(|mime| sink.can_play_type(mime));

        let mode = if native {
            set_sink_source(sink, &url)?;
            AttachMode::Native
        } else if self.demuxers.is_supported() {
            match self.bind_demuxer(sink, &url) {
                Ok(demuxer) => {
                    self.demuxer = Some(demuxer);
                    AttachMode::Demuxer
                }
                Err(e) => {
                    warn!("Demuxer attach failed, falling back to direct source: {}", e);
                    set_sink_source(sink, &url)?;
                    AttachMode::DirectFallback
                }
            }
        } else {
            debug!("No demuxer available, handing URL to the sink directly");
            set_sink_source(sink, &url)?;
            AttachMode::DirectFallback
        };

        info!("Attached {} via {:?}", url, mode);
        self.mode = Some(mode);
        self.url = Some(url);
        Ok(mode)
    }

    /// Releases the current binding and clears the sink source.
    pub fn detach(&mut self, sink: &mut dyn MediaSink) {
        if self.mode.is_none() && self.demuxer.is_none() {
            return;
        }

        if let Err(e) = sink.pause() {
            debug!("Pause before detach failed: {}", e);
        }
        self.destroy();
        if let Err(e) = sink.set_source(None) {
            debug!("Clearing sink source failed: {}", e);
        }
        self.mode = None;
        self.url = None;
    }

    /// Destroys the demuxer, if any. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if let Some(mut demuxer) = self.demuxer.take() {
            debug!("Destroying demuxer");
            demuxer.destroy();
        }
    }

    fn bind_demuxer(
        &mut self,
        sink: &mut dyn MediaSink,
        url: &Url,
    ) -> anyhow::Result<Box<dyn Demuxer>> {
        let mut demuxer = self.demuxers.create(&self.stream)?;
        let bound = demuxer
            .load_source(url)
            .and_then(|_| demuxer.attach_media(sink));
        if let Err(e) = bound {
            demuxer.destroy();
            return Err(e);
        }
        Ok(demuxer)
    }
}

fn set_sink_source(sink: &mut dyn MediaSink, url: &Url) -> Result<(), AttachError> {
    sink.set_source(Some(url))
        .map_err(|e| AttachError::InvalidUrl(format!("{}: {}", url, e)))
}
