#![cfg(test)]

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::backends::{BackendError, EventBatch, PlaybackBackend};
use crate::config::StreamConfig;
use crate::models::SessionToken;
use crate::player::traits::{Demuxer, DemuxerFactory, MediaSink};

/// Observable state of a [`RecordingSink`].
#[derive(Debug, Clone)]
pub struct SinkState {
    pub native: bool,
    pub source: Option<String>,
    pub paused: bool,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub rate: f64,
    pub volume: f64,
    pub muted: bool,
    pub play_calls: u32,
    pub pause_calls: u32,
    /// Every position written through `set_current_time`, in order.
    pub seeks: Vec<f64>,
    /// Every rate written through `set_playback_rate`, in order.
    pub rate_writes: Vec<f64>,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            native: false,
            source: None,
            paused: true,
            current_time: 0.0,
            duration: None,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            play_calls: 0,
            pause_calls: 0,
            seeks: Vec::new(),
            rate_writes: Vec::new(),
        }
    }
}

/// Media sink that records every call into shared state.
#[derive(Debug)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new(native: bool) -> (Self, Arc<Mutex<SinkState>>) {
        let state = Arc::new(Mutex::new(SinkState {
            native,
            ..SinkState::default()
        }));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl MediaSink for RecordingSink {
    fn can_play_type(&self, _mime: &str) -> bool {
        self.state.lock().unwrap().native
    }

    fn set_source(&mut self, url: Option<&Url>) -> Result<()> {
        self.state.lock().unwrap().source = url.map(|u| u.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.play_calls += 1;
        state.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.pause_calls += 1;
        state.paused = true;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.state.lock().unwrap().paused
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().current_time
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.current_time = seconds;
        state.seeks.push(seconds);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().unwrap().duration
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().unwrap().rate
    }

    fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.rate = rate;
        state.rate_writes.push(rate);
        Ok(())
    }

    fn set_volume(&mut self, volume: f64) -> Result<()> {
        self.state.lock().unwrap().volume = volume;
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.state.lock().unwrap().muted = muted;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallCounts {
    pub heartbeats: u32,
    pub refreshes: u32,
    pub ends: u32,
    pub submissions: u32,
}

impl CallCounts {
    pub fn total(&self) -> u32 {
        self.heartbeats + self.refreshes + self.ends + self.submissions
    }
}

/// In-memory backend that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<CallCounts>,
    batches: Mutex<Vec<EventBatch>>,
    tokens: Mutex<Vec<SessionToken>>,
    heartbeat_error: Mutex<Option<BackendError>>,
    refresh_error: Mutex<Option<BackendError>>,
    events_error: Mutex<Option<BackendError>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_heartbeat(&self, error: BackendError) {
        *self.heartbeat_error.lock().unwrap() = Some(error);
    }

    pub fn fail_refresh(&self, error: BackendError) {
        *self.refresh_error.lock().unwrap() = Some(error);
    }

    pub fn fail_events(&self, error: BackendError) {
        *self.events_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<EventBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// Tokens seen by every call, in order.
    pub fn tokens(&self) -> Vec<SessionToken> {
        self.tokens.lock().unwrap().clone()
    }

    fn respond(
        &self,
        token: &SessionToken,
        error: &Mutex<Option<BackendError>>,
    ) -> Result<(), BackendError> {
        self.tokens.lock().unwrap().push(token.clone());
        match error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlaybackBackend for RecordingBackend {
    async fn heartbeat(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.calls.lock().unwrap().heartbeats += 1;
        self.respond(token, &self.heartbeat_error)
    }

    async fn refresh(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.calls.lock().unwrap().refreshes += 1;
        self.respond(token, &self.refresh_error)
    }

    async fn end(&self, token: &SessionToken) -> Result<(), BackendError> {
        self.calls.lock().unwrap().ends += 1;
        self.tokens.lock().unwrap().push(token.clone());
        Ok(())
    }

    async fn submit_events(&self, batch: &EventBatch) -> Result<(), BackendError> {
        self.calls.lock().unwrap().submissions += 1;
        self.batches.lock().unwrap().push(batch.clone());
        self.respond(&batch.token, &self.events_error)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemuxerState {
    pub created: u32,
    pub loaded: Option<String>,
    pub attached: u32,
    pub destroyed: u32,
}

#[derive(Debug)]
pub struct RecordingDemuxerFactory {
    supported: bool,
    state: Arc<Mutex<DemuxerState>>,
}

impl RecordingDemuxerFactory {
    pub fn new(supported: bool) -> (Self, Arc<Mutex<DemuxerState>>) {
        let state = Arc::new(Mutex::new(DemuxerState::default()));
        (
            Self {
                supported,
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl DemuxerFactory for RecordingDemuxerFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, _config: &StreamConfig) -> Result<Box<dyn Demuxer>> {
        self.state.lock().unwrap().created += 1;
        Ok(Box::new(RecordingDemuxer {
            state: Arc::clone(&self.state),
        }))
    }
}

struct RecordingDemuxer {
    state: Arc<Mutex<DemuxerState>>,
}

impl Demuxer for RecordingDemuxer {
    fn load_source(&mut self, url: &Url) -> Result<()> {
        self.state.lock().unwrap().loaded = Some(url.to_string());
        Ok(())
    }

    fn attach_media(&mut self, _sink: &mut dyn MediaSink) -> Result<()> {
        self.state.lock().unwrap().attached += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        self.state.lock().unwrap().destroyed += 1;
    }
}
