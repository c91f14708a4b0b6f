use anyhow::Result;
use async_trait::async_trait;
use proctored_player::backends::{BackendError, EventBatch, PlaybackBackend};
use proctored_player::config::StreamConfig;
use proctored_player::models::SessionToken;
use proctored_player::player::{Demuxer, DemuxerFactory, MediaSink};
use std::sync::{Arc, Mutex};
use url::Url;

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
    pub seeks: Vec<f64>,
    pub rate_writes: Vec<f64>,
}

impl Default for SinkState {
    fn default() -> Self {
        Self {
            native: true,
            source: None,
            paused: true,
            current_time: 0.0,
            duration: None,
            rate: 1.0,
            volume: 1.0,
            muted: false,
            play_calls: 0,
            seeks: Vec::new(),
            rate_writes: Vec::new(),
        }
    }
}

/// Media sink whose state the test inspects and tweaks directly.
pub struct MockSink {
    pub state: Arc<Mutex<SinkState>>,
}

impl MockSink {
    pub fn new(native: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                native,
                ..SinkState::default()
            })),
        }
    }
}

impl MediaSink for MockSink {
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
        self.state.lock().unwrap().paused = true;
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

#[derive(Debug, Clone, Copy, Default, PartialEq)]
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

#[derive(Debug, Default)]
pub struct MockBackend {
    calls: Mutex<CallCounts>,
    batches: Mutex<Vec<EventBatch>>,
    heartbeat_error: Mutex<Option<BackendError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_heartbeat_error(&self, error: BackendError) {
        *self.heartbeat_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }

    pub fn batches(&self) -> Vec<EventBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlaybackBackend for MockBackend {
    async fn heartbeat(&self, _token: &SessionToken) -> Result<(), BackendError> {
        self.calls.lock().unwrap().heartbeats += 1;
        match self.heartbeat_error.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn refresh(&self, _token: &SessionToken) -> Result<(), BackendError> {
        self.calls.lock().unwrap().refreshes += 1;
        Ok(())
    }

    async fn end(&self, _token: &SessionToken) -> Result<(), BackendError> {
        self.calls.lock().unwrap().ends += 1;
        Ok(())
    }

    async fn submit_events(&self, batch: &EventBatch) -> Result<(), BackendError> {
        self.calls.lock().unwrap().submissions += 1;
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemuxerLog {
    pub loaded: Option<String>,
    pub attached: u32,
    pub destroyed: u32,
}

pub struct MockDemuxerFactory {
    pub log: Arc<Mutex<DemuxerLog>>,
}

impl MockDemuxerFactory {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(DemuxerLog::default())),
        }
    }
}

impl DemuxerFactory for MockDemuxerFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self, _config: &StreamConfig) -> Result<Box<dyn Demuxer>> {
        Ok(Box::new(MockDemuxer {
            log: Arc::clone(&self.log),
        }))
    }
}

struct MockDemuxer {
    log: Arc<Mutex<DemuxerLog>>,
}

impl Demuxer for MockDemuxer {
    fn load_source(&mut self, url: &Url) -> Result<()> {
        self.log.lock().unwrap().loaded = Some(url.to_string());
        Ok(())
    }

    fn attach_media(&mut self, _sink: &mut dyn MediaSink) -> Result<()> {
        self.log.lock().unwrap().attached += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().destroyed += 1;
    }
}
