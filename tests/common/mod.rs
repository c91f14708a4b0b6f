pub mod builders;
pub mod mocks;

use proctored_player::config::Config;
use proctored_player::models::{DeviceId, FatalReason, PlaybackBootstrap, VideoMeta};
use proctored_player::player::{
    DemuxerFactory, HostCallbacks, LeaveProgress, NativeOnly, PlaybackController,
    PlaybackOptions, PlayerHandle,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use mocks::{MockBackend, MockSink, SinkState};

pub const VIDEO_ID: i64 = 7;
pub const ENROLLMENT_ID: i64 = 42;

/// A controller running its own event loop against mock collaborators.
pub struct Harness {
    pub handle: PlayerHandle,
    pub sink: Arc<Mutex<SinkState>>,
    pub backend: Arc<MockBackend>,
    pub fatals: Arc<Mutex<Vec<FatalReason>>>,
    pub leaves: Arc<Mutex<Vec<LeaveProgress>>>,
    task: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn spawn(bootstrap: PlaybackBootstrap) -> Self {
        Self::spawn_with(bootstrap, Config::default(), true, Box::new(NativeOnly))
    }

    pub fn spawn_with(
        bootstrap: PlaybackBootstrap,
        config: Config,
        native: bool,
        demuxers: Box<dyn DemuxerFactory>,
    ) -> Self {
        let sink = MockSink::new(native);
        let sink_state = Arc::clone(&sink.state);
        let backend = Arc::new(MockBackend::new());
        let fatals = Arc::new(Mutex::new(Vec::new()));
        let leaves = Arc::new(Mutex::new(Vec::new()));

        let callbacks = {
            let fatals = Arc::clone(&fatals);
            let leaves = Arc::clone(&leaves);
            HostCallbacks::new()
                .on_fatal(move |reason| fatals.lock().unwrap().push(reason))
                .on_leave_progress(move |progress| leaves.lock().unwrap().push(progress))
        };

        let (handle, controller) = PlaybackController::new(
            PlaybackOptions {
                video: VideoMeta::new(VIDEO_ID, "Organic Chemistry 3"),
                bootstrap,
                enrollment_id: Some(ENROLLMENT_ID),
                device_id: DeviceId::new("5b1e7c44-1d2a-4f3e-9a8b-0c6d5e4f3a21"),
            },
            Box::new(sink),
            backend.clone(),
            demuxers,
            config,
            callbacks,
        );
        let task = tokio::spawn(controller.run());

        Self {
            handle,
            sink: sink_state,
            backend,
            fatals,
            leaves,
            task: Some(task),
        }
    }

    /// Lets every ready task run and paused time move forward by `by`.
    pub async fn advance(&self, by: Duration) {
        tokio::time::sleep(by).await;
    }

    pub fn fatals(&self) -> Vec<FatalReason> {
        self.fatals.lock().unwrap().clone()
    }

    pub fn leaves(&self) -> Vec<LeaveProgress> {
        self.leaves.lock().unwrap().clone()
    }

    /// Unmounts and waits for the event loop, including its shutdown grace, to finish.
    pub async fn shutdown(&mut self) {
        self.handle.unmount();
        if let Some(task) = self.task.take() {
            task.await.expect("controller task panicked");
        }
    }
}
