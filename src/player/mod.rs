pub mod attacher;
pub mod controller;
pub mod controls_visibility;
pub mod gestures;
pub mod hotkeys;
pub mod leave_progress;
pub mod progress_tracker;
pub mod seek_guard;
pub mod speed_governor;
pub mod traits;
pub mod types;

pub use attacher::StreamAttacher;
pub use controller::{
    ControllerSnapshot, HostCallbacks, PlaybackController, PlaybackOptions, PlayerCommand,
    PlayerHandle,
};
pub use gestures::{GestureDisambiguator, GestureIntent};
pub use hotkeys::Key;
pub use leave_progress::LeaveProgress;
pub use traits::{Demuxer, DemuxerFactory, MediaSink, NativeOnly};
pub use types::{
    AttachError, AttachMode, DemuxerErrorReport, PointerInput, SinkEvent, StageRect,
    StreamFailure,
};
