// Wire and playback constants shared across the controller.

// === Session API ===
pub const HEARTBEAT_PATH: &str = "/api/v1/videos/playback/heartbeat/";
pub const REFRESH_PATH: &str = "/api/v1/videos/playback/refresh/";
pub const END_PATH: &str = "/api/v1/videos/playback/end/";
pub const EVENTS_PATH: &str = "/api/v1/videos/playback/events/";

// === Stream attachment ===
/// MIME types probed on the sink before falling back to the software demuxer.
pub const NATIVE_HLS_MIME_TYPES: [&str; 2] =
    ["application/vnd.apple.mpegurl", "application/x-mpegURL"];

// === Playback rate ===
pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const RATE_MENU: [f64; 13] = [
    0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 8.0, 10.0, 16.0,
];

// === Progress ===
/// Backward movement larger than this counts as a jump rather than jitter.
pub const BACKWARD_JUMP_THRESHOLD_SECS: f64 = 0.15;
/// Playback within this distance of the end counts as completed.
pub const COMPLETION_TOLERANCE_SECS: f64 = 0.5;

// === Keyboard ===
pub const ARROW_SKIP_SECS: f64 = 5.0;
pub const JL_SKIP_SECS: f64 = 10.0;

// === Render surface ===
pub const WATERMARK_BRAND: &str = "proctored";
