pub mod errors;
pub mod http;
pub mod traits;


pub use errors::BackendError;
pub use http::HttpPlaybackBackend;
pub use traits::{EventBatch, PlaybackBackend};
