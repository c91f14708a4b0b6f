pub mod dispatcher;
pub mod event_batcher;
pub mod session;

pub use dispatcher::{BackendCall, BackendDispatcher, BackendOutcome};
pub use event_batcher::EventBatcher;
pub use session::{SessionLifecycle, SessionState};
