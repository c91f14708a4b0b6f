pub mod errors;
pub mod lifecycle;
pub mod time;

pub use errors::PlayerError;
pub use lifecycle::LifecycleGuard;
