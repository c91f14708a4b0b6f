use thiserror::Error;

/// Failures surfaced while constructing a controller or its collaborators.
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}
