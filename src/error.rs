use thiserror::Error;

/// Errors surfaced by the inspection engine.
///
/// Only transport and input-decoding failures end up here. Unknown stream records,
/// taps that miss every element and cancelled runs are handled in place.
#[derive(Debug, Error)]
pub enum InspectorError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend {endpoint} returned {status}: {detail}")]
    Backend {
        endpoint: String,
        status: u16,
        detail: String,
    },

    #[error("invalid hierarchy payload: {0}")]
    InvalidHierarchy(#[from] serde_json::Error),

    #[error("invalid hierarchy dump: {0}")]
    InvalidDump(String),

    #[error("invalid device info: {0}")]
    InvalidDeviceInfo(String),

    #[error("invalid execution stream: {0}")]
    InvalidStream(String),

    #[error("step failed: {0}")]
    StepFailed(String),

    #[error("invalid config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InspectorError>;
