/// Error types for sensor API requests
use thiserror::Error;

/// Why a sensor API request produced no payload.
#[derive(Error, Debug)]
pub enum SensorError {
    /// Request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any non-2xx response
    #[error("Bad response status from {url}: {status}")]
    Status { url: String, status: u16 },

    /// Body was not the JSON shape the endpoint promises
    #[error("Failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Type alias for Results using SensorError
pub type Result<T> = std::result::Result<T, SensorError>;
