//! # Error Types
//!
//! Custom error types for Geo Monitor using `thiserror`.

use thiserror::Error;

/// Main error type for Geo Monitor
#[derive(Debug, Error)]
pub enum GeoMonitorError {
    /// Transport/framing errors on the request/reply channel
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Geo Monitor
pub type Result<T> = std::result::Result<T, GeoMonitorError>;
