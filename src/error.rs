//! Error types for chronam-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error variants (HTTP status, rate limiting, corpus state)
//! - Retryability classification for the request executor (see [`crate::retry`])
//! - Context information (URL, file path, attempt counts)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chronam-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chronam-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "data_dir")
        key: Option<String>,
    },

    /// Network error (connection, timeout, transport)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server responded with an unexpected HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// The HTTP status code returned by the server
        status: u16,
        /// The URL that produced the status
        url: String,
    },

    /// Server responded with 429 Too Many Requests
    #[error("rate limited by {url}")]
    RateLimited {
        /// The URL that rate-limited us
        url: String,
        /// Parsed Retry-After header value in seconds, if the server sent one
        retry_after: Option<f64>,
    },

    /// All retry attempts were consumed without a definitive error
    #[error("request failed after {attempts} attempts")]
    RetriesExhausted {
        /// Total number of attempts made (initial try plus retries)
        attempts: u32,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Corpus metadata file exists but could not be parsed
    #[error("corrupt corpus state at {path}: {message}")]
    CorruptState {
        /// Path to the unreadable metadata file
        path: PathBuf,
        /// What went wrong while parsing it
        message: String,
    },

    /// Text service response carried no usable full text
    #[error("no full text in response from {url}")]
    MissingFullText {
        /// The text service URL that was queried
        url: String,
    },
}
