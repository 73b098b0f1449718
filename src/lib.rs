//! # chronam-dl
//!
//! Resumable corpus downloader for the Library of Congress Chronicling
//! America newspaper archive.
//!
//! ## Design Philosophy
//!
//! chronam-dl is designed to be:
//! - **Polite** - One request in flight at a time, a courtesy delay before
//!   every request, exponential backoff that honors `Retry-After`
//! - **Resumable** - Page files and corpus metadata are checkpointed as work
//!   completes; an interrupted run picks up where it stopped without
//!   re-fetching anything already on disk
//! - **Forgiving** - A malformed search record or a missing file variant is
//!   logged and skipped, never fatal to the run
//! - **Library-first** - The binary is a thin CLI over the crate
//!
//! ## Quick Start
//!
//! ```no_run
//! use chronam_dl::{Config, CorpusDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chronam_dl::Error> {
//!     let config = Config {
//!         corpus: "prohibition_1920s".to_string(),
//!         query: "prohibition".to_string(),
//!         max_pages: 150,
//!         ..Config::default()
//!     };
//!
//!     let downloader = CorpusDownloader::new(config)?;
//!     let stats = downloader.run().await?;
//!
//!     println!(
//!         "downloaded {}, skipped {}, partial {}",
//!         stats.downloaded, stats.skipped, stats.partial
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client with retry semantics
pub mod client;
/// Configuration types
pub mod config;
/// File resolution and the download pipeline
pub mod download;
/// Error types
pub mod error;
/// Search API wire types and normalization
pub mod record;
/// Retry logic with exponential backoff
pub mod retry;
/// Paginated search walking
pub mod search;
/// Corpus metadata persistence
pub mod state;
/// Core types
pub mod types;

// Re-export commonly used types
pub use client::ArchiveClient;
pub use config::{Config, Endpoints, HttpConfig, RetryConfig};
pub use download::CorpusDownloader;
pub use error::{Error, Result};
pub use search::search_pages;
pub use state::CorpusState;
pub use types::{Format, Page, PageFiles, PageId, RunStats};

/// Wait for a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The CLI races this against the running pipeline and cancels the
/// downloader's token when it completes, so the run stops at the next page
/// boundary with all checkpointed work preserved.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

/// Wait for a termination signal (non-Unix fallback).
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
