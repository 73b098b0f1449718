//! Command-line entry point for chronam-dl.
//!
//! Parses the run parameters, initializes tracing, wires termination signals
//! to the pipeline's cancellation token, and maps outcomes to exit codes:
//! `0` on success, `1` on startup or run failure, `130` on user interrupt.

use chronam_dl::{Config, CorpusDownloader, RetryConfig, wait_for_signal};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

/// Download historical newspaper pages from Chronicling America.
///
/// Searches the Library of Congress Chronicling America collection and
/// downloads all four file variants per matching page (PDF, JP2, OCR text,
/// ALTO XML) into a local corpus directory. Re-running the same command
/// resumes where the previous run stopped.
///
/// # Examples
///
/// ```sh
/// chronam-dl "prohibition" --corpus prohibition_1920s \
///     --start-date 1920-01-01 --end-date 1929-12-31 --max-pages 150
///
/// chronam-dl "influenza epidemic" --corpus spanish_flu_1918 \
///     --start-date 1918-01-01 --end-date 1919-12-31
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Search query passed through to the archive verbatim
    query: String,

    /// Corpus name, becomes the directory under the data dir
    #[arg(long)]
    corpus: String,

    /// Maximum number of newspaper pages to collect
    #[arg(long, default_value_t = 150)]
    max_pages: usize,

    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Latest publication date (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Restrict results to one US state
    #[arg(long)]
    state: Option<String>,

    /// Root directory for corpus storage
    #[arg(long, default_value = "./data", env = "CHRONAM_DATA_DIR")]
    data_dir: PathBuf,

    /// Courtesy delay between requests, in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Skip searching; re-attempt the missing files of pages already
    /// recorded in corpus metadata
    #[arg(long)]
    retry_incomplete: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config, String> {
        let mut retry = RetryConfig::default();
        if let Some(delay) = self.delay {
            retry.base_delay = Duration::try_from_secs_f64(delay)
                .map_err(|_| format!("--delay must be a non-negative number, got {delay}"))?;
        }

        Ok(Config {
            corpus: self.corpus,
            query: self.query,
            start_date: self.start_date,
            end_date: self.end_date,
            state_filter: self.state,
            max_pages: self.max_pages,
            data_dir: self.data_dir,
            retry_incomplete: self.retry_incomplete,
            retry,
            ..Config::default()
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt().with_env_filter(filter).with_target(false).init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(message) => {
            error!("{message}");
            return ExitCode::from(1);
        }
    };

    let downloader = match CorpusDownloader::new(config) {
        Ok(downloader) => downloader,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return ExitCode::from(1);
        }
    };

    let cancel = downloader.cancellation_token();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        warn!("Interrupted. Progress saved. Re-run to resume.");
        signal_cancel.cancel();
    });

    match downloader.run().await {
        Ok(_) if cancel.is_cancelled() => ExitCode::from(130),
        Ok(_) => {
            info!("Download complete!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            ExitCode::from(1)
        }
    }
}
