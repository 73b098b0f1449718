//! File resolution and the resumable download pipeline
//!
//! Maps page descriptors to remote URLs and local file names, fetches the
//! four format variants of each page, and drives the whole
//! search-then-download run through [`CorpusDownloader`]. Downloads are
//! idempotent: a variant already on disk is recorded without touching the
//! network, and corpus metadata is checkpointed after every page so an
//! interrupted run resumes where it stopped.

use crate::client::ArchiveClient;
use crate::config::{Config, Endpoints};
use crate::error::{Error, Result};
use crate::search::search_pages;
use crate::state::CorpusState;
use crate::types::{Format, Page, PageFiles, RunStats};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Remote URL serving one format variant of a page
///
/// PDF, JP2, and XML come straight off the storage service keyed by batch
/// path. OCR text has no stored file; it is extracted on demand by the text
/// service from the page's ALTO XML, addressed through the `segment` query
/// parameter.
pub fn remote_url(endpoints: &Endpoints, page: &Page, format: Format) -> String {
    match format {
        Format::Txt => format!(
            "{}?segment=/service/{}.xml&format=alto_xml&full_text=1",
            endpoints.text_url, page.batch_path
        ),
        _ => format!(
            "{}/{}.{}",
            endpoints.storage_url,
            page.batch_path,
            format.extension()
        ),
    }
}

/// Local file name for one format variant of a page
pub fn local_file_name(page: &Page, format: Format) -> String {
    format!("{}.{}", page.file_stem(), format.extension())
}

/// Pull the OCR full text out of a text-service response
///
/// The service answers with a single-key object keyed by the segment path:
/// `{"/service/...xml": {"full_text": "...", ...}}`. Any value carrying a
/// non-empty `full_text` counts; an empty object or an empty string does not.
fn full_text_of(value: &serde_json::Value) -> Option<String> {
    value
        .as_object()?
        .values()
        .filter_map(|entry| entry.get("full_text").and_then(|t| t.as_str()))
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Write a file through a `.part` sibling and an atomic rename
///
/// A process killed mid-write leaves only the `.part` file behind, so the
/// exists-check on the next run never mistakes a truncated file for a
/// completed download.
async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = dest.with_extension("part");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, dest).await?;
    Ok(())
}

/// The search-and-download pipeline for one corpus
///
/// Owns the shared HTTP client, the run configuration, and a cancellation
/// token. One run is strictly sequential: search result pages are walked one
/// at a time, then each collected page's four variants are fetched in a
/// fixed order, one request in flight at any moment.
pub struct CorpusDownloader {
    client: ArchiveClient,
    config: Config,
    cancel: CancellationToken,
}

impl CorpusDownloader {
    /// Build a downloader for the given run configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Build a downloader driven by an externally owned cancellation token
    ///
    /// Cancelling the token stops the run at the next page boundary; work
    /// already checkpointed stays durable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn with_cancellation(config: Config, cancel: CancellationToken) -> Result<Self> {
        let client = ArchiveClient::new(&config.http, config.retry.clone())?;
        Ok(Self {
            client,
            config,
            cancel,
        })
    }

    /// Token that stops this run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute one full run: search, download, checkpoint, summarize
    ///
    /// With `retry_incomplete` set, the search phase is skipped and the run
    /// re-attempts only the missing variants of pages already recorded in
    /// corpus metadata.
    ///
    /// # Errors
    ///
    /// Returns an error for startup failures only: an uncreatable corpus
    /// directory, corrupt prior metadata, or a metadata write failure.
    /// Everything below the page level is absorbed into the run statistics.
    pub async fn run(&self) -> Result<RunStats> {
        let pages_dir = self.config.pages_dir();
        tokio::fs::create_dir_all(&pages_dir).await?;

        let metadata_path = self.config.metadata_path();
        let mut state = CorpusState::load(&metadata_path).await?;

        let pages = if self.config.retry_incomplete {
            let pending = state.incomplete_pages();
            tracing::info!(
                pending = pending.len(),
                "Re-attempting incomplete pages from corpus metadata"
            );
            pending
        } else {
            search_pages(&self.client, &self.config, &self.cancel).await
        };
        tracing::info!(found = pages.len(), "Processing pages");

        let mut stats = RunStats::default();
        for mut page in pages {
            if self.cancel.is_cancelled() {
                tracing::info!("Interrupted, progress saved");
                break;
            }

            if let Some(prior) = state.get(page.id()) {
                if prior.files.is_complete() {
                    stats.skipped += 1;
                    continue;
                }
            }

            page.files = self.download_page_files(&page, &pages_dir).await;
            match page.files.present_count() {
                4 => stats.downloaded += 1,
                0 => stats.failed += 1,
                _ => stats.partial += 1,
            }

            state.merge(page);
            // Checkpoint after every page so an interrupt loses nothing
            state.save(&metadata_path, &self.config).await?;
        }

        state.save(&metadata_path, &self.config).await?;

        tracing::info!(
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            partial = stats.partial,
            failed = stats.failed,
            total = state.len(),
            corpus = %self.config.corpus,
            "Run finished"
        );
        Ok(stats)
    }

    /// Ensure every variant of one page exists locally
    ///
    /// Variants already on disk are recorded without network access. Each
    /// fetch failure is logged and recorded as absent; one variant failing
    /// never aborts the others.
    pub async fn download_page_files(&self, page: &Page, pages_dir: &Path) -> PageFiles {
        let mut files = PageFiles::default();

        for format in Format::ALL {
            let file_name = local_file_name(page, format);
            let dest = pages_dir.join(&file_name);
            let relative = format!("pages/{file_name}");

            if matches!(tokio::fs::try_exists(&dest).await, Ok(true)) {
                files.set(format, Some(relative));
                continue;
            }

            let fetched = match format {
                Format::Txt => self.fetch_text(page, &dest).await,
                _ => self.fetch_binary(page, format, &dest).await,
            };

            match fetched {
                Ok(()) => files.set(format, Some(relative)),
                Err(e) => {
                    tracing::debug!(
                        error = %e,
                        page_id = %page.id(),
                        %format,
                        "Variant download failed"
                    );
                }
            }
        }

        files
    }

    async fn fetch_binary(&self, page: &Page, format: Format, dest: &Path) -> Result<()> {
        let url = remote_url(&self.config.endpoints, page, format);
        let body = self.client.get_bytes(&url, &[]).await?;
        write_atomic(dest, &body).await
    }

    async fn fetch_text(&self, page: &Page, dest: &Path) -> Result<()> {
        let url = remote_url(&self.config.endpoints, page, Format::Txt);
        let body = self.client.get_bytes(&url, &[]).await?;

        let value: serde_json::Value = serde_json::from_slice(&body)?;
        let text = full_text_of(&value).ok_or_else(|| Error::MissingFullText {
            url: url.clone(),
        })?;

        write_atomic(dest, text.as_bytes()).await
    }
}
