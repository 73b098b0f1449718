//! Corpus state: the accumulating metadata document and its persistence
//!
//! One corpus owns one `metadata.json`. Pages live in an identity-keyed
//! index that only ever grows; re-downloading a page overwrites its entry in
//! place. Saves go through a temporary sibling file and an atomic rename so
//! an interrupted run never leaves a torn document behind.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{Page, PageId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Owned shape of `metadata.json`, used when loading prior state
#[derive(Debug, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    pages: Vec<Page>,
}

/// Borrowed shape of `metadata.json`, used when persisting
#[derive(Serialize)]
struct MetadataDocument<'a> {
    corpus: &'a str,
    search_query: &'a str,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    state_filter: Option<&'a str>,
    total_pages: usize,
    pages: &'a [Page],
}

/// Every page ever recorded for a corpus, indexed by identity
///
/// Pages keep first-seen order so the persisted array stays stable across
/// runs; merging an existing identity overwrites in place. Entries are never
/// removed.
#[derive(Debug, Default)]
pub struct CorpusState {
    pages: Vec<Page>,
    index: HashMap<PageId, usize>,
}

impl CorpusState {
    /// Load prior corpus state from `path`
    ///
    /// A missing file yields an empty state (first run). A file that exists
    /// but cannot be parsed is fatal: a run must not silently overwrite a
    /// corpus another run spent hours building.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptState`] for unparsable content and
    /// [`Error::Io`] for any other read failure.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let file: MetadataFile =
            serde_json::from_slice(&raw).map_err(|e| Error::CorruptState {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut state = Self::default();
        for page in file.pages {
            state.merge(page);
        }

        tracing::info!(existing = state.len(), "Loaded prior corpus state");
        Ok(state)
    }

    /// The recorded page for an identity, if any
    pub fn get(&self, id: &PageId) -> Option<&Page> {
        self.index.get(id).map(|&i| &self.pages[i])
    }

    /// Insert a page, or overwrite the existing entry with the same identity
    pub fn merge(&mut self, page: Page) {
        match self.index.get(page.id()) {
            Some(&i) => self.pages[i] = page,
            None => {
                self.index.insert(page.id().clone(), self.pages.len());
                self.pages.push(page);
            }
        }
    }

    /// Number of distinct pages recorded
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when no pages are recorded yet
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// All recorded pages in stable order
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter()
    }

    /// Pages still missing at least one file variant
    ///
    /// Drives the metadata-driven refetch pass; the descriptors are cloned
    /// so the pass can merge updated entries back in.
    pub fn incomplete_pages(&self) -> Vec<Page> {
        self.pages
            .iter()
            .filter(|p| !p.files.is_complete())
            .cloned()
            .collect()
    }

    /// Persist the full metadata document to `path`
    ///
    /// Writes a pretty-printed document to a temporary sibling and renames
    /// it over the target, so readers only ever observe a complete file.
    /// Called after every processed page and once at run end; the run
    /// parameters are stamped in every time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the temporary file cannot be written or
    /// renamed into place.
    pub async fn save(&self, path: &Path, config: &Config) -> Result<()> {
        let document = MetadataDocument {
            corpus: &config.corpus,
            search_query: &config.query,
            start_date: config.start_date,
            end_date: config.end_date,
            state_filter: config.state_filter.as_deref(),
            total_pages: self.pages.len(),
            pages: &self.pages,
        };
        let encoded = serde_json::to_vec_pretty(&document)?;

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &encoded).await?;
        tokio::fs::rename(&tmp_path, path).await?;

        Ok(())
    }
}
