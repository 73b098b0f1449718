//! Core types for chronam-dl

use serde::{Deserialize, Serialize};

/// One of the four file variants available for every newspaper page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Rendered document (PDF)
    Pdf,
    /// Scanned page image (JPEG 2000)
    Jp2,
    /// Recognized OCR text (plain text via the text service)
    Txt,
    /// Structured OCR markup (ALTO XML)
    Xml,
}

impl Format {
    /// Every format in download order: storage-served binaries first,
    /// the text service last
    pub const ALL: [Format; 4] = [Format::Pdf, Format::Jp2, Format::Xml, Format::Txt];

    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Jp2 => "jp2",
            Format::Txt => "txt",
            Format::Xml => "xml",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Composite identity of a newspaper page
///
/// Formatted as `{lccn}/{date}/ed-{edition}/seq-{sequence}`. This is the sole
/// deduplication key across runs, for both search-driven and metadata-driven
/// fetch passes. Derivable from descriptor fields alone, so it stays stable
/// across repeated searches.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Build the identity from its component fields
    pub fn new(lccn: &str, date: &str, edition: u32, sequence: u32) -> Self {
        Self(format!("{lccn}/{date}/ed-{edition}/seq-{sequence}"))
    }

    /// The identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Recorded locations of a page's four file variants
///
/// Each field holds the corpus-relative path (`pages/<name>.<ext>`) once the
/// variant is on disk, or `None` while it is absent. A page is complete when
/// all four are present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFiles {
    /// Rendered document
    pub pdf: Option<String>,
    /// Scanned image
    pub jp2: Option<String>,
    /// Recognized text
    pub txt: Option<String>,
    /// Structured markup
    pub xml: Option<String>,
}

impl PageFiles {
    /// Recorded path for one format
    pub fn get(&self, format: Format) -> Option<&str> {
        match format {
            Format::Pdf => self.pdf.as_deref(),
            Format::Jp2 => self.jp2.as_deref(),
            Format::Txt => self.txt.as_deref(),
            Format::Xml => self.xml.as_deref(),
        }
    }

    /// Record (or clear) the path for one format
    pub fn set(&mut self, format: Format, path: Option<String>) {
        match format {
            Format::Pdf => self.pdf = path,
            Format::Jp2 => self.jp2 = path,
            Format::Txt => self.txt = path,
            Format::Xml => self.xml = path,
        }
    }

    /// True when all four variants are recorded
    pub fn is_complete(&self) -> bool {
        Format::ALL.iter().all(|f| self.get(*f).is_some())
    }

    /// Number of variants recorded
    pub fn present_count(&self) -> usize {
        Format::ALL.iter().filter(|f| self.get(**f).is_some()).count()
    }
}

/// Descriptor of one digitized newspaper page
///
/// Produced by the search-result normalizer, merged into corpus state by
/// identity, and persisted to `metadata.json`. The transient `ocr_text`
/// carried in search results never reaches disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Composite identity (see [`PageId`])
    pub page_id: PageId,
    /// Newspaper title
    pub newspaper_title: String,
    /// Library of Congress Control Number of the newspaper
    pub lccn: String,
    /// Publication date as reported by the archive
    pub date: String,
    /// Edition number within the publication day
    pub edition: u32,
    /// Page sequence number within the edition
    pub sequence: u32,
    /// US state of publication
    pub state: String,
    /// City of publication
    pub city: String,
    /// Storage path fragment shared by this page's files
    pub batch_path: String,
    /// Archive item URL
    pub url: String,
    /// Recorded file variants
    #[serde(default)]
    pub files: PageFiles,
    /// OCR text snippet from the search result; kept in memory only
    #[serde(skip)]
    pub ocr_text: String,
}

impl Page {
    /// The page's composite identity
    pub fn id(&self) -> &PageId {
        &self.page_id
    }

    /// Base file name shared by this page's variants, without extension
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_ed-{}_seq-{}",
            self.lccn, self.date, self.edition, self.sequence
        )
    }
}

/// Counters reported at the end of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Pages with all four variants present after this run's attempts
    pub downloaded: usize,
    /// Pages with some but not all variants present
    pub partial: usize,
    /// Pages already complete before this run (no requests made)
    pub skipped: usize,
    /// Pages with no variants present after attempts
    pub failed: usize,
}

impl RunStats {
    /// Total pages this run looked at
    pub fn processed(&self) -> usize {
        self.downloaded + self.partial + self.skipped + self.failed
    }
}
