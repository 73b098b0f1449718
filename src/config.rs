//! Configuration types for chronam-dl

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Retry configuration for transient failures
///
/// The same base delay serves two purposes: it is slept once before every
/// first attempt as a courtesy to the archive's rate limits, and it seeds the
/// exponential backoff schedule used between retries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try (default: 8)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Courtesy delay before every first attempt, and the initial backoff
    /// delay (default: 0.5 seconds)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Maximum delay between retries (default: 300 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            backoff_factor: default_backoff_factor(),
            jitter: true,
        }
    }
}

/// HTTP client configuration (timeout, identification)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout applied to every request (default: 120 seconds)
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Archive endpoint URLs
///
/// Defaults point at the Library of Congress production services. Overridable
/// so tests can target a local mock server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Endpoints {
    /// Collection search API base URL
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Storage service base URL for PDF/JP2/XML files
    #[serde(default = "default_storage_url")]
    pub storage_url: String,

    /// Word-coordinates text service URL for OCR full text
    #[serde(default = "default_text_url")]
    pub text_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            storage_url: default_storage_url(),
            text_url: default_text_url(),
        }
    }
}

/// Main configuration for a corpus download run
///
/// Fields are organized into logical sub-configs:
/// - [`retry`](RetryConfig) — backoff schedule and attempt budget
/// - [`http`](HttpConfig) — client timeout and identification
/// - [`endpoints`](Endpoints) — archive service URLs
///
/// Sub-config fields are flattened for serialization, so the JSON format
/// stays flat (no nesting).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Corpus name — becomes the directory under `data_dir`
    pub corpus: String,

    /// Search query passed through to the archive verbatim
    #[serde(default)]
    pub query: String,

    /// Earliest publication date to include
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Latest publication date to include
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// Restrict results to one US state (matched case-insensitively)
    #[serde(default)]
    pub state_filter: Option<String>,

    /// Maximum number of newspaper pages to collect (default: 150)
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Root directory for corpus storage (default: "./data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Skip the search phase and re-attempt missing files of pages already
    /// recorded in corpus metadata (default: false)
    #[serde(default)]
    pub retry_incomplete: bool,

    /// Backoff schedule and attempt budget
    #[serde(flatten, default)]
    pub retry: RetryConfig,

    /// HTTP client settings
    #[serde(flatten, default)]
    pub http: HttpConfig,

    /// Archive service URLs
    #[serde(flatten, default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Directory holding this corpus: `<data_dir>/<corpus>`
    pub fn corpus_dir(&self) -> PathBuf {
        self.data_dir.join(&self.corpus)
    }

    /// Directory holding downloaded page files: `<data_dir>/<corpus>/pages`
    pub fn pages_dir(&self) -> PathBuf {
        self.corpus_dir().join("pages")
    }

    /// Path of the accumulating corpus metadata file
    pub fn metadata_path(&self) -> PathBuf {
        self.corpus_dir().join("metadata.json")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus: String::new(),
            query: String::new(),
            start_date: None,
            end_date: None,
            state_filter: None,
            max_pages: default_max_pages(),
            data_dir: default_data_dir(),
            retry_incomplete: false,
            retry: RetryConfig::default(),
            http: HttpConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

fn default_max_retries() -> u32 {
    8
}

fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(300)
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_user_agent() -> String {
    "chronam-dl/0.2 (historical research)".to_string()
}

fn default_search_url() -> String {
    "https://www.loc.gov/collections/chronicling-america/".to_string()
}

fn default_storage_url() -> String {
    "https://tile.loc.gov/storage-services/service".to_string()
}

fn default_text_url() -> String {
    "https://tile.loc.gov/text-services/word-coordinates-service".to_string()
}

fn default_max_pages() -> usize {
    150
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

// Duration serialization helper (fractional seconds, so 0.5s survives)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
