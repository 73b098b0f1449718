//! Search API wire types and normalization into page descriptors
//!
//! The archive's search endpoint returns loosely-typed records: most fields
//! arrive as lists of strings that may be missing, empty, or oddly shaped.
//! These types exist only at the ingestion boundary. Records that fail the
//! reject rules are dropped individually so one malformed record cannot end
//! a crawl; everything downstream works with [`Page`].

use crate::types::{Page, PageFiles, PageId};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// One page of search results from the archive
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Raw result records, deserialized individually by [`normalize`]
    #[serde(default)]
    pub results: Vec<serde_json::Value>,

    /// Pagination block; `next` is absent on the last result page
    #[serde(default)]
    pub pagination: Pagination,
}

/// Pagination block of a search response
#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    /// URL of the next result page, if any
    #[serde(default)]
    pub next: Option<String>,
}

impl Pagination {
    /// True when the response points at a further result page
    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|url| !url.is_empty())
    }
}

/// One raw record from the search API
///
/// Every field defaults to empty so partially-populated records still
/// deserialize; [`SearchRecord::into_page`] applies the reject rules.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRecord {
    /// Record type; newspaper pages are `["segment"]`
    #[serde(default, rename = "type")]
    pub record_type: Vec<String>,

    /// IIIF image URLs for the page scan
    #[serde(default)]
    pub image_url: Vec<String>,

    /// LCCN values of the parent newspaper
    #[serde(default)]
    pub number_lccn: Vec<String>,

    /// Publication date
    #[serde(default)]
    pub date: Option<String>,

    /// Edition numbers
    #[serde(default)]
    pub number_edition: Vec<String>,

    /// Page numbers, often zero-padded
    #[serde(default)]
    pub number_page: Vec<String>,

    /// States of publication
    #[serde(default)]
    pub location_state: Vec<String>,

    /// Cities of publication
    #[serde(default)]
    pub location_city: Vec<String>,

    /// Titles of the parent newspaper
    #[serde(default)]
    pub partof_title: Vec<String>,

    /// OCR text snippets
    #[serde(default)]
    pub description: Vec<String>,

    /// Archive item URL
    #[serde(default)]
    pub url: Option<String>,
}

impl SearchRecord {
    /// Normalize this raw record into a page descriptor
    ///
    /// Returns `None` when the record is not a newspaper page segment, has no
    /// image URL, its image URL carries no batch path, or its edition or page
    /// number is non-numeric. Missing descriptive fields fall back to fixed
    /// defaults rather than rejecting the record.
    pub fn into_page(self) -> Option<Page> {
        // Only segment records describe individual newspaper pages
        if self.record_type != ["segment"] {
            return None;
        }

        let image_url = self.image_url.first()?;
        let batch_path = extract_batch_path(image_url)?;

        let lccn = first_or(self.number_lccn, "unknown");
        let date = self.date.unwrap_or_else(|| "unknown".to_string());

        let edition: u32 = first_or(self.number_edition, "1").parse().ok()?;

        // Page numbers arrive zero-padded ("0027"); an all-zero value means
        // the first page
        let page_num = first_or(self.number_page, "1");
        let stripped = page_num.trim_start_matches('0');
        let sequence: u32 = if stripped.is_empty() {
            1
        } else {
            stripped.parse().ok()?
        };

        Some(Page {
            page_id: PageId::new(&lccn, &date, edition, sequence),
            newspaper_title: first_or(self.partof_title, "Unknown"),
            lccn,
            date,
            edition,
            sequence,
            state: first_or(self.location_state, "Unknown"),
            city: first_or(self.location_city, "Unknown"),
            batch_path,
            url: self.url.unwrap_or_default(),
            files: PageFiles::default(),
            ocr_text: first_or(self.description, ""),
        })
    }
}

/// Normalize one raw search result into a page descriptor
///
/// Records whose JSON shape does not fit [`SearchRecord`] are dropped with a
/// debug log, the same as records failing the semantic reject rules.
pub fn normalize(raw: serde_json::Value) -> Option<Page> {
    match serde_json::from_value::<SearchRecord>(raw) {
        Ok(record) => record.into_page(),
        Err(e) => {
            tracing::debug!(error = %e, "Skipping search record with unexpected shape");
            None
        }
    }
}

/// Extract the batch storage path from an IIIF image URL
///
/// The URL embeds a colon-separated service path between a `service:` marker
/// and `/full`; the storage services expect it slash-separated. For example
/// `...iiif/service:ndnp:dlc:batch_x:data:sn83030214:00206:1920050201:0027/full/...`
/// yields `ndnp/dlc/batch_x/data/sn83030214/00206/1920050201/0027`.
pub fn extract_batch_path(image_url: &str) -> Option<String> {
    batch_path_regex()
        .captures(image_url)
        .map(|caps| caps[1].replace(':', "/"))
}

fn batch_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Pattern is a literal, so compilation cannot fail at runtime
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| Regex::new(r"service:([^/]+)/full").expect("literal pattern compiles"))
}

fn first_or(items: Vec<String>, default: &str) -> String {
    items
        .into_iter()
        .next()
        .unwrap_or_else(|| default.to_string())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const IMAGE_URL: &str = "https://tile.loc.gov/image-services/iiif/service:ndnp:dlc:batch_dlc_fogler_ver01:data:sn83030214:00206532518:1920050201:0027/full/pct:6.25/0/default.jpg";

    fn valid_record() -> serde_json::Value {
        json!({
            "type": ["segment"],
            "image_url": [IMAGE_URL],
            "number_lccn": ["sn83030214"],
            "date": "1920-05-02",
            "number_edition": ["1"],
            "number_page": ["0027"],
            "location_state": ["New York"],
            "location_city": ["New York"],
            "partof_title": ["New-York Tribune"],
            "description": ["PROHIBITION AGENTS RAID WAREHOUSE"],
            "url": "https://www.loc.gov/resource/sn83030214/1920-05-02/ed-1/?sp=27"
        })
    }

    #[test]
    fn extract_batch_path_converts_colons_to_slashes() {
        let path = extract_batch_path(IMAGE_URL).unwrap();
        assert_eq!(
            path,
            "ndnp/dlc/batch_dlc_fogler_ver01/data/sn83030214/00206532518/1920050201/0027"
        );
    }

    #[test]
    fn extract_batch_path_handles_minimal_segments() {
        let url = "https://example.com/iiif/service:a:b:c/full/whatever";
        assert_eq!(extract_batch_path(url).unwrap(), "a/b/c");
    }

    #[test]
    fn extract_batch_path_without_marker_is_none() {
        assert!(extract_batch_path("https://example.com/image.jpg").is_none());
        assert!(extract_batch_path("").is_none());
        // a service marker without the /full terminator doesn't match either
        assert!(extract_batch_path("https://example.com/service:a:b:c/rest").is_none());
    }

    #[test]
    fn valid_record_normalizes_fully() {
        let page = normalize(valid_record()).unwrap();

        assert_eq!(page.lccn, "sn83030214");
        assert_eq!(page.date, "1920-05-02");
        assert_eq!(page.edition, 1);
        assert_eq!(page.sequence, 27, "leading zeros stripped");
        assert_eq!(page.newspaper_title, "New-York Tribune");
        assert_eq!(page.state, "New York");
        assert_eq!(page.city, "New York");
        assert_eq!(
            page.batch_path,
            "ndnp/dlc/batch_dlc_fogler_ver01/data/sn83030214/00206532518/1920050201/0027"
        );
        assert_eq!(page.ocr_text, "PROHIBITION AGENTS RAID WAREHOUSE");
        assert_eq!(
            page.id().as_str(),
            "sn83030214/1920-05-02/ed-1/seq-27"
        );
        assert_eq!(page.files, PageFiles::default());
    }

    #[test]
    fn non_segment_records_are_rejected() {
        let mut record = valid_record();
        record["type"] = json!(["collection"]);
        assert!(normalize(record).is_none());

        let mut record = valid_record();
        record["type"] = json!([]);
        assert!(normalize(record).is_none());

        let mut record = valid_record();
        record.as_object_mut().unwrap().remove("type");
        assert!(normalize(record).is_none());
    }

    #[test]
    fn records_without_image_urls_are_rejected() {
        let mut record = valid_record();
        record["image_url"] = json!([]);
        assert!(normalize(record).is_none());

        let mut record = valid_record();
        record.as_object_mut().unwrap().remove("image_url");
        assert!(normalize(record).is_none());
    }

    #[test]
    fn records_whose_image_url_has_no_batch_path_are_rejected() {
        let mut record = valid_record();
        record["image_url"] = json!(["https://example.com/plain.jpg"]);
        assert!(normalize(record).is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let record = json!({
            "type": ["segment"],
            "image_url": [IMAGE_URL]
        });
        let page = normalize(record).unwrap();

        assert_eq!(page.lccn, "unknown");
        assert_eq!(page.date, "unknown");
        assert_eq!(page.edition, 1);
        assert_eq!(page.sequence, 1);
        assert_eq!(page.newspaper_title, "Unknown");
        assert_eq!(page.state, "Unknown");
        assert_eq!(page.city, "Unknown");
        assert_eq!(page.url, "");
        assert_eq!(page.ocr_text, "");
        assert_eq!(page.id().as_str(), "unknown/unknown/ed-1/seq-1");
    }

    #[test]
    fn all_zero_page_number_becomes_sequence_one() {
        let mut record = valid_record();
        record["number_page"] = json!(["0"]);
        assert_eq!(normalize(record).unwrap().sequence, 1);

        let mut record = valid_record();
        record["number_page"] = json!(["000"]);
        assert_eq!(normalize(record).unwrap().sequence, 1);
    }

    #[test]
    fn non_numeric_sequence_or_edition_is_rejected() {
        let mut record = valid_record();
        record["number_page"] = json!(["twenty-seven"]);
        assert!(normalize(record).is_none());

        let mut record = valid_record();
        record["number_edition"] = json!(["extra"]);
        assert!(normalize(record).is_none());
    }

    #[test]
    fn wrong_shaped_records_are_dropped_not_fatal() {
        // type as a bare string instead of a list
        assert!(normalize(json!({"type": "segment", "image_url": [IMAGE_URL]})).is_none());
        // image_url as a number
        assert!(normalize(json!({"type": ["segment"], "image_url": 42})).is_none());
        // not an object at all
        assert!(normalize(json!("just a string")).is_none());
    }

    #[test]
    fn pagination_has_next_requires_nonempty_url() {
        let with_next: Pagination =
            serde_json::from_value(json!({"next": "https://example.com/?sp=2"})).unwrap();
        assert!(with_next.has_next());

        let null_next: Pagination = serde_json::from_value(json!({"next": null})).unwrap();
        assert!(!null_next.has_next());

        let empty_next: Pagination = serde_json::from_value(json!({"next": ""})).unwrap();
        assert!(!empty_next.has_next());

        let absent: Pagination = serde_json::from_value(json!({})).unwrap();
        assert!(!absent.has_next());
    }

    #[test]
    fn search_response_defaults_when_fields_missing() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.results.is_empty());
        assert!(!response.pagination.has_next());
    }
}
