//! Search parameter building and the paginated result walker

use crate::client::ArchiveClient;
use crate::config::Config;
use crate::record::{self, SearchResponse};
use crate::types::Page;
use chrono::{Datelike, NaiveDate};
use tokio_util::sync::CancellationToken;

/// Hard ceiling on result pages walked in one search, whatever the server's
/// pagination claims
pub const MAX_RESULT_PAGES: u32 = 1_000;

/// Consecutive result pages yielding no accepted descriptors before the
/// walker gives up
pub const MAX_BARREN_PAGES: u32 = 10;

/// Walk paginated search results, normalizing records into page descriptors
///
/// Collects up to `config.max_pages` descriptors, requesting result pages
/// one at a time through the retrying client. The walk stops when the cap is
/// reached, the server returns no results or no next page, the cancellation
/// token fires, or one of two safety nets trips: a hard result-page ceiling
/// ([`MAX_RESULT_PAGES`]) and a run of result pages contributing nothing
/// ([`MAX_BARREN_PAGES`]). A request or parse failure ends the walk early
/// with a log line; whatever was collected so far is returned, never an
/// error.
pub async fn search_pages(
    client: &ArchiveClient,
    config: &Config,
    cancel: &CancellationToken,
) -> Vec<Page> {
    let mut pages: Vec<Page> = Vec::new();
    let base_params = build_search_params(config);
    let mut result_page: u32 = 1;
    let mut barren_streak: u32 = 0;

    tracing::info!(
        query = %config.query,
        max_pages = config.max_pages,
        "Searching the archive"
    );

    while pages.len() < config.max_pages {
        if cancel.is_cancelled() {
            tracing::info!("Search cancelled, keeping partial results");
            break;
        }

        if result_page > MAX_RESULT_PAGES {
            tracing::warn!(
                limit = MAX_RESULT_PAGES,
                "Result page ceiling reached, stopping search"
            );
            break;
        }

        let mut params = base_params.clone();
        params.push(("sp", result_page.to_string()));

        let response: SearchResponse =
            match client.get_json(&config.endpoints.search_url, &params).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        result_page,
                        "Search failed, keeping partial results"
                    );
                    break;
                }
            };

        if response.results.is_empty() {
            tracing::info!("No more results");
            break;
        }

        let has_next = response.pagination.has_next();
        let accepted_before = pages.len();

        for raw in response.results {
            if pages.len() >= config.max_pages {
                break;
            }
            if let Some(page) = record::normalize(raw) {
                pages.push(page);
            }
        }

        if pages.len() == accepted_before {
            barren_streak += 1;
            if barren_streak >= MAX_BARREN_PAGES {
                tracing::warn!(
                    streak = barren_streak,
                    "Too many result pages without usable records, stopping search"
                );
                break;
            }
        } else {
            barren_streak = 0;
        }

        if !has_next {
            break;
        }

        result_page += 1;
    }

    tracing::info!(found = pages.len(), "Search finished");
    pages
}

/// Build the fixed search parameters for a run
///
/// Always requests JSON at page granularity within the Chronicling America
/// collection; the date range and state filter are appended when configured.
/// The walker adds the `sp` result-page number per request.
fn build_search_params(config: &Config) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("fo", "json".to_string()),
        ("c", "100".to_string()),
        ("dl", "page".to_string()),
        ("qs", config.query.clone()),
        ("fa", "partof_collection:chronicling america".to_string()),
    ];

    if let Some(dates) = build_date_param(config.start_date, config.end_date) {
        params.push(("dates", dates));
    }
    if let Some(state) = &config.state_filter {
        params.push(("location_state", state.to_lowercase()));
    }

    params
}

/// Build the year-range parameter (`YYYY/YYYY`) from the configured dates
///
/// The archive filters by year only. A missing side falls back to the
/// present side, so a single date becomes a one-year window.
fn build_date_param(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    match (start, end) {
        (Some(s), Some(e)) => Some(format!("{}/{}", s.year(), e.year())),
        (Some(s), None) => Some(format!("{}/{}", s.year(), s.year())),
        (None, Some(e)) => Some(format!("{}/{}", e.year(), e.year())),
        (None, None) => None,
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoints, HttpConfig, RetryConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IMAGE_URL: &str =
        "https://tile.loc.gov/image-services/iiif/service:ndnp:dlc:batch_x:data:sn1:001:19200502:0001/full/pct:6.25/0/default.jpg";

    fn segment_record(lccn: &str, seq: &str) -> serde_json::Value {
        json!({
            "type": ["segment"],
            "image_url": [IMAGE_URL],
            "number_lccn": [lccn],
            "date": "1920-05-02",
            "number_edition": ["1"],
            "number_page": [seq],
            "partof_title": ["Test Gazette"],
            "url": "https://example.com/resource"
        })
    }

    fn test_config(server_uri: &str, max_pages: usize) -> Config {
        Config {
            corpus: "test".to_string(),
            query: "prohibition".to_string(),
            max_pages,
            endpoints: Endpoints {
                search_url: format!("{server_uri}/search"),
                storage_url: format!("{server_uri}/storage"),
                text_url: format!("{server_uri}/text"),
            },
            ..Config::default()
        }
    }

    fn test_client() -> ArchiveClient {
        let http = HttpConfig {
            timeout: Duration::from_secs(5),
            user_agent: "chronam-dl-test/0.0".to_string(),
        };
        let retry = RetryConfig {
            max_retries: 0,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            jitter: false,
        };
        ArchiveClient::new(&http, retry).unwrap()
    }

    #[test]
    fn date_param_covers_all_range_shapes() {
        let start = NaiveDate::from_ymd_opt(1920, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(1929, 12, 31).unwrap();

        assert_eq!(
            build_date_param(Some(start), Some(end)).unwrap(),
            "1920/1929"
        );
        assert_eq!(build_date_param(Some(start), None).unwrap(), "1920/1920");
        assert_eq!(build_date_param(None, Some(end)).unwrap(), "1929/1929");
        assert_eq!(build_date_param(None, None), None);
    }

    #[test]
    fn search_params_carry_the_fixed_contract() {
        let config = Config {
            query: "gold rush".to_string(),
            start_date: NaiveDate::from_ymd_opt(1898, 1, 1),
            end_date: NaiveDate::from_ymd_opt(1899, 12, 31),
            state_filter: Some("California".to_string()),
            ..Config::default()
        };

        let params = build_search_params(&config);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("fo"), Some("json"));
        assert_eq!(get("c"), Some("100"));
        assert_eq!(get("dl"), Some("page"));
        assert_eq!(get("qs"), Some("gold rush"));
        assert_eq!(get("fa"), Some("partof_collection:chronicling america"));
        assert_eq!(get("dates"), Some("1898/1899"));
        assert_eq!(get("location_state"), Some("california"), "lowercased");
    }

    #[test]
    fn optional_params_are_omitted_when_unset() {
        let config = Config {
            query: "anything".to_string(),
            ..Config::default()
        };
        let params = build_search_params(&config);
        assert!(params.iter().all(|(k, _)| *k != "dates"));
        assert!(params.iter().all(|(k, _)| *k != "location_state"));
    }

    #[tokio::test]
    async fn single_page_of_results_needs_exactly_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("sp", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [segment_record("sn1", "0001"), segment_record("sn2", "0002")],
                "pagination": {"next": null}
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 2);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].lccn, "sn1");
        assert_eq!(pages[1].lccn, "sn2");
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            1,
            "cap reached and no next page: one request suffices"
        );
    }

    #[tokio::test]
    async fn cap_stops_mid_result_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [segment_record("sn1", "0001"), segment_record("sn2", "0002")],
                "pagination": {"next": "https://example.com/?sp=2"}
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 1);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert_eq!(pages.len(), 1, "cap bounds the collection");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn walker_follows_pagination_until_last_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("sp", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [segment_record("sn1", "0001")],
                "pagination": {"next": "https://example.com/?sp=2"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("sp", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [segment_record("sn2", "0003")],
                "pagination": {"next": null}
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].sequence, 3);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_records_are_skipped_not_counted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"type": ["collection"], "image_url": [IMAGE_URL]},
                    segment_record("sn9", "0005"),
                    {"type": ["segment"], "image_url": []}
                ],
                "pagination": {}
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lccn, "sn9");
    }

    #[tokio::test]
    async fn empty_results_end_the_walk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "pagination": {"next": "https://example.com/?sp=2"}
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert!(pages.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn request_failure_returns_partial_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("sp", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [segment_record("sn1", "0001")],
                "pagination": {"next": "https://example.com/?sp=2"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("sp", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert_eq!(pages.len(), 1, "the first page's records survive");
    }

    #[tokio::test]
    async fn malformed_json_returns_partial_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert!(pages.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn barren_result_pages_trip_the_circuit_breaker() {
        let server = MockServer::start().await;
        // Every result page claims a next page but contains only rejects
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"type": ["collection"]}],
                "pagination": {"next": "https://example.com/?sp=next"}
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &CancellationToken::new()).await;

        assert!(pages.is_empty());
        assert_eq!(
            server.received_requests().await.unwrap().len() as u32,
            MAX_BARREN_PAGES,
            "walker should stop after the barren streak, not walk forever"
        );
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [segment_record("sn1", "0001")],
                "pagination": {}
            })))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let config = test_config(&server.uri(), 10);
        let pages = search_pages(&test_client(), &config, &cancel).await;

        assert!(pages.is_empty());
        assert_eq!(server.received_requests().await.unwrap().len(), 0);
    }
}
