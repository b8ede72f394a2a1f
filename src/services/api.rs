// src/services/api.rs

//! WordPress REST API client.
//!
//! Wraps a [`RequestSession`] with the `wp/v2` route layout: a capability
//! probe against the API root, paginated collection crawls driven by a
//! [`CrawlWindow`], and single-record lookups by id. Pagination state never
//! leaves [`crawl_pages`](WpApi::crawl_pages); per-page results come back as
//! a tagged [`PageFetchOutcome`] so the end of a collection is ordinary
//! data flow rather than an error unwinding the loop.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::error::{AppError, Result};
use crate::models::{CrawlWindow, EntityKind, WpObject};
use crate::services::RequestSession;
use crate::utils::normalize_target;

/// Collection metadata advertised by the REST API's paging headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageMeta {
    pub total_entries: Option<usize>,
    pub total_pages: Option<usize>,
}

impl PageMeta {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            total_entries: header_count(headers, "X-WP-Total"),
            total_pages: header_count(headers, "X-WP-TotalPages"),
        }
    }
}

fn header_count(headers: &HeaderMap, name: &str) -> Option<usize> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Result of fetching one collection page.
#[derive(Debug)]
pub enum PageFetchOutcome {
    /// A page of records plus whatever totals the response advertised.
    Page(Vec<WpObject>, PageMeta),
    /// The server signalled that the requested page is past the end.
    EndOfData,
    /// The request failed for a reason other than pagination.
    Failure(AppError),
}

/// Outcome of a collection crawl.
#[derive(Debug, Default)]
pub struct CrawlResult {
    pub entries: Vec<WpObject>,
    /// Collection size reported by the server, when it said.
    pub total_entries: Option<usize>,
    pub total_pages: Option<usize>,
    /// True when a mid-crawl failure cut the crawl short.
    pub truncated: bool,
}

/// Client for one WordPress site's REST API.
pub struct WpApi {
    base_url: String,
    session: Arc<RequestSession>,
    probe: OnceCell<()>,
}

impl WpApi {
    pub fn new(base_url: &str, session: Arc<RequestSession>) -> Self {
        Self {
            base_url: normalize_target(base_url),
            session,
            probe: OnceCell::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API root, `{base}/wp-json/`.
    pub fn api_url(&self) -> String {
        format!("{}wp-json/", self.base_url)
    }

    fn endpoint(&self, kind: EntityKind) -> String {
        format!("{}wp/v2/{}", self.api_url(), kind.slug())
    }

    /// Fetch the API root document, verifying the site serves `wp/v2`.
    ///
    /// Any error status, an undecodable body or a missing `wp/v2` namespace
    /// all collapse into [`AppError::NoUsableApi`]: the site cannot be
    /// harvested, whatever the specific reason.
    pub async fn basic_info(&self) -> Result<Value> {
        let url = self.api_url();
        let response = match self.session.get(&url).await {
            Ok(response) => response,
            Err(AppError::Status { .. } | AppError::InvalidPage) => {
                return Err(AppError::NoUsableApi { url });
            }
            Err(err) => return Err(err),
        };

        let info: Value = match response.json().await {
            Ok(info) => info,
            Err(_) => return Err(AppError::NoUsableApi { url }),
        };
        if !info.is_object() {
            return Err(AppError::NoUsableApi { url });
        }

        let has_v2 = info
            .get("namespaces")
            .and_then(Value::as_array)
            .is_some_and(|namespaces| namespaces.iter().any(|ns| ns.as_str() == Some("wp/v2")));
        if !has_v2 {
            return Err(AppError::NoUsableApi { url });
        }

        Ok(info)
    }

    /// Run the capability probe once per client; later calls are free.
    pub async fn ensure_usable(&self) -> Result<()> {
        self.probe
            .get_or_try_init(|| async { self.basic_info().await.map(|_| ()) })
            .await?;
        Ok(())
    }

    /// Fetch one collection page.
    ///
    /// `with_per_page` pins the page size explicitly; the windowing
    /// arithmetic needs that whenever a start offset is in play.
    pub async fn fetch_page(
        &self,
        kind: EntityKind,
        page: usize,
        with_per_page: bool,
    ) -> PageFetchOutcome {
        let mut url = format!("{}?page={page}", self.endpoint(kind));
        if with_per_page {
            url.push_str(&format!("&per_page={}", CrawlWindow::PER_PAGE));
        }

        let response = match self.session.get(&url).await {
            Ok(response) => response,
            Err(AppError::InvalidPage) => return PageFetchOutcome::EndOfData,
            Err(err) => return PageFetchOutcome::Failure(err),
        };

        let meta = PageMeta::from_headers(response.headers());
        match response.json::<Vec<WpObject>>().await {
            Ok(entries) => PageFetchOutcome::Page(entries, meta),
            Err(err) => PageFetchOutcome::Failure(err.into()),
        }
    }

    /// Crawl a collection page by page, honoring the `(start, num)` window.
    ///
    /// A failure after at least one accumulated entry is logged and returns
    /// the partial result with `truncated` set; a failure before any entry
    /// propagates.
    pub async fn crawl_pages(&self, kind: EntityKind, window: CrawlWindow) -> Result<CrawlResult> {
        let mut window = window;
        let with_per_page = window.start.is_some();
        let mut page = window.first_page();
        let mut entries: Vec<WpObject> = Vec::new();
        let mut entries_left = window.num;
        let mut total_entries: Option<usize> = None;
        let mut total_pages: Option<usize> = None;
        let mut truncated = false;

        loop {
            match self.fetch_page(kind, page, with_per_page).await {
                PageFetchOutcome::EndOfData => break,
                PageFetchOutcome::Failure(err) => {
                    if entries.is_empty() {
                        return Err(err);
                    }
                    log::error!(
                        "Crawl of {} stopped at page {page} after {} entries: {err}",
                        kind.slug(),
                        entries.len()
                    );
                    truncated = true;
                    break;
                }
                PageFetchOutcome::Page(batch, meta) => {
                    if total_entries.is_none() {
                        if let Some(total) = meta.total_entries {
                            total_entries = Some(total);
                            window.clamp_start(total);
                        }
                    }
                    if total_pages.is_none() {
                        total_pages = meta.total_pages;
                    }

                    if batch.is_empty() {
                        break;
                    }
                    log::debug!("Fetched page {page} of {}: {} entries", kind.slug(), batch.len());

                    let mut kept = batch;
                    let first_page = window.first_page();
                    if page < first_page {
                        // Pages before the window carry nothing we want.
                        kept.clear();
                    } else if page == first_page {
                        let offset = window.first_page_offset().min(kept.len());
                        kept.drain(..offset);
                    }

                    if let Some(left) = entries_left {
                        kept.truncate(left);
                        entries_left = Some(left - kept.len());
                    }
                    entries.extend(kept);

                    if entries_left == Some(0) {
                        break;
                    }
                    page += 1;
                }
            }
        }

        Ok(CrawlResult {
            entries,
            total_entries,
            total_pages,
            truncated,
        })
    }

    /// Probe the API, then crawl every record of `kind` within `window`.
    pub async fn fetch(&self, kind: EntityKind, window: CrawlWindow) -> Result<CrawlResult> {
        self.ensure_usable().await?;
        self.crawl_pages(kind, window).await
    }

    /// Look up a single record by id, preferring the caller's cache.
    ///
    /// A 404 or past-the-end answer means the record does not exist, which
    /// is a `None`, not an error.
    pub async fn fetch_by_id(
        &self,
        kind: EntityKind,
        id: i64,
        cache: &[WpObject],
    ) -> Result<Option<WpObject>> {
        if let Some(hit) = cache.iter().find(|entry| entry.id() == Some(id)) {
            return Ok(Some(hit.clone()));
        }

        self.ensure_usable().await?;
        let url = format!("{}/{id}", self.endpoint(kind));
        match self.session.get(&url).await {
            Ok(response) => Ok(Some(response.json::<WpObject>().await?)),
            Err(err) if err.is_not_found() || err.is_invalid_page() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> WpApi {
        let config = SessionConfig {
            max_retries: 0,
            backoff_factor: 0.0,
            ..SessionConfig::default()
        };
        WpApi::new(&server.uri(), Arc::new(RequestSession::new(config).unwrap()))
    }

    fn items(ids: std::ops::RangeInclusive<i64>) -> Vec<Value> {
        ids.map(|id| json!({"id": id, "link": format!("https://example.org/?p={id}")}))
            .collect()
    }

    fn page_response(ids: std::ops::RangeInclusive<i64>, total: usize) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(items(ids))
            .insert_header("X-WP-Total", total.to_string())
            .insert_header("X-WP-TotalPages", total.div_ceil(10).to_string())
    }

    fn invalid_page_response() -> ResponseTemplate {
        ResponseTemplate::new(400).set_body_json(json!({
            "code": "rest_post_invalid_page_number",
            "message": "The page number requested is larger than the number of pages available.",
            "data": {"status": 400}
        }))
    }

    async fn mount_page(server: &MockServer, page: usize, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("page", page.to_string()))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn mount_probe(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/wp-json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Example",
                "namespaces": ["oembed/1.0", "wp/v2"]
            })))
            .mount(server)
            .await;
    }

    fn ids(result: &CrawlResult) -> Vec<i64> {
        result.entries.iter().filter_map(WpObject::id).collect()
    }

    #[tokio::test]
    async fn test_crawl_everything() {
        let server = MockServer::start().await;
        // Page size stays at the server default when no offset is given.
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("page", "1"))
            .and(query_param_is_missing("per_page"))
            .respond_with(page_response(1..=10, 30))
            .mount(&server)
            .await;
        mount_page(&server, 2, page_response(11..=20, 30)).await;
        mount_page(&server, 3, page_response(21..=30, 30)).await;
        mount_page(&server, 4, invalid_page_response()).await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::everything())
            .await
            .unwrap();
        assert_eq!(ids(&result), (1..=30).collect::<Vec<_>>());
        assert_eq!(result.total_entries, Some(30));
        assert_eq!(result.total_pages, Some(3));
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_crawl_with_offset_skips_early_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("page", "1"))
            .respond_with(page_response(1..=10, 30))
            .expect(0)
            .mount(&server)
            .await;
        mount_page(&server, 2, page_response(11..=20, 30)).await;
        mount_page(&server, 3, page_response(21..=30, 30)).await;
        mount_page(&server, 4, invalid_page_response()).await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::new(Some(11), None))
            .await
            .unwrap();
        assert_eq!(ids(&result), (12..=30).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_crawl_with_limit_stops_early() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_response(1..=10, 30)).await;
        mount_page(&server, 2, page_response(11..=20, 30)).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("page", "3"))
            .respond_with(page_response(21..=30, 30))
            .expect(0)
            .mount(&server)
            .await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::new(None, Some(15)))
            .await
            .unwrap();
        assert_eq!(ids(&result), (1..=15).collect::<Vec<_>>());
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_crawl_with_offset_and_limit() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_response(1..=10, 30)).await;
        mount_page(&server, 2, page_response(11..=20, 30)).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("page", "3"))
            .respond_with(page_response(21..=30, 30))
            .expect(0)
            .mount(&server)
            .await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::new(Some(5), Some(10)))
            .await
            .unwrap();
        assert_eq!(ids(&result), (6..=15).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_crawl_stops_on_empty_page() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_response(1..=10, 30)).await;
        mount_page(&server, 2, ResponseTemplate::new(200).set_body_json(json!([]))).await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::everything())
            .await
            .unwrap();
        assert_eq!(ids(&result), (1..=10).collect::<Vec<_>>());
        assert_eq!(result.total_entries, Some(30));
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn test_crawl_keeps_partial_result_on_mid_crawl_failure() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_response(1..=10, 30)).await;
        mount_page(&server, 2, ResponseTemplate::new(500)).await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::everything())
            .await
            .unwrap();
        assert_eq!(ids(&result), (1..=10).collect::<Vec<_>>());
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_crawl_propagates_initial_failure() {
        let server = MockServer::start().await;
        mount_page(&server, 1, ResponseTemplate::new(500)).await;

        let err = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::everything())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_crawl_treats_undecodable_page_as_failure() {
        let server = MockServer::start().await;
        mount_page(&server, 1, page_response(1..=10, 30)).await;
        mount_page(
            &server,
            2,
            ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
        )
        .await;

        let result = api(&server)
            .crawl_pages(EntityKind::Post, CrawlWindow::everything())
            .await
            .unwrap();
        assert_eq!(result.entries.len(), 10);
        assert!(result.truncated);
    }

    #[tokio::test]
    async fn test_fetch_probes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": ["wp/v2"]
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_page(&server, 1, page_response(1..=5, 5)).await;
        mount_page(&server, 2, invalid_page_response()).await;

        let api = api(&server);
        let first = api.fetch(EntityKind::Post, CrawlWindow::everything()).await.unwrap();
        let second = api.fetch(EntityKind::Post, CrawlWindow::everything()).await.unwrap();
        assert_eq!(first.entries.len(), 5);
        assert_eq!(second.entries.len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_rejects_api_without_v2() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": ["oembed/1.0"]
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .fetch(EntityKind::Post, CrawlWindow::everything())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoUsableApi { .. }));
    }

    #[tokio::test]
    async fn test_probe_maps_error_status_to_no_usable_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = api(&server).basic_info().await.unwrap_err();
        assert!(matches!(err, AppError::NoUsableApi { .. }));
    }

    #[tokio::test]
    async fn test_fetch_by_id_prefers_cache() {
        let server = MockServer::start().await;
        let cache: Vec<WpObject> = serde_json::from_value(json!([
            {"id": 7, "link": "https://example.org/?p=7"}
        ]))
        .unwrap();

        let hit = api(&server)
            .fetch_by_id(EntityKind::Post, 7, &cache)
            .await
            .unwrap();
        assert_eq!(hit.and_then(|entry| entry.id()), Some(7));
        // No probe mock mounted: a request would have failed loudly.
    }

    #[tokio::test]
    async fn test_fetch_by_id_requests_uncached_record() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
            .mount(&server)
            .await;

        let hit = api(&server)
            .fetch_by_id(EntityKind::Post, 7, &[])
            .await
            .unwrap();
        assert_eq!(hit.and_then(|entry| entry.id()), Some(7));
    }

    #[tokio::test]
    async fn test_fetch_by_id_missing_record_is_none() {
        let server = MockServer::start().await;
        mount_probe(&server).await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let hit = api(&server)
            .fetch_by_id(EntityKind::Post, 999, &[])
            .await
            .unwrap();
        assert!(hit.is_none());
    }
}
