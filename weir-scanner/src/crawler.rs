use crate::error::{Result, ScanError};
use crate::page::{self, PageContent};
use crate::result::CrawlResult;
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(CrawlResult) + Send + Sync>;

/// Decides which outbound links from a fetched page go back to the frontier.
///
/// The crawler does no link filtering of its own beyond refusing to revisit
/// URLs it already fetched; every other decision (normalization, allow-lists,
/// trap suppression, duplicate content) belongs to the installed policy.
pub type PagePolicy = Arc<dyn Fn(&PageContent) -> Vec<String> + Send + Sync>;

pub struct Crawler {
    client: Client,
    visited: Arc<Mutex<HashSet<String>>>,
    results: Arc<Mutex<Vec<CrawlResult>>>,
    max_pages: usize,
    politeness_delay_ms: u64,
    page_policy: Option<PagePolicy>,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Crawler {
    pub fn new() -> Self {
        Self::with_timeout(10)
    }

    pub fn with_timeout(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .user_agent("Weir/0.2 (https://github.com/trapdoorsec/weir)")
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(timeout_secs / 2))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .tcp_keepalive(std::time::Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            visited: Arc::new(Mutex::new(HashSet::new())),
            results: Arc::new(Mutex::new(Vec::new())),
            max_pages: 0,
            politeness_delay_ms: 0,
            page_policy: None,
            progress_callback: None,
            result_callback: None,
        }
    }

    /// Stop fetching once this many pages have been retrieved. 0 means unbounded.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Per-worker delay between consecutive fetches.
    pub fn with_politeness_delay_ms(mut self, delay_ms: u64) -> Self {
        self.politeness_delay_ms = delay_ms;
        self
    }

    pub fn with_page_policy(mut self, policy: PagePolicy) -> Self {
        self.page_policy = Some(policy);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, start_url: &str, workers: usize) -> Result<Vec<CrawlResult>> {
        info!("Starting crawl of {} with {} workers", start_url, workers);

        Url::parse(start_url).map_err(|e| ScanError::InvalidUrl(format!("Invalid URL: {}", e)))?;

        // Mark initial URL as visited
        {
            let mut visited = self.visited.lock().await;
            visited.insert(start_url.to_string());
        }

        // Worker-owned queues; new URLs are distributed round-robin
        let worker_queues: Arc<Vec<Mutex<VecDeque<String>>>> =
            Arc::new((0..workers).map(|_| Mutex::new(VecDeque::new())).collect());

        {
            let mut queue = worker_queues[0].lock().await;
            queue.push_back(start_url.to_string());
        }

        // Budget slots are reserved before fetching so concurrent workers
        // cannot collectively overshoot max_pages
        let fetched = Arc::new(AtomicUsize::new(0));

        let mut worker_handles = Vec::new();

        for worker_id in 0..workers {
            let client = self.client.clone();
            let fetched = fetched.clone();
            let page_policy = self.page_policy.clone();
            let progress_cb = self.progress_callback.clone();
            let result_cb = self.result_callback.clone();
            let max_pages = self.max_pages;
            let delay_ms = self.politeness_delay_ms;
            let visited = self.visited.clone();
            let results = self.results.clone();
            let worker_queues_clone = worker_queues.clone();

            let handle = tokio::spawn(async move {
                debug!("Worker {} started", worker_id);
                let mut empty_iterations = 0;
                const MAX_EMPTY_ITERATIONS: usize = 10;

                loop {
                    let work_item = {
                        let mut queue = worker_queues_clone[worker_id].lock().await;
                        queue.pop_front()
                    };

                    let url = if let Some(item) = work_item {
                        empty_iterations = 0;
                        item
                    } else {
                        if Self::all_queues_empty(&worker_queues_clone).await {
                            empty_iterations += 1;
                            if empty_iterations >= MAX_EMPTY_ITERATIONS {
                                debug!("Worker {} exiting", worker_id);
                                break;
                            }
                        } else {
                            empty_iterations = 0;
                        }

                        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
                        continue;
                    };

                    // Reserve a page budget slot; released again on fetch failure
                    if max_pages > 0 && fetched.fetch_add(1, Ordering::SeqCst) >= max_pages {
                        debug!("Worker {} hit page budget, exiting", worker_id);
                        break;
                    }

                    if let Some(ref callback) = progress_cb {
                        callback(worker_id, url.clone());
                    }

                    if delay_ms > 0 {
                        tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                    }

                    match Self::fetch_and_select(&client, &url, &page_policy).await {
                        Ok((crawl_result, new_urls)) => {
                            if let Some(ref callback) = result_cb {
                                callback(crawl_result.clone());
                            }
                            {
                                let mut results_lock = results.lock().await;
                                results_lock.push(crawl_result);
                            }

                            // Distribute frontier candidates round-robin
                            let mut target_worker = 0;
                            for new_url in new_urls {
                                let should_queue = {
                                    let mut visited_lock = visited.lock().await;
                                    if !visited_lock.contains(&new_url) {
                                        visited_lock.insert(new_url.clone());
                                        true
                                    } else {
                                        false
                                    }
                                };

                                if should_queue {
                                    debug!(
                                        "[Worker {}] Queuing {} to worker {}",
                                        worker_id, new_url, target_worker
                                    );
                                    let mut queue =
                                        worker_queues_clone[target_worker].lock().await;
                                    queue.push_back(new_url);
                                    drop(queue);

                                    target_worker =
                                        (target_worker + 1) % worker_queues_clone.len();
                                }
                            }
                        }
                        Err(e) => {
                            if max_pages > 0 {
                                fetched.fetch_sub(1, Ordering::SeqCst);
                            }
                            // A single bad page never aborts the crawl
                            warn!("Crawl error for {}: {}", url, e);
                        }
                    }
                }

                debug!("Worker {} finished", worker_id);
            });

            worker_handles.push(handle);
        }

        for handle in worker_handles {
            handle
                .await
                .map_err(|e| ScanError::Other(format!("Worker task failed: {}", e)))?;
        }

        let results = self.results.lock().await;
        info!("Crawl complete. Visited {} pages", results.len());
        Ok(results.clone())
    }

    /// Check if all worker queues are empty
    async fn all_queues_empty(worker_queues: &Arc<Vec<Mutex<VecDeque<String>>>>) -> bool {
        for queue in worker_queues.iter() {
            if !queue.lock().await.is_empty() {
                return false;
            }
        }
        true
    }

    /// Fetch one URL, hand the extracted page to the policy, and return the
    /// result row plus the links the policy kept.
    async fn fetch_and_select(
        client: &Client,
        url: &str,
        page_policy: &Option<PagePolicy>,
    ) -> Result<(CrawlResult, Vec<String>)> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = client.get(url).send().await?;
        let response_time = start.elapsed();

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_length = response.content_length();

        let body = response.text().await?;

        let mut result = CrawlResult::new(url.to_string());
        result.status_code = status_code;
        result.content_type = content_type.clone();
        result.content_length = content_length;
        result.response_time = response_time;

        let is_html = content_type
            .as_ref()
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);

        let content = if is_html {
            page::parse_html(url, status_code, &body)
        } else {
            PageContent::empty(url.to_string(), status_code)
        };
        result.anchors_found = content.hrefs.len();

        let kept = match page_policy {
            Some(policy) => policy(&content),
            // No policy installed: keep every resolvable same-page href
            None => content
                .hrefs
                .iter()
                .filter_map(|href| Self::resolve_href(url, href))
                .collect(),
        };
        result.links_kept = kept.clone();

        Ok((result, kept))
    }

    fn resolve_href(base: &str, href: &str) -> Option<String> {
        if href.is_empty()
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with('#')
        {
            return None;
        }

        let base_url = Url::parse(base).ok()?;
        let mut resolved = base_url.join(href).ok()?;
        resolved.set_fragment(None);

        Some(resolved.to_string())
    }

    pub async fn get_results(&self) -> Vec<CrawlResult> {
        self.results.lock().await.clone()
    }

    pub async fn get_visited_count(&self) -> usize {
        self.visited.lock().await.len()
    }
}

impl Default for Crawler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// Test basic link discovery with no policy installed
    #[tokio::test]
    async fn test_link_discovery() {
        let mock_server = MockServer::start().await;

        let root_html = format!(
            r#"<html><body>
                <a href="{}/page1">Page 1</a>
                <a href="{}/page2">Page 2</a>
            </body></html>"#,
            mock_server.uri(),
            mock_server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        for p in ["/page1", "/page2"] {
            Mock::given(method("GET"))
                .and(path(p))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(b"<html><body>Leaf</body></html>"),
                )
                .mount(&mock_server)
                .await;
        }

        let crawler = Crawler::new();
        let results = crawler.crawl(&mock_server.uri(), 1).await.unwrap();

        assert!(
            results.len() >= 3,
            "Expected at least 3 pages crawled (root + 2 links), but got {}",
            results.len()
        );
    }

    /// The installed page policy decides which links reach the frontier
    #[tokio::test]
    async fn test_page_policy_filters_frontier() {
        let mock_server = MockServer::start().await;

        let root_html = format!(
            r#"<html><body>
                <a href="{}/keep">Keep</a>
                <a href="{}/drop">Drop</a>
            </body></html>"#,
            mock_server.uri(),
            mock_server.uri()
        );

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/keep"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><body>Kept page</body></html>"),
            )
            .mount(&mock_server)
            .await;

        let base = mock_server.uri();
        let policy: PagePolicy = Arc::new(move |page: &PageContent| {
            page.hrefs
                .iter()
                .filter(|href| !href.contains("drop"))
                .map(|href| format!("{}{}", base, href.trim_start_matches(&base)))
                .collect()
        });

        let crawler = Crawler::new().with_page_policy(policy);
        let results = crawler.crawl(&mock_server.uri(), 1).await.unwrap();

        let urls: Vec<_> = results.iter().map(|r| r.url.clone()).collect();
        assert!(urls.iter().any(|u| u.ends_with("/keep")));
        assert!(!urls.iter().any(|u| u.ends_with("/drop")));
    }

    /// Non-HTML responses produce no frontier candidates
    #[tokio::test]
    async fn test_non_html_yields_no_links() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_bytes(br#"{"a": "<a href=/x>not html</a>"}"#),
            )
            .mount(&mock_server)
            .await;

        let crawler = Crawler::new();
        let results = crawler.crawl(&mock_server.uri(), 1).await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].links_kept.is_empty());
        assert_eq!(results[0].anchors_found, 0);
    }

    /// Page budget stops the crawl even while the frontier still has work
    #[tokio::test]
    async fn test_max_pages_budget() {
        let mock_server = MockServer::start().await;

        let mut root_html = String::from("<html><body>");
        for i in 1..=10 {
            root_html.push_str(&format!(
                r#"<a href="{}/page{}">Page {}</a>"#,
                mock_server.uri(),
                i,
                i
            ));
        }
        root_html.push_str("</body></html>");

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        for i in 1..=10 {
            Mock::given(method("GET"))
                .and(path(format!("/page{}", i)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(b"<html><body>Page</body></html>"),
                )
                .mount(&mock_server)
                .await;
        }

        let crawler = Crawler::new().with_max_pages(3);
        let results = crawler.crawl(&mock_server.uri(), 1).await.unwrap();

        assert!(
            results.len() <= 3,
            "Page budget exceeded: crawled {}",
            results.len()
        );
    }

    /// The budget holds even when several workers race for the last slots
    #[tokio::test]
    async fn test_max_pages_budget_with_many_workers() {
        let mock_server = MockServer::start().await;

        let mut root_html = String::from("<html><body>");
        for i in 1..=20 {
            root_html.push_str(&format!(
                r#"<a href="{}/page{}">Page {}</a>"#,
                mock_server.uri(),
                i,
                i
            ));
        }
        root_html.push_str("</body></html>");

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        for i in 1..=20 {
            Mock::given(method("GET"))
                .and(path(format!("/page{}", i)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(b"<html><body>Page</body></html>"),
                )
                .mount(&mock_server)
                .await;
        }

        let crawler = Crawler::new().with_max_pages(3);
        let results = crawler.crawl(&mock_server.uri(), 8).await.unwrap();

        assert!(
            results.len() <= 3,
            "Page budget exceeded with 8 workers: crawled {}",
            results.len()
        );
    }

    /// Multiple workers share the frontier via round-robin distribution
    #[tokio::test]
    async fn test_multiple_workers_are_used() {
        use std::collections::HashMap;
        use tokio::sync::Mutex as TokioMutex;

        let worker_activity: Arc<TokioMutex<HashMap<usize, Vec<String>>>> =
            Arc::new(TokioMutex::new(HashMap::new()));
        let worker_activity_clone = worker_activity.clone();

        let mock_server = MockServer::start().await;

        let mut root_html = String::from("<html><body>");
        for i in 1..=10 {
            root_html.push_str(&format!(
                r#"<a href="{}/page{}">Page {}</a>"#,
                mock_server.uri(),
                i,
                i
            ));
        }
        root_html.push_str("</body></html>");

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        for i in 1..=10 {
            Mock::given(method("GET"))
                .and(path(format!("/page{}", i)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(b"<html><body>Page</body></html>"),
                )
                .mount(&mock_server)
                .await;
        }

        let crawler = Crawler::new().with_progress_callback(Arc::new(move |worker_id, url| {
            let worker_activity = worker_activity_clone.clone();
            tokio::spawn(async move {
                let mut activity = worker_activity.lock().await;
                activity.entry(worker_id).or_insert_with(Vec::new).push(url);
            });
        }));

        let results = crawler.crawl(&mock_server.uri(), 4).await.unwrap();

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        assert!(!results.is_empty(), "Should have crawled some pages");

        let activity = worker_activity.lock().await;
        let workers_used = activity.keys().count();
        assert!(
            workers_used > 1,
            "Expected multiple workers to be used, but only {} worker(s) processed URLs",
            workers_used
        );
    }
}
