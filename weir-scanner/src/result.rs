use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-page row produced by the crawl loop, used for console summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub response_time: Duration,
    /// Links that survived the page policy and were handed back to the frontier
    pub links_kept: Vec<String>,
    /// Raw anchor count before filtering
    pub anchors_found: usize,
    pub error: Option<String>,
}

impl CrawlResult {
    pub fn new(url: String) -> Self {
        Self {
            url,
            status_code: 0,
            content_type: None,
            content_length: None,
            response_time: Duration::from_secs(0),
            links_kept: Vec::new(),
            anchors_found: 0,
            error: None,
        }
    }

    pub fn with_error(url: String, error: String) -> Self {
        Self {
            url,
            status_code: 0,
            content_type: None,
            content_length: None,
            response_time: Duration::from_secs(0),
            links_kept: Vec::new(),
            anchors_found: 0,
            error: Some(error),
        }
    }
}
