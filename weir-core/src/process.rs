//! The per-page processing pipeline.
//!
//! `PageProcessor::process` is the single entry point the crawl loop invokes
//! for every fetched page. Ordering inside one call:
//!
//! 1. non-200 status or empty body: no links, no stats
//! 2. the page's own URL must pass the validity filter
//! 3. record the visit (before the duplicate check, so every reachable URL
//!    shows up in the visited set even when its content is a duplicate);
//!    a canonical URL seen before stops here, keeping per-URL stats unique
//! 4. minimum-text-length gate: short pages contribute no links, no word
//!    stats, and no fingerprint
//! 5. duplicate check: duplicate pages contribute no links and no word stats
//! 6. word statistics, then link extraction and filtering
//!
//! All mutable state lives behind this type's locks; concurrent workers can
//! share one processor through an `Arc`.

use crate::canonical::CanonicalUrl;
use crate::dedup::{DedupStrategy, FingerprintIndex};
use crate::rules::{FilterConfig, Verdict};
use crate::shape::{DEFAULT_SHAPE_CEILING, ShapeTracker};
use crate::stats::CrawlStats;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};
use weir_scanner::PageContent;

pub const DEFAULT_MIN_TEXT_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub filter: FilterConfig,
    pub dedup: DedupStrategy,
    pub shape_ceiling: u32,
    /// Pages with less extracted text than this are not worth exploring
    pub min_text_len: usize,
    /// Host suffix whose subdomains are tallied in the report
    pub monitored_suffix: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            dedup: DedupStrategy::default(),
            shape_ceiling: DEFAULT_SHAPE_CEILING,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
            monitored_suffix: "ics.uci.edu".to_string(),
        }
    }
}

pub struct PageProcessor {
    filter: FilterConfig,
    min_text_len: usize,
    shapes: Mutex<ShapeTracker>,
    fingerprints: Mutex<FingerprintIndex>,
    stats: Mutex<CrawlStats>,
}

impl PageProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self {
            filter: config.filter,
            min_text_len: config.min_text_len,
            shapes: Mutex::new(ShapeTracker::new(config.shape_ceiling)),
            fingerprints: Mutex::new(FingerprintIndex::new(config.dedup)),
            stats: Mutex::new(CrawlStats::new(&config.monitored_suffix)),
        }
    }

    /// Process one fetched page and return the filtered outbound links to
    /// hand back to the frontier.
    pub fn process(&self, page: &PageContent) -> Vec<CanonicalUrl> {
        if page.status != 200 {
            debug!("skipping {} (status {})", page.url, page.status);
            return Vec::new();
        }

        let page_url = match CanonicalUrl::parse(&page.url) {
            Ok(url) => url,
            Err(e) => {
                // A page we cannot even name is dropped, never an abort
                warn!("unparsable page URL {}: {}", page.url, e);
                return Vec::new();
            }
        };

        if page.text.is_empty() && page.hrefs.is_empty() {
            debug!("skipping {} (empty body)", page.url);
            return Vec::new();
        }

        // A page whose own URL fails the filter (e.g. an off-list seed or a
        // redirect target) contributes neither stats nor links
        if !self.filter.is_valid(&page_url) {
            debug!("skipping {} (page URL rejected by filter)", page.url);
            return Vec::new();
        }

        if !self.stats.lock().unwrap().record_visit(&page_url) {
            debug!("skipping {} (already visited)", page.url);
            return Vec::new();
        }

        if page.text.len() < self.min_text_len {
            debug!(
                "skipping links of {} (text {} below threshold {})",
                page.url,
                page.text.len(),
                self.min_text_len
            );
            return Vec::new();
        }

        if self.fingerprints.lock().unwrap().is_duplicate(&page.text) {
            debug!("skipping links of {} (duplicate content)", page.url);
            return Vec::new();
        }

        self.stats
            .lock()
            .unwrap()
            .record_words(&page_url, &page.text);

        self.extract_links(&page_url, &page.hrefs)
    }

    /// Resolve, canonicalize, de-duplicate and filter one page's hrefs.
    fn extract_links(&self, page_url: &CanonicalUrl, hrefs: &[String]) -> Vec<CanonicalUrl> {
        let mut seen_on_page = HashSet::new();
        let mut kept = Vec::new();

        for href in hrefs {
            let candidate = match CanonicalUrl::resolve(href, Some(page_url.as_url())) {
                Ok(url) => url,
                // Malformed links are dropped silently
                Err(_) => continue,
            };

            if !seen_on_page.insert(candidate.as_str().to_string()) {
                continue;
            }

            match self.filter.verdict(&candidate) {
                Verdict::Allowed => {}
                Verdict::Rejected(reason) => {
                    debug!("rejected {} ({:?})", candidate, reason);
                    continue;
                }
            }

            if !self.shapes.lock().unwrap().check_and_record(&candidate) {
                continue;
            }

            kept.push(candidate);
        }

        kept
    }

    pub fn stats(&self) -> MutexGuard<'_, CrawlStats> {
        self.stats.lock().unwrap()
    }

    pub fn fingerprint_count(&self) -> usize {
        self.fingerprints.lock().unwrap().len()
    }
}
