use crate::process::{PageProcessor, ProcessorConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;
use weir_scanner::Crawler;
use weir_scanner::result::CrawlResult;

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub urls: Vec<String>,
    pub threads: usize,
    /// 0 means unbounded
    pub max_pages: usize,
    /// Delay between requests issued by one worker, in milliseconds
    pub delay_ms: u64,
    pub show_progress_bars: bool,
    pub processor: ProcessorConfig,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            threads: 10,
            max_pages: 0,
            delay_ms: 500,
            show_progress_bars: true,
            processor: ProcessorConfig::default(),
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for reporting individual crawl results as they come in
pub type CrawlResultCallback = Arc<dyn Fn(CrawlResult) + Send + Sync>;

/// Everything a finished crawl produced: the per-fetch results and the
/// processor holding the accumulated statistics.
pub struct CrawlOutcome {
    pub results: Vec<CrawlResult>,
    pub processor: Arc<PageProcessor>,
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Execute a crawl with the given options
/// Returns the crawl results together with the accumulated statistics
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
    result_callback: Option<CrawlResultCallback>,
) -> Result<CrawlOutcome, String> {
    let CrawlOptions {
        urls,
        threads,
        max_pages,
        delay_ms,
        show_progress_bars,
        processor,
    } = options;

    let processor = Arc::new(PageProcessor::new(processor));

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    // Counter for tracking processed URLs
    let processed_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

    // Progress callback for worker updates (only if progress bars enabled)
    let internal_progress_callback: weir_scanner::ProgressCallback = if show_progress_bars {
        let pb_clone = progress_bar.clone().unwrap();
        let count_clone = processed_count.clone();
        Arc::new(move |_worker_id: usize, _url: String| {
            let count = count_clone.fetch_add(1, std::sync::atomic::Ordering::Relaxed) + 1;
            pb_clone.set_message(format!("Crawling... {} URLs processed", count));
            pb_clone.tick();
        })
    } else {
        // No-op callback when progress bars are disabled
        Arc::new(|_worker_id: usize, _url: String| {})
    };

    // Every fetched page flows through the processor; the links it keeps
    // become the frontier for the workers.
    let processor_clone = processor.clone();
    let page_policy: weir_scanner::PagePolicy = Arc::new(move |page| {
        processor_clone
            .process(page)
            .into_iter()
            .map(|url| url.to_string())
            .collect()
    });

    let mut crawler = Crawler::new()
        .with_max_pages(max_pages)
        .with_politeness_delay_ms(delay_ms)
        .with_page_policy(page_policy)
        .with_progress_callback(internal_progress_callback);

    // Add result callback if provided (converts CrawlResultCallback to ResultCallback)
    if let Some(ref cb) = result_callback {
        let cb_clone = cb.clone();
        let result_cb: weir_scanner::ResultCallback = Arc::new(move |result: CrawlResult| {
            cb_clone(result);
        });
        crawler = crawler.with_result_callback(result_cb);
    }

    // Crawl each seed URL
    let mut all_results = Vec::new();
    for (idx, url_str) in urls.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && urls.len() > 1
        {
            callback(format!(
                "Crawling seed {}/{}: {}",
                idx + 1,
                urls.len(),
                url_str
            ));
        }

        match crawler.crawl(url_str, threads).await {
            Ok(results) => {
                all_results.extend(results);
            }
            Err(e) => {
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to crawl {}: {}", url_str, e));
                }
            }
        }
    }

    // Finish progress bar (only if enabled)
    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(std::sync::atomic::Ordering::Relaxed);
        pb.finish_with_message(format!("Crawl complete! {} URLs processed", total));
    }

    Ok(CrawlOutcome {
        results: all_results,
        processor,
    })
}

/// Generate a console summary from fetch results
pub fn generate_crawl_summary(results: &[CrawlResult]) -> String {
    // Filter out 404s
    let filtered_results: Vec<&CrawlResult> =
        results.iter().filter(|r| r.status_code != 404).collect();

    let mut summary = String::new();
    summary.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    summary.push_str("# Summary:\n");
    summary.push_str(&format!("  Pages fetched: {}\n", filtered_results.len()));

    let total_anchors: usize = filtered_results.iter().map(|r| r.anchors_found).sum();
    summary.push_str(&format!("  Anchors found: {}\n", total_anchors));

    let total_kept: usize = filtered_results.iter().map(|r| r.links_kept.len()).sum();
    summary.push_str(&format!("  Links kept: {}\n", total_kept));

    summary.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    // Group results by host
    let mut by_host: HashMap<String, Vec<&CrawlResult>> = HashMap::new();

    for result in filtered_results {
        if let Ok(url) = Url::parse(&result.url)
            && let Some(host) = url.host_str()
        {
            by_host.entry(host.to_string()).or_default().push(result);
        }
    }

    // Display results grouped by host
    for (host, host_results) in by_host.iter() {
        summary.push_str(&format!("## {}\n", host));
        summary.push_str(&format!("  {} pages found\n\n", host_results.len()));

        for result in host_results {
            let path = extract_url_path(&result.url);

            // Color code based on status
            let status_str = match result.status_code {
                100..=199 => format!("\x1b[37m{}\x1b[0m", result.status_code), // White
                200..=299 => format!("\x1b[32m{}\x1b[0m", result.status_code), // Green
                300..=399 => format!("\x1b[36m{}\x1b[0m", result.status_code), // Cyan
                400..=499 => format!("\x1b[33m{}\x1b[0m", result.status_code), // Orange/Yellow
                500..=599 => format!("\x1b[31m{}\x1b[0m", result.status_code), // Red
                _ => format!("{}", result.status_code),
            };

            // Build line with path and status
            let mut line = format!("  {} {}", status_str, path);

            // Only show MIME type if it's not text/html
            if let Some(ref content_type) = result.content_type
                && content_type != "text/html"
            {
                line.push_str(&format!(" \x1b[90m{}\x1b[0m", content_type));
            }

            summary.push_str(&line);
            summary.push('\n');
        }
        summary.push('\n');
    }

    summary
}
