// Crawl report rendering

use crate::stats::CrawlStats;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const TOP_WORD_COUNT: usize = 50;

/// Render the four report sections in their fixed order:
/// 1. unique page count
/// 2. longest page URL and its word count
/// 3. the 50 most common words, one `word: count` per line
/// 4. `subdomain, count` per line, lexicographically sorted
///
/// The layout is deliberately stable; downstream tooling diffs these files.
pub fn render_report(stats: &CrawlStats) -> String {
    let mut report = String::new();

    report.push_str(&format!("{}\n", stats.unique_pages()));

    match stats.longest_page() {
        Some((url, words)) => report.push_str(&format!("{}, {}\n", url, words)),
        None => report.push_str("none, 0\n"),
    }

    for (word, count) in stats.top_words(TOP_WORD_COUNT) {
        report.push_str(&format!("{}: {}\n", word, count));
    }

    for (subdomain, count) in stats.subdomains() {
        report.push_str(&format!("{}, {}\n", subdomain, count));
    }

    report
}

/// JSON rendering of the same data, for machine consumers.
pub fn render_json_report(stats: &CrawlStats) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Weir",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
            },
            "unique_pages": stats.unique_pages(),
            "longest_page": stats.longest_page().map(|(url, words)| {
                serde_json::json!({ "url": url, "words": words })
            }),
            "top_words": stats
                .top_words(TOP_WORD_COUNT)
                .into_iter()
                .map(|(word, count)| serde_json::json!({ "word": word, "count": count }))
                .collect::<Vec<_>>(),
            "subdomains": stats
                .subdomains()
                .map(|(subdomain, count)| {
                    serde_json::json!({ "subdomain": subdomain, "count": count })
                })
                .collect::<Vec<_>>(),
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
