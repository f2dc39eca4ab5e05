//! Core crawl logic for weir: canonical URLs, the validity filter, trap
//! detection, content de-duplication, statistics, and report rendering.

use colored::Colorize;

pub mod canonical;
pub mod crawl;
pub mod dedup;
pub mod process;
pub mod report;
pub mod rules;
pub mod shape;
pub mod stats;

pub use canonical::{CanonicalUrl, NormalizeError};
pub use crawl::{
    CrawlOptions, CrawlOutcome, CrawlProgressCallback, CrawlResultCallback, execute_crawl,
    extract_url_path, generate_crawl_summary,
};
pub use dedup::{DedupStrategy, FingerprintIndex, SimHash};
pub use process::{PageProcessor, ProcessorConfig};
pub use rules::{AllowRule, FilterConfig, RejectReason, Verdict};
pub use shape::ShapeTracker;
pub use stats::CrawlStats;

const BANNER: &str = r#"
               _
 __      _____(_)_ __
 \ \ /\ / / _ \ | '__|
  \ V  V /  __/ | |
   \_/\_/ \___|_|_|
"#;

pub fn print_banner() {
    println!("{}", BANNER.bright_cyan());
    println!(
        "  {} {}",
        "weir".bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    println!("  {}\n", "a restricted-domain web crawler".bright_black());
}
