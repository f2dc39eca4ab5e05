use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

// Helper functions for crawl handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add https:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    // Try to parse as-is
    if Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    // Try adding https://
    let with_scheme = format!("https://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

// Re-export crawl types and functions from weir-core
pub use weir_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path, generate_crawl_summary,
};
pub use weir_core::process::ProcessorConfig;
pub use weir_core::report::{render_json_report, render_report, save_report};

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&10);
    let max_pages = *sub_matches.get_one::<usize>("max-pages").unwrap_or(&0);
    let delay_ms = *sub_matches.get_one::<u64>("delay-ms").unwrap_or(&500);
    let output = sub_matches.get_one::<PathBuf>("output");
    let json = sub_matches.get_flag("json");

    // Load seed URLs from source
    let urls = match load_urls_from_source(url, hosts_file) {
        Ok(urls) => urls,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    // Print crawl configuration
    if !quiet {
        println!("\n🕷️  Crawling from {} seed(s)", urls.len());
        println!("Workers: {}", threads);
        if max_pages > 0 {
            println!("Page budget: {}", max_pages);
        }
        println!("Politeness delay: {}ms\n", delay_ms);
    }

    let options = CrawlOptions {
        urls,
        threads,
        max_pages,
        delay_ms,
        show_progress_bars: !quiet,
        processor: ProcessorConfig::default(),
    };

    // Execute crawl with progress callback
    let progress_callback: CrawlProgressCallback = Arc::new(|msg: String| {
        println!("{}", msg);
    });

    let outcome = match execute_crawl(options, Some(progress_callback), None).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} Crawl failed: {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        println!("\n{} Crawl complete!\n", "✓".green().bold());
        print!("{}", generate_crawl_summary(&outcome.results));
    }

    // Render the crawl report
    let stats = outcome.processor.stats();
    let report = if json {
        match render_json_report(&stats) {
            Ok(rendered) => rendered,
            Err(e) => {
                eprintln!("{} Failed to render report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }
    } else {
        render_report(&stats)
    };

    match output {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.display().to_string()).to_string();
            if let Err(e) = save_report(&report, Path::new(&expanded)) {
                eprintln!(
                    "{} Failed to write report to {}: {}",
                    "✗".red().bold(),
                    expanded,
                    e
                );
                std::process::exit(1);
            }
            if !quiet {
                println!(
                    "{} Report written to {}",
                    "✓".green().bold(),
                    expanded.bright_white()
                );
            }
        }
        None => print!("{}", report),
    }
}
