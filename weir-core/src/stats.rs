//! Crawl statistics: unique pages, subdomain distribution, word frequencies.
//!
//! One aggregate owned by the page processor and mutated only under its lock.
//! Every counter is monotonic for the crawl lifetime; nothing here is ever
//! decremented or reset.

use crate::canonical::CanonicalUrl;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap, HashSet};

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| include_str!("stopwords.txt").lines().collect());

#[derive(Debug, Clone, Copy)]
struct WordEntry {
    count: u64,
    first_seen: u64,
}

/// Process-wide crawl statistics, lifetime = crawl session.
#[derive(Debug)]
pub struct CrawlStats {
    visited: HashSet<String>,
    subdomain_counts: BTreeMap<String, u64>,
    /// Only hosts under this suffix contribute to the subdomain table
    monitored_suffix: String,
    word_counts: HashMap<String, WordEntry>,
    next_word_seq: u64,
    /// (url, word count) in visit order; first-seen order breaks ties
    page_word_counts: Vec<(String, usize)>,
}

impl CrawlStats {
    pub fn new(monitored_suffix: &str) -> Self {
        Self {
            visited: HashSet::new(),
            subdomain_counts: BTreeMap::new(),
            monitored_suffix: monitored_suffix.to_string(),
            word_counts: HashMap::new(),
            next_word_seq: 0,
            page_word_counts: Vec::new(),
        }
    }

    /// Record a visit to a page. Returns false when the canonical URL was
    /// already in the visited set.
    pub fn record_visit(&mut self, url: &CanonicalUrl) -> bool {
        if !self.visited.insert(url.as_str().to_string()) {
            return false;
        }

        let host = url.host().trim_start_matches("www.");
        if host == self.monitored_suffix || host.ends_with(&format!(".{}", self.monitored_suffix))
        {
            *self.subdomain_counts.entry(host.to_string()).or_insert(0) += 1;
        }
        true
    }

    /// Tokenize the page text and fold it into the word tables.
    pub fn record_words(&mut self, url: &CanonicalUrl, text: &str) {
        let mut page_words = 0usize;

        for token in tokenize(text) {
            page_words += 1;
            let seq = self.next_word_seq;
            let entry = self.word_counts.entry(token).or_insert_with(|| {
                WordEntry {
                    count: 0,
                    first_seen: seq,
                }
            });
            entry.count += 1;
            self.next_word_seq += 1;
        }

        self.page_word_counts
            .push((url.as_str().to_string(), page_words));
    }

    pub fn unique_pages(&self) -> usize {
        self.visited.len()
    }

    pub fn was_visited(&self, url: &CanonicalUrl) -> bool {
        self.visited.contains(url.as_str())
    }

    /// The page with the most recorded words. Ties go to the earlier page.
    pub fn longest_page(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (url, count) in &self.page_word_counts {
            match best {
                Some((_, best_count)) if *count <= best_count => {}
                _ => best = Some((url.as_str(), *count)),
            }
        }
        best
    }

    /// The `n` most frequent words, count descending; ties broken by
    /// first-seen order.
    pub fn top_words(&self, n: usize) -> Vec<(String, u64)> {
        let mut words = self
            .word_counts
            .iter()
            .map(|(word, entry)| (word.clone(), entry.count, entry.first_seen))
            .collect::<Vec<_>>();
        words.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        words
            .into_iter()
            .take(n)
            .map(|(word, count, _)| (word, count))
            .collect()
    }

    /// (subdomain, visit count) pairs, lexicographically sorted by subdomain.
    pub fn subdomains(&self) -> impl Iterator<Item = (&str, u64)> {
        self.subdomain_counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn word_count_for(&self, url: &CanonicalUrl) -> Option<usize> {
        self.page_word_counts
            .iter()
            .find(|(u, _)| u == url.as_str())
            .map(|(_, c)| *c)
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new("ics.uci.edu")
    }
}

/// Word-like tokens: lowercase alphanumeric runs of length >= 2 that are not
/// stop words.
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::parse(s).unwrap()
    }

    #[test]
    fn test_tokenize_filters_stop_words_and_short_tokens() {
        let tokens: Vec<_> = tokenize("The cat and a dog ran to X").collect();
        assert_eq!(tokens, vec!["cat", "dog", "ran"]);
    }

    #[test]
    fn test_record_visit_is_idempotent_per_url() {
        let mut stats = CrawlStats::new("ics.uci.edu");
        let u = url("https://vision.ics.uci.edu/projects");
        assert!(stats.record_visit(&u));
        assert!(!stats.record_visit(&u));
        assert_eq!(stats.unique_pages(), 1);
        let counts: Vec<_> = stats.subdomains().collect();
        assert_eq!(counts, vec![("vision.ics.uci.edu", 1)]);
    }

    #[test]
    fn test_unmonitored_host_not_in_subdomain_table() {
        let mut stats = CrawlStats::new("ics.uci.edu");
        stats.record_visit(&url("https://stat.uci.edu/about"));
        assert_eq!(stats.unique_pages(), 1);
        assert_eq!(stats.subdomains().count(), 0);
    }
}
