//! Pattern-trap tracking by generalized path shape.
//!
//! The static rule table can only reject traps we have seen before. This
//! tracker catches the rest: it collapses every maximal digit run in a path
//! to `N` (`/events/2024/10` becomes `/events/N/N`) and counts how often each
//! shape shows up. Past a ceiling, the shape is treated as a pagination-style
//! trap and every further URL of that shape is suppressed.

use crate::canonical::CanonicalUrl;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_SHAPE_CEILING: u32 = 30;

/// Replace every maximal run of ASCII digits in the path with `N`.
pub fn path_shape(url: &CanonicalUrl) -> String {
    let mut shape = String::with_capacity(url.path().len());
    let mut in_digits = false;
    for ch in url.path().chars() {
        if ch.is_ascii_digit() {
            if !in_digits {
                shape.push('N');
                in_digits = true;
            }
        } else {
            shape.push(ch);
            in_digits = false;
        }
    }
    shape
}

/// Stateful per-shape counter. Monotonic for the crawl lifetime; never reset.
#[derive(Debug)]
pub struct ShapeTracker {
    counts: HashMap<String, u32>,
    ceiling: u32,
}

impl ShapeTracker {
    pub fn new(ceiling: u32) -> Self {
        Self {
            counts: HashMap::new(),
            ceiling,
        }
    }

    /// Record one sighting of the URL's shape. Returns true while the shape
    /// is still under its ceiling; the counter increments regardless of the
    /// outcome.
    pub fn check_and_record(&mut self, url: &CanonicalUrl) -> bool {
        let shape = format!("{}{}", url.host(), path_shape(url));
        let count = self.counts.entry(shape).or_insert(0);
        *count += 1;
        if *count > self.ceiling {
            debug!("shape ceiling exceeded for {}", url);
            false
        } else {
            true
        }
    }

    pub fn shape_count(&self, url: &CanonicalUrl) -> u32 {
        let shape = format!("{}{}", url.host(), path_shape(url));
        self.counts.get(&shape).copied().unwrap_or(0)
    }
}

impl Default for ShapeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_SHAPE_CEILING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::parse(s).unwrap()
    }

    #[test]
    fn test_path_shape_collapses_digit_runs() {
        assert_eq!(
            path_shape(&url("https://example.com/events/2024/10")),
            "/events/N/N"
        );
        assert_eq!(
            path_shape(&url("https://example.com/item42/page7")),
            "/itemN/pageN"
        );
        assert_eq!(path_shape(&url("https://example.com/plain")), "/plain");
    }

    #[test]
    fn test_ceiling_rejects_after_threshold() {
        let mut tracker = ShapeTracker::new(30);
        for day in 1..=30 {
            let u = url(&format!("https://example.com/events/2024/{}", day));
            assert!(tracker.check_and_record(&u), "URL {} should pass", day);
        }
        // 31st distinct URL of the same shape is suppressed
        let u = url("https://example.com/events/2024/31");
        assert!(!tracker.check_and_record(&u));
        // and stays suppressed
        let u = url("https://example.com/events/2025/1");
        assert!(!tracker.check_and_record(&u));
    }

    #[test]
    fn test_different_shapes_count_separately() {
        let mut tracker = ShapeTracker::new(2);
        assert!(tracker.check_and_record(&url("https://example.com/a/1")));
        assert!(tracker.check_and_record(&url("https://example.com/a/2")));
        assert!(!tracker.check_and_record(&url("https://example.com/a/3")));
        // distinct shape, own counter
        assert!(tracker.check_and_record(&url("https://example.com/b/1/x")));
    }

    #[test]
    fn test_same_path_on_different_hosts_is_distinct() {
        let mut tracker = ShapeTracker::new(1);
        assert!(tracker.check_and_record(&url("https://a.example.com/p/1")));
        assert!(tracker.check_and_record(&url("https://b.example.com/p/1")));
        assert!(!tracker.check_and_record(&url("https://a.example.com/p/2")));
    }
}
