//! The validity filter: a declarative, ordered rule table over canonical URLs.
//!
//! Decision order (first match wins):
//! 1. scheme must be http or https
//! 2. path depth ceiling
//! 3. static trap-pattern library
//! 4. file-extension exclusion (path suffix only, case-insensitive)
//! 5. allow-list of permitted hosts/paths
//!
//! Rejections here are policy decisions, not errors; callers log them at
//! debug level at most.

use crate::canonical::CanonicalUrl;
use once_cell::sync::Lazy;
use regex::Regex;

/// A named trap pattern. Named so individual rules can be unit-tested and
/// rejection reasons traced back to the rule that fired.
pub struct TrapRule {
    pub name: &'static str,
    pub pattern: Regex,
}

impl TrapRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static trap pattern"),
        }
    }

    pub fn matches(&self, url: &CanonicalUrl) -> bool {
        self.pattern.is_match(url.as_str())
    }
}

/// Known crawler traps, accumulated from observed crawl blowups.
pub static TRAP_RULES: Lazy<Vec<TrapRule>> = Lazy::new(|| {
    vec![
        // Infinite event-calendar enumeration
        TrapRule::new("calendar-events", r"wics\.ics\.uci\.edu/events/20"),
        TrapRule::new("social-share", r"[?&]share=(facebook|twitter)"),
        TrapRule::new("login-action", r"[?&]action=login"),
        // Revision-diff views multiply every wiki page by its history length
        TrapRule::new("version-diff", r"[?&]action=diff"),
        TrapRule::new("timeline-from", r"timeline\?from"),
        // Feed, print and tag views mirror content that is crawled elsewhere
        TrapRule::new("feed-path", r"/feed/?$"),
        TrapRule::new("print-view", r"[?&]print="),
        TrapRule::new("tag-listing", r"/tag/"),
        // Image gallery plugin query marker
        TrapRule::new("gallery-query", r"/\?afg"),
        TrapRule::new("image-page", r"/img_"),
        // DokuWiki: any query string is a do=/rev=/idx= style navigation trap
        TrapRule::new("doku-query", r"doku\.php.*\?"),
        TrapRule::new("numeric-pagination", r"(/\d+){4,}$"),
    ]
});

/// Binary asset and document extensions that are never worth fetching.
/// Matched case-insensitively against the path suffix; the query string is
/// ignored for this check.
static EXCLUDED_EXTENSIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\.(css|js|bmp|gif|jpe?g|ico|png|tiff?|mid|mp2|mp3|mp4|wav|avi|mov|mpeg|ram|m4v|mkv|ogg|ogv|pdf|ps|eps|tex|ppt|pptx|doc|docx|xls|xlsx|names|data|dat|exe|bz2|tar|msi|bin|7z|psd|dmg|iso|epub|dll|cnf|tgz|sha1|thmx|mso|arff|rtf|jar|csv|rm|smil|wmv|swf|wma|zip|rar|gz|txt|htm|xml|java|bib)$",
    )
    .expect("static extension pattern")
});

/// Why a URL was turned away. Diagnostic only; never surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Scheme,
    PathTooDeep,
    Trap(&'static str),
    ExcludedExtension,
    OutsideAllowList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Rejected(RejectReason),
}

/// A permitted domain entry: a host suffix, optionally narrowed to a path
/// prefix on that host.
#[derive(Debug, Clone)]
pub struct AllowRule {
    pub host_suffix: String,
    pub path_prefix: Option<String>,
}

impl AllowRule {
    pub fn host(suffix: &str) -> Self {
        Self {
            host_suffix: suffix.to_string(),
            path_prefix: None,
        }
    }

    pub fn host_path(suffix: &str, path_prefix: &str) -> Self {
        Self {
            host_suffix: suffix.to_string(),
            path_prefix: Some(path_prefix.to_string()),
        }
    }

    fn matches(&self, url: &CanonicalUrl) -> bool {
        let host = url.host();
        let host_ok =
            host == self.host_suffix || host.ends_with(&format!(".{}", self.host_suffix));
        if !host_ok {
            return false;
        }
        match &self.path_prefix {
            Some(prefix) => url.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}

/// Static configuration for the validity filter. Loaded once, never mutated.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub max_path_depth: usize,
    pub allow_list: Vec<AllowRule>,
    /// The one `?version=` value that is a real page rather than a revision
    /// trap. Checked by string equality, deliberately not by regex.
    pub allowed_version_value: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_path_depth: 8,
            allow_list: vec![
                AllowRule::host("ics.uci.edu"),
                AllowRule::host("cs.uci.edu"),
                AllowRule::host("informatics.uci.edu"),
                AllowRule::host("stat.uci.edu"),
                AllowRule::host_path(
                    "today.uci.edu",
                    "/department/information_computer_sciences/",
                ),
            ],
            allowed_version_value: "1".to_string(),
        }
    }
}

impl FilterConfig {
    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    pub fn with_allow_list(mut self, allow_list: Vec<AllowRule>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Evaluate the full rule table. Pure: same URL and config, same verdict.
    pub fn verdict(&self, url: &CanonicalUrl) -> Verdict {
        if !matches!(url.scheme(), "http" | "https") {
            return Verdict::Rejected(RejectReason::Scheme);
        }

        if url.path_depth() > self.max_path_depth {
            return Verdict::Rejected(RejectReason::PathTooDeep);
        }

        for rule in TRAP_RULES.iter() {
            if rule.matches(url) {
                return Verdict::Rejected(RejectReason::Trap(rule.name));
            }
        }

        if let Some(version) = url.query_param("version")
            && version != self.allowed_version_value
        {
            return Verdict::Rejected(RejectReason::Trap("version-param"));
        }

        if EXCLUDED_EXTENSIONS.is_match(url.path()) {
            return Verdict::Rejected(RejectReason::ExcludedExtension);
        }

        if !self.allow_list.iter().any(|rule| rule.matches(url)) {
            return Verdict::Rejected(RejectReason::OutsideAllowList);
        }

        Verdict::Allowed
    }

    pub fn is_valid(&self, url: &CanonicalUrl) -> bool {
        matches!(self.verdict(url), Verdict::Allowed)
    }
}
