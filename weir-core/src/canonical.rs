//! URL canonicalization
//!
//! Every URL entering the filtering pipeline is reduced to a canonical form
//! first, so that equality and dedup comparisons are meaningful:
//! - relative references are resolved against the page URL
//! - the fragment is always dropped
//! - session/tracking query parameters are stripped and the remainder sorted,
//!   so two URLs differing only by a nuisance parameter compare equal
//!
//! Trap-indicating parameters (`share`, `action`, `version`, ...) are kept
//! intact; rejecting those is the validity filter's job, not ours.

use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("malformed URL: {0}")]
    MalformedUrl(String),
}

/// Session and tracking parameters that create spurious URL permutations
const STRIPPED_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "sid",
    "sessionid",
    "phpsessid",
    "jsessionid",
    "replytocom",
];

/// A normalized, comparable URL. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub fn parse(raw: &str) -> Result<Self, NormalizeError> {
        Self::resolve(raw, None)
    }

    /// Resolve `raw` against `base` (when given) and canonicalize the result.
    ///
    /// Fails with `MalformedUrl` when the input cannot be parsed as an
    /// absolute URL with a host; the caller drops the link.
    pub fn resolve(raw: &str, base: Option<&Url>) -> Result<Self, NormalizeError> {
        let parsed = match base {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        }
        .map_err(|e| NormalizeError::MalformedUrl(format!("{}: {}", raw, e)))?;

        if !parsed.has_host() {
            return Err(NormalizeError::MalformedUrl(format!("{}: no host", raw)));
        }

        let mut url = parsed;
        url.set_fragment(None);

        if let Some(query) = url.query().map(str::to_string) {
            let mut params = query
                .split('&')
                .filter(|p| {
                    let key = p.split('=').next().unwrap_or("").to_ascii_lowercase();
                    !STRIPPED_PARAMS.contains(&key.as_str())
                })
                .collect::<Vec<_>>();

            if params.is_empty() {
                url.set_query(None);
            } else {
                params.sort_unstable();
                url.set_query(Some(&params.join("&")));
            }
        }

        Ok(CanonicalUrl(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// Value of the first query parameter with the given name, if present.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.0
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Number of non-empty `/`-separated path segments.
    pub fn path_depth(&self) -> usize {
        self.0.path().split('/').filter(|s| !s.is_empty()).count()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_is_stripped() {
        let a = CanonicalUrl::parse("https://example.com/page#section").unwrap();
        let b = CanonicalUrl::parse("https://example.com/page").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_relative_reference_resolution() {
        let base = Url::parse("https://sub.example.com/dir/index.html").unwrap();
        let resolved = CanonicalUrl::resolve("/other", Some(&base)).unwrap();
        assert_eq!(resolved.as_str(), "https://sub.example.com/other");

        let scheme_relative = CanonicalUrl::resolve("//cdn.example.com/a", Some(&base)).unwrap();
        assert_eq!(scheme_relative.as_str(), "https://cdn.example.com/a");
    }

    #[test]
    fn test_fragment_only_reference_resolves_to_base() {
        let base = Url::parse("https://example.com/page").unwrap();
        let resolved = CanonicalUrl::resolve("#top", Some(&base)).unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_tracking_params_are_stripped() {
        let a = CanonicalUrl::parse("https://example.com/p?utm_source=x&id=3").unwrap();
        let b = CanonicalUrl::parse("https://example.com/p?id=3").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_order_is_canonicalized() {
        let a = CanonicalUrl::parse("https://example.com/p?b=2&a=1").unwrap();
        let b = CanonicalUrl::parse("https://example.com/p?a=1&b=2").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_trap_params_are_kept() {
        let url = CanonicalUrl::parse("https://example.com/p?share=facebook").unwrap();
        assert_eq!(url.query(), Some("share=facebook"));
        assert_eq!(url.query_param("share").as_deref(), Some("facebook"));
    }

    #[test]
    fn test_malformed_url_is_an_error() {
        assert!(CanonicalUrl::parse("not a url").is_err());
        assert!(CanonicalUrl::parse("/relative/without/base").is_err());
        assert!(CanonicalUrl::parse("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_path_depth() {
        let url = CanonicalUrl::parse("https://example.com/a/b/c").unwrap();
        assert_eq!(url.path_depth(), 3);
        let root = CanonicalUrl::parse("https://example.com/").unwrap();
        assert_eq!(root.path_depth(), 0);
    }
}
