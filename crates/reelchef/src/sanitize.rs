//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Traces are safe to share for debugging. Submitted URLs can carry
//! tracking parameters or credentials, so spans only ever see the
//! redacted form produced here.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strips userinfo, query string and fragment from a URL.
///
/// - `https://user:pw@www.tiktok.com/@chef/video/1?is_from_webapp=1` → `https://****@www.tiktok.com/@chef/video/1`
/// - `https://youtu.be/abc#t=10` → `https://youtu.be/abc`
/// - `not a url` → `not a url`
pub fn redact_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    if let Some(scheme_end) = without_query.find("://") {
        let after_scheme = &without_query[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].find('@') {
            let scheme = &without_query[..scheme_end + 3];
            let after_at = &after_scheme[at_pos + 1..];
            return format!("{}****@{}", scheme, after_at);
        }
    }

    without_query.to_string()
}

/// Returns a short deterministic hash of a URL for correlating log lines
/// without repeating the URL itself.
pub fn hash_url(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
