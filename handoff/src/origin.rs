//! Referrer check for portal exchange requests.

/// Whether `actual` is exactly the configured portal origin.
///
/// Both sides lose at most one trailing `/` before comparing. Anything else
/// must match byte for byte: no prefix, subdomain or path tolerance.
#[must_use]
pub fn is_trusted_origin(actual: &str, configured: &str) -> bool {
    let configured = normalize(configured);
    !configured.is_empty() && normalize(actual) == configured
}

fn normalize(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
#[path = "origin_test.rs"]
mod tests;
