//! Destination memory — where to send the user once login resolves.

/// Whether `url` is a path inside this application. Absolute URLs and the
/// protocol-relative forms browsers resolve to another host (`//host`,
/// `/\host`, control characters) are refused.
#[must_use]
pub fn is_app_path(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url.starts_with("/\\")
        && !url.chars().any(char::is_control)
}

/// Remembers the destination of one login attempt.
///
/// The first write wins: redirects that pass through the login entry point
/// again (portal round trip, provider callback) must not replace the page
/// the user actually asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationMemory {
    stored: Option<String>,
    fallback: String,
}

impl DestinationMemory {
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self { stored: None, fallback: fallback.into() }
    }

    /// Store `url` unless a destination is already held or it is not an
    /// app path. Returns whether the value was stored.
    pub fn remember(&mut self, url: &str) -> bool {
        let url = url.trim();
        if self.stored.is_some() || !is_app_path(url) {
            return false;
        }
        self.stored = Some(url.to_owned());
        true
    }

    /// Stored destination, or the configured fallback.
    #[must_use]
    pub fn recall(&self) -> &str {
        self.stored.as_deref().unwrap_or(&self.fallback)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.stored.is_some()
    }

    pub fn clear(&mut self) {
        self.stored = None;
    }

    /// Recall and clear in one step.
    pub fn take(&mut self) -> String {
        self.stored.take().unwrap_or_else(|| self.fallback.clone())
    }
}

#[cfg(test)]
#[path = "destination_test.rs"]
mod tests;
