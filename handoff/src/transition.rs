//! Pending transition — one navigation attempt at the login entry point.
//!
//! A transition is built from the incoming request, passed by value through
//! the router and exchanger, and dropped when the attempt resolves. The
//! referrer tag lives here instead of on the session, so reading it for one
//! decision cannot leak into a later navigation.

use std::collections::HashMap;
use std::fmt;

use uuid::Uuid;

use crate::destination::is_app_path;

/// Query parameter carrying the portal exchange token.
pub const QUERY_TOKEN: &str = "token";
/// Query parameter carrying the identity provider callback code.
pub const QUERY_CODE: &str = "code";
/// Query parameter overriding the post-login destination.
pub const QUERY_NEXT_URL: &str = "nextUrl";

/// Route-name prefix of pages reachable without a login.
const PUBLIC_ROUTE_PREFIX: &str = "public-instances";

/// Tag used to match an in-flight exchange against the session's current
/// transition before anything is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionId(Uuid);

impl TransitionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where the login attempt was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferrerTag {
    /// Started by the internal application; always uses the provider login.
    Internal,
    External,
}

impl ReferrerTag {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "internal" => Some(Self::Internal),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransition {
    id: TransitionId,
    /// URL the user originally tried to open before being sent to login.
    pub requested_url: Option<String>,
    pub query_token: Option<String>,
    pub provider_code: Option<String>,
    /// Explicit destination override (`nextUrl`).
    pub next_url: Option<String>,
    pub referrer_tag: Option<ReferrerTag>,
    /// Document referrer of the navigation, checked against the portal origin.
    pub referrer: Option<String>,
    /// Name of the route the navigation came from.
    pub from_route: Option<String>,
}

impl PendingTransition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: TransitionId::new(),
            requested_url: None,
            query_token: None,
            provider_code: None,
            next_url: None,
            referrer_tag: None,
            referrer: None,
            from_route: None,
        }
    }

    /// Build a transition from login query parameters. Empty values count as
    /// absent.
    #[must_use]
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| non_empty(params.get(key).map(String::as_str));
        Self {
            query_token: get(QUERY_TOKEN),
            provider_code: get(QUERY_CODE),
            next_url: get(QUERY_NEXT_URL),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let value: String = token.into();
        self.query_token = non_empty(Some(value.as_str()));
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        let value: String = code.into();
        self.provider_code = non_empty(Some(value.as_str()));
        self
    }

    #[must_use]
    pub fn with_next_url(mut self, url: impl Into<String>) -> Self {
        let value: String = url.into();
        self.next_url = non_empty(Some(value.as_str()));
        self
    }

    #[must_use]
    pub fn with_requested_url(mut self, url: Option<String>) -> Self {
        self.requested_url = non_empty(url.as_deref());
        self
    }

    #[must_use]
    pub fn with_referrer(mut self, referrer: Option<String>) -> Self {
        self.referrer = non_empty(referrer.as_deref());
        self
    }

    #[must_use]
    pub fn with_referrer_tag(mut self, tag: Option<ReferrerTag>) -> Self {
        self.referrer_tag = tag;
        self
    }

    #[must_use]
    pub fn with_from_route(mut self, route: Option<String>) -> Self {
        self.from_route = non_empty(route.as_deref());
        self
    }

    #[must_use]
    pub fn id(&self) -> TransitionId {
        self.id
    }

    /// Destination to remember for this attempt: the explicit `nextUrl`
    /// wins over the originally requested URL. Values that are not app paths
    /// are ignored.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.next_url
            .as_deref()
            .filter(|url| is_app_path(url))
            .or_else(|| self.requested_url.as_deref().filter(|url| is_app_path(url)))
    }

    #[must_use]
    pub fn from_public_route(&self) -> bool {
        self.from_route
            .as_deref()
            .is_some_and(|name| name.starts_with(PUBLIC_ROUTE_PREFIX))
    }
}

impl Default for PendingTransition {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[path = "transition_test.rs"]
mod tests;
