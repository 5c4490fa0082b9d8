//! Handoff configuration parsed from environment variables.

use crate::notify::Language;

pub const DEFAULT_EXCHANGE_URL: &str = "http://127.0.0.1:3000/api/v1/auth/token-exchange";
pub const DEFAULT_DESTINATION: &str = "/";
pub const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing config: env var {var} not set")]
    Missing { var: String },

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Everything the entry router and token exchanger need to know about the
/// portal and the application's own login endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffConfig {
    /// Origin of the trusted external portal, without trailing slash.
    pub portal_url: String,
    /// Portal path that starts an authenticated login.
    pub prestation_path: String,
    /// Portal path used when the user came from a public page.
    pub public_prestation_path: String,
    /// Callback URL the portal sends the user back to.
    pub redirect_uri: String,
    /// Feature flag for the whole portal exchange path.
    pub token_exchange_enabled: bool,
    /// Backend endpoint that redeems portal tokens.
    pub exchange_url: String,
    /// Fallback when no destination was remembered.
    pub default_destination: String,
    pub language: Language,
    pub exchange_timeout_secs: u64,
}

impl HandoffConfig {
    /// Config with defaults for everything but the two required URLs.
    #[must_use]
    pub fn new(portal_url: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            portal_url: trim_url(&portal_url.into()),
            prestation_path: String::new(),
            public_prestation_path: String::new(),
            redirect_uri: redirect_uri.into(),
            token_exchange_enabled: true,
            exchange_url: DEFAULT_EXCHANGE_URL.to_owned(),
            default_destination: DEFAULT_DESTINATION.to_owned(),
            language: Language::default(),
            exchange_timeout_secs: DEFAULT_EXCHANGE_TIMEOUT_SECS,
        }
    }

    /// Build typed handoff config from environment variables.
    ///
    /// Required:
    /// - `HANDOFF_PORTAL_URL`
    /// - `HANDOFF_REDIRECT_URI`
    ///
    /// Optional:
    /// - `HANDOFF_PRESTATION_PATH`: default empty (portal root)
    /// - `HANDOFF_PUBLIC_PRESTATION_PATH`: defaults to the prestation path
    /// - `HANDOFF_TOKEN_EXCHANGE`: default `true`
    /// - `HANDOFF_EXCHANGE_URL`: default [`DEFAULT_EXCHANGE_URL`]
    /// - `HANDOFF_DEFAULT_DESTINATION`: default `/`
    /// - `HANDOFF_LANGUAGE`: `de` (default), `fr`, `it` or `en`
    /// - `HANDOFF_EXCHANGE_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value is
    /// malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let portal_url = required("HANDOFF_PORTAL_URL")?;
        let redirect_uri = required("HANDOFF_REDIRECT_URI")?;
        if !portal_url.starts_with("http://") && !portal_url.starts_with("https://") {
            return Err(ConfigError::Parse(format!("HANDOFF_PORTAL_URL must be an http(s) URL: {portal_url}")));
        }

        let prestation_path = std::env::var("HANDOFF_PRESTATION_PATH").unwrap_or_default();
        let public_prestation_path =
            std::env::var("HANDOFF_PUBLIC_PRESTATION_PATH").unwrap_or_else(|_| prestation_path.clone());
        let token_exchange_enabled = match std::env::var("HANDOFF_TOKEN_EXCHANGE") {
            Ok(raw) => parse_bool(&raw)
                .ok_or_else(|| ConfigError::Parse(format!("HANDOFF_TOKEN_EXCHANGE is not a boolean: {raw}")))?,
            Err(_) => true,
        };
        let language = std::env::var("HANDOFF_LANGUAGE")
            .map(|raw| Language::parse(&raw))
            .unwrap_or_default();

        Ok(Self {
            portal_url: trim_url(&portal_url),
            prestation_path,
            public_prestation_path,
            redirect_uri,
            token_exchange_enabled,
            exchange_url: std::env::var("HANDOFF_EXCHANGE_URL").unwrap_or_else(|_| DEFAULT_EXCHANGE_URL.to_owned()),
            default_destination: std::env::var("HANDOFF_DEFAULT_DESTINATION")
                .unwrap_or_else(|_| DEFAULT_DESTINATION.to_owned()),
            language,
            exchange_timeout_secs: env_parse("HANDOFF_EXCHANGE_TIMEOUT_SECS", DEFAULT_EXCHANGE_TIMEOUT_SECS),
        })
    }
}

/// Read a boolean env var. Unset or unrecognised values yield `None`.
#[must_use]
pub fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|raw| parse_bool(&raw))
}

/// Read and parse an env var, falling back to `default` when unset or invalid.
pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        _ => Err(ConfigError::Missing { var: var.to_owned() }),
    }
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_owned()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
