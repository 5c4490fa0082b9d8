//! Identity provider collaborator.
//!
//! The provider's own protocol is out of scope here; this module only names
//! the few calls the reconciler needs and the credential shape they agree on.

use serde::{Deserialize, Serialize};

/// Authenticator kind passed to [`ProviderAuthenticator::setup`].
pub const PROVIDER_KIND: &str = "oidc";

/// Session credential as issued by the identity provider's token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl Credential {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: None, id_token: None, token_type: None, expires_in: None }
    }

    /// Parse a token-endpoint response body.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::MalformedResponse`] if the payload has no
    /// usable access token.
    pub fn from_token_response(raw: &serde_json::Value) -> Result<Self, ProviderError> {
        let credential: Self =
            serde_json::from_value(raw.clone()).map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        if credential.access_token.trim().is_empty() {
            return Err(ProviderError::MalformedResponse("empty access_token".into()));
        }
        Ok(credential)
    }
}

// Tokens must never end up in logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The auth response could not be turned into a credential.
    #[error("malformed auth response: {0}")]
    MalformedResponse(String),

    /// The request to the provider failed in transport.
    #[error("provider request failed: {0}")]
    Request(String),

    /// The provider answered but refused the credential.
    #[error("provider rejected credential: {0}")]
    Rejected(String),
}

/// Calls into the identity provider made while installing or tearing down a
/// session.
#[async_trait::async_trait]
pub trait ProviderAuthenticator: Send + Sync {
    /// Turn a raw token response into a credential.
    async fn handle_auth_response(&self, raw: &serde_json::Value) -> Result<Credential, ProviderError>;

    /// Prepare the provider session for `credential`. With `already_trusted`
    /// the provider must not repeat its interactive challenge.
    async fn setup(&self, kind: &str, credential: &Credential, already_trusted: bool) -> Result<(), ProviderError>;

    /// Discard provider-side state for a credential that is being replaced.
    async fn invalidate(&self, credential: &Credential) -> Result<(), ProviderError>;

    /// Start the single-logout handshake. Returns the URL the user has to
    /// visit to finish it, if the provider has one.
    async fn single_logout(&self, credential: &Credential) -> Result<Option<String>, ProviderError>;
}
