//! Token exchanger — redeem a portal token for a local session.
//!
//! FLOW
//! ====
//! 1. lock, mark the transition current, invalidate any live session, unlock
//! 2. referrer must be the configured portal, else fail without a request
//! 3. one `POST {"jwt-token": ...}` to the backend exchange endpoint
//! 4. classify the response (`classify_response` is pure for testability)
//! 5. lock, commit through the reconciler if the transition is still current
//!
//! Any failure queues one localized notification and leaves the session
//! unauthenticated. The lock is never held across the network call; the
//! transition tag is what keeps a late result from landing in a session that
//! has moved on.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::config::HandoffConfig;
use crate::notify::Notification;
use crate::origin::is_trusted_origin;
use crate::provider::{Credential, ProviderError};
use crate::reconcile::{ReconcileError, SessionReconciler};
use crate::session::SessionHandle;
use crate::transition::{PendingTransition, TransitionId};

/// JSON field the backend expects the portal token in.
pub const EXCHANGE_TOKEN_FIELD: &str = "jwt-token";

// =============================================================================
// OUTCOME
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeFailure {
    #[error("referrer is not the trusted portal")]
    UntrustedOrigin,

    /// Backend refused the token (expired, already used, unknown).
    #[error("backend rejected token: {0}")]
    BackendRejected(String),

    #[error("malformed exchange response: {0}")]
    MalformedResponse(String),

    /// Transport failure or anything unexpected while exchanging.
    #[error("exchange request failed: {0}")]
    NetworkError(String),

    /// A newer login attempt replaced this one before it could commit.
    #[error("exchange superseded by a newer login attempt")]
    Superseded,
}

impl ExchangeFailure {
    /// Stable, grepable reason code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UntrustedOrigin => "untrusted-origin",
            Self::BackendRejected(_) => "backend-rejected",
            Self::MalformedResponse(_) => "malformed-response",
            Self::NetworkError(_) => "network-error",
            Self::Superseded => "superseded",
        }
    }
}

impl From<ReconcileError> for ExchangeFailure {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Superseded(_) => Self::Superseded,
            ReconcileError::Provider(ProviderError::MalformedResponse(msg)) => Self::MalformedResponse(msg),
            other => Self::NetworkError(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Session installed; `destination` is where the user goes next.
    Success { credential: Credential, destination: String },
    Failure(ExchangeFailure),
}

impl ExchangeOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

// =============================================================================
// BACKEND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    #[error("exchange request failed: {0}")]
    Transport(String),
}

/// The backend endpoint that redeems portal tokens.
#[async_trait::async_trait]
pub trait ExchangeBackend: Send + Sync {
    async fn post_token(&self, token: &str) -> Result<BackendResponse, BackendError>;
}

pub struct HttpExchangeBackend {
    http: reqwest::Client,
    url: String,
}

impl HttpExchangeBackend {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::ClientBuild(e.to_string()))?;
        Ok(Self { http, url: url.into() })
    }

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &HandoffConfig) -> Result<Self, BackendError> {
        Self::new(config.exchange_url.clone(), Duration::from_secs(config.exchange_timeout_secs))
    }
}

#[async_trait::async_trait]
impl ExchangeBackend for HttpExchangeBackend {
    async fn post_token(&self, token: &str) -> Result<BackendResponse, BackendError> {
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&serde_json::json!({ EXCHANGE_TOKEN_FIELD: token }))
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(BackendResponse { status, body })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    code: Option<String>,
}

/// Turn a backend response into the raw credential payload, or the reason
/// it was refused.
///
/// # Errors
///
/// `BackendRejected(code)` for a structured non-2xx error,
/// `MalformedResponse` for any body that does not parse as expected.
pub fn classify_response(response: &BackendResponse) -> Result<serde_json::Value, ExchangeFailure> {
    if (200..300).contains(&response.status) {
        return serde_json::from_str::<serde_json::Value>(&response.body)
            .ok()
            .filter(serde_json::Value::is_object)
            .ok_or_else(|| ExchangeFailure::MalformedResponse(format!("status {}: not a JSON object", response.status)));
    }

    let parsed: ErrorBody = serde_json::from_str(&response.body)
        .map_err(|e| ExchangeFailure::MalformedResponse(format!("status {}: {e}", response.status)))?;
    let failure = parsed
        .errors
        .into_iter()
        .find_map(|entry| entry.code.filter(|c| !c.is_empty()))
        .map_or_else(
            || ExchangeFailure::MalformedResponse(format!("status {}: no error code", response.status)),
            ExchangeFailure::BackendRejected,
        );
    Err(failure)
}

// =============================================================================
// EXCHANGER
// =============================================================================

pub struct TokenExchanger {
    config: Arc<HandoffConfig>,
    backend: Arc<dyn ExchangeBackend>,
    reconciler: Arc<SessionReconciler>,
}

impl TokenExchanger {
    #[must_use]
    pub fn new(
        config: Arc<HandoffConfig>,
        backend: Arc<dyn ExchangeBackend>,
        reconciler: Arc<SessionReconciler>,
    ) -> Self {
        Self { config, backend, reconciler }
    }

    /// Redeem `token` for `transition` and install the resulting session.
    pub async fn exchange(&self, session: &SessionHandle, transition: &PendingTransition, token: &str) -> ExchangeOutcome {
        let tag = transition.id();
        let invalidated = {
            let mut state = session.lock().await;
            state.begin_transition(tag);
            if state.is_authenticated() {
                self.reconciler.invalidate(&mut state).await
            } else {
                Ok(())
            }
        };

        let redeemed = match invalidated {
            Ok(()) => self.redeem(session, transition, token, tag).await,
            Err(e) => {
                // The previous session may still be persisted; no request goes out.
                tracing::warn!(%tag, error = %e, "invalidating previous session failed");
                Err(ExchangeFailure::from(e))
            }
        };

        match redeemed {
            Ok((credential, destination)) => ExchangeOutcome::Success { credential, destination },
            Err(failure) => {
                self.fail(session, tag, &failure).await;
                ExchangeOutcome::Failure(failure)
            }
        }
    }

    async fn redeem(
        &self,
        session: &SessionHandle,
        transition: &PendingTransition,
        token: &str,
        tag: TransitionId,
    ) -> Result<(Credential, String), ExchangeFailure> {
        let referrer = transition.referrer.as_deref().unwrap_or_default();
        if !is_trusted_origin(referrer, &self.config.portal_url) {
            tracing::warn!(%referrer, portal = %self.config.portal_url, "exchange refused: untrusted referrer");
            return Err(ExchangeFailure::UntrustedOrigin);
        }

        let response = self
            .backend
            .post_token(token)
            .await
            .map_err(|e| ExchangeFailure::NetworkError(e.to_string()))?;
        let raw = classify_response(&response)?;

        let mut state = session.lock().await;
        let destination = self
            .reconciler
            .install_pretrusted_credential(&mut state, tag, &raw)
            .await?;
        let credential = state
            .credential()
            .cloned()
            .ok_or_else(|| ExchangeFailure::NetworkError("credential missing after install".into()))?;
        Ok((credential, destination))
    }

    async fn fail(&self, session: &SessionHandle, tag: TransitionId, failure: &ExchangeFailure) {
        let mut state = session.lock().await;
        if !state.is_current(tag) {
            tracing::info!(%tag, "discarding result of superseded token exchange");
            return;
        }

        tracing::error!(%tag, reason = failure.code(), error = %failure, "token exchange failed");
        if state.is_authenticated() {
            if let Err(e) = self.reconciler.invalidate(&mut state).await {
                tracing::warn!(error = %e, "rollback after failed exchange incomplete");
            }
        }
        state.finish_transition();
        state.notify(Notification::exchange_failed(self.config.language));
    }
}

#[cfg(test)]
#[path = "exchange_test.rs"]
mod tests;
