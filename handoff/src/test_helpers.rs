//! Recording doubles shared by the handoff unit tests.
//!
//! Every double appends to one shared call log so tests can assert the
//! order of store writes, provider calls and backend requests.

use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::config::HandoffConfig;
use crate::exchange::{BackendError, BackendResponse, ExchangeBackend, TokenExchanger};
use crate::provider::{Credential, ProviderAuthenticator, ProviderError};
use crate::reconcile::SessionReconciler;
use crate::session::{GroupId, SessionHandle, SessionState, SessionStore, StoreError};
use crate::transition::TransitionId;

pub const PORTAL: &str = "https://portal.example/";
pub const REDIRECT_URI: &str = "https://app.example/login";
pub const DEFAULT_DESTINATION: &str = "/";

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn test_config() -> HandoffConfig {
    let mut config = HandoffConfig::new(PORTAL, REDIRECT_URI);
    config.prestation_path = "/prestations/login".into();
    config.public_prestation_path = "/prestations/public".into();
    config
}

pub fn token_response(access_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "refresh_token": "refresh",
        "id_token": "id",
        "token_type": "Bearer",
        "expires_in": 300
    })
}

// =============================================================================
// STORE
// =============================================================================

pub struct RecordingStore {
    log: CallLog,
    pub fail_writes: bool,
    /// Fail only the write that clears the group.
    pub fail_group_clear: bool,
}

impl RecordingStore {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail_writes: false, fail_group_clear: false }
    }
}

#[async_trait::async_trait]
impl SessionStore for RecordingStore {
    async fn write_group(&self, group: Option<&GroupId>) -> Result<(), StoreError> {
        let value = group.map_or_else(|| "none".to_owned(), ToString::to_string);
        self.log.lock().unwrap().push(format!("store.group={value}"));
        if self.fail_group_clear && group.is_none() {
            return Err(StoreError::Write("group".into()));
        }
        Ok(())
    }

    async fn write_credential(&self, credential: Option<&Credential>) -> Result<(), StoreError> {
        let value = credential.map_or("none", |c| c.access_token.as_str());
        self.log
            .lock()
            .unwrap()
            .push(format!("store.credential={value}"));
        if self.fail_writes && credential.is_some() {
            return Err(StoreError::Write("disk full".into()));
        }
        Ok(())
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

pub struct RecordingProvider {
    log: CallLog,
    pub reject_setup: bool,
}

impl RecordingProvider {
    pub fn new(log: CallLog) -> Self {
        Self { log, reject_setup: false }
    }
}

#[async_trait::async_trait]
impl ProviderAuthenticator for RecordingProvider {
    async fn handle_auth_response(&self, raw: &serde_json::Value) -> Result<Credential, ProviderError> {
        self.log
            .lock()
            .unwrap()
            .push("provider.handle_auth_response".into());
        Credential::from_token_response(raw)
    }

    async fn setup(&self, kind: &str, _credential: &Credential, already_trusted: bool) -> Result<(), ProviderError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("provider.setup({kind}, trusted={already_trusted})"));
        if self.reject_setup {
            return Err(ProviderError::Rejected("challenge failed".into()));
        }
        Ok(())
    }

    async fn invalidate(&self, credential: &Credential) -> Result<(), ProviderError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("provider.invalidate({})", credential.access_token));
        Ok(())
    }

    async fn single_logout(&self, credential: &Credential) -> Result<Option<String>, ProviderError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("provider.single_logout({})", credential.access_token));
        Ok(Some("https://idp.example/logout".into()))
    }
}

// =============================================================================
// BACKEND
// =============================================================================

pub enum Script {
    Respond(u16, String),
    Fail(String),
}

/// Backend double that answers every request with the same script.
pub struct ScriptedBackend {
    log: CallLog,
    script: Script,
}

impl ScriptedBackend {
    pub fn respond(log: CallLog, status: u16, body: serde_json::Value) -> Self {
        Self { log, script: Script::Respond(status, body.to_string()) }
    }

    pub fn respond_raw(log: CallLog, status: u16, body: &str) -> Self {
        Self { log, script: Script::Respond(status, body.to_owned()) }
    }

    pub fn fail(log: CallLog, message: &str) -> Self {
        Self { log, script: Script::Fail(message.to_owned()) }
    }
}

#[async_trait::async_trait]
impl ExchangeBackend for ScriptedBackend {
    async fn post_token(&self, token: &str) -> Result<BackendResponse, BackendError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("backend.post_token({token})"));
        match &self.script {
            Script::Respond(status, body) => Ok(BackendResponse { status: *status, body: body.clone() }),
            Script::Fail(message) => Err(BackendError::Transport(message.clone())),
        }
    }
}

// =============================================================================
// WIRING
// =============================================================================

pub fn reconciler(log: &CallLog) -> Arc<SessionReconciler> {
    Arc::new(SessionReconciler::new(
        Arc::new(RecordingProvider::new(log.clone())),
        Arc::new(RecordingStore::new(log.clone())),
    ))
}

pub fn exchanger(log: &CallLog, backend: Arc<dyn ExchangeBackend>) -> TokenExchanger {
    TokenExchanger::new(Arc::new(test_config()), backend, reconciler(log))
}

pub fn exchanger_with(backend: Arc<dyn ExchangeBackend>, reconciler: Arc<SessionReconciler>) -> TokenExchanger {
    TokenExchanger::new(Arc::new(test_config()), backend, reconciler)
}

pub fn empty_session() -> SessionHandle {
    SessionHandle::new(SessionState::new(DEFAULT_DESTINATION))
}

/// A session already logged in as `old-token` with group `42` selected.
pub async fn authenticated_session() -> SessionHandle {
    let log = call_log();
    let reconciler = reconciler(&log);
    let session = empty_session();
    {
        let mut state = session.lock().await;
        let tag = TransitionId::new();
        state.begin_transition(tag);
        reconciler
            .install_fresh_credential(&mut state, tag, Credential::new("old-token"))
            .await
            .unwrap();
        reconciler
            .select_group(&mut state, GroupId::new("42"))
            .await
            .unwrap();
    }
    session
}
