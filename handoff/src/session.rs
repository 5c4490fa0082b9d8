//! Session state — the one owner of credential and group selection.
//!
//! DESIGN
//! ======
//! `SessionState` is never global. Each session lives behind one
//! `SessionHandle`; the router, exchanger and reconciler borrow it for the
//! duration of a step and nothing else can see it mid-step. Mutators for the
//! credential and the selected group are crate-private and only called by
//! `SessionReconciler`, so a stale group paired with a new credential cannot
//! be produced from outside.
//!
//! Authentication is derived from the credential (`Some` = authenticated)
//! instead of being a second flag that could drift.

use std::fmt;
use std::sync::{Arc, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::destination::DestinationMemory;
use crate::notify::Notification;
use crate::provider::Credential;
use crate::transition::TransitionId;

// =============================================================================
// GROUP
// =============================================================================

/// Authorization context the user operates under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store write failed: {0}")]
    Write(String),
}

/// Persistence behind the session. Group selection is written separately
/// from the credential because stores keep it independently.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn write_group(&self, group: Option<&GroupId>) -> Result<(), StoreError>;
    async fn write_credential(&self, credential: Option<&Credential>) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    group: std::sync::Mutex<Option<GroupId>>,
    credential: std::sync::Mutex<Option<Credential>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn group(&self) -> Option<GroupId> {
        self.group
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn write_group(&self, group: Option<&GroupId>) -> Result<(), StoreError> {
        *self.group.lock().unwrap_or_else(PoisonError::into_inner) = group.cloned();
        Ok(())
    }

    async fn write_credential(&self, credential: Option<&Credential>) -> Result<(), StoreError> {
        *self
            .credential
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = credential.cloned();
        Ok(())
    }
}

// =============================================================================
// SESSION STATE
// =============================================================================

#[derive(Debug)]
pub struct SessionState {
    credential: Option<Credential>,
    selected_group: Option<GroupId>,
    destination: DestinationMemory,
    /// Transition allowed to commit a credential; `None` when idle.
    current_transition: Option<TransitionId>,
    notifications: Vec<Notification>,
}

impl SessionState {
    #[must_use]
    pub fn new(default_destination: impl Into<String>) -> Self {
        Self {
            credential: None,
            selected_group: None,
            destination: DestinationMemory::new(default_destination),
            current_transition: None,
            notifications: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    #[must_use]
    pub fn selected_group(&self) -> Option<&GroupId> {
        self.selected_group.as_ref()
    }

    #[must_use]
    pub fn destination(&self) -> &DestinationMemory {
        &self.destination
    }

    #[must_use]
    pub fn current_transition(&self) -> Option<TransitionId> {
        self.current_transition
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Hand out queued notifications; each one is shown once.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// First-write-wins destination for the in-flight attempt.
    pub fn remember_destination(&mut self, url: &str) -> bool {
        self.destination.remember(url)
    }

    /// Make `id` the only transition allowed to commit. Any exchange still
    /// running for an older transition will be discarded.
    pub fn begin_transition(&mut self, id: TransitionId) {
        if let Some(previous) = self.current_transition.replace(id) {
            if previous != id {
                tracing::debug!(%previous, current = %id, "login transition superseded");
            }
        }
    }

    #[must_use]
    pub fn is_current(&self, id: TransitionId) -> bool {
        self.current_transition == Some(id)
    }

    /// Resolve `id` without a credential change: forget the transition and
    /// its destination. Does nothing once a newer transition has started.
    pub fn abandon_transition(&mut self, id: TransitionId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        self.finish_transition();
        true
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            authenticated: self.is_authenticated(),
            group: self.selected_group.clone(),
            pending_destination: self.destination.is_set().then(|| self.destination.recall().to_owned()),
        }
    }

    // Reconciler-only mutators below.

    pub(crate) fn take_group(&mut self) -> Option<GroupId> {
        self.selected_group.take()
    }

    pub(crate) fn set_group(&mut self, group: GroupId) {
        self.selected_group = Some(group);
    }

    pub(crate) fn take_credential(&mut self) -> Option<Credential> {
        self.credential.take()
    }

    /// Install a credential. The group is always reset alongside.
    pub(crate) fn install(&mut self, credential: Credential) {
        self.selected_group = None;
        self.credential = Some(credential);
    }

    /// Resolve the attempt: forget the transition and its destination.
    pub(crate) fn finish_transition(&mut self) {
        self.current_transition = None;
        self.destination.clear();
    }

    pub(crate) fn take_destination(&mut self) -> String {
        self.destination.take()
    }

    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

/// Read-only snapshot handed to code outside the handoff core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub authenticated: bool,
    pub group: Option<GroupId>,
    pub pending_destination: Option<String>,
}

// =============================================================================
// HANDLE
// =============================================================================

/// Shared owner of one `SessionState`. Clone is cheap.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<SessionState>>);

impl SessionHandle {
    #[must_use]
    pub fn new(state: SessionState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Exclusive access for one step of a flow. Never held across the
    /// backend exchange request.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.0.lock().await
    }

    pub async fn view(&self) -> SessionView {
        self.0.lock().await.view()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
