//! Session reconciler — the only writer of credential and group.
//!
//! ORDERING
//! ========
//! Replacing a session always runs in this order, under the caller's lock:
//!
//! 1. clear the selected group (memory, then store)
//! 2. discard the old credential (memory, store, provider)
//! 3. install the new credential
//! 4. hand back the remembered destination and forget it
//!
//! The group goes first because stores keep it independently of the
//! credential, and a group surviving into the next session evaluates
//! authorization under the wrong context.
//!
//! Group and credential are taken out of memory before the first store
//! write. Every clearing write is attempted even when an earlier one fails,
//! and the first failure is returned. A failed write therefore leaves the
//! in-memory session unauthenticated, but the store may still hold old
//! values; callers must not start a new login on top of that error.

use std::sync::Arc;

use crate::provider::{Credential, PROVIDER_KIND, ProviderAuthenticator, ProviderError};
use crate::session::{GroupId, SessionState, SessionStore, StoreError};
use crate::transition::TransitionId;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Another transition started after this one; its result is discarded.
    #[error("transition {0} was superseded")]
    Superseded(TransitionId),

    #[error("no authenticated session")]
    NotAuthenticated,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SessionReconciler {
    provider: Arc<dyn ProviderAuthenticator>,
    store: Arc<dyn SessionStore>,
}

impl SessionReconciler {
    #[must_use]
    pub fn new(provider: Arc<dyn ProviderAuthenticator>, store: Arc<dyn SessionStore>) -> Self {
        Self { provider, store }
    }

    /// Tear down the current session: group first, then the credential.
    ///
    /// # Errors
    ///
    /// Returns the first failed store write. The in-memory session is
    /// unauthenticated either way.
    pub async fn invalidate(&self, state: &mut SessionState) -> Result<(), ReconcileError> {
        let had_group = state.take_group().is_some();
        let old = state.take_credential();

        let group_cleared = self.write_cleared_group(had_group).await;
        let Some(old) = old else {
            return group_cleared;
        };
        let credential_cleared = self.store.write_credential(None).await;
        if let Err(e) = self.provider.invalidate(&old).await {
            // The local session is already gone; the provider entry expires on its own.
            tracing::warn!(error = %e, "provider invalidation failed");
        }
        tracing::debug!("session invalidated");

        group_cleared?;
        credential_cleared?;
        Ok(())
    }

    /// Install a credential the caller already trusts, replacing whatever
    /// session exists. Returns the destination to navigate to.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Superseded`] if `tag` is no longer the
    /// session's current transition, or a store error.
    pub async fn install_fresh_credential(
        &self,
        state: &mut SessionState,
        tag: TransitionId,
        credential: Credential,
    ) -> Result<String, ReconcileError> {
        ensure_current(state, tag)?;

        self.invalidate(state).await?;
        self.store.write_credential(Some(&credential)).await?;
        state.install(credential);

        let destination = state.take_destination();
        state.finish_transition();
        tracing::info!(%tag, %destination, "session installed");
        Ok(destination)
    }

    /// Install a raw token response obtained through the portal exchange.
    ///
    /// The exchange token was the trust anchor, so the provider is told not
    /// to repeat its challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is stale, the payload cannot be
    /// parsed, or the provider or store fails.
    pub async fn install_pretrusted_credential(
        &self,
        state: &mut SessionState,
        tag: TransitionId,
        raw: &serde_json::Value,
    ) -> Result<String, ReconcileError> {
        self.install_raw(state, tag, raw, true).await
    }

    /// Install a raw token response from the regular provider callback.
    ///
    /// # Errors
    ///
    /// Same as [`Self::install_pretrusted_credential`].
    pub async fn install_provider_credential(
        &self,
        state: &mut SessionState,
        tag: TransitionId,
        raw: &serde_json::Value,
    ) -> Result<String, ReconcileError> {
        self.install_raw(state, tag, raw, false).await
    }

    async fn install_raw(
        &self,
        state: &mut SessionState,
        tag: TransitionId,
        raw: &serde_json::Value,
        already_trusted: bool,
    ) -> Result<String, ReconcileError> {
        ensure_current(state, tag)?;
        let credential = self.provider.handle_auth_response(raw).await?;
        self.provider
            .setup(PROVIDER_KIND, &credential, already_trusted)
            .await?;
        self.install_fresh_credential(state, tag, credential)
            .await
    }

    /// Select the authorization group for the current session.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotAuthenticated`] without a session, or a
    /// store error.
    pub async fn select_group(&self, state: &mut SessionState, group: GroupId) -> Result<(), ReconcileError> {
        if !state.is_authenticated() {
            return Err(ReconcileError::NotAuthenticated);
        }
        self.store.write_group(Some(&group)).await?;
        tracing::debug!(%group, "group selected");
        state.set_group(group);
        Ok(())
    }

    /// Log out: clear the group, drop the credential, then run the
    /// provider's single logout. Returns the provider's logout URL, if any.
    ///
    /// The group is cleared on every logout, not only when the exchange path
    /// is enabled.
    ///
    /// # Errors
    ///
    /// Returns a store error. Provider failures are logged; the local session
    /// is gone regardless.
    pub async fn logout(&self, state: &mut SessionState) -> Result<Option<String>, ReconcileError> {
        let had_group = state.take_group().is_some();
        state.finish_transition();
        let old = state.take_credential();

        let group_cleared = self.write_cleared_group(had_group).await;
        let Some(old) = old else {
            return group_cleared.map(|()| None);
        };
        let credential_cleared = self.store.write_credential(None).await;
        let url = match self.provider.single_logout(&old).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "single logout failed");
                None
            }
        };

        group_cleared?;
        credential_cleared?;
        Ok(url)
    }

    async fn write_cleared_group(&self, had_group: bool) -> Result<(), ReconcileError> {
        // Always written: the store may hold a group this process never saw.
        self.store.write_group(None).await?;
        if had_group {
            tracing::debug!("group cleared");
        }
        Ok(())
    }
}

fn ensure_current(state: &SessionState, tag: TransitionId) -> Result<(), ReconcileError> {
    if state.is_current(tag) {
        Ok(())
    } else {
        Err(ReconcileError::Superseded(tag))
    }
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
