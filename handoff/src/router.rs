//! Entry router — pick the authentication path for a login navigation.

use std::sync::Arc;

use crate::config::HandoffConfig;
use crate::exchange::{ExchangeOutcome, TokenExchanger};
use crate::session::SessionHandle;
use crate::transition::{PendingTransition, ReferrerTag};

/// Query parameter the portal reads the callback URL from.
pub const PORTAL_REDIRECT_PARAM: &str = "redirectUrl";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPath {
    /// Regular identity provider login.
    Provider,
    /// Portal handoff through a one-time exchange token.
    TokenExchange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Hand the navigation to the provider login; `code` is set when this is
    /// the provider's callback.
    DelegateToProvider { code: Option<String> },
    /// No token yet: send the user to the portal to obtain one.
    RedirectToPortal { url: String },
    Exchanged(ExchangeOutcome),
}

pub struct EntryRouter {
    config: Arc<HandoffConfig>,
    exchanger: TokenExchanger,
}

impl EntryRouter {
    #[must_use]
    pub fn new(config: Arc<HandoffConfig>, exchanger: TokenExchanger) -> Self {
        Self { config, exchanger }
    }

    #[must_use]
    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Decide the path for `transition` without side effects.
    #[must_use]
    pub fn decide(&self, transition: &PendingTransition) -> EntryPath {
        let has_code = transition.provider_code.is_some();
        let internal = transition.referrer_tag == Some(ReferrerTag::Internal);
        if has_code || internal || !self.config.token_exchange_enabled {
            EntryPath::Provider
        } else {
            EntryPath::TokenExchange
        }
    }

    /// Route one login navigation. The transition, and with it the referrer
    /// tag, is consumed here.
    pub async fn route(&self, session: &SessionHandle, transition: PendingTransition) -> EntryOutcome {
        let path = self.decide(&transition);
        tracing::debug!(
            transition = %transition.id(),
            ?path,
            referrer_tag = ?transition.referrer_tag,
            "routing login transition"
        );

        match path {
            EntryPath::Provider => EntryOutcome::DelegateToProvider { code: transition.provider_code },
            EntryPath::TokenExchange => self.token_exchange(session, transition).await,
        }
    }

    async fn token_exchange(&self, session: &SessionHandle, transition: PendingTransition) -> EntryOutcome {
        if let Some(destination) = transition.destination() {
            session.lock().await.remember_destination(destination);
        }

        match transition.query_token.as_deref() {
            Some(token) => EntryOutcome::Exchanged(self.exchanger.exchange(session, &transition, token).await),
            None => {
                let url = self.portal_redirect_url(&transition);
                tracing::info!(%url, "no exchange token, redirecting to portal");
                EntryOutcome::RedirectToPortal { url }
            }
        }
    }

    /// Portal login URL that sends the user back to our callback afterwards.
    #[must_use]
    pub fn portal_redirect_url(&self, transition: &PendingTransition) -> String {
        let path = if transition.from_public_route() {
            &self.config.public_prestation_path
        } else {
            &self.config.prestation_path
        };
        format!(
            "{}{}?{}={}",
            self.config.portal_url,
            path,
            PORTAL_REDIRECT_PARAM,
            urlencoding::encode(&self.config.redirect_uri)
        )
    }
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
