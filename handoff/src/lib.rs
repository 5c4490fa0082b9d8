//! Handoff — session establishment for portal and provider logins.
//!
//! ARCHITECTURE
//! ============
//! A user reaches the login entry point either straight from the identity
//! provider (a callback `code`) or from the external portal carrying a
//! one-time exchange `token`. Both paths end in the same place: a single
//! `SessionState` holding one credential, no stale group selection, and the
//! user's original destination restored.
//!
//! ```text
//! PendingTransition ─► EntryRouter ─┬─► DelegateToProvider (code / internal / disabled)
//!                                   ├─► RedirectToPortal   (no token yet)
//!                                   └─► TokenExchanger ─► origin check ─► backend
//!                                                          │
//!                                                          ▼
//!                                                  SessionReconciler ─► SessionState
//! ```
//!
//! DESIGN
//! ======
//! - The referrer tag and query values travel in a typed `PendingTransition`
//!   value; nothing about the attempt is kept as ambient mutable state.
//! - `SessionState` is owned by one `SessionHandle`; only the reconciler
//!   mutates the credential and the selected group.
//! - Every exchange is tagged with its transition id. A result whose tag is
//!   no longer current is discarded instead of committed.

pub mod config;
pub mod destination;
pub mod exchange;
pub mod notify;
pub mod origin;
pub mod provider;
pub mod reconcile;
pub mod router;
pub mod session;
pub mod transition;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{ConfigError, HandoffConfig};
pub use destination::DestinationMemory;
pub use exchange::{BackendError, BackendResponse, ExchangeBackend, ExchangeFailure, ExchangeOutcome, HttpExchangeBackend, TokenExchanger};
pub use notify::{Language, Notification, NotificationLevel};
pub use origin::is_trusted_origin;
pub use provider::{Credential, ProviderAuthenticator, ProviderError};
pub use reconcile::{ReconcileError, SessionReconciler};
pub use router::{EntryOutcome, EntryPath, EntryRouter};
pub use session::{GroupId, MemoryStore, SessionHandle, SessionState, SessionStore, SessionView, StoreError};
pub use transition::{PendingTransition, ReferrerTag, TransitionId};
