use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{Session, User};

use super::{CredentialStore, IdentityVerifier};

/// Observable authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Hydration has not finished; nothing is known yet.
    Unknown,
    SignedOut,
    SignedIn {
        session: Session,
        /// When the server last confirmed this session.
        verified_at: DateTime<Utc>,
    },
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::SignedIn { session, .. } => Some(session),
            _ => None,
        }
    }

    fn signed_in(session: Session) -> Self {
        AuthState::SignedIn {
            session,
            verified_at: Utc::now(),
        }
    }
}

/// In-memory session state, mirrored to a `CredentialStore`.
///
/// Every mutation bumps a generation counter. A hydration that finds the
/// generation moved while it was waiting on the verifier drops its result, so
/// a logout or fresh login issued mid-hydration is never overwritten.
pub struct SessionStore {
    credentials: CredentialStore,
    verifier: Arc<dyn IdentityVerifier>,
    state: watch::Sender<AuthState>,
    generation: AtomicU64,
}

impl SessionStore {
    pub fn new(credentials: CredentialStore, verifier: Arc<dyn IdentityVerifier>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            credentials,
            verifier,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the session with a server-issued pair. The token is opaque and
    /// is stored as given.
    pub fn set_auth(&self, user: User, token: String) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let session = Session::new(user, token);
        self.credentials.write(&session);
        debug!(user_id = session.user.id, "Session set");
        self.state.send_replace(AuthState::signed_in(session));
    }

    /// Drop the session from memory and storage. Safe to call repeatedly.
    pub fn logout(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.credentials.clear();
        let changed = self.state.send_if_modified(|state| {
            if *state == AuthState::SignedOut {
                false
            } else {
                *state = AuthState::SignedOut;
                true
            }
        });
        if changed {
            info!("Signed out");
        }
    }

    /// Load the persisted session and confirm it with the verifier.
    ///
    /// Always completes: a missing or unreadable record leaves the store
    /// signed out, and any verification error clears the session.
    pub async fn initialize(&self) {
        let generation = self.generation.load(Ordering::SeqCst);

        let Some(stored) = self.credentials.read() else {
            if self.credentials.has_partial_record() {
                debug!("Removing incomplete credential record");
                self.credentials.clear();
            }
            debug!("No stored session");
            self.state.send_replace(AuthState::SignedOut);
            return;
        };

        debug!(user_id = stored.user.id, "Verifying stored session");
        let result = self.verifier.verify(&stored.token).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Session changed during verification, discarding result");
            return;
        }

        match result {
            Ok(user) => {
                let session = Session::new(user, stored.token);
                self.credentials.write(&session);
                info!(user_id = session.user.id, "Stored session verified");
                self.state.send_replace(AuthState::signed_in(session));
            }
            Err(e) => {
                warn!(error = %e, "Stored session rejected, signing out");
                self.credentials.clear();
                self.state.send_replace(AuthState::SignedOut);
            }
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().session().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session().is_some()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Current mutation count. Pass it back to `replace_user` so a result
    /// fetched before a logout or login is discarded.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Swap in a fresh user record for the current session, keeping the
    /// token. Does nothing if the session changed since `expected_generation`
    /// or there is no session.
    pub fn replace_user(&self, expected_generation: u64, user: User) -> bool {
        if self.generation() != expected_generation {
            debug!("Session changed while fetching user, discarding result");
            return false;
        }
        let Some(mut session) = self.session() else {
            return false;
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        session.user = user;
        self.credentials.write(&session);
        debug!(user_id = session.user.id, "User record refreshed");
        self.state.send_replace(AuthState::signed_in(session));
        true
    }
}
