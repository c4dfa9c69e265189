//! Render-or-redirect check shared by protected views.
//!
//! A view shows nothing until the session is resolved, redirects when it is
//! resolved to signed out, and renders only for a present session.

use tracing::{debug, info};

use crate::api::ApiError;
use crate::models::Session;

use super::{AuthState, SessionStore};

/// Default login entry point
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not known yet.
    Pending,
    Redirect(String),
    Allow(Session),
}

impl GuardDecision {
    pub fn evaluate(state: &AuthState, login_path: &str) -> Self {
        match state {
            AuthState::Unknown => GuardDecision::Pending,
            AuthState::SignedOut => GuardDecision::Redirect(login_path.to_string()),
            AuthState::SignedIn { session, .. } => GuardDecision::Allow(session.clone()),
        }
    }
}

/// What a protected view produced when mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOutcome {
    /// Nothing at all, not even a placeholder.
    Blank,
    Redirect(String),
    Content(String),
}

impl ViewOutcome {
    pub fn is_blank(&self) -> bool {
        matches!(self, ViewOutcome::Blank)
    }
}

/// A view that requires a verified session. Implementors supply `render`;
/// `mount` applies the guard so every view behaves the same way.
pub trait ProtectedView {
    fn name(&self) -> &str;

    fn render(&self, session: &Session) -> String;

    fn mount(&self, store: &SessionStore, login_path: &str) -> ViewOutcome {
        match GuardDecision::evaluate(&store.state(), login_path) {
            GuardDecision::Pending => ViewOutcome::Blank,
            GuardDecision::Redirect(to) => {
                debug!(view = self.name(), to = %to, "Not signed in, redirecting");
                ViewOutcome::Redirect(to)
            }
            GuardDecision::Allow(session) => ViewOutcome::Content(self.render(&session)),
        }
    }
}

/// Re-verify the session after a view's request was refused with 401/403.
/// Returns true when a re-check ran.
pub async fn recheck_on_rejection(store: &SessionStore, error: &ApiError) -> bool {
    if !error.is_auth_rejection() {
        return false;
    }
    info!(error = %error, "Request refused, re-verifying session");
    store.initialize().await;
    true
}
