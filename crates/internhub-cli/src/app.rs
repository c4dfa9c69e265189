//! Application shell for the InternHub client.
//!
//! `App` is the composition root: it builds the credential store, the API
//! client and the session store, and owns the bootstrap/teardown lifecycle.
//! Views receive the session store from here rather than from a global.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use internhub_core::api::{ApiClient, ApiError, AuthApi};
use internhub_core::auth::{
    recheck_on_rejection, CredentialStore, IdentityVerifier, ProtectedView, SessionStore, ViewOutcome,
};
use internhub_core::models::{RegisterRequest, Session};
use internhub_core::Config;

/// Shown when a login failure carries no server message.
const LOGIN_FALLBACK: &str = "Login failed";

/// Shown when a registration failure carries no server message.
const REGISTER_FALLBACK: &str = "Registration failed";

pub struct App<A: AuthApi = ApiClient> {
    /// File values only; environment overrides never land here.
    pub config: Config,
    /// False when the config file could not be read, so it is never clobbered.
    pub persist_config: bool,
    config_dirty: bool,
    api: Arc<A>,
    store: SessionStore,
    pub login_error: Option<String>,
}

impl App<ApiClient> {
    /// Build the application from configuration.
    pub fn new(config: Config) -> Result<Self> {
        let effective = config.with_env_overrides();
        let api = ApiClient::new(&effective.api_base_url, effective.request_timeout())?;

        let cache_dir = match effective.cache_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(error = %e, "Could not resolve cache directory");
                None
            }
        };
        debug!(?cache_dir, storage = ?effective.storage, "Credential storage configured");
        let backend = effective.storage.open(cache_dir.as_deref());

        Ok(Self::with_parts(config, Arc::new(api), CredentialStore::from_backend(backend)))
    }
}

impl<A: AuthApi + 'static> App<A> {
    pub fn with_parts(config: Config, api: Arc<A>, credentials: CredentialStore) -> Self {
        let store = SessionStore::new(credentials, api.clone());
        Self {
            config,
            persist_config: true,
            config_dirty: false,
            api,
            store,
            login_error: None,
        }
    }

    /// Hydrate the session from storage. Run once before any view mounts.
    pub async fn bootstrap(&self) {
        self.store.initialize().await;
        info!(authenticated = self.store.is_authenticated(), "Session hydrated");
    }

    /// Persist configuration on the way out, if anything in it changed.
    pub fn teardown(self) -> Result<()> {
        if self.needs_config_save() {
            self.config.save()?;
        }
        debug!("App torn down");
        Ok(())
    }

    fn needs_config_save(&self) -> bool {
        self.persist_config && self.config_dirty
    }

    fn remember_email(&mut self, email: &str) {
        if self.config.last_email.as_deref() != Some(email) {
            self.config.last_email = Some(email.to_string());
            self.config_dirty = true;
        }
    }

    pub fn session(&self) -> Option<Session> {
        self.store.session()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Log in with email and password. On failure `login_error` holds the
    /// message to show the user.
    pub async fn attempt_login(&mut self, email: &str, password: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            self.login_error = Some("Email and password required".to_string());
            return Err(anyhow::anyhow!("Email and password required"));
        }

        self.login_error = None;

        match self.api.login(email, password).await {
            Ok(session) => {
                self.remember_email(email);
                self.store.set_auth(session.user, session.token);
                info!("Login successful");
                Ok(())
            }
            Err(e) => Err(self.record_failure(e, LOGIN_FALLBACK)),
        }
    }

    /// Create an account and sign in with it.
    pub async fn attempt_register(&mut self, request: &RegisterRequest) -> Result<()> {
        if request.name.trim().is_empty()
            || request.email.trim().is_empty()
            || request.phone.trim().is_empty()
            || request.password.is_empty()
        {
            self.login_error = Some("Name, email, phone and password required".to_string());
            return Err(anyhow::anyhow!("Missing registration fields"));
        }

        self.login_error = None;

        match self.api.register(request).await {
            Ok(session) => {
                self.remember_email(&session.user.email);
                self.store.set_auth(session.user, session.token);
                info!("Registration successful");
                Ok(())
            }
            Err(e) => Err(self.record_failure(e, REGISTER_FALLBACK)),
        }
    }

    fn record_failure(&mut self, e: ApiError, fallback: &str) -> anyhow::Error {
        error!(error = %e, "{}", fallback);
        let message = e.user_message(fallback);
        self.login_error = Some(message.clone());
        anyhow::anyhow!(message)
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn open(&self, view: &dyn ProtectedView) -> ViewOutcome {
        view.mount(&self.store, &self.config.login_path)
    }

    /// Fetch the latest user record for the current session. A 401/403 makes
    /// the store re-verify, which signs out a dead token.
    ///
    /// A result that arrives after a logout or another login is dropped.
    pub async fn refresh_user(&self) -> Result<(), ApiError> {
        let generation = self.store.generation();
        let Some(session) = self.store.session() else {
            return Ok(());
        };
        match self.api.verify(&session.token).await {
            Ok(user) => {
                if user != session.user {
                    self.store.replace_user(generation, user);
                }
                Ok(())
            }
            Err(e) => {
                if self.store.generation() == generation {
                    recheck_on_rejection(&self.store, &e).await;
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use internhub_core::auth::{KeyValueStore, MemoryStore};
    use internhub_core::models::{Role, User};

    use crate::views::DashboardView;

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            email: "a@x.com".to_string(),
            phone: "1".to_string(),
            college: None,
            city: None,
            role: Role::Student,
        }
    }

    /// Stands in for the backend: one account, `a@x.com` / `p`.
    struct FakeBackend {
        current_user: Mutex<Option<User>>,
        verify_calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FakeBackend {
        fn new(user: Option<User>) -> Arc<Self> {
            Arc::new(Self {
                current_user: Mutex::new(user),
                verify_calls: AtomicUsize::new(0),
                gate: None,
            })
        }

        /// Verification parks until `gate` is notified.
        fn gated(user: User, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                current_user: Mutex::new(Some(user)),
                verify_calls: AtomicUsize::new(0),
                gate: Some(gate),
            })
        }

        fn revoke(&self) {
            *self.current_user.lock().expect("lock") = None;
        }
    }

    #[async_trait]
    impl IdentityVerifier for FakeBackend {
        async fn verify(&self, token: &str) -> Result<User, ApiError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }
            match self.current_user.lock().expect("lock").clone() {
                Some(user) if token == "tok1" => Ok(user),
                _ => Err(ApiError::Unauthorized(None)),
            }
        }
    }

    #[async_trait]
    impl AuthApi for FakeBackend {
        async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
            if email == "a@x.com" && password == "p" {
                Ok(Session::new(user(1, "A"), "tok1"))
            } else {
                Err(ApiError::Unauthorized(Some("Invalid credentials".to_string())))
            }
        }

        async fn register(&self, request: &RegisterRequest) -> Result<Session, ApiError> {
            if request.email == "a@x.com" {
                return Err(ApiError::Rejected("Email already registered".to_string()));
            }
            Err(ApiError::ServerError("database down".to_string()))
        }
    }

    fn app(backend: &MemoryStore, api: Arc<FakeBackend>) -> App<FakeBackend> {
        App::with_parts(Config::default(), api, CredentialStore::new(backend.clone()))
    }

    #[tokio::test]
    async fn test_login_persists_and_unlocks_views() {
        let storage = MemoryStore::new();
        let mut app = app(&storage, FakeBackend::new(Some(user(1, "A"))));
        app.bootstrap().await;
        assert_eq!(app.open(&DashboardView), ViewOutcome::Redirect("/login".to_string()));

        app.attempt_login("a@x.com", "p").await.expect("login");

        assert_eq!(storage.get("token").expect("get"), Some("tok1".to_string()));
        let raw_user = storage.get("user").expect("get").expect("user stored");
        let stored: serde_json::Value = serde_json::from_str(&raw_user).expect("json");
        assert_eq!(stored["id"], 1);
        assert_eq!(stored["role"], "STUDENT");

        assert!(matches!(app.open(&DashboardView), ViewOutcome::Content(_)));
        assert_eq!(app.config.last_email.as_deref(), Some("a@x.com"));
        assert_eq!(app.login_error, None);
    }

    #[tokio::test]
    async fn test_views_blank_before_bootstrap() {
        let storage = MemoryStore::new();
        let app = app(&storage, FakeBackend::new(None));
        assert!(app.open(&DashboardView).is_blank());
    }

    #[tokio::test]
    async fn test_login_failure_uses_server_message() {
        let storage = MemoryStore::new();
        let mut app = app(&storage, FakeBackend::new(None));

        let result = app.attempt_login("a@x.com", "wrong").await;

        assert!(result.is_err());
        assert_eq!(app.login_error.as_deref(), Some("Invalid credentials"));
        assert!(storage.is_empty());
        assert!(app.session().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let mut app = app(&MemoryStore::new(), FakeBackend::new(None));
        assert!(app.attempt_login("  ", "p").await.is_err());
        assert_eq!(app.login_error.as_deref(), Some("Email and password required"));
    }

    #[tokio::test]
    async fn test_register_failures() {
        let mut app = app(&MemoryStore::new(), FakeBackend::new(None));
        let mut request = RegisterRequest {
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            phone: "1".to_string(),
            password: "p".to_string(),
            ..Default::default()
        };

        assert!(app.attempt_register(&request).await.is_err());
        assert_eq!(app.login_error.as_deref(), Some("Email already registered"));

        request.email = "b@x.com".to_string();
        assert!(app.attempt_register(&request).await.is_err());
        assert_eq!(app.login_error.as_deref(), Some("Registration failed"));
    }

    #[tokio::test]
    async fn test_bootstrap_restores_previous_login() {
        let storage = MemoryStore::new();
        let api = FakeBackend::new(Some(user(1, "A")));
        let mut first = app(&storage, api.clone());
        first.attempt_login("a@x.com", "p").await.expect("login");

        let second = app(&storage, api.clone());
        second.bootstrap().await;

        assert_eq!(second.session().map(|s| s.token), Some("tok1".to_string()));
        assert_eq!(api.verify_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_revoked_token_signs_out_on_refresh() {
        let storage = MemoryStore::new();
        let api = FakeBackend::new(Some(user(1, "A")));
        let mut app = app(&storage, api.clone());
        app.attempt_login("a@x.com", "p").await.expect("login");

        api.revoke();
        let result = app.refresh_user().await;

        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
        assert_eq!(app.open(&DashboardView), ViewOutcome::Redirect("/login".to_string()));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_server_changes() {
        let storage = MemoryStore::new();
        let api = FakeBackend::new(Some(user(1, "A")));
        let mut app = app(&storage, api.clone());
        app.attempt_login("a@x.com", "p").await.expect("login");

        *api.current_user.lock().expect("lock") = Some(user(1, "Renamed"));
        app.refresh_user().await.expect("refresh");

        assert_eq!(app.session().map(|s| s.user.name), Some("Renamed".to_string()));
    }

    #[tokio::test]
    async fn test_logout_then_bootstrap_skips_verification() {
        let storage = MemoryStore::new();
        let api = FakeBackend::new(Some(user(1, "A")));
        let mut app = app(&storage, api.clone());
        app.attempt_login("a@x.com", "p").await.expect("login");
        app.logout();

        let next = self::app(&storage, api.clone());
        next.bootstrap().await;

        assert_eq!(next.open(&DashboardView), ViewOutcome::Redirect("/login".to_string()));
        assert_eq!(api.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_stays_signed_out() {
        let storage = MemoryStore::new();
        let gate = Arc::new(Notify::new());
        let api = FakeBackend::gated(user(1, "A"), gate.clone());
        let mut app = app(&storage, api.clone());
        app.attempt_login("a@x.com", "p").await.expect("login");
        *api.current_user.lock().expect("lock") = Some(user(1, "Renamed"));

        let refresh = app.refresh_user();
        tokio::pin!(refresh);

        // Drive the refresh until it parks on the verifier
        tokio::select! {
            biased;
            _ = &mut refresh => panic!("refresh finished before the gate opened"),
            _ = tokio::task::yield_now() => {}
        }
        assert_eq!(api.verify_calls.load(Ordering::SeqCst), 1);

        app.logout();
        gate.notify_one();
        refresh.await.expect("refresh resolves");

        assert!(app.session().is_none());
        assert_eq!(app.open(&DashboardView), ViewOutcome::Redirect("/login".to_string()));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_config_saved_only_when_email_changes() {
        let mut app = app(&MemoryStore::new(), FakeBackend::new(Some(user(1, "A"))));
        assert!(!app.needs_config_save());

        assert!(app.attempt_login("a@x.com", "wrong").await.is_err());
        assert!(!app.needs_config_save());

        app.attempt_login("a@x.com", "p").await.expect("login");
        assert!(app.needs_config_save());
    }

    #[tokio::test]
    async fn test_same_email_does_not_dirty_config() {
        let mut config = Config::default();
        config.last_email = Some("a@x.com".to_string());
        let mut app = App::with_parts(
            config,
            FakeBackend::new(Some(user(1, "A"))),
            CredentialStore::new(MemoryStore::new()),
        );

        app.attempt_login("a@x.com", "p").await.expect("login");
        assert!(!app.needs_config_save());
    }

    #[tokio::test]
    async fn test_unreadable_config_never_saved() {
        let mut app = app(&MemoryStore::new(), FakeBackend::new(Some(user(1, "A"))));
        app.persist_config = false;

        app.attempt_login("a@x.com", "p").await.expect("login");
        assert!(!app.needs_config_save());
    }
}
