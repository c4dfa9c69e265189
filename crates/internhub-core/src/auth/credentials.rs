use tracing::{debug, warn};

use crate::models::{Session, User};

use super::storage::{KeyValueStore, StorageError};

/// Storage key for the raw bearer token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the JSON-encoded user record
pub const USER_KEY: &str = "user";

/// Durable mirror of the session: two string entries, `token` and `user`.
///
/// Nothing here fails. Without a backend every read is absent and every write
/// is a no-op; backend errors are logged and read as absent.
pub struct CredentialStore {
    backend: Option<Box<dyn KeyValueStore>>,
}

impl CredentialStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Some(Box::new(backend)),
        }
    }

    pub fn from_backend(backend: Option<Box<dyn KeyValueStore>>) -> Self {
        Self { backend }
    }

    /// A store with no durable storage behind it.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    fn get(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential entry");
                None
            }
        }
    }

    /// Load the persisted session, if both entries are present and valid.
    pub fn read(&self) -> Option<Session> {
        let token = self.get(TOKEN_KEY)?;
        let raw_user = self.get(USER_KEY)?;
        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => Some(Session::new(user, token)),
            Err(e) => {
                warn!(error = %e, "Stored user record is malformed");
                None
            }
        }
    }

    /// True when something is stored but `read` cannot assemble a session
    /// from it (one key missing, or an unparsable user).
    pub fn has_partial_record(&self) -> bool {
        let token = self.get(TOKEN_KEY);
        let user = self.get(USER_KEY);
        (token.is_some() || user.is_some()) && self.read().is_none()
    }

    pub fn write(&self, session: &Session) {
        let Some(backend) = self.backend.as_ref() else {
            debug!("Credential storage unavailable, session not persisted");
            return;
        };
        if let Err(e) = Self::write_entries(backend.as_ref(), session) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    fn write_entries(backend: &dyn KeyValueStore, session: &Session) -> Result<(), StorageError> {
        let user = serde_json::to_string(&session.user)?;
        backend.set(TOKEN_KEY, &session.token)?;
        backend.set(USER_KEY, &user)?;
        Ok(())
    }

    pub fn clear(&self) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = backend.remove(key) {
                warn!(key, error = %e, "Failed to clear credential entry");
            }
        }
    }
}
