//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `CredentialStore`: the durable `token`/`user` record
//! - `SessionStore`: observable in-memory session state with hydration
//! - `IdentityVerifier`: the remote check a stored token must pass
//! - `ProtectedView`: the render-or-redirect guard used by dashboard views
//!
//! A stored session is never trusted until the server has confirmed its token
//! at least once since process start.

pub mod credentials;
pub mod guard;
pub mod session;
pub mod storage;
pub mod verifier;

pub use credentials::CredentialStore;
pub use guard::{recheck_on_rejection, GuardDecision, ProtectedView, ViewOutcome, DEFAULT_LOGIN_PATH};
pub use session::{AuthState, SessionStore};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError, StorageKind};
pub use verifier::IdentityVerifier;
