//! Core library for the InternHub client.
//!
//! Owns the session lifecycle every protected view depends on: credential
//! persistence, hydration against `/auth/me`, and the render-or-redirect
//! guard, plus the HTTP client for the `/auth` endpoints.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, AuthApi};
pub use auth::{AuthState, CredentialStore, IdentityVerifier, ProtectedView, SessionStore, ViewOutcome};
pub use config::Config;
pub use models::{Role, Session, User};
