//! REST client for the InternHub backend.
//!
//! This module provides the `ApiClient` used for login, registration and
//! token verification against the `/auth` endpoints, and the `AuthApi` trait
//! the application shell depends on.
//!
//! Authenticated requests carry the session token as a bearer token.

use async_trait::async_trait;

use crate::auth::IdentityVerifier;
use crate::models::{RegisterRequest, Session};

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// The `/auth` operations that create a session.
#[async_trait]
pub trait AuthApi: IdentityVerifier {
    async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError>;
    async fn register(&self, request: &RegisterRequest) -> Result<Session, ApiError>;
}
