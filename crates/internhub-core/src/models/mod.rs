//! Data models shared by the session store and the API client.
//!
//! - `User`, `Role`: the identity record returned by the backend
//! - `Session`: a user paired with its bearer token
//! - Request/response bodies for the `/auth` endpoints

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, ErrorBody, LoginRequest, RegisterRequest};
pub use user::{Role, Session, User};
