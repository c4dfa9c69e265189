use async_trait::async_trait;

use crate::api::ApiError;
use crate::models::User;

/// Confirms that a bearer token is still live and returns the canonical user
/// record for it. Any error means the token must be treated as invalid.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<User, ApiError>;
}
