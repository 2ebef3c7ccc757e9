//! Authentication strategies
//!
//! Both strategies implement [`AuthService`]. They are selected once at
//! startup through [`crate::Authenticator`], never per request.

mod directory;
mod local;

pub use directory::DirectoryAuthService;
pub use local::LocalAuthService;

use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use janus_core::types::{IdentityId, LoginRequest, SignupRequest};

/// The authentication contract consumed by transports
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Create a new identity and return its id
    async fn signup(&self, request: &SignupRequest) -> AuthResult<IdentityId>;

    /// Verify credentials and return the resolved identity id
    async fn login(&self, request: &LoginRequest) -> AuthResult<IdentityId>;
}

/// Trimmed value of a required field
fn required(field: &str, value: &str) -> AuthResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidInput(format!(
            "{} cannot be null or empty",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Passwords are checked for blankness but never trimmed.
fn required_password(value: &str) -> AuthResult<&str> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidInput(
            "Password cannot be null or empty".to_string(),
        ));
    }
    Ok(value)
}
