//! Authentication contract errors
//!
//! Everything `login` and `signup` can return. Store and directory errors are
//! translated into one of these at the strategy boundary, so no persistence
//! or protocol detail reaches the caller.

use thiserror::Error;

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("User with email {0} already exists")]
    AlreadyExists(String),

    #[error("Operation not supported by the active authentication strategy")]
    Unsupported,

    /// Unknown email, wrong password and locked account all map here.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication backend unavailable")]
    BackendUnavailable,

    #[error("User creation failed: {}", .0.join(", "))]
    CreationFailed(Vec<String>),

    #[error("Failed to provision local account: {}", .0.join(", "))]
    ProvisioningFailed(Vec<String>),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AuthError {
    pub fn creation_failed(reason: impl Into<String>) -> Self {
        AuthError::CreationFailed(vec![reason.into()])
    }

    pub fn provisioning_failed(reason: impl Into<String>) -> Self {
        AuthError::ProvisioningFailed(vec![reason.into()])
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AlreadyExists(_) => "AlreadyExists",
            AuthError::Unsupported => "Unsupported",
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::BackendUnavailable => "BackendUnavailable",
            AuthError::CreationFailed(_) => "CreationFailed",
            AuthError::ProvisioningFailed(_) => "ProvisioningFailed",
            AuthError::InvalidInput(_) => "InvalidInput",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::InvalidInput(_)
            | AuthError::CreationFailed(_)
            | AuthError::Unsupported => 400,

            AuthError::InvalidCredentials => 401,

            AuthError::AlreadyExists(_) => 409,

            AuthError::BackendUnavailable => 503,

            AuthError::ProvisioningFailed(_) => 500,
        }
    }

    /// Human-readable reasons for creation and provisioning failures
    pub fn reasons(&self) -> &[String] {
        match self {
            AuthError::CreationFailed(reasons) | AuthError::ProvisioningFailed(reasons) => reasons,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_lists() {
        let err = AuthError::CreationFailed(vec![
            "Passwords must be at least 6 characters.".to_string(),
            "Passwords must have at least one digit ('0'-'9').".to_string(),
        ]);
        assert_eq!(err.reasons().len(), 2);
        assert!(err.to_string().starts_with("User creation failed: Passwords must"));
        assert!(AuthError::InvalidCredentials.reasons().is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::AlreadyExists("a@x.com".into()).http_status(), 409);
        assert_eq!(AuthError::InvalidCredentials.http_status(), 401);
        assert_eq!(AuthError::Unsupported.http_status(), 400);
        assert_eq!(AuthError::provisioning_failed("x").http_status(), 500);
    }
}
