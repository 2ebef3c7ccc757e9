//! Utility functions

use uuid::Uuid;

/// Generate a new identity ID
pub fn generate_identity_id() -> String {
    Uuid::new_v4().to_string()
}

/// Normalize an email for case-insensitive lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
