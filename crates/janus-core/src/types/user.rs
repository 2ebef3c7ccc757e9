//! Identity types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{generate_identity_id, normalize_email};

/// Canonical local identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Absent for directory-provisioned accounts
    #[serde(skip_serializing)]
    pub credential_hash: Option<String>,
    /// Links the record to a directory entry
    pub directory_uuid: Option<String>,
    pub failed_attempt_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserIdentity {
    /// New account created through local signup
    pub fn local(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        credential_hash: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_identity_id(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            credential_hash: Some(credential_hash),
            directory_uuid: None,
            failed_attempt_count: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// New shadow account provisioned from a directory login
    pub fn provisioned(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        directory_uuid: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_identity_id(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            credential_hash: None,
            directory_uuid: Some(directory_uuid.into()),
            failed_attempt_count: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Lookup key for the email index
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.map(|until| until > now).unwrap_or(false)
    }

    /// Whether the stored directory id already equals `uuid`
    pub fn is_linked_to(&self, uuid: &str) -> bool {
        self.directory_uuid.as_deref() == Some(uuid)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Count one failed attempt. At `max_failed_attempts` the account locks
    /// until `lock_until` and the counter starts over. Returns whether this
    /// attempt locked the account.
    pub fn apply_failed_attempt(&mut self, max_failed_attempts: u32, lock_until: DateTime<Utc>) -> bool {
        let count = self.failed_attempt_count.saturating_add(1);
        let locked = count >= max_failed_attempts;

        if locked {
            self.failed_attempt_count = 0;
            self.locked_until = Some(lock_until);
        } else {
            self.failed_attempt_count = count;
        }
        self.touch();

        locked
    }

    pub fn clear_failed_attempts(&mut self) {
        self.failed_attempt_count = 0;
        self.locked_until = None;
        self.touch();
    }
}
