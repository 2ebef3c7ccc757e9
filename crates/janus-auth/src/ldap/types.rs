//! Directory entry, errors and attribute normalization

use janus_core::{DEFAULT_DIRECTORY_FIRST_NAME, DEFAULT_DIRECTORY_LAST_NAME};
use ldap3::SearchEntry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Directory Entry
// ============================================================================

/// A user found and verified in the directory.
///
/// Built for a single login attempt and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Bind principal for the verification step
    pub distinguished_name: String,

    /// Directory-side stable identifier, in canonical string form
    pub unique_id: String,

    pub given_name: Option<String>,

    pub surname: Option<String>,
}

impl DirectoryEntry {
    /// Given name, or the sentinel when the directory has none
    pub fn first_name(&self) -> &str {
        non_empty(self.given_name.as_deref()).unwrap_or(DEFAULT_DIRECTORY_FIRST_NAME)
    }

    /// Surname, or the sentinel when the directory has none
    pub fn last_name(&self) -> &str {
        non_empty(self.surname.as_deref()).unwrap_or(DEFAULT_DIRECTORY_LAST_NAME)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Errors
// ============================================================================

/// LDAP result code for invalid credentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Failed to connect to LDAP server: {0}")]
    Connection(String),

    #[error("Service account bind failed: {0}")]
    ServiceBind(String),

    #[error("User search failed: {0}")]
    Search(String),

    #[error("No directory entry matches the user filter")]
    UserNotFound,

    #[error("User bind rejected with code {0}")]
    UserBindRejected(u32),

    #[error("Attribute '{0}' is missing or empty")]
    MissingUniqueId(String),

    #[error("LDAP protocol error: {0}")]
    Protocol(String),
}

impl DirectoryError {
    /// Failures that say something about the user's credentials rather
    /// than about the directory itself.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            DirectoryError::UserNotFound | DirectoryError::UserBindRejected(_)
        )
    }
}

// ============================================================================
// Server Info
// ============================================================================

/// LDAP server information from the root DSE
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapServerInfo {
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub naming_contexts: Vec<String>,
    pub supported_ldap_version: Vec<String>,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// First textual value of an attribute, matching the name case-insensitively
pub fn get_first_attr(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry
        .attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attr))
        .and_then(|(_, values)| values.first().cloned())
}

fn get_first_bin_attr<'a>(entry: &'a SearchEntry, attr: &str) -> Option<&'a [u8]> {
    entry
        .bin_attrs
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(attr))
        .and_then(|(_, values)| values.first())
        .map(Vec::as_slice)
}

/// Canonical string form of the unique-id attribute.
///
/// Text values pass through. 16-byte binary values (Active Directory
/// `objectGUID`) decode as a GUID with little-endian leading fields, which
/// is how the directory itself renders them. Any other binary value is
/// hex-encoded.
pub fn normalize_unique_id(entry: &SearchEntry, attr: &str) -> Option<String> {
    if let Some(text) = get_first_attr(entry, attr) {
        let text = text.trim();
        return (!text.is_empty()).then(|| text.to_string());
    }

    let bytes = get_first_bin_attr(entry, attr).filter(|b| !b.is_empty())?;
    match <[u8; 16]>::try_from(bytes) {
        Ok(guid) => Some(Uuid::from_bytes_le(guid).to_string()),
        Err(_) => Some(hex::encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(attrs: &[(&str, &str)], bin_attrs: &[(&str, Vec<u8>)]) -> SearchEntry {
        SearchEntry {
            dn: "uid=jane,ou=users,dc=example,dc=com".to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
                .collect::<HashMap<_, _>>(),
            bin_attrs: bin_attrs
                .iter()
                .map(|(k, v)| (k.to_string(), vec![v.clone()]))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_text_unique_id_passes_through() {
        let e = entry(&[("entryUUID", "U-123")], &[]);
        assert_eq!(normalize_unique_id(&e, "entryUUID").as_deref(), Some("U-123"));
        assert_eq!(normalize_unique_id(&e, "entryuuid").as_deref(), Some("U-123"));
    }

    #[test]
    fn test_binary_guid_decodes_mixed_endian() {
        let bytes = vec![
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ];
        let e = entry(&[], &[("objectGUID", bytes)]);
        assert_eq!(
            normalize_unique_id(&e, "objectGUID").as_deref(),
            Some("00112233-4455-6677-8899-aabbccddeeff")
        );
    }

    #[test]
    fn test_other_binary_is_hex() {
        let e = entry(&[], &[("objectSid", vec![0x01, 0x05, 0xff])]);
        assert_eq!(normalize_unique_id(&e, "objectSid").as_deref(), Some("0105ff"));
    }

    #[test]
    fn test_missing_or_blank_unique_id() {
        let e = entry(&[("entryUUID", "  ")], &[]);
        assert!(normalize_unique_id(&e, "entryUUID").is_none());
        assert!(normalize_unique_id(&e, "objectGUID").is_none());
    }

    #[test]
    fn test_sentinel_names() {
        let found = DirectoryEntry {
            distinguished_name: "uid=jane".to_string(),
            unique_id: "U-1".to_string(),
            given_name: Some("Jane".to_string()),
            surname: Some(" ".to_string()),
        };
        assert_eq!(found.first_name(), "Jane");
        assert_eq!(found.last_name(), "User");

        let bare = DirectoryEntry {
            given_name: None,
            ..found
        };
        assert_eq!(bare.first_name(), "LDAP");
    }

    #[test]
    fn test_credential_failures() {
        assert!(DirectoryError::UserNotFound.is_credential_failure());
        assert!(DirectoryError::UserBindRejected(49).is_credential_failure());
        assert!(!DirectoryError::Connection("refused".into()).is_credential_failure());
        assert!(!DirectoryError::MissingUniqueId("entryUUID".into()).is_credential_failure());
    }
}
