//! LDAP directory authentication module
//!
//! Provides:
//! - Service bind, user search and user bind over one connection
//! - Unique-id normalization (text, GUID, other binary)
//! - Root DSE connection checks
//! - TLS/STARTTLS support

mod client;
mod types;

pub use client::{DirectoryConnector, DirectorySession, Ldap3Connector, LdapClient};
pub use types::*;
