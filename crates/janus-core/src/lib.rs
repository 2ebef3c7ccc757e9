//! Janus Core Library
//!
//! Core types, configuration and errors shared by the Janus authentication crates.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::JanusConfig;
pub use error::{Error, Result};

/// Janus version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// First name given to directory-provisioned identities without a given name
pub const DEFAULT_DIRECTORY_FIRST_NAME: &str = "LDAP";

/// Last name given to directory-provisioned identities without a surname
pub const DEFAULT_DIRECTORY_LAST_NAME: &str = "User";

/// Default LDAP port
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// Default LDAPS port
pub const DEFAULT_LDAPS_PORT: u16 = 636;

/// Placeholder substituted with the email in the directory user filter
pub const EMAIL_PLACEHOLDER: &str = "{email}";
