//! Authentication for Janus
//!
//! One contract, [`AuthService`], with two strategies behind it:
//! - [`LocalAuthService`]: credentials hashed and checked against the local store
//! - [`DirectoryAuthService`]: credentials checked by an LDAP bind, followed by
//!   just-in-time provisioning of a local shadow identity
//!
//! [`Authenticator`] picks one of them from configuration at startup.

pub mod credential;
pub mod error;
pub mod facade;
pub mod ldap;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use credential::{Argon2Verifier, CredentialVerifier};
pub use error::{AuthError, AuthResult};
pub use facade::Authenticator;
pub use ldap::{DirectoryEntry, DirectoryError, LdapClient, LdapServerInfo};
pub use strategy::{AuthService, DirectoryAuthService, LocalAuthService};
