//! Error types for Janus
//!
//! These are store and configuration level errors. The authentication
//! contract has its own taxonomy in `janus-auth`; nothing here is meant to
//! reach a caller of `login` or `signup` untranslated.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Store Errors
    #[error("An identity with email {0} already exists")]
    Conflict(String),

    #[error("The specified identity does not exist: {0}")]
    NotFound(String),

    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Database Errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Conflict(_) => "Conflict",
            Error::NotFound(_) => "NotFound",
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::DatabaseError(_) => "InternalError",
            Error::InternalError(_) => "InternalError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }
}
