//! Identity storage for Janus
//!
//! The authentication strategies only see the [`IdentityStore`] trait.
//! [`SqliteIdentityStore`] is the indexed production backend;
//! [`MemoryIdentityStore`] serves tests and local development.

pub mod memory;
pub mod repository;
pub mod traits;

pub use memory::MemoryIdentityStore;
pub use repository::SqliteIdentityStore;
pub use traits::*;
