//! Core types for Janus

mod request;
mod user;

pub use request::*;
pub use user::*;
