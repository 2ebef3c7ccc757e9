//! Cryptography utilities for Janus

pub mod hash;

pub use hash::*;
