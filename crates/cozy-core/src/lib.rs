//! Core domain types, errors, events, and configuration for Cozy.
//!
//! This crate has no knowledge of storage or scheduling; it defines the
//! vocabulary the other crates share: alarm records, sound references,
//! play handles, domain events, and the workspace-wide error type.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

pub use config::CozyConfig;
pub use error::{CozyError, Result};
pub use types::*;
