//! # resonance-core
//!
//! Core crate for the Resonance plugin host. Contains configuration
//! schemas, typed identifiers, well-known event topics, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Resonance crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
