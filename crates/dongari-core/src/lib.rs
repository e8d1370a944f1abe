//! # Dongari Core
//!
//! Shared configuration and error types for the dongari club backend.

pub mod config;
pub mod error;

pub use config::DongariConfig;
pub use error::{DongariError, Result};
