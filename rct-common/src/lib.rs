//! # RCT Common Library
//!
//! Shared plumbing for the RCT reconciliation workspace:
//! - Error type and result alias
//! - Configuration file resolution and TOML loading
//! - Logging configuration and subscriber initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
