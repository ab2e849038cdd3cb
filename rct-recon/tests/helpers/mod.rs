//! Test Helper Utilities
//!
//! Shared utilities for rct-recon integration tests

#![allow(dead_code)]

pub mod log_capture;
pub mod records;

pub use log_capture::{capture_logs, LogCapture};
pub use records::RecordBuilder;
