//! rct-recon: Record Reconciliation Engine
//!
//! Turns per-source bibliographic record batches into one deduplicated,
//! provenance-annotated record per publication, each labelled RCT / not RCT
//! and assigned a topic.
//!
//! Stages: normalizer → resolver → merge → classify, driven by
//! [`orchestrator::Reconciler`].

pub mod classify;
pub mod config;
pub mod error;
pub mod merge;
pub mod normalizer;
pub mod orchestrator;
pub mod resolver;
pub mod types;

pub use crate::config::ReconConfig;
pub use crate::error::{ReconError, ReconResult};
pub use crate::orchestrator::{
    collect_batches, OutputFilter, ReconciliationOutput, ReconciliationSummary, Reconciler,
    RecordSource,
};
pub use crate::types::{CanonicalRecord, RawRecord, SourceBatch};
