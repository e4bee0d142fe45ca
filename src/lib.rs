// src/lib.rs
//! Extraction and reconciliation of financial statements from annotated filings.
//!
//! A filing's annotated text is split into statement sections, each table is
//! classified by an external collaborator and turned into typed values, and
//! the merged statements are checked for internal and cross-statement
//! consistency before narrative-driven reclassification.

pub mod classifier;
pub mod edgar;
pub mod extractors;
pub mod pipeline;
pub mod reclassify;
pub mod reconcile;
pub mod statements;
pub mod storage;
pub mod utils;

pub use pipeline::{FilingResult, Orchestrator};
pub use utils::{AppError, PipelineConfig};
