// src/pipeline/mod.rs
pub mod orchestrator;
pub mod result;

pub use orchestrator::{Orchestrator, PipelineState};
pub use result::{ExtractionStats, FilingResult, SectionFailure, SectionSummary};
