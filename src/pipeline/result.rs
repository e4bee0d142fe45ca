// src/pipeline/result.rs
use crate::edgar::models::{FilingIdentity, StatementType};
use crate::extractors::section::{Detection, StatementSection};
use crate::extractors::units::DetectedUnits;
use crate::reclassify::{NarrativeSignals, ReclassificationRecord};
use crate::reconcile::report::{LinkageReport, ValidationReport};
use crate::statements::tree::StatementTree;
use serde::Serialize;

/// A detected section and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub statement: StatementType,
    pub start_line: usize,
    pub end_line: usize,
    pub length: usize,
    pub detection: Detection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<DetectedUnits>,
    pub values_extracted: usize,
}

impl SectionSummary {
    pub fn new(section: &StatementSection) -> Self {
        Self {
            statement: section.kind,
            start_line: section.start_line,
            end_line: section.end_line,
            length: section.len(),
            detection: section.detection,
            units: None,
            values_extracted: 0,
        }
    }
}

/// A section whose classification failed; the pipeline continued without it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionFailure {
    pub statement: StatementType,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionStats {
    pub sections_detected: usize,
    pub sections_extracted: usize,
    pub values_extracted: usize,
    /// Values in standard slots.
    pub mapped_values: usize,
    /// Values in additional or unclassified lists.
    pub unmapped_values: usize,
    pub narratives_analyzed: usize,
}

/// Everything produced for one filing.
#[derive(Debug, Clone, Serialize)]
pub struct FilingResult {
    pub identity: FilingIdentity,
    /// Fiscal year behind each value's primary figure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_year: Option<i32>,
    pub statements: StatementTree,
    pub validation: ValidationReport,
    /// Aggregation checks for the comparative years.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub historical_validation: Vec<ValidationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkage: Option<LinkageReport>,
    pub reclassifications: Vec<ReclassificationRecord>,
    pub narratives: NarrativeSignals,
    pub sections: Vec<SectionSummary>,
    pub section_failures: Vec<SectionFailure>,
    pub stats: ExtractionStats,
}

impl FilingResult {
    /// Every failed aggregation or linkage check name for the primary year.
    pub fn failed_checks(&self) -> Vec<String> {
        let mut failed: Vec<String> = self.validation.failed_checks().into_iter().map(str::to_string).collect();
        if let Some(linkage) = &self.linkage {
            failed.extend(linkage.failed_checks.iter().map(|name| format!("linkage.{}", name)));
        }
        failed
    }
}
