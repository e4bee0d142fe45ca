// src/classifier/mod.rs
//! Contracts for the external collaborators the pipeline depends on: the
//! document converter, the table classifier, the section navigator and the
//! narrative analyzers. The pipeline only relies on these input/output shapes.

pub mod annotate;
pub mod fixture;
pub mod http;

use crate::edgar::models::{AnnotatedDocument, StatementType};
use crate::utils::error::{ClassifierError, PipelineError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use annotate::{HeadingAnnotator, PassthroughConverter};
pub use fixture::FixtureClassifier;
pub use http::HttpClassifier;

// --- Classification types ---

/// Where a classified row should land.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TargetVariable {
    /// A canonical statement field name (e.g. "cash_and_equivalents").
    Mapped(String),
    /// No standard field fits; the row is kept under its own label.
    Unique,
}

impl TargetVariable {
    pub fn variable(&self) -> Option<&str> {
        match self {
            TargetVariable::Mapped(name) => Some(name),
            TargetVariable::Unique => None,
        }
    }
}

impl Default for TargetVariable {
    fn default() -> Self {
        TargetVariable::Unique
    }
}

impl From<String> for TargetVariable {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unique") {
            TargetVariable::Unique
        } else {
            TargetVariable::Mapped(trimmed.to_ascii_lowercase())
        }
    }
}

impl From<TargetVariable> for String {
    fn from(target: TargetVariable) -> Self {
        match target {
            TargetVariable::Mapped(name) => name,
            TargetVariable::Unique => "UNIQUE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowKind {
    #[default]
    Item,
    Subtotal,
    Total,
}

/// Classifier output for one table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowClassification {
    #[serde(default)]
    pub row_label: String,
    #[serde(rename = "fsap_variable", alias = "target", default)]
    pub target: TargetVariable,
    #[serde(default)]
    pub confidence: f64,
    #[serde(rename = "item_type", alias = "row_kind", default)]
    pub row_kind: RowKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_section: Option<String>,
    /// Absolute 1-based line the classifier claims the row is on.
    #[serde(rename = "markdown_line", alias = "source_line", default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
}

/// Maps a 1-based table column (label column excluded) to a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearColumn {
    pub year: i32,
    pub column_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableClassification {
    #[serde(default)]
    pub year_columns: Vec<YearColumn>,
    #[serde(rename = "row_mappings", alias = "rows", default)]
    pub rows: Vec<RowClassification>,
}

/// A table handed to the classifier. `first_line` is the absolute line of the
/// first line of `text`, so claimed source lines can be absolute.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableRequest<'a> {
    pub statement: StatementType,
    pub text: &'a str,
    pub first_line: usize,
}

/// A section title located by the navigator, usually from the table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionAnchor {
    #[serde(rename = "statement_type", default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<StatementType>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_hint: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeAnalysis {
    #[serde(default)]
    pub summary: String,
    /// Short structured findings (risk titles, strategy themes, ...).
    #[serde(default)]
    pub signals: Vec<String>,
}

// --- Collaborator traits ---

/// Turns a raw filing into annotated text with statement markers.
pub trait DocumentConverter: Send + Sync {
    fn convert(&self, raw: &str) -> Result<AnnotatedDocument, PipelineError>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Best effort: may omit or mis-assign rows, but never returns partial output.
    async fn classify_table(&self, request: TableRequest<'_>) -> Result<TableClassification, ClassifierError>;
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn locate_sections(&self, toc_text: &str) -> Result<Vec<SectionAnchor>, ClassifierError>;
}

#[async_trait]
pub trait NarrativeAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this analyzer wants sections of the given type.
    fn accepts(&self, statement: StatementType) -> bool {
        statement.is_narrative()
    }

    async fn analyze(&self, statement: StatementType, text: &str) -> Result<NarrativeAnalysis, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_sentinel_is_typed() {
        let json = r#"{
            "year_columns": [{"year": 2024, "column_index": 1}],
            "row_mappings": [
                {"row_label": "Cash", "fsap_variable": "cash_and_equivalents", "confidence": 0.9, "item_type": "ITEM", "markdown_line": 12},
                {"row_label": "Crypto assets", "fsap_variable": "UNIQUE", "confidence": 0.6},
                {"row_label": "Total assets", "fsap_variable": "", "item_type": "TOTAL"}
            ]
        }"#;
        let classification: TableClassification = serde_json::from_str(json).unwrap();

        assert_eq!(classification.rows[0].target, TargetVariable::Mapped("cash_and_equivalents".into()));
        assert_eq!(classification.rows[0].source_line, Some(12));
        assert_eq!(classification.rows[1].target, TargetVariable::Unique);
        assert_eq!(classification.rows[1].row_kind, RowKind::Item);
        assert_eq!(classification.rows[2].target, TargetVariable::Unique);
        assert_eq!(classification.rows[2].row_kind, RowKind::Total);

        let back = serde_json::to_value(&classification.rows[1]).unwrap();
        assert_eq!(back["fsap_variable"], "UNIQUE");
    }
}
