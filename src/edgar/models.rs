// src/edgar/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the filing being processed. Fields are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingIdentity {
    company_name: String,
    entity_id: String,
    fiscal_year: Option<i32>,
    form_type: String,
    source_document: String,
}

impl FilingIdentity {
    pub fn new(
        company_name: impl Into<String>,
        entity_id: impl Into<String>,
        fiscal_year: Option<i32>,
        form_type: impl Into<String>,
        source_document: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            entity_id: entity_id.into(),
            fiscal_year,
            form_type: form_type.into(),
            source_document: source_document.into(),
        }
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn fiscal_year(&self) -> Option<i32> {
        self.fiscal_year
    }

    pub fn form_type(&self) -> &str {
        &self.form_type
    }

    pub fn source_document(&self) -> &str {
        &self.source_document
    }
}

impl fmt::Display for FilingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fiscal_year {
            Some(year) => write!(f, "{} {} FY{}", self.entity_id, self.form_type, year),
            None => write!(f, "{} {}", self.entity_id, self.form_type),
        }
    }
}

/// Statement-type tags recognized in annotated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementType {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
    Supplemental,
    Business,
    RiskFactors,
    Mda,
    Notes,
}

impl StatementType {
    pub const ALL: [StatementType; 8] = [
        StatementType::BalanceSheet,
        StatementType::IncomeStatement,
        StatementType::CashFlow,
        StatementType::Supplemental,
        StatementType::Business,
        StatementType::RiskFactors,
        StatementType::Mda,
        StatementType::Notes,
    ];

    /// The three primary statements counted by the segmenter's fallback rule.
    pub fn is_primary(self) -> bool {
        matches!(
            self,
            StatementType::BalanceSheet | StatementType::IncomeStatement | StatementType::CashFlow
        )
    }

    /// Tables that go through the classifier and value extractor.
    pub fn is_financial(self) -> bool {
        self.is_primary() || self == StatementType::Supplemental
    }

    /// Free-text sections handed to narrative analyzers.
    pub fn is_narrative(self) -> bool {
        !self.is_financial()
    }

    /// Tag used inside `[TABLE: ...]` markers.
    pub fn marker_tag(self) -> &'static str {
        match self {
            StatementType::BalanceSheet => "BALANCE_SHEET",
            StatementType::IncomeStatement => "INCOME_STATEMENT",
            StatementType::CashFlow => "CASH_FLOW",
            StatementType::Supplemental => "SUPPLEMENTAL",
            StatementType::Business => "BUSINESS",
            StatementType::RiskFactors => "RISK_FACTORS",
            StatementType::Mda => "MDA",
            StatementType::Notes => "NOTES",
        }
    }

    /// Parses a marker tag or short code ("BS", "IS", "CF", "SP").
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "BALANCE_SHEET" | "BS" => Some(StatementType::BalanceSheet),
            "INCOME_STATEMENT" | "IS" => Some(StatementType::IncomeStatement),
            "CASH_FLOW" | "CASH_FLOW_STATEMENT" | "CF" => Some(StatementType::CashFlow),
            "SUPPLEMENTAL" | "SP" => Some(StatementType::Supplemental),
            "BUSINESS" => Some(StatementType::Business),
            "RISK_FACTORS" => Some(StatementType::RiskFactors),
            "MDA" => Some(StatementType::Mda),
            "NOTES" => Some(StatementType::Notes),
            _ => None,
        }
    }

    pub fn marker(self) -> String {
        format!("[TABLE: {}]", self.marker_tag())
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker_tag())
    }
}

/// Converted filing text with embedded statement markers.
#[derive(Debug, Clone)]
pub struct AnnotatedDocument {
    text: String,
    line_starts: Vec<usize>,
}

impl AnnotatedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// 1-based line number containing `byte_offset`.
    pub fn line_at(&self, byte_offset: usize) -> usize {
        match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let doc = AnnotatedDocument::new("first\nsecond\nthird");
        assert_eq!(doc.line_at(0), 1);
        assert_eq!(doc.line_at(5), 1); // the newline itself
        assert_eq!(doc.line_at(6), 2);
        assert_eq!(doc.line_at(13), 3);
        assert_eq!(doc.line_count(), 3);
    }

    #[test]
    fn test_marker_tags_round_trip() {
        for kind in StatementType::ALL {
            assert_eq!(StatementType::from_tag(kind.marker_tag()), Some(kind));
        }
        assert_eq!(StatementType::from_tag("cash_flow_statement"), Some(StatementType::CashFlow));
        assert_eq!(StatementType::from_tag("EQUITY"), None);
    }
}
