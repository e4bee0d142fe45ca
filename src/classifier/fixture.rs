// src/classifier/fixture.rs
use crate::classifier::{
    Classifier, NarrativeAnalysis, NarrativeAnalyzer, Navigator, SectionAnchor, TableClassification, TableRequest,
};
use crate::edgar::models::StatementType;
use crate::utils::error::{ClassifierError, ConfigError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Recorded collaborator answers for one filing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationFixture {
    #[serde(default)]
    pub tables: BTreeMap<StatementType, TableClassification>,
    #[serde(default)]
    pub anchors: Vec<SectionAnchor>,
    #[serde(default)]
    pub narratives: BTreeMap<StatementType, NarrativeAnalysis>,
}

/// Replays recorded classifications, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureClassifier {
    fixture: ClassificationFixture,
}

impl FixtureClassifier {
    pub fn new(fixture: ClassificationFixture) -> Self {
        Self { fixture }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let fixture = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::info!("Loaded classification fixture from {}", path.display());
        Ok(Self::new(fixture))
    }

    pub fn fixture(&self) -> &ClassificationFixture {
        &self.fixture
    }
}

#[async_trait]
impl Classifier for FixtureClassifier {
    async fn classify_table(&self, request: TableRequest<'_>) -> Result<TableClassification, ClassifierError> {
        self.fixture
            .tables
            .get(&request.statement)
            .cloned()
            .ok_or_else(|| ClassifierError::Unavailable(request.statement.to_string()))
    }
}

#[async_trait]
impl Navigator for FixtureClassifier {
    async fn locate_sections(&self, _toc_text: &str) -> Result<Vec<SectionAnchor>, ClassifierError> {
        Ok(self.fixture.anchors.clone())
    }
}

#[async_trait]
impl NarrativeAnalyzer for FixtureClassifier {
    fn name(&self) -> &str {
        "fixture"
    }

    fn accepts(&self, statement: StatementType) -> bool {
        self.fixture.narratives.contains_key(&statement)
    }

    async fn analyze(&self, statement: StatementType, _text: &str) -> Result<NarrativeAnalysis, ClassifierError> {
        self.fixture
            .narratives
            .get(&statement)
            .cloned()
            .ok_or_else(|| ClassifierError::Unavailable(statement.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{RowKind, TargetVariable};
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "tables": {
            "BALANCE_SHEET": {
                "year_columns": [{"year": 2024, "column_index": 1}],
                "row_mappings": [
                    {"row_label": "Cash", "fsap_variable": "cash_and_equivalents", "confidence": 0.95, "item_type": "ITEM"},
                    {"row_label": "Total assets", "fsap_variable": "total_assets", "confidence": 0.9, "item_type": "TOTAL"}
                ]
            }
        },
        "anchors": [{"statement_type": "BALANCE_SHEET", "title": "Consolidated Balance Sheets"}],
        "narratives": {
            "RISK_FACTORS": {"summary": "Restructuring may disrupt operations.", "signals": ["restructuring"]}
        }
    }"#;

    #[tokio::test]
    async fn test_replays_recorded_answers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let classifier = FixtureClassifier::from_file(file.path()).unwrap();

        let request = TableRequest { statement: StatementType::BalanceSheet, text: "", first_line: 1 };
        let table = classifier.classify_table(request).await.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].target, TargetVariable::Mapped("cash_and_equivalents".into()));
        assert_eq!(table.rows[1].row_kind, RowKind::Total);

        let anchors = classifier.locate_sections("").await.unwrap();
        assert_eq!(anchors[0].statement, Some(StatementType::BalanceSheet));

        assert!(classifier.accepts(StatementType::RiskFactors));
        assert!(!classifier.accepts(StatementType::Mda));
        let analysis = classifier.analyze(StatementType::RiskFactors, "").await.unwrap();
        assert_eq!(analysis.signals, vec!["restructuring".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_table_is_unavailable() {
        let classifier = FixtureClassifier::default();
        let request = TableRequest { statement: StatementType::CashFlow, text: "", first_line: 1 };
        let err = classifier.classify_table(request).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }

    #[test]
    fn test_bad_fixture_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(matches!(FixtureClassifier::from_file(file.path()), Err(ConfigError::Parse { .. })));
    }
}
