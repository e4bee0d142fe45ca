// src/extractors/values.rs
use crate::classifier::{RowClassification, TableClassification};
use crate::edgar::models::StatementType;
use crate::extractors::table::{ParsedRow, ParsedTable};
use crate::extractors::units::UnitScale;
use crate::statements::value::{ExtractedValue, MappingKind, Provenance};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

// --- Regex Patterns (Lazy Static) ---
static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b")
        .expect("Failed to compile MONTH_RE")
});

static SLASH_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}$").expect("Failed to compile SLASH_DATE_RE")
});

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+(?:\.\d+)?|\.\d+").expect("Failed to compile NUMBER_RE")
});

const EMPTY_MARKERS: &[&str] = &["", "-", "—", "–", "n/a", "nm", "*"];

/// Which rule located a classified row. Earlier variants take priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMatch {
    SourceLine,
    ExactLabel,
    ContainsLabel,
    RowIndex,
}

/// Turns a parsed table plus its classification into typed values.
/// Pure and deterministic: the same inputs always give the same output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValueExtractor;

impl ValueExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(
        &self,
        statement: StatementType,
        table: &ParsedTable,
        classification: &TableClassification,
        unit_scale: UnitScale,
    ) -> Vec<ExtractedValue> {
        // 1-based data column -> fiscal year
        let year_columns: BTreeMap<usize, i32> = classification
            .year_columns
            .iter()
            .map(|yc| (yc.column_index, yc.year))
            .collect();

        let mut values = Vec::new();
        for rc in &classification.rows {
            let Some((row, how)) = self.find_row(table, rc) else {
                tracing::debug!("No row found for classified label '{}', dropping", rc.row_label);
                continue;
            };

            let years: BTreeMap<i32, f64> = row
                .cells
                .iter()
                .enumerate()
                .filter_map(|(idx, cell)| {
                    let year = year_columns.get(&(idx + 1))?;
                    parse_cell(cell).map(|v| (*year, v))
                })
                .collect();

            if years.is_empty() {
                tracing::debug!("Row '{}' (line {}) has no numeric year cells", row.label, row.source_line);
                continue;
            }

            tracing::trace!("Matched '{}' to line {} via {:?}", rc.row_label, row.source_line, how);
            let label = if rc.row_label.trim().is_empty() { row.label.clone() } else { rc.row_label.clone() };
            values.push(ExtractedValue {
                label,
                variable: rc.target.variable().map(str::to_string),
                mapping: MappingKind::classify(&rc.target, rc.row_kind),
                years,
                value: None,
                unit_scale,
                confidence: rc.confidence.clamp(0.0, 1.0),
                provenance: Provenance {
                    statement,
                    source_line: row.source_line,
                    row_index: row.index,
                    row_kind: rc.row_kind,
                    parent_section: rc.parent_section.clone(),
                    table_title: table.title.clone(),
                },
            });
        }

        tracing::debug!(
            "Extracted {} of {} classified rows from {} table",
            values.len(),
            classification.rows.len(),
            statement
        );
        values
    }

    /// Locates the table row for a classification: claimed line, exact label,
    /// a row whose label contains the classified one (closest first), then index.
    pub fn find_row<'t>(&self, table: &'t ParsedTable, rc: &RowClassification) -> Option<(&'t ParsedRow, RowMatch)> {
        if let Some(line) = rc.source_line {
            if let Some(row) = table.rows.iter().find(|r| r.source_line == line) {
                return Some((row, RowMatch::SourceLine));
            }
        }

        let target = normalize_label(&rc.row_label);
        if !target.is_empty() {
            if let Some(row) = table.rows.iter().find(|r| normalize_label(&r.label) == target) {
                return Some((row, RowMatch::ExactLabel));
            }

            // Only rows more specific than the target qualify, so a classification
            // for "total liabilities and equity" never lands on "total liabilities".
            let contains = table
                .rows
                .iter()
                .filter(|r| normalize_label(&r.label).contains(&target))
                .min_by_key(|r| (r.label.len(), r.index));
            if let Some(row) = contains {
                return Some((row, RowMatch::ContainsLabel));
            }
        }

        rc.row_index
            .and_then(|idx| table.rows.get(idx))
            .map(|row| (row, RowMatch::RowIndex))
    }
}

/// Parses one table cell. Returns `None` for blanks, dashes, dates and text.
pub fn parse_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if EMPTY_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
        return None;
    }
    if MONTH_RE.is_match(trimmed) || SLASH_DATE_RE.is_match(trimmed) {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ',' | '$') && !c.is_whitespace())
        .collect();

    let (negative, body) = if let Some(inner) = cleaned.strip_prefix('(') {
        (true, inner.trim_end_matches(')'))
    } else if let Some(rest) = cleaned
        .strip_prefix('-')
        .or_else(|| cleaned.strip_prefix('\u{2212}'))
        .or_else(|| cleaned.strip_prefix('\u{2013}'))
    {
        (true, rest)
    } else {
        (false, cleaned.as_str())
    };

    let number: f64 = NUMBER_RE.find(body)?.as_str().parse().ok()?;
    Some(if negative { -number } else { number })
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(':')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{RowKind, TargetVariable, YearColumn};

    const BALANCE_SHEET: &str = "## Consolidated Balance Sheets
| | 2024 | 2023 |
|---|---|---|
| Cash and cash equivalents | 1,200 | 1,000 |
| Total liabilities | 800 | 700 |
| Total liabilities and equity | 2,000 | 1,800 |
| Treasury stock | (150) | — |
| Period end | 12/31/2024 | 12/31/2023 |";

    fn table() -> ParsedTable {
        ParsedTable::parse(BALANCE_SHEET, 10)
    }

    fn row(label: &str, target: &str) -> RowClassification {
        RowClassification {
            row_label: label.to_string(),
            target: TargetVariable::from(target.to_string()),
            confidence: 0.95,
            row_kind: RowKind::Item,
            parent_section: None,
            source_line: None,
            row_index: None,
        }
    }

    fn classification(rows: Vec<RowClassification>) -> TableClassification {
        TableClassification {
            year_columns: vec![
                YearColumn { year: 2024, column_index: 1 },
                YearColumn { year: 2023, column_index: 2 },
            ],
            rows,
        }
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("(1,234)"), Some(-1234.0));
        assert_eq!(parse_cell("$5,000"), Some(5000.0));
        assert_eq!(parse_cell("$ (12.5)"), Some(-12.5));
        assert_eq!(parse_cell("-42"), Some(-42.0));
        assert_eq!(parse_cell("\u{2212}7"), Some(-7.0));
        assert_eq!(parse_cell("12/31/2024"), None);
        assert_eq!(parse_cell("Sep. 28, 2024"), None);
        assert_eq!(parse_cell("—"), None);
        assert_eq!(parse_cell("N/A"), None);
        assert_eq!(parse_cell(""), None);
        assert_eq!(parse_cell("n.m."), None);
    }

    #[test]
    fn test_extract_values_with_provenance() {
        let values = ValueExtractor::new().extract(
            StatementType::BalanceSheet,
            &table(),
            &classification(vec![row("Cash and cash equivalents", "cash_and_equivalents")]),
            UnitScale::Millions,
        );

        assert_eq!(values.len(), 1);
        let cash = &values[0];
        assert_eq!(cash.variable.as_deref(), Some("cash_and_equivalents"));
        assert_eq!(cash.mapping, MappingKind::Mapped);
        assert_eq!(cash.years[&2024], 1200.0);
        assert_eq!(cash.years[&2023], 1000.0);
        assert_eq!(cash.unit_scale, UnitScale::Millions);
        assert_eq!(cash.provenance.source_line, 13);
        assert_eq!(cash.provenance.table_title.as_deref(), Some("Consolidated Balance Sheets"));
    }

    #[test]
    fn test_unparseable_cells_are_omitted_not_zero() {
        let values = ValueExtractor::new().extract(
            StatementType::BalanceSheet,
            &table(),
            &classification(vec![row("Treasury stock", "treasury_stock"), row("Period end", "UNIQUE")]),
            UnitScale::Unspecified,
        );

        assert_eq!(values.len(), 1, "date row yields nothing");
        assert_eq!(values[0].years.get(&2024), Some(&-150.0));
        assert_eq!(values[0].years.get(&2023), None);
    }

    #[test]
    fn test_source_line_beats_label_match() {
        // Label says "Cash", which is contained in the cash row, but the claimed line is the liabilities row.
        let table = table();
        let mut rc = row("Cash", "cash_and_equivalents");
        rc.source_line = Some(14);

        let (found, how) = ValueExtractor::new().find_row(&table, &rc).unwrap();
        assert_eq!(how, RowMatch::SourceLine);
        assert_eq!(found.label, "Total liabilities");
    }

    #[test]
    fn test_contains_match_never_picks_less_specific_row() {
        let extractor = ValueExtractor::new();
        let table = table();

        let (exact, how) = extractor.find_row(&table, &row("total liabilities", "total_liabilities")).unwrap();
        assert_eq!(how, RowMatch::ExactLabel);
        assert_eq!(exact.label, "Total liabilities");

        // The only row containing this label is the longer one; the shorter row must not match.
        let (longer, how) = extractor
            .find_row(&table, &row("liabilities and equity", "total_liabilities_and_equity"))
            .unwrap();
        assert_eq!(how, RowMatch::ContainsLabel);
        assert_eq!(longer.label, "Total liabilities and equity");
    }

    #[test]
    fn test_row_index_fallback_and_drop() {
        let extractor = ValueExtractor::new();
        let table = table();
        let mut by_index = row("Something renamed", "UNIQUE");
        by_index.row_index = Some(3);
        let (found, how) = extractor.find_row(&table, &by_index).unwrap();
        assert_eq!(how, RowMatch::RowIndex);
        assert_eq!(found.label, "Treasury stock");

        let missing = row("Goodwill", "goodwill");
        assert!(extractor.find_row(&table, &missing).is_none());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = ValueExtractor::new();
        let cls = classification(vec![
            row("Cash and cash equivalents", "cash_and_equivalents"),
            row("Total liabilities", "total_liabilities"),
            row("Treasury stock", "UNIQUE"),
        ]);
        let first = extractor.extract(StatementType::BalanceSheet, &table(), &cls, UnitScale::Millions);
        let second = extractor.extract(StatementType::BalanceSheet, &table(), &cls, UnitScale::Millions);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }
}
