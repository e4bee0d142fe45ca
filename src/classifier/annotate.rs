// src/classifier/annotate.rs
use crate::classifier::DocumentConverter;
use crate::edgar::models::{AnnotatedDocument, StatementType};
use crate::utils::error::PipelineError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Accepts text that already carries `[TABLE: ...]` markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughConverter;

impl DocumentConverter for PassthroughConverter {
    fn convert(&self, raw: &str) -> Result<AnnotatedDocument, PipelineError> {
        if raw.trim().is_empty() {
            return Err(PipelineError::Conversion("document is empty".to_string()));
        }
        Ok(AnnotatedDocument::new(raw))
    }
}

// Heading patterns per statement; tried against each non-table line.
static HEADING_PATTERNS: Lazy<Vec<(StatementType, Regex)>> = Lazy::new(|| {
    [
        (StatementType::IncomeStatement, r"(?i)^\W*(?:consolidated\s+)?statements?\s+of\s+(?:operations|income|earnings)\b"),
        (StatementType::BalanceSheet, r"(?i)^\W*(?:consolidated\s+)?balance\s+sheets?\b"),
        (StatementType::BalanceSheet, r"(?i)^\W*(?:consolidated\s+)?statements?\s+of\s+financial\s+position\b"),
        (StatementType::CashFlow, r"(?i)^\W*(?:consolidated\s+)?statements?\s+of\s+cash\s+flows?\b"),
        (StatementType::Business, r"(?i)^\W*item\s+1\.?\s+business\b"),
        (StatementType::RiskFactors, r"(?i)^\W*item\s+1a\.?\s+risk\s+factors\b"),
        (StatementType::Mda, r"(?i)^\W*item\s+7\.?\s+management.s\s+discussion\b"),
        (StatementType::Notes, r"(?i)^\W*notes\s+to\s+(?:the\s+)?(?:consolidated\s+)?financial\s+statements\b"),
    ]
    .into_iter()
    .filter_map(|(kind, pat)| Regex::new(pat).ok().map(|re| (kind, re)))
    .collect()
});

static PARENT_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)parent\s+company|registrant\s+only|condensed\s+financial\s+information\s+of")
        .expect("Failed to compile PARENT_ONLY_RE")
});

/// Inserts a statement marker before the first heading of each statement type.
/// Table rows (tables of contents, indexes) are never treated as headings, and
/// parent-company-only statements are skipped. Types that already carry a
/// marker are left alone.
#[derive(Debug, Clone, Copy)]
pub struct HeadingAnnotator {
    /// Lines after a heading checked for parent-company context.
    pub context_lines: usize,
}

impl Default for HeadingAnnotator {
    fn default() -> Self {
        Self { context_lines: 2 }
    }
}

impl HeadingAnnotator {
    pub fn annotate(&self, raw: &str) -> String {
        let lines: Vec<&str> = raw.lines().collect();
        let mut marked: Vec<StatementType> = StatementType::ALL
            .into_iter()
            .filter(|kind| raw.contains(&kind.marker()))
            .collect();

        let mut out = String::with_capacity(raw.len() + 256);
        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim_start();
            if !trimmed.starts_with('|') {
                let heading = HEADING_PATTERNS
                    .iter()
                    .find(|(kind, re)| !marked.contains(kind) && re.is_match(trimmed))
                    .map(|(kind, _)| *kind);
                if let Some(kind) = heading {
                    let context_end = (idx + 1 + self.context_lines).min(lines.len());
                    if lines[idx..context_end].iter().any(|l| PARENT_ONLY_RE.is_match(l)) {
                        tracing::debug!("Skipping parent-company heading at line {}: {}", idx + 1, trimmed);
                    } else {
                        tracing::debug!("Marking {} at line {}", kind, idx + 1);
                        out.push_str(&kind.marker());
                        out.push('\n');
                        marked.push(kind);
                    }
                }
            }
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl DocumentConverter for HeadingAnnotator {
    fn convert(&self, raw: &str) -> Result<AnnotatedDocument, PipelineError> {
        if raw.trim().is_empty() {
            return Err(PipelineError::Conversion("document is empty".to_string()));
        }
        Ok(AnnotatedDocument::new(self.annotate(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_rejects_empty() {
        assert!(PassthroughConverter.convert("  \n").is_err());
        let doc = PassthroughConverter.convert("[TABLE: BALANCE_SHEET]\n| a | 1 |").unwrap();
        assert_eq!(doc.line_count(), 2);
    }

    #[test]
    fn test_marks_headings_but_not_index_rows() {
        let raw = "\
| Consolidated Balance Sheets | 45 |
Item 1A. Risk Factors
Some risk text.
CONSOLIDATED BALANCE SHEETS
| Cash | 10 |
CONSOLIDATED STATEMENTS OF OPERATIONS
| Revenue | 5 |
";
        let out = HeadingAnnotator::default().annotate(raw);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "| Consolidated Balance Sheets | 45 |");
        assert_eq!(lines[1], "[TABLE: RISK_FACTORS]");
        assert_eq!(lines[4], "[TABLE: BALANCE_SHEET]");
        assert_eq!(lines[5], "CONSOLIDATED BALANCE SHEETS");
        assert_eq!(lines[7], "[TABLE: INCOME_STATEMENT]");
        assert_eq!(out.matches("[TABLE: BALANCE_SHEET]").count(), 1);
    }

    #[test]
    fn test_skips_parent_company_statements() {
        let raw = "\
Balance Sheets
(Parent Company Only)
| Cash | 1 |
Consolidated Balance Sheets
| Cash | 10 |
";
        let out = HeadingAnnotator::default().annotate(raw);
        let marker_line = out.lines().position(|l| l == "[TABLE: BALANCE_SHEET]").unwrap();
        assert_eq!(out.lines().nth(marker_line + 1), Some("Consolidated Balance Sheets"));
    }

    #[test]
    fn test_existing_markers_are_kept() {
        let raw = "[TABLE: CASH_FLOW]\nStatements of Cash Flows\n| Net income | 5 |\n";
        let out = HeadingAnnotator::default().annotate(raw);
        assert_eq!(out.matches("[TABLE: CASH_FLOW]").count(), 1);
    }
}
