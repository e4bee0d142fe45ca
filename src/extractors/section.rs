// src/extractors/section.rs

// --- Imports ---
use crate::edgar::models::{AnnotatedDocument, StatementType};
use crate::utils::config::PipelineConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

// --- Regex Patterns (Lazy Static) ---
// `[TABLE: TYPE]` markers written by the document converter
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[TABLE:\s*([A-Z_]+)\]").expect("Failed to compile MARKER_RE")
});

// Anything that closes a section: the next marker or a terminal heading
static SECTION_END_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\[TABLE:\s*[A-Z_]+\]", // Next marker of any type
        r"(?i)\n\s*Item\s+9",    // Item 9 (Changes in and Disagreements with Accountants)
        r"(?i)\n\s*SIGNATURES",  // Signature block
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static TOC_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)table\s+of\s+contents").expect("Failed to compile TOC_HEADING_RE")
});

// Statement-defining phrases for the keyword fallback, in priority order
const FALLBACK_KEYWORDS: &[(StatementType, &[&str])] = &[
    (
        StatementType::BalanceSheet,
        &["Balance Sheets", "Balance Sheet", "Statements of Financial Position", "Financial Position"],
    ),
    (
        StatementType::IncomeStatement,
        &["Statements of Operations", "Statements of Income", "Statements of Earnings"],
    ),
    (StatementType::CashFlow, &["Statements of Cash Flows", "Cash Flows"]),
];

// --- Data Structures ---

/// How a section's start was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Detection {
    Marker,
    Keyword,
}

/// One contiguous slice of the annotated document belonging to a statement type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementSection {
    pub kind: StatementType,
    pub text: String,
    pub start: usize, // byte offset into the document
    pub end: usize,
    pub start_line: usize, // 1-based line of `start`
    pub end_line: usize,
    pub detection: Detection,
}

impl StatementSection {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A candidate section start reported by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionStart {
    pub kind: StatementType,
    pub start: usize,
    /// Where the end search begins (past the marker or heading itself).
    pub body_start: usize,
}

// --- Strategies ---

/// A way of locating section starts. Strategies only find starts; the
/// segmenter applies the shared end-of-section rule and the length filter.
pub trait SegmentationStrategy {
    fn name(&self) -> &'static str;

    /// Candidate starts for the types in `wanted`, best candidates first.
    fn find_starts(&self, text: &str, wanted: &[StatementType]) -> Vec<SectionStart>;
}

/// Primary strategy: explicit `[TABLE: TYPE]` markers, first occurrence per type.
pub struct MarkerStrategy;

impl SegmentationStrategy for MarkerStrategy {
    fn name(&self) -> &'static str {
        "marker"
    }

    fn find_starts(&self, text: &str, wanted: &[StatementType]) -> Vec<SectionStart> {
        let mut starts: BTreeMap<StatementType, SectionStart> = BTreeMap::new();
        for caps in MARKER_RE.captures_iter(text) {
            let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Some(kind) = StatementType::from_tag(tag.as_str()) else {
                tracing::debug!("Ignoring unknown marker tag '{}'", tag.as_str());
                continue;
            };
            if !wanted.contains(&kind) {
                continue;
            }
            // First match is the consolidated statement; later ones are parent-only or notes
            starts.entry(kind).or_insert(SectionStart {
                kind,
                start: whole.start(),
                body_start: whole.end(),
            });
        }
        starts.into_values().collect()
    }
}

/// Fallback strategy: statement headings found by keyword after the table of contents.
pub struct KeywordStrategy {
    skip_fraction: f64,
    hints: BTreeMap<StatementType, Vec<String>>,
}

impl KeywordStrategy {
    pub fn new(skip_fraction: f64) -> Self {
        Self { skip_fraction, hints: BTreeMap::new() }
    }

    /// Extra titles (e.g. from a navigator) tried before the built-in phrases.
    pub fn with_hints(mut self, hints: BTreeMap<StatementType, Vec<String>>) -> Self {
        self.hints = hints;
        self
    }

    fn keywords_for(&self, kind: StatementType) -> Vec<String> {
        let mut keywords: Vec<String> = self.hints.get(&kind).cloned().unwrap_or_default();
        if let Some((_, builtin)) = FALLBACK_KEYWORDS.iter().find(|(k, _)| *k == kind) {
            keywords.extend(builtin.iter().map(|kw| kw.to_string()));
        }
        keywords
    }

    fn heading_regex(keyword: &str) -> Option<Regex> {
        let flexible = regex::escape(keyword.trim()).replace(' ', r"\s+");
        // Line start, optional table/bullet noise, optional "Consolidated"
        Regex::new(&format!(r"(?i)\n[^\w\n]*(?:Consolidated\s+)?{}.*", flexible)).ok()
    }
}

impl SegmentationStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn find_starts(&self, text: &str, wanted: &[StatementType]) -> Vec<SectionStart> {
        let skip = char_floor(text, (text.len() as f64 * self.skip_fraction) as usize);
        let searchable = &text[skip..];

        let mut starts = Vec::new();
        for &kind in wanted.iter().filter(|k| k.is_primary()) {
            for keyword in self.keywords_for(kind) {
                let Some(re) = Self::heading_regex(&keyword) else {
                    continue;
                };
                for mat in re.find_iter(searchable) {
                    let start = skip + mat.start() + 1; // skip the leading newline
                    starts.push(SectionStart { kind, start, body_start: skip + mat.end() });
                }
            }
        }
        starts
    }
}

// --- Segmenter ---

pub struct Segmenter {
    min_section_len: usize,
    max_section_len: usize,
    min_marker_sections: usize,
    primary: Box<dyn SegmentationStrategy + Send + Sync>,
    fallback: Box<dyn SegmentationStrategy + Send + Sync>,
}

impl Segmenter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            min_section_len: config.min_section_len,
            max_section_len: config.max_section_len,
            min_marker_sections: config.min_marker_sections,
            primary: Box::new(MarkerStrategy),
            fallback: Box::new(KeywordStrategy::new(config.toc_skip_fraction)),
        }
    }

    pub fn with_fallback(mut self, fallback: impl SegmentationStrategy + Send + Sync + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    /// Splits the document into at most one section per statement type.
    /// An empty map is a valid result.
    pub fn segment(&self, doc: &AnnotatedDocument) -> BTreeMap<StatementType, StatementSection> {
        let text = doc.text();
        let mut sections = BTreeMap::new();

        for start in self.primary.find_starts(text, &StatementType::ALL) {
            let end = self.find_section_end(text, start);
            if let Some(section) = self.build_section(doc, start, end, Detection::Marker) {
                sections.insert(start.kind, section);
            }
        }

        let primary_found = sections.keys().filter(|k| k.is_primary()).count();
        if primary_found < self.min_marker_sections {
            let missing: Vec<StatementType> = StatementType::ALL
                .into_iter()
                .filter(|k| k.is_primary() && !sections.contains_key(k))
                .collect();
            tracing::info!(
                "Only {} primary statements found by {} strategy; trying {} strategy for {:?}",
                primary_found,
                self.primary.name(),
                self.fallback.name(),
                missing
            );
            for start in self.fallback.find_starts(text, &missing) {
                if sections.contains_key(&start.kind) {
                    continue;
                }
                let end = self.find_section_end(text, start);
                if let Some(section) = self.build_section(doc, start, end, Detection::Keyword) {
                    sections.insert(start.kind, section);
                }
            }
            self.clip_keyword_sections(doc, &mut sections);
        }

        tracing::info!(
            "Segmented document ({} bytes) into {} sections: {:?}",
            text.len(),
            sections.len(),
            sections.keys().collect::<Vec<_>>()
        );
        sections
    }

    // Keyword headings carry no closing marker, so a keyword section also
    // ends where the next detected section begins.
    fn clip_keyword_sections(
        &self,
        doc: &AnnotatedDocument,
        sections: &mut BTreeMap<StatementType, StatementSection>,
    ) {
        let starts: Vec<usize> = sections.values().map(|s| s.start).collect();
        let clipped: Vec<(StatementType, usize)> = sections
            .values()
            .filter(|s| s.detection == Detection::Keyword)
            .filter_map(|s| {
                let next = starts.iter().copied().filter(|&p| p > s.start).min()?;
                (next < s.end).then_some((s.kind, next))
            })
            .collect();

        for (kind, new_end) in clipped {
            let Some(old) = sections.remove(&kind) else { continue };
            let start = SectionStart { kind, start: old.start, body_start: old.start };
            if let Some(section) = self.build_section(doc, start, new_end, Detection::Keyword) {
                sections.insert(kind, section);
            }
        }
    }

    fn build_section(
        &self,
        doc: &AnnotatedDocument,
        start: SectionStart,
        end: usize,
        detection: Detection,
    ) -> Option<StatementSection> {
        let len = end.saturating_sub(start.start);
        if len < self.min_section_len {
            tracing::debug!(
                "Dropping {} section at byte {} ({} bytes < minimum {})",
                start.kind,
                start.start,
                len,
                self.min_section_len
            );
            return None;
        }
        let section = StatementSection {
            kind: start.kind,
            text: doc.text()[start.start..end].to_string(),
            start: start.start,
            end,
            start_line: doc.line_at(start.start),
            end_line: doc.line_at(end - 1),
            detection,
        };
        tracing::debug!(
            "Found {} section via {:?}: lines {}-{} ({} bytes)",
            section.kind,
            detection,
            section.start_line,
            section.end_line,
            section.len()
        );
        Some(section)
    }

    /// End is the earliest of: next marker, a terminal heading, or the length cap.
    fn find_section_end(&self, text: &str, start: SectionStart) -> usize {
        let limit = char_floor(text, start.start.saturating_add(self.max_section_len).min(text.len()));
        if start.body_start >= limit {
            return limit;
        }
        let window = &text[start.body_start..limit];
        SECTION_END_RE
            .iter()
            .filter_map(|re| re.find(window))
            .map(|m| start.body_start + m.start())
            .min()
            .unwrap_or(limit)
    }
}

/// Returns the region after a "TABLE OF CONTENTS" heading, capped at `max_lines` lines.
pub fn table_of_contents(doc: &AnnotatedDocument, max_lines: usize) -> Option<String> {
    let heading = TOC_HEADING_RE.find(doc.text())?;
    let toc: Vec<&str> = doc.text()[heading.start()..].lines().take(max_lines).collect();
    Some(toc.join("\n"))
}

// Largest char boundary <= idx
fn char_floor(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_len: usize) -> PipelineConfig {
        PipelineConfig { min_section_len: min_len, ..PipelineConfig::default() }
    }

    fn filler(tag: &str, lines: usize) -> String {
        (0..lines).map(|i| format!("| {} row {} | {} |\n", tag, i, i * 10)).collect()
    }

    #[test]
    fn test_marker_sections_end_at_next_marker() {
        let text = format!(
            "Cover page\n[TABLE: BALANCE_SHEET]\n{}[TABLE: INCOME_STATEMENT]\n{}[TABLE: CASH_FLOW_STATEMENT]\n{}\nItem 9. Changes in Accountants\nafter",
            filler("bs", 5),
            filler("is", 5),
            filler("cf", 5)
        );
        let doc = AnnotatedDocument::new(text);
        let sections = Segmenter::new(&config(20)).segment(&doc);

        assert_eq!(sections.len(), 3);
        let bs = &sections[&StatementType::BalanceSheet];
        assert!(bs.text.starts_with("[TABLE: BALANCE_SHEET]"));
        assert!(bs.text.contains("bs row 4"));
        assert!(!bs.text.contains("INCOME_STATEMENT"));
        assert_eq!(bs.start_line, 2);
        assert_eq!(bs.detection, Detection::Marker);

        let cf = &sections[&StatementType::CashFlow];
        assert!(cf.text.contains("cf row 4"));
        assert!(!cf.text.contains("Item 9"), "terminal heading must close the section");
    }

    #[test]
    fn test_first_marker_wins() {
        let text = format!(
            "[TABLE: BALANCE_SHEET]\n| consolidated |\n{}[TABLE: NOTES]\nnote text\n[TABLE: BALANCE_SHEET]\n| parent company |\n{}",
            filler("a", 4),
            filler("b", 4)
        );
        let sections = Segmenter::new(&config(20)).segment(&AnnotatedDocument::new(text));
        let bs = &sections[&StatementType::BalanceSheet];
        assert!(bs.text.contains("consolidated"));
        assert!(!bs.text.contains("parent company"));
    }

    #[test]
    fn test_short_sections_dropped() {
        let text = format!("[TABLE: MDA]\ntiny\n[TABLE: BALANCE_SHEET]\n{}", filler("bs", 10));
        let sections = Segmenter::new(&config(60)).segment(&AnnotatedDocument::new(text));
        assert!(!sections.contains_key(&StatementType::Mda));
        assert!(sections.contains_key(&StatementType::BalanceSheet));
    }

    #[test]
    fn test_length_cap() {
        let text = format!("[TABLE: BALANCE_SHEET]\n{}", filler("bs", 200));
        let cfg = PipelineConfig { min_section_len: 10, max_section_len: 300, ..PipelineConfig::default() };
        let sections = Segmenter::new(&cfg).segment(&AnnotatedDocument::new(text));
        assert_eq!(sections[&StatementType::BalanceSheet].len(), 300);
    }

    #[test]
    fn test_keyword_fallback_skips_table_of_contents() {
        // The ToC mentions every statement near the top; real headings come later.
        let toc = "TABLE OF CONTENTS\nConsolidated Balance Sheets 45\nConsolidated Statements of Operations 46\nConsolidated Statements of Cash Flows 47\n";
        let padding = "Narrative paragraph about the business.\n".repeat(40);
        let text = format!(
            "{}{}\nCONSOLIDATED BALANCE SHEETS\n{}\n**Consolidated Statements of Operations**\n{}\n| Consolidated Statements of Cash Flows |\n{}",
            toc,
            padding,
            filler("bs", 5),
            filler("is", 5),
            filler("cf", 5)
        );
        let doc = AnnotatedDocument::new(text);
        let sections = Segmenter::new(&config(50)).segment(&doc);

        assert_eq!(sections.len(), 3);
        let bs = &sections[&StatementType::BalanceSheet];
        assert_eq!(bs.detection, Detection::Keyword);
        assert!(bs.text.starts_with("CONSOLIDATED BALANCE SHEETS"));
        assert!(bs.text.contains("bs row 4"));
        assert!(!bs.text.contains("is row 0"), "keyword section must stop at the next statement");
        assert!(sections[&StatementType::IncomeStatement].text.contains("is row 0"));
        assert!(sections[&StatementType::CashFlow].text.contains("cf row 4"));
    }

    #[test]
    fn test_fallback_not_used_when_markers_suffice() {
        let text = format!(
            "[TABLE: BALANCE_SHEET]\n{}[TABLE: INCOME_STATEMENT]\n{}[TABLE: CASH_FLOW]\n{}\nStatements of Cash Flows appear again here\n",
            filler("bs", 5),
            filler("is", 5),
            filler("cf", 5)
        );
        let sections = Segmenter::new(&config(20)).segment(&AnnotatedDocument::new(text));
        assert!(sections.values().all(|s| s.detection == Detection::Marker));
    }

    #[test]
    fn test_navigator_hints_tried_first() {
        let padding = "intro\n".repeat(40);
        let text = format!("{}\nStatement of Condition\n{}", padding, filler("bs", 6));
        let mut hints = BTreeMap::new();
        hints.insert(StatementType::BalanceSheet, vec!["Statement of Condition".to_string()]);
        let segmenter = Segmenter::new(&config(20))
            .with_fallback(KeywordStrategy::new(0.1).with_hints(hints));

        let sections = segmenter.segment(&AnnotatedDocument::new(text));
        assert!(sections[&StatementType::BalanceSheet].text.starts_with("Statement of Condition"));
    }

    #[test]
    fn test_no_sections_is_not_an_error() {
        let sections = Segmenter::new(&config(20)).segment(&AnnotatedDocument::new("plain text only"));
        assert!(sections.is_empty());
    }

    #[test]
    fn test_table_of_contents_region() {
        let doc = AnnotatedDocument::new("Cover\nTable of Contents\nItem 1\nItem 7\nItem 8\n");
        let toc = table_of_contents(&doc, 3).unwrap();
        assert_eq!(toc, "Table of Contents\nItem 1\nItem 7");
        assert!(table_of_contents(&AnnotatedDocument::new("none here"), 10).is_none());
    }
}
