// src/utils/html_debug.rs
use crate::edgar::models::{AnnotatedDocument, StatementType};
use crate::extractors::section::StatementSection;
use crate::utils::error::AppError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn css_class(kind: StatementType) -> &'static str {
    match kind {
        StatementType::BalanceSheet => "highlight-bs",
        StatementType::IncomeStatement => "highlight-is",
        StatementType::CashFlow => "highlight-cf",
        StatementType::Supplemental => "highlight-sp",
        _ => "highlight-narrative",
    }
}

/// Renders the annotated document with every detected section highlighted.
pub fn render_debug_html<'a>(doc: &AnnotatedDocument, sections: impl IntoIterator<Item = &'a StatementSection>) -> String {
    let text = doc.text();
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    debug_html.push_str("body { font-family: monospace; white-space: pre-wrap; }\n");
    debug_html.push_str(".highlight-bs { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-is { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-cf { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-sp { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-narrative { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut sorted: Vec<&StatementSection> = sections.into_iter().collect();
    sorted.sort_by_key(|s| s.start);

    let mut last_pos = 0;
    for section in sorted {
        // Overlapping sections keep only the part after the previous one.
        let start = section.start.max(last_pos);
        let end = section.end.min(text.len());
        if start >= end || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            continue;
        }
        if start > last_pos {
            debug_html.push_str(&html_escape::encode_text(&text[last_pos..start]));
        }
        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"{} lines {}-{} ({:?})\">",
            css_class(section.kind),
            section.kind,
            section.start_line,
            section.end_line,
            section.detection
        ));
        debug_html.push_str(&html_escape::encode_text(&text[start..end]));
        debug_html.push_str("</span>");
        last_pos = end;
    }

    if last_pos < text.len() {
        debug_html.push_str(&html_escape::encode_text(&text[last_pos..]));
    }
    debug_html.push_str("\n</body>\n</html>");
    debug_html
}

/// Writes the highlighted view to `path`.
pub fn save_debug_html<'a>(
    doc: &AnnotatedDocument,
    sections: impl IntoIterator<Item = &'a StatementSection>,
    path: &Path,
) -> Result<(), AppError> {
    let mut file = File::create(path)?;
    file.write_all(render_debug_html(doc, sections).as_bytes())?;
    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}
