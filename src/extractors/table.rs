// src/extractors/table.rs
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRow {
    pub index: usize,
    pub label: String,
    /// Raw cell text for each data column, label column excluded.
    pub cells: Vec<String>,
    /// Absolute 1-based line in the annotated document.
    pub source_line: usize,
}

/// First pipe table of a statement section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedTable {
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<ParsedRow>,
    pub start_line: Option<usize>,
}

impl ParsedTable {
    /// Parses the first table in `text`. `first_line` is the absolute line
    /// number of the first line of `text`.
    ///
    /// Blank lines inside a table are ignored; any other non-pipe line after
    /// the table has started ends it. A `#` or `**` line before the table is
    /// taken as the title.
    pub fn parse(text: &str, first_line: usize) -> Self {
        let mut table = ParsedTable::default();
        let mut in_table = false;
        let mut header_parsed = false;

        for (offset, raw_line) in text.lines().enumerate() {
            let line_no = first_line + offset;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('|') && line.ends_with('|') && line.len() > 1 {
                if !in_table {
                    in_table = true;
                    table.start_line = Some(line_no);
                }
            } else if in_table {
                break;
            } else {
                if line.starts_with('#') || line.starts_with("**") {
                    let title = line.trim_matches(|c| c == '#' || c == '*' || c == ' ');
                    if !title.is_empty() {
                        table.title = Some(title.to_string());
                    }
                }
                continue;
            }

            if is_separator(line) {
                continue;
            }

            let cells = split_cells(line);
            if !header_parsed {
                table.headers = cells;
                header_parsed = true;
                continue;
            }

            // Rows with an empty label are sub-headers (typically period dates)
            let Some((label, values)) = cells.split_first() else {
                continue;
            };
            if label.is_empty() {
                continue;
            }
            table.rows.push(ParsedRow {
                index: table.rows.len(),
                label: label.clone(),
                cells: values.to_vec(),
                source_line: line_no,
            });
        }

        tracing::debug!(
            "Parsed table '{}' with {} rows from line {:?}",
            table.title.as_deref().unwrap_or(""),
            table.rows.len(),
            table.start_line
        );
        table
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn is_separator(line: &str) -> bool {
    line.contains("---")
        && line.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

fn split_cells(line: &str) -> Vec<String> {
    line.trim_matches('|')
        .split('|')
        .map(|cell| cell.trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION: &str = "[TABLE: BALANCE_SHEET]
## Consolidated Balance Sheets
(In millions)

| | 2024 | 2023 |
|---|---|---|
| | Dec. 31, 2024 | Dec. 31, 2023 |
| Cash and cash equivalents | $ 1,200 | $ 1,000 |

| Accounts receivable, net | 300 | 280 |
| Total current assets | 1,500 | 1,280 |
Notes follow.
| Not part of the table | 1 | 2 |
";

    #[test]
    fn test_parse_first_table_with_absolute_lines() {
        let table = ParsedTable::parse(SECTION, 40);

        assert_eq!(table.title.as_deref(), Some("Consolidated Balance Sheets"));
        assert_eq!(table.headers, vec!["", "2024", "2023"]);
        assert_eq!(table.start_line, Some(44));
        assert_eq!(table.rows.len(), 3);

        let cash = &table.rows[0];
        assert_eq!(cash.label, "Cash and cash equivalents");
        assert_eq!(cash.cells, vec!["$ 1,200", "$ 1,000"]);
        assert_eq!(cash.source_line, 47);

        assert_eq!(table.rows[1].source_line, 49);
        assert_eq!(table.rows[2].index, 2);
        assert!(table.rows.iter().all(|r| r.label != "Not part of the table"));
    }

    #[test]
    fn test_no_table() {
        let table = ParsedTable::parse("just prose\nmore prose", 1);
        assert!(table.is_empty());
        assert!(table.headers.is_empty());
    }
}
