//! Table detection in extracted page text.
//!
//! A table is a run of at least two consecutive lines that split into the
//! same number (two or more) of cells. Cells are separated by tabs, by `|`,
//! or by runs of two or more spaces. The first line is the header.
//!
//! Space-separated lines are held to a stricter shape, since prose often has
//! double spaces after a full stop: no cell may read as a sentence, and a
//! line with a single gap needs a short or numeric cell.

use crate::error::{DocgateError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

static WIDE_GAP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

/// A tabular region found in page text.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn from_lines(lines: Vec<Vec<String>>) -> Option<Self> {
        let mut lines = lines.into_iter();
        let header = normalize_header(lines.next()?);
        let rows: Vec<Vec<String>> = lines.collect();
        if rows.is_empty() {
            return None;
        }
        Some(Self { header, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// `Table with R rows and C columns. Columns: a, b, c`, listing at most
    /// `max_columns` header names and ending with `...` when more exist.
    pub fn describe(&self, max_columns: usize) -> String {
        let shown: Vec<&str> = self
            .header
            .iter()
            .take(max_columns)
            .map(String::as_str)
            .collect();

        let mut description = format!(
            "Table with {} rows and {} columns. Columns: {}",
            self.row_count(),
            self.column_count(),
            shown.join(", ")
        );
        if self.header.len() > max_columns {
            description.push_str("...");
        }
        description
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DocgateError::Extraction(format!("Failed to flush CSV: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| DocgateError::Extraction(format!("CSV is not UTF-8: {}", e)))
    }

    /// Rows as objects keyed by header name.
    pub fn to_json(&self) -> Value {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .header
                    .iter()
                    .zip(row)
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                Value::Object(object)
            })
            .collect();
        Value::Array(rows)
    }
}

/// Find every table in a page of text.
pub fn detect_tables(text: &str) -> Vec<Table> {
    let mut tables = Vec::new();
    let mut run: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        let cells = split_cells(line);

        if cells.as_ref().is_some_and(|c| is_separator(c)) {
            continue;
        }

        match cells {
            Some(cells) if run.first().map_or(true, |r| r.len() == cells.len()) => run.push(cells),
            Some(cells) => {
                flush(&mut run, &mut tables);
                run.push(cells);
            }
            None => flush(&mut run, &mut tables),
        }
    }
    flush(&mut run, &mut tables);

    tables
}

fn flush(run: &mut Vec<Vec<String>>, tables: &mut Vec<Table>) {
    if run.len() >= 2 {
        tables.extend(Table::from_lines(std::mem::take(run)));
    } else {
        run.clear();
    }
}

/// Split a line into cells, or `None` if it is not table-shaped.
fn split_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cells: Vec<String> = if trimmed.contains('\t') {
        trimmed.split('\t').map(|c| c.trim().to_string()).collect()
    } else if trimmed.contains('|') {
        let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
        inner.split('|').map(|c| c.trim().to_string()).collect()
    } else {
        let cells: Vec<String> = WIDE_GAP.split(trimmed).map(|c| c.trim().to_string()).collect();
        if !gap_split_is_tabular(&cells) {
            return None;
        }
        cells
    };

    (cells.len() >= 2).then_some(cells)
}

fn gap_split_is_tabular(cells: &[String]) -> bool {
    if cells.iter().any(|c| is_sentence(c)) {
        return false;
    }
    cells.len() > 2 || cells.iter().any(|c| is_compact(c))
}

/// Several words closed by sentence punctuation.
fn is_sentence(cell: &str) -> bool {
    cell.contains(' ') && cell.ends_with(['.', '!', '?'])
}

/// A number, or at most three words.
fn is_compact(cell: &str) -> bool {
    let numeric = cell.trim_matches(|c: char| matches!(c, '$' | '%' | '€' | '£')).replace(',', "");
    numeric.parse::<f64>().is_ok() || cell.split_whitespace().count() <= 3
}

/// Markdown rule lines such as `|---|:---:|`.
fn is_separator(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | '=' | '+')))
}

fn normalize_header(cells: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    cells
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = if cell.is_empty() {
                format!("column_{}", i + 1)
            } else {
                cell
            };

            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_space_aligned_table() {
        let text = "Quarterly results\n\
                    Region    Sales    Units\n\
                    North     100      7\n\
                    South     80       5\n\
                    \n\
                    Closing remarks follow.";

        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, ["Region", "Sales", "Units"]);
        assert_eq!(tables[0].rows[1], ["South", "80", "5"]);
        assert_eq!(
            tables[0].describe(5),
            "Table with 2 rows and 3 columns. Columns: Region, Sales, Units"
        );
    }

    #[test]
    fn test_markdown_pipes_and_separator() {
        let text = "| name | qty |\n|------|-----|\n| bolt | 4 |\n| nut | 9 |";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].header, ["name", "qty"]);
        assert_eq!(tables[0].row_count(), 2);
    }

    #[test]
    fn test_tabs_and_column_change_splits_tables() {
        let text = "a\tb\n1\t2\nx\ty\tz\n7\t8\t9";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].header, ["x", "y", "z"]);
    }

    #[test]
    fn test_prose_is_not_a_table() {
        let text = "Just one sentence.\nAnother plain line.\nsingle  gap line";
        assert!(detect_tables(text).is_empty());
    }

    #[test]
    fn test_double_spaced_prose_is_not_a_table() {
        let text = "The results were good.  See below for details.\n\
                    Revenue rose sharply.  Costs fell too.";
        assert!(detect_tables(text).is_empty());

        let text = "The committee met on Tuesday morning  and again later that afternoon\n\
                    Several members raised the budget  while others asked about hiring";
        assert!(detect_tables(text).is_empty());
    }

    #[test]
    fn test_two_column_key_values_still_detected() {
        let text = "Metric  Value\nGross margin for the year  41.5%\nHeadcount  1,204";
        let tables = detect_tables(text);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows[0], ["Gross margin for the year", "41.5%"]);
    }

    #[test]
    fn test_description_truncates_columns() {
        let table = Table {
            header: (1..=7).map(|i| format!("c{}", i)).collect(),
            rows: vec![vec![String::new(); 7]],
        };
        assert_eq!(
            table.describe(5),
            "Table with 1 rows and 7 columns. Columns: c1, c2, c3, c4, c5..."
        );
    }

    #[test]
    fn test_header_normalization() {
        let header = normalize_header(vec!["".into(), "x".into(), "x".into()]);
        assert_eq!(header, ["column_1", "x", "x_2"]);
    }

    #[test]
    fn test_csv_and_json() {
        let table = Table {
            header: vec!["name".into(), "note".into()],
            rows: vec![vec!["Ana".into(), "a, b".into()]],
        };
        assert_eq!(table.to_csv().unwrap(), "name,note\nAna,\"a, b\"\n");

        let json = table.to_json();
        assert_eq!(json[0]["note"], "a, b");
    }
}
