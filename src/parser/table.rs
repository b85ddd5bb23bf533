//! Tabular text parsing: strict CSV and loose table detection.
//!
//! Every caller (CSV attachments, PDF text, email bodies) goes through
//! [`parse_delimited`] with the mode that matches its source.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::report::Grid;

/// Runs of two or more whitespace characters, a tab, or a comma.
static LOOSE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}|\t|,").expect("valid regex"));

/// Runs of two or more whitespace characters, or a tab.
static PDF_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}|\t").expect("valid regex"));

/// Minimum number of fields for a loose line to count as a table row.
const MIN_LOOSE_FIELDS: usize = 2;

/// Lines shorter than this (after trimming) are ignored in PDF text.
const MIN_PDF_LINE_LEN: usize = 3;

/// How a block of text is split into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// RFC 4180-style quoting; every non-blank line is a row.
    Csv,
    /// Heuristic table detection for plain-text bodies: split on
    /// multi-space, tab or comma and keep lines with at least two fields.
    Loose,
    /// Heuristic for text extracted from PDFs: split on multi-space or tab,
    /// retrying with single whitespace when that finds fewer than two
    /// fields.
    LoosePdf,
}

/// Parse `text` into a grid of trimmed string cells.
///
/// Returns an empty grid when nothing qualifies; absence of tabular
/// structure is not an error.
pub fn parse_delimited(text: &str, mode: ParseMode) -> Grid {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match mode {
            ParseMode::Csv => Some(parse_csv_line(line)),
            ParseMode::Loose => loose_row(line, &LOOSE_SEPARATOR),
            ParseMode::LoosePdf => pdf_row(line),
        })
        .collect()
}

/// Scan one CSV line, honouring quotes and doubled-quote escapes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn split_fields(line: &str, separator: &Regex) -> Vec<String> {
    separator
        .split(line)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

fn loose_row(line: &str, separator: &Regex) -> Option<Vec<String>> {
    let fields = split_fields(line, separator);
    (fields.len() >= MIN_LOOSE_FIELDS).then_some(fields)
}

fn pdf_row(line: &str) -> Option<Vec<String>> {
    if line.trim().chars().count() < MIN_PDF_LINE_LEN {
        return None;
    }
    loose_row(line, &PDF_SEPARATOR).or_else(|| {
        let words: Vec<String> = line.split_whitespace().map(String::from).collect();
        (words.len() >= MIN_LOOSE_FIELDS).then_some(words)
    })
}

/// Serialize a grid as CSV text, one line per row.
pub fn to_csv(grid: &Grid) -> String {
    let mut out = String::new();
    for row in grid {
        let line = row
            .iter()
            .map(|cell| csv_escape(cell))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Escape a value for CSV (RFC 4180).
///
/// Wraps in double quotes if the value contains commas, quotes, or newlines.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
