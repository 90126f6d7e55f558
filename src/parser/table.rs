//! Fixed-width table parser for backend listings
//!
//! Column boundaries come from the header: each header token's starting
//! display column is where its data column begins, and the next token's
//! start (or end of line) is where it ends. Slicing by offsets keeps values
//! with embedded spaces intact.
//!
//! Offsets are terminal display columns, not chars: the backend pads cells
//! by width, so a double-width name (CJK) occupies two columns per char.

use super::Column;
use crate::domain::PackageRecord;
use crate::error::ParseError;
use log::debug;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_width::UnicodeWidthChar;

/// Minimum number of recognised column names for a line to count as a header
const MIN_HEADER_COLUMNS: usize = 2;

// Trailing "N upgrades available." style summary lines
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\d+\s+(upgrades?|updates?|packages?)\b").unwrap()
});

/// Parser for fixed-width tabular listings
#[derive(Debug, Clone, Default)]
pub struct TableParser;

impl TableParser {
    /// Create a new table parser
    pub fn new() -> Self {
        Self
    }

    /// Parse raw listing text into records, in listing order
    pub fn parse(&self, raw: &str) -> Result<Vec<PackageRecord>, ParseError> {
        let mut layout: Option<Layout> = None;
        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for raw_line in raw.lines() {
            let line = visible_text(raw_line);
            if line.trim().is_empty() || is_separator(line) {
                continue;
            }

            // A header may repeat (second table for explicitly targeted packages)
            if let Some(header) = Layout::from_header(line, layout.is_some())? {
                debug!("listing header with {} columns", header.columns.len());
                layout = Some(header);
                continue;
            }

            let Some(current) = layout.as_ref() else {
                debug!("skipping preamble line: {}", line.trim());
                continue;
            };

            if SUMMARY_RE.is_match(line) {
                debug!("skipping summary line: {}", line.trim());
                continue;
            }

            let Some(record) = current.slice(line) else {
                debug!("skipping non-tabular line: {}", line.trim());
                continue;
            };

            if !seen.insert(record.id.clone()) {
                return Err(ParseError::duplicate_id(record.id));
            }
            records.push(record);
        }

        match layout {
            Some(_) => Ok(records),
            None => Err(ParseError::EmptyOrUnrecognized),
        }
    }
}

/// Column layout derived from a header line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    /// Start display columns with the recognised column, if any
    columns: Vec<(Option<Column>, usize)>,
}

impl Layout {
    /// Try to read a header line
    ///
    /// Returns `Ok(None)` when the line is not a header. Once a table has been
    /// seen, only a line naming every expected column counts as a new header.
    fn from_header(line: &str, in_table: bool) -> Result<Option<Self>, ParseError> {
        let columns: Vec<(Option<Column>, usize)> = tokens(line)
            .into_iter()
            .map(|(start, token)| (Column::from_header(&token), start))
            .collect();

        let recognised: HashSet<Column> = columns.iter().filter_map(|(c, _)| *c).collect();
        let required = if in_table {
            Column::ALL.len()
        } else {
            MIN_HEADER_COLUMNS
        };
        if recognised.len() < required {
            return Ok(None);
        }

        if let Some(missing) = Column::ALL.iter().find(|c| !recognised.contains(c)) {
            return Err(ParseError::missing_column(missing.header()));
        }

        Ok(Some(Self { columns }))
    }

    /// Slice a data row into a record
    ///
    /// Columns beyond the end of the row are empty. Rows that do not line up
    /// with the header or lack a usable id are not table rows.
    fn slice(&self, line: &str) -> Option<PackageRecord> {
        let cells = display_cells(line);
        let width = cells
            .last()
            .map(|(column, ch)| column + char_width(*ch))
            .unwrap_or(0);
        let mut record = PackageRecord::new("", "", "", "", "");

        for (index, (column, start)) in self.columns.iter().enumerate() {
            // Table cells are always separated by whitespace at column starts
            if *start > 0 && *start < width && !blank_before(&cells, *start) {
                return None;
            }
            let Some(column) = column else {
                continue;
            };
            let end = self
                .columns
                .get(index + 1)
                .map(|(_, next)| *next)
                .unwrap_or(width);
            let value = field(&cells, *start, end);

            match column {
                Column::Name => record.name = value,
                Column::Id => record.id = value,
                Column::Version => record.current_version = value,
                Column::Available => record.available_version = value,
                Column::Source => record.source = value,
            }
        }

        if record.id.is_empty() || record.id.chars().any(char::is_whitespace) {
            return None;
        }
        Some(record)
    }
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Characters of a line with the display column each one starts at
fn display_cells(line: &str) -> Vec<(usize, char)> {
    let mut column = 0;
    line.chars()
        .map(|ch| {
            let start = column;
            column += char_width(ch);
            (start, ch)
        })
        .collect()
}

/// Whether the character just left of a display column is whitespace
fn blank_before(cells: &[(usize, char)], column: usize) -> bool {
    cells
        .iter()
        .rev()
        .find(|(start, _)| *start < column)
        .is_none_or(|(_, ch)| ch.is_whitespace())
}

/// Extract the trimmed text of the characters starting within `[start, end)`
fn field(cells: &[(usize, char)], start: usize, end: usize) -> String {
    cells
        .iter()
        .filter(|(column, _)| (start..end).contains(column))
        .map(|(_, ch)| *ch)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Split a line into whitespace-separated tokens with their display columns
fn tokens(line: &str) -> Vec<(usize, String)> {
    let mut result = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (column, ch) in display_cells(line) {
        if ch.is_whitespace() {
            if let Some(token) = current.take() {
                result.push(token);
            }
        } else {
            match current.as_mut() {
                Some((_, text)) => text.push(ch),
                None => current = Some((column, ch.to_string())),
            }
        }
    }
    if let Some(token) = current {
        result.push(token);
    }

    result
}

/// Text that remains visible after carriage-return overwrites (progress spinners)
fn visible_text(line: &str) -> &str {
    line.rsplit('\r').next().unwrap_or(line).trim_end()
}

/// Rule lines made only of dashes and spaces
fn is_separator(line: &str) -> bool {
    line.chars().any(|c| c == '-' || c == '─')
        && line
            .chars()
            .all(|c| c == '-' || c == '─' || c.is_whitespace())
}
