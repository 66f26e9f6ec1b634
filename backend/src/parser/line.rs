//! Classification and extraction of single plate rows.
//!
//! A raw line is split on commas into cells. Rows of interest carry a plate
//! row letter (`A`-`H`) followed either by 12 integer measurements (a data
//! row) or by 4 sample names (an identifier row). Everything else is noise
//! from the instrument export (headers, blank lines, footers) and is discarded.

use crate::error::{RowError, RowResult};
use crate::models::{RowLetter, DATA_COLUMNS, IDENTIFIER_COLUMNS};

/// What a line of input holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// Row letter followed by integer measurements.
    Data,
    /// Row letter followed by sample names.
    Identifiers,
    /// Anything else.
    Discard,
}

/// Decide what kind of row `cells` holds.
///
/// Finds the first cell that is a row letter, then looks at the next
/// non-empty cell: an integer makes it a data row, anything else an
/// identifier row. No row letter, or nothing after it, means discard.
pub fn classify<S: AsRef<str>>(cells: &[S]) -> LineType {
    let mut found_letter = false;

    for cell in cells {
        let cell = cell.as_ref().trim();
        if cell.is_empty() {
            continue;
        }

        if found_letter {
            return if cell.parse::<i64>().is_ok() {
                LineType::Data
            } else {
                LineType::Identifiers
            };
        }

        if RowLetter::from_token(cell).is_some() {
            found_letter = true;
        }
    }

    LineType::Discard
}

/// Locate the row letter and return it with the cells that follow it.
pub fn extract_row<S: AsRef<str>>(cells: &[S]) -> RowResult<(RowLetter, &[S])> {
    cells
        .iter()
        .enumerate()
        .find_map(|(i, c)| RowLetter::from_token(c.as_ref().trim()).map(|row| (row, &cells[i + 1..])))
        .ok_or(RowError::MissingRowLetter)
}

/// Extract the 12 measurements of a data row.
///
/// Cells that are not integers are skipped; the row is rejected unless
/// exactly 12 integers remain.
pub fn parse_data_row<S: AsRef<str>>(cells: &[S]) -> RowResult<([i64; DATA_COLUMNS], RowLetter)> {
    let (row, payload) = extract_row(cells)?;

    let parsed: Vec<i64> = payload
        .iter()
        .filter_map(|c| c.as_ref().trim().parse::<i64>().ok())
        .collect();

    let values: [i64; DATA_COLUMNS] = parsed.try_into().map_err(|v: Vec<i64>| RowError::DataCount {
        row: row.as_char(),
        found: v.len(),
    })?;

    Ok((values, row))
}

/// Extract the 4 sample names of an identifier row.
///
/// Names are trimmed and blank cells dropped; the row is rejected unless
/// exactly 4 names remain.
pub fn parse_identifier_row<S: AsRef<str>>(
    cells: &[S],
) -> RowResult<([String; IDENTIFIER_COLUMNS], RowLetter)> {
    let (row, payload) = extract_row(cells)?;

    let names: Vec<String> = payload
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let names: [String; IDENTIFIER_COLUMNS] =
        names.try_into().map_err(|v: Vec<String>| RowError::IdentifierCount {
            row: row.as_char(),
            found: v.len(),
        })?;

    Ok((names, row))
}
