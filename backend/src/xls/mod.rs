//! Flatten a workbook sheet into comma-separated lines.
//!
//! Plate readers usually save `.xls`/`.xlsx` workbooks. The grid parser only
//! needs the sheet's cells as text, one line per sheet row, so this module
//! renders every cell with its display form and joins the row with commas.

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use crate::error::{XlsError, XlsResult};

/// File extensions handled as workbooks.
pub const WORKBOOK_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];

/// Whether `path` looks like a workbook by its extension.
pub fn is_workbook_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether `bytes` start like a zip (xlsx/ods) or OLE2 (xls) container.
pub fn is_workbook_bytes(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

/// Write sheet `sheet_index` of the workbook at `path` as CSV lines.
pub fn csv_from_workbook<P: AsRef<Path>, W: Write>(path: P, sheet_index: usize, writer: W) -> XlsResult<()> {
    let mut workbook = open_workbook_auto(path)?;
    write_sheet(&mut workbook, sheet_index, writer)
}

/// Same as [`csv_from_workbook`] for an in-memory workbook (e.g. an upload).
pub fn csv_from_workbook_bytes<W: Write>(bytes: &[u8], sheet_index: usize, writer: W) -> XlsResult<()> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    write_sheet(&mut workbook, sheet_index, writer)
}

/// Flatten sheet `sheet_index` of an in-memory workbook into a string.
pub fn workbook_bytes_to_csv(bytes: &[u8], sheet_index: usize) -> XlsResult<String> {
    let mut buf = Vec::new();
    csv_from_workbook_bytes(bytes, sheet_index, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_sheet<RS, W>(workbook: &mut Sheets<RS>, sheet_index: usize, mut writer: W) -> XlsResult<()>
where
    RS: Read + Seek,
    W: Write,
{
    let count = workbook.sheet_names().len();
    if count == 0 {
        return Err(XlsError::NoSheets);
    }

    let range = workbook
        .worksheet_range_at(sheet_index)
        .ok_or(XlsError::SheetOutOfRange {
            index: sheet_index,
            count,
        })??;

    for line in sheet_lines(&range) {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;

    Ok(())
}

/// One comma-joined line per sheet row.
pub fn sheet_lines(range: &Range<Data>) -> Vec<String> {
    range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>().join(","))
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (*f as i64).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workbook_path_detection() {
        assert!(is_workbook_path(Path::new("plate.xlsx")));
        assert!(is_workbook_path(Path::new("PLATE.XLS")));
        assert!(!is_workbook_path(Path::new("plate.csv")));
        assert!(!is_workbook_path(Path::new("plate")));
    }

    #[test]
    fn test_workbook_magic_bytes() {
        assert!(is_workbook_bytes(b"PK\x03\x04rest"));
        assert!(is_workbook_bytes(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1]));
        assert!(!is_workbook_bytes(b"A,1,2,3"));
    }

    #[test]
    fn test_sheet_lines_render_cells() {
        let mut range = Range::new((0, 0), (1, 2));
        range.set_value((0, 0), Data::String("A".into()));
        range.set_value((0, 1), Data::Float(10.0));
        range.set_value((0, 2), Data::Int(-3));
        range.set_value((1, 0), Data::String("B".into()));
        range.set_value((1, 2), Data::String("Ctrl_unpulsed".into()));

        assert_eq!(sheet_lines(&range), vec!["A,10,-3", "B,,Ctrl_unpulsed"]);
    }

    #[test]
    fn test_fractional_floats_kept() {
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_garbage_bytes_are_workbook_error() {
        let err = workbook_bytes_to_csv(b"not a workbook", 0).unwrap_err();
        assert!(matches!(err, XlsError::Workbook(_)));
    }
}
