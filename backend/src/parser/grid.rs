//! Line-by-line assembly of the flat plate buffers.
//!
//! Every line is classified independently and its values are written at
//! `row * width + column`, so rows may arrive in any order and repeated rows
//! overwrite earlier ones.

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};

use super::line::{classify, parse_data_row, parse_identifier_row, LineType};
use crate::error::{GridError, GridResult, RowError};
use crate::models::{DATA_COLUMNS, DATA_SLOTS, IDENTIFIER_COLUMNS, IDENTIFIER_SLOTS};

/// What to do with a row that has the wrong number of values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Stop the whole parse at the first malformed row.
    #[default]
    Abort,
    /// Skip malformed rows and list them in the [`GridReport`].
    Collect,
}

/// The flat data and identifier buffers of one plate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateGrid {
    data: [i64; DATA_SLOTS],
    identifiers: Vec<String>,
}

impl Default for PlateGrid {
    fn default() -> Self {
        Self {
            data: [0; DATA_SLOTS],
            identifiers: vec![String::new(); IDENTIFIER_SLOTS],
        }
    }
}

impl PlateGrid {
    /// 96 measurements, row-major, 12 per plate row.
    pub fn data(&self) -> &[i64; DATA_SLOTS] {
        &self.data
    }

    /// 32 sample names, row-major, 4 per plate row. Rows never seen are empty strings.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn into_parts(self) -> ([i64; DATA_SLOTS], Vec<String>) {
        (self.data, self.identifiers)
    }

    fn place_data(&mut self, row: usize, values: [i64; DATA_COLUMNS]) {
        let start = row * DATA_COLUMNS;
        self.data[start..start + DATA_COLUMNS].copy_from_slice(&values);
    }

    fn place_identifiers(&mut self, row: usize, names: [String; IDENTIFIER_COLUMNS]) {
        let start = row * IDENTIFIER_COLUMNS;
        for (slot, name) in self.identifiers[start..start + IDENTIFIER_COLUMNS].iter_mut().zip(names) {
            *slot = name;
        }
    }
}

/// A row skipped under [`MalformedRowPolicy::Collect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRow {
    /// 1-based input line number.
    pub line: usize,
    pub error: RowError,
}

/// Counts gathered while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridReport {
    pub data_rows: usize,
    pub identifier_rows: usize,
    pub discarded: usize,
    pub malformed: Vec<MalformedRow>,
}

/// Scans comma-separated plate exports into a [`PlateGrid`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GridAssembler {
    policy: MalformedRowPolicy,
}

impl GridAssembler {
    pub fn new(policy: MalformedRowPolicy) -> Self {
        Self { policy }
    }

    /// Read `reader` line by line and fill the plate buffers.
    ///
    /// Only read failures and (under [`MalformedRowPolicy::Abort`]) malformed
    /// rows are errors; unrecognised lines are counted as discarded.
    pub fn parse<R: Read>(&self, reader: R) -> GridResult<(PlateGrid, GridReport)> {
        let mut grid = PlateGrid::default();
        let mut report = GridReport::default();

        for (line_idx, line_result) in BufReader::new(reader).lines().enumerate() {
            let line_num = line_idx + 1;
            let line = line_result?;
            let cells: Vec<&str> = line.split(',').collect();

            let outcome = match classify(&cells) {
                LineType::Data => parse_data_row(&cells).map(|(values, row)| {
                    grid.place_data(row.index(), values);
                    report.data_rows += 1;
                }),
                LineType::Identifiers => parse_identifier_row(&cells).map(|(names, row)| {
                    grid.place_identifiers(row.index(), names);
                    report.identifier_rows += 1;
                }),
                LineType::Discard => {
                    report.discarded += 1;
                    Ok(())
                }
            };

            if let Err(error) = outcome {
                match self.policy {
                    MalformedRowPolicy::Abort => {
                        return Err(GridError::MalformedRow {
                            line: line_num,
                            source: error,
                        })
                    }
                    MalformedRowPolicy::Collect => report.malformed.push(MalformedRow {
                        line: line_num,
                        error,
                    }),
                }
            }
        }

        Ok((grid, report))
    }
}

/// Parse a plate export, aborting on the first malformed row.
pub fn parse_grid<R: Read>(reader: R) -> GridResult<PlateGrid> {
    GridAssembler::default().parse(reader).map(|(grid, _)| grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATE: &str = "\
Plate reader export,,,,
,1,2,3,4,5,6,7,8,9,10,11,12
A,10,20,30,15,25,35,5,5,5,0,0,0
B,1,2,3,4,5,6,7,8,9,10,11,12

,Samples
A,Ctrl_unpulsed,S1,S2,S3
B,S4,S5,S6,S7
";

    #[test]
    fn test_parse_places_rows_by_letter() {
        let (grid, report) = GridAssembler::default().parse(PLATE.as_bytes()).unwrap();

        assert_eq!(&grid.data()[..12], &[10, 20, 30, 15, 25, 35, 5, 5, 5, 0, 0, 0]);
        assert_eq!(&grid.data()[12..24], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert!(grid.data()[24..].iter().all(|&v| v == 0));

        assert_eq!(&grid.identifiers()[..8], &["Ctrl_unpulsed", "S1", "S2", "S3", "S4", "S5", "S6", "S7"]);
        assert!(grid.identifiers()[8..].iter().all(String::is_empty));

        assert_eq!(report.data_rows, 2);
        assert_eq!(report.identifier_rows, 2);
        assert_eq!(report.discarded, 4);
        assert!(report.malformed.is_empty());
    }

    #[test]
    fn test_out_of_order_rows() {
        let input = "H,S29,S30,S31,S32\nC,1,1,1,1,1,1,1,1,1,1,1,1\nA,S1,S2,S3,S4\n";
        let grid = parse_grid(input.as_bytes()).unwrap();

        assert_eq!(grid.identifiers()[0], "S1");
        assert_eq!(grid.identifiers()[28], "S29");
        assert_eq!(grid.identifiers()[31], "S32");
        assert_eq!(&grid.data()[24..36], &[1; 12]);
    }

    #[test]
    fn test_short_data_row_aborts() {
        let input = "A,S1,S2,S3,S4\nA,1,2,3,4,5,6,7,8,9,10,11\n";
        let err = parse_grid(input.as_bytes()).unwrap_err();

        match err {
            GridError::MalformedRow { line, source } => {
                assert_eq!(line, 2);
                assert_eq!(source, RowError::DataCount { row: 'A', found: 11 });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collect_policy_skips_malformed_rows() {
        let input = "A,1,2,3,4,5,6,7,8,9,10,11\nB,1,2,3,4,5,6,7,8,9,10,11,12\nC,S1,S2\n";
        let (grid, report) = GridAssembler::new(MalformedRowPolicy::Collect)
            .parse(input.as_bytes())
            .unwrap();

        assert_eq!(report.data_rows, 1);
        assert_eq!(report.malformed.len(), 2);
        assert_eq!(report.malformed[0].line, 1);
        assert_eq!(report.malformed[1].error, RowError::IdentifierCount { row: 'C', found: 2 });
        assert!(grid.data()[..12].iter().all(|&v| v == 0));
        assert_eq!(grid.data()[12], 1);
    }

    #[test]
    fn test_windows_line_endings() {
        let input = "A,S1,S2,S3,S4\r\nA,1,2,3,4,5,6,7,8,9,10,11,12\r\n";
        let grid = parse_grid(input.as_bytes()).unwrap();

        assert_eq!(grid.identifiers()[3], "S4");
        assert_eq!(grid.data()[11], 12);
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let bytes: &[u8] = &[b'A', b',', 0xFF, 0xFE, b'\n'];
        assert!(matches!(parse_grid(bytes), Err(GridError::Io(_))));
    }
}
