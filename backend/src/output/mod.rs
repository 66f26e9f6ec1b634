//! Prism import layout.
//!
//! An experiment is written as exactly 4 rows by 32 columns: row 0 holds the
//! sample names, rows 1-3 the three replicates, one sample per column in
//! experiment order. Columns past the last sample are empty so the file
//! always matches the fixed import template.

use std::fmt;
use std::io::{Read, Write};

use crate::error::{OutputError, OutputResult};
use crate::models::{Experiment, Sample, IDENTIFIER_SLOTS, REPLICATES};

/// Rows in the layout: names plus one per replicate.
pub const LAYOUT_ROWS: usize = 1 + REPLICATES;

/// Columns in the layout.
pub const LAYOUT_COLUMNS: usize = IDENTIFIER_SLOTS;

/// The 4 x 32 cell grid for `experiment`.
pub fn prism_grid(experiment: &Experiment) -> Vec<Vec<String>> {
    let mut grid = vec![vec![String::new(); LAYOUT_COLUMNS]; LAYOUT_ROWS];

    for (col, sample) in experiment.iter().enumerate() {
        grid[0][col] = sample.name.clone();
        for (rep, value) in sample.values.iter().enumerate() {
            grid[rep + 1][col] = value.to_string();
        }
    }

    grid
}

/// Write `experiment` as Prism CSV.
pub fn write_csv<W: Write>(experiment: &Experiment, writer: W) -> OutputResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    for row in prism_grid(experiment) {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;

    Ok(())
}

/// Prism CSV for `experiment` as a string.
pub fn to_csv_string(experiment: &Experiment) -> OutputResult<String> {
    let mut buf = Vec::new();
    write_csv(experiment, &mut buf)?;
    String::from_utf8(buf).map_err(|e| OutputError::Layout(e.to_string()))
}

/// Read a Prism CSV back into an experiment.
///
/// Samples are read column by column up to the first column whose four
/// cells are all empty.
pub fn read_experiment_csv<R: Read>(name: impl Into<String>, reader: R) -> OutputResult<Experiment> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let rows = rdr
        .records()
        .collect::<Result<Vec<csv::StringRecord>, csv::Error>>()?;

    if rows.len() != LAYOUT_ROWS {
        return Err(OutputError::Layout(format!(
            "expected {} rows, found {}",
            LAYOUT_ROWS,
            rows.len()
        )));
    }

    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if width > LAYOUT_COLUMNS {
        return Err(OutputError::Layout(format!(
            "expected at most {} columns, found {}",
            LAYOUT_COLUMNS, width
        )));
    }

    let cell = |row: usize, col: usize| rows[row].get(col).unwrap_or("").trim();

    let mut samples = Vec::new();
    for col in 0..width {
        if (0..LAYOUT_ROWS).all(|row| cell(row, col).is_empty()) {
            break;
        }

        let mut values = [0i64; REPLICATES];
        for (rep, value) in values.iter_mut().enumerate() {
            let raw = cell(rep + 1, col);
            *value = raw.parse().map_err(|_| {
                OutputError::Layout(format!("column {}, row {}: '{}' is not an integer", col + 1, rep + 2, raw))
            })?;
        }

        // Names are kept as written; only the measurements are trimmed
        samples.push(Sample::new(rows[0].get(col).unwrap_or(""), values));
    }

    Experiment::new(name, samples).map_err(|e| OutputError::Layout(e.to_string()))
}

/// Aligned plain-text table: names on the first line, one line per replicate.
pub fn render_table(experiment: &Experiment) -> String {
    let widths: Vec<usize> = experiment
        .iter()
        .map(|s| {
            s.values
                .iter()
                .map(|v| v.to_string().len())
                .chain(std::iter::once(s.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(LAYOUT_ROWS);

    let names: Vec<String> = experiment
        .iter()
        .zip(&widths)
        .map(|(s, w)| format!("{:<w$}", s.name, w = w))
        .collect();
    lines.push(names.join("  "));

    for rep in 0..REPLICATES {
        let values: Vec<String> = experiment
            .iter()
            .zip(&widths)
            .map(|(s, w)| format!("{:>w$}", s.values[rep], w = w))
            .collect();
        lines.push(values.join("  "));
    }

    lines
        .iter()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", render_table(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn experiment() -> Experiment {
        Experiment::new(
            "plate",
            vec![
                Sample::new("Ctrl_unpulsed", [10, 20, 30]),
                Sample::new("S1", [15, 25, 35]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_layout_is_always_4_by_32() {
        let grid = prism_grid(&experiment());
        assert_eq!(grid.len(), 4);
        assert!(grid.iter().all(|row| row.len() == 32));
        assert_eq!(grid[0][..3], ["Ctrl_unpulsed", "S1", ""]);
        assert_eq!(grid[3][1], "35");

        let empty = Experiment::new("empty", vec![]).unwrap();
        assert!(prism_grid(&empty).iter().flatten().all(String::is_empty));
    }

    #[test]
    fn test_csv_bytes() {
        let csv = to_csv_string(&experiment()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        let padding = ",".repeat(30);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], format!("Ctrl_unpulsed,S1{}", padding));
        assert_eq!(lines[1], format!("10,15{}", padding));
        assert_eq!(lines[2], format!("20,25{}", padding));
        assert_eq!(lines[3], format!("30,35{}", padding));
        assert!(csv.ends_with('\n'));
        assert!(!csv.contains('\r'));
    }

    #[test]
    fn test_read_rejects_bad_layout() {
        let err = read_experiment_csv("x", "a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expected 4 rows"));

        let err = read_experiment_csv("x", "a\n1\nfoo\n3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("not an integer"));
    }

    #[test]
    fn test_read_keeps_name_whitespace() {
        let e = Experiment::new(
            "plate",
            vec![
                Sample::new(" Ctrl_unpulsed", [1, 2, 3]),
                Sample::new("S1 ", [4, 5, 6]),
            ],
        )
        .unwrap();

        let csv = to_csv_string(&e).unwrap();
        let back = read_experiment_csv("plate", csv.as_bytes()).unwrap();

        assert_eq!(back.identifiers(), vec![" Ctrl_unpulsed", "S1 "]);
        assert_eq!(back, e);
    }

    #[test]
    fn test_read_trims_measurements() {
        let back = read_experiment_csv("plate", "S1\n 1\n2 \n 3 \n".as_bytes()).unwrap();
        assert_eq!(back.samples()[0].values, [1, 2, 3]);
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&experiment());
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Ctrl_unpulsed  S1");
        assert_eq!(lines[1], "           10  15");
        assert_eq!(lines[3], "           30  35");
    }

    fn sample_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_ ]{0,12}"
    }

    proptest! {
        #[test]
        fn prop_csv_round_trip(
            samples in proptest::collection::vec((sample_name(), any::<[i32; 3]>()), 0..=32)
        ) {
            let samples: Vec<Sample> = samples
                .into_iter()
                .map(|(name, v)| Sample::new(name, v.map(i64::from)))
                .collect();
            let e = Experiment::new("plate", samples).unwrap();

            let csv = to_csv_string(&e).unwrap();
            let back = read_experiment_csv("plate", csv.as_bytes()).unwrap();

            prop_assert_eq!(back, e);
        }
    }
}
