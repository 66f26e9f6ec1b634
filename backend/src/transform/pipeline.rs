//! High-level pipeline API for plate export to Prism CSV conversion.
//!
//! This module provides easy-to-use functions that combine all steps:
//! workbook flattening, grid parsing, experiment reconstruction, sorting,
//! control adjustment and CSV output.
//!
//! # Example
//!
//! ```rust,ignore
//! use csvtoprism::{convert_file, write_outputs, ConvertOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let result = convert_file(Path::new("plate.xlsx"), &ConvertOptions::default())?;
//!     let files = write_outputs(&result.raw, &result.adjusted, Path::new("."))?;
//!
//!     println!("Wrote {}", files.adjusted.display());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use super::adjust::{adjust, control_mean};
use super::builder::build_from_grid;
use super::grouper::group_by_controls;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::error::PipelineResult;
use crate::models::{Experiment, SampleGroup};
use crate::output::{to_csv_string, write_csv};
use crate::parser::{parse_bytes_auto, GridReport, MalformedRowPolicy, ParsedPlate};
use crate::xls::{is_workbook_bytes, is_workbook_path, workbook_bytes_to_csv};

/// Options for the conversion pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Zero-based workbook sheet to read (ignored for CSV input)
    #[serde(default)]
    pub sheet: usize,

    /// 1-based original sample positions, in the desired output order
    #[serde(default)]
    pub sort_order: Option<Vec<usize>>,

    /// What to do with rows of the wrong width
    #[serde(default)]
    pub malformed_rows: MalformedRowPolicy,

    /// Where output files go (current directory if unset)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Result of a complete conversion
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Samples as read from the plate (after sorting)
    pub raw: Experiment,

    /// Samples offset by the control mean
    pub adjusted: Experiment,

    /// Rounded control mean that was subtracted
    pub control_mean: i64,

    /// Line counts and skipped rows
    pub report: GridReport,

    /// Detected input encoding ("workbook" for spreadsheets)
    pub encoding: String,
}

/// Paths of the two CSV files written for one experiment
#[derive(Debug, Clone, Serialize)]
pub struct OutputFiles {
    pub raw: PathBuf,
    pub adjusted: PathBuf,
}

/// Raw and adjusted Prism CSV bodies
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCsv {
    pub raw_csv: String,
    pub adjusted_csv: String,
}

/// Experiment name for an input file: the part of the file name before the first dot.
pub fn experiment_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|n| !n.is_empty())
        .unwrap_or("experiment")
        .to_string()
}

/// Parse a plate export (CSV or workbook) from memory into an experiment.
pub fn read_experiment_bytes(
    name: &str,
    bytes: &[u8],
    options: &ConvertOptions,
) -> PipelineResult<(Experiment, ParsedPlate)> {
    let parsed = if is_workbook_bytes(bytes) {
        log_info(format!("📗 Reading workbook sheet {}...", options.sheet));
        let csv = workbook_bytes_to_csv(bytes, options.sheet)?;
        let mut parsed = parse_bytes_auto(csv.as_bytes(), options.malformed_rows)?;
        parsed.encoding = "workbook".to_string();
        parsed
    } else {
        log_info("📖 Reading CSV export...");
        parse_bytes_auto(bytes, options.malformed_rows)?
    };

    print_report(&parsed);

    let experiment = build_from_grid(name, &parsed.grid, options.sort_order.as_deref())?;
    print_order(&experiment, options.sort_order.is_some());

    Ok((experiment, parsed))
}

/// Read a plate export file into an experiment.
pub fn read_experiment_file(path: &Path, options: &ConvertOptions) -> PipelineResult<(Experiment, ParsedPlate)> {
    let bytes = std::fs::read(path)?;
    if is_workbook_path(path) && !is_workbook_bytes(&bytes) {
        log_warning(format!(
            "{} has a workbook extension but no workbook signature, reading as CSV",
            path.display()
        ));
    }
    read_experiment_bytes(&experiment_name(path), &bytes, options)
}

/// Convert in-memory plate export bytes.
pub fn convert_bytes(name: &str, bytes: &[u8], options: &ConvertOptions) -> PipelineResult<ConversionResult> {
    let (raw, parsed) = read_experiment_bytes(name, bytes, options)?;
    finish(raw, parsed)
}

/// Convert a plate export file.
///
/// This is the main entry point for the pipeline. It:
/// 1. Flattens the workbook sheet (if the input is a workbook)
/// 2. Scans the plate grid
/// 3. Rebuilds the samples and applies the sort order
/// 4. Adjusts every sample by the control mean
pub fn convert_file(path: &Path, options: &ConvertOptions) -> PipelineResult<ConversionResult> {
    let (raw, parsed) = read_experiment_file(path, options)?;
    finish(raw, parsed)
}

fn finish(raw: Experiment, parsed: ParsedPlate) -> PipelineResult<ConversionResult> {
    log_info("⚖️  Adjusting by control...");
    let control = raw.control().map_err(|e| {
        log_error("No sample name contains \"unpulsed\"");
        e
    })?;
    let mean = control_mean(control);
    log_success(format!("Control \"{}\" mean: {}", control.name, mean));

    let adjusted = adjust(&raw)?;

    Ok(ConversionResult {
        raw,
        adjusted,
        control_mean: mean,
        report: parsed.report,
        encoding: parsed.encoding,
    })
}

/// Write `<name>_Raw.csv` and `<name>_Adjusted.csv` into `dir`.
pub fn write_outputs(raw: &Experiment, adjusted: &Experiment, dir: &Path) -> PipelineResult<OutputFiles> {
    std::fs::create_dir_all(dir)?;

    let files = OutputFiles {
        raw: dir.join(format!("{}_Raw.csv", raw.name())),
        adjusted: dir.join(format!("{}_Adjusted.csv", adjusted.name())),
    };

    write_csv(raw, BufWriter::new(File::create(&files.raw)?))?;
    log_success(format!("💾 Created: {}", files.raw.display()));

    write_csv(adjusted, BufWriter::new(File::create(&files.adjusted)?))?;
    log_success(format!("💾 Created: {}", files.adjusted.display()));

    Ok(files)
}

/// Write generated CSV bodies as `<name>.csv` and `<name>_Adjusted.csv` into `dir`.
pub fn write_generated(name: &str, csv: &GeneratedCsv, dir: &Path) -> PipelineResult<OutputFiles> {
    std::fs::create_dir_all(dir)?;

    let files = OutputFiles {
        raw: dir.join(format!("{}.csv", name)),
        adjusted: dir.join(format!("{}_Adjusted.csv", name)),
    };

    std::fs::write(&files.raw, &csv.raw_csv)?;
    log_success(format!("💾 Created: {}", files.raw.display()));

    std::fs::write(&files.adjusted, &csv.adjusted_csv)?;
    log_success(format!("💾 Created: {}", files.adjusted.display()));

    Ok(files)
}

/// Raw and adjusted CSV for a submitted experiment.
///
/// Without groups the experiment is adjusted by its "unpulsed" control.
/// With groups, columns are laid out control-then-group and each group is
/// adjusted by its own control.
pub fn generate_csv(experiment: &Experiment, groups: &[SampleGroup]) -> PipelineResult<(Experiment, Experiment, GeneratedCsv)> {
    let (raw, adjusted) = if groups.is_empty() {
        (experiment.clone(), adjust(experiment)?)
    } else {
        log_info(format!("📦 Arranging {} control group(s)...", groups.len()));
        let grouped = group_by_controls(experiment, groups)?;
        for group in grouped.groups() {
            log_info_indent(
                format!("{} → {} sample(s)", group.control.name, group.samples.len()),
                1,
            );
        }
        (grouped.flatten()?, grouped.adjusted()?.flatten()?)
    };

    let csv = GeneratedCsv {
        raw_csv: to_csv_string(&raw)?,
        adjusted_csv: to_csv_string(&adjusted)?,
    };

    Ok((raw, adjusted, csv))
}

/// Print grid scan counts
fn print_report(parsed: &ParsedPlate) {
    let report = &parsed.report;
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!(
        "{} data row(s), {} identifier row(s), {} line(s) discarded",
        report.data_rows, report.identifier_rows, report.discarded
    ));

    if !report.malformed.is_empty() {
        log_warning(format!("{} malformed row(s) skipped", report.malformed.len()));
        for row in report.malformed.iter().take(5) {
            log_warning(format!("• line {}: {}", row.line, row.error));
        }
    }
}

/// Print the resulting sample order
fn print_order(experiment: &Experiment, sorted: bool) {
    if sorted {
        log_info("Sort order specified.");
        log_info(format!("New Order: {}", experiment.identifiers().join(", ")));
    } else {
        log_info("No sort order specified. Retaining original order of identifiers.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATE: &str = "\
A,10,20,30,15,25,35,5,5,5,0,0,0
A,Ctrl_unpulsed,S1,S2,S3
";

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.sheet, 0);
        assert!(opts.sort_order.is_none());
        assert_eq!(opts.malformed_rows, MalformedRowPolicy::Abort);
    }

    #[test]
    fn test_experiment_name() {
        assert_eq!(experiment_name(Path::new("/data/run1.xlsx")), "run1");
        assert_eq!(experiment_name(Path::new("run2.plate.csv")), "run2");
        assert_eq!(experiment_name(Path::new("/")), "experiment");
    }

    #[test]
    fn test_convert_bytes() {
        let result = convert_bytes("run", PLATE.as_bytes(), &ConvertOptions::default()).unwrap();

        assert_eq!(result.raw.len(), 32);
        assert_eq!(result.raw.name(), "run");
        assert_eq!(result.control_mean, 20);
        assert_eq!(result.adjusted.samples()[0].values, [-10, 0, 10]);
        assert_eq!(result.adjusted.samples()[1].values, [-5, 5, 15]);
        // Unfilled plate slots are offset too
        assert_eq!(result.adjusted.samples()[4].values, [-20, -20, -20]);
    }

    #[test]
    fn test_extreme_measurements_are_reported() {
        let plate = "\
A,9223372036854775807,9223372036854775807,9223372036854775807,1,2,3,5,5,5,0,0,0
A,Ctrl_unpulsed,S1,S2,S3
";
        let result = convert_bytes("run", plate.as_bytes(), &ConvertOptions::default()).unwrap();
        assert_eq!(result.control_mean, i64::MAX);
        assert_eq!(result.adjusted.samples()[0].values, [0, 0, 0]);

        let plate = "\
A,10,20,30,-9223372036854775808,25,35,5,5,5,0,0,0
A,Ctrl_unpulsed,S1,S2,S3
";
        let err = convert_bytes("run", plate.as_bytes(), &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::Experiment(crate::error::ExperimentError::ValueOverflow { ref sample, .. })
                if sample == "S1"
        ));
    }

    #[test]
    fn test_generate_grouped() {
        let (raw, _) = read_experiment_bytes("run", PLATE.as_bytes(), &ConvertOptions::default()).unwrap();
        let groups = vec![SampleGroup::new("Ctrl_unpulsed", vec!["S2".into()])];

        let (flat, adjusted, csv) = generate_csv(&raw, &groups).unwrap();

        assert_eq!(flat.identifiers(), vec!["Ctrl_unpulsed", "S2"]);
        assert_eq!(adjusted.samples()[1].values, [-15, -15, -15]);
        assert!(csv.raw_csv.starts_with("Ctrl_unpulsed,S2,"));
        assert!(csv.adjusted_csv.lines().nth(1).unwrap().starts_with("-10,-15,"));
    }

    #[test]
    fn test_write_generated_names() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, _) = read_experiment_bytes("run", PLATE.as_bytes(), &ConvertOptions::default()).unwrap();
        let (_, _, csv) = generate_csv(&raw, &[]).unwrap();

        let files = write_generated("run", &csv, dir.path()).unwrap();

        assert_eq!(files.raw, dir.path().join("run.csv"));
        assert_eq!(files.adjusted, dir.path().join("run_Adjusted.csv"));
        assert_eq!(std::fs::read_to_string(&files.adjusted).unwrap(), csv.adjusted_csv);
    }
}
