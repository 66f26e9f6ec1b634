//! Error types for the csvtoprism conversion pipeline.
//!
//! This module defines a hierarchy of error types, one per stage:
//!
//! - [`RowError`] - A single plate row did not have the expected geometry
//! - [`GridError`] - Line scanning / grid assembly errors
//! - [`ExperimentError`] - Caller-controlled model errors (control, sort order, groups)
//! - [`XlsError`] - Workbook sheet extraction errors
//! - [`OutputError`] - CSV writing / reading-back errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Row Extraction Errors
// =============================================================================

/// A classified row whose payload does not match the plate geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// No `A`-`H` row letter in the row.
    #[error("no plate row letter (A-H) found")]
    MissingRowLetter,

    /// A data row did not contain exactly 12 integer measurements.
    #[error("row {row}: expected 12 measurements, found {found}")]
    DataCount { row: char, found: usize },

    /// An identifier row did not contain exactly 4 sample names.
    #[error("row {row}: expected 4 sample names, found {found}")]
    IdentifierCount { row: char, found: usize },
}

// =============================================================================
// Grid Assembly Errors
// =============================================================================

/// Errors while scanning the input into the flat plate buffers.
#[derive(Debug, Error)]
pub enum GridError {
    /// Failed to read a line from the input.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode input bytes.
    #[error("Failed to decode input: {0}")]
    Encoding(String),

    /// A row had the wrong number of values; the parse was aborted.
    #[error("Malformed plate row on line {line}: {source}")]
    MalformedRow { line: usize, source: RowError },
}

// =============================================================================
// Experiment Errors
// =============================================================================

/// Errors in the experiment model. These come from caller input (sort order,
/// sample groups, submitted experiments), never from raw file content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    /// No sample name contains "unpulsed".
    #[error("no control found")]
    NoControl,

    /// Sort order length differs from the sample count.
    #[error("experiment contains {samples} identifiers, but sort order contains {order}")]
    SortLength { samples: usize, order: usize },

    /// Sort index outside `1..=max`.
    #[error("invalid identifier index [{index}] - index must be between 1-{max}")]
    SortIndex { index: usize, max: usize },

    /// The same index appears twice in a sort order.
    #[error("identifier index [{0}] appears more than once in the sort order")]
    DuplicateSortIndex(usize),

    /// Fewer measurements than three per identifier.
    #[error("{samples} identifiers need {} measurements, found {values}", .samples * 3)]
    MissingMeasurements { samples: usize, values: usize },

    /// More samples than one plate can hold.
    #[error("experiment has {0} samples, a plate holds at most 32")]
    TooManySamples(usize),

    /// A group references a sample that is not in the experiment.
    #[error("unknown sample: {0}")]
    UnknownSample(String),

    /// Subtracting an offset took a value outside the 64-bit range.
    #[error("sample '{sample}': {value} minus {offset} overflows")]
    ValueOverflow { sample: String, value: i64, offset: i64 },

    /// A group names a sample that appears more than once on the plate.
    #[error("sample name '{0}' is used by more than one well group")]
    AmbiguousSample(String),

    /// A sample was assigned to more than one group.
    #[error("sample '{0}' belongs to more than one group")]
    SampleInMultipleGroups(String),
}

// =============================================================================
// Workbook Errors
// =============================================================================

/// Errors while flattening a workbook sheet to CSV.
#[derive(Debug, Error)]
pub enum XlsError {
    /// The workbook could not be opened or read.
    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// The workbook has no sheets at all.
    #[error("This workbook contains no sheets.")]
    NoSheets,

    /// The requested sheet index does not exist.
    #[error("No sheet {index} available, please select a sheet between 0 and {}", .count.saturating_sub(1))]
    SheetOutOfRange { index: usize, count: usize },

    /// Writing the flattened CSV failed.
    #[error("Failed to write CSV: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing or reading the Prism CSV layout.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Underlying writer/reader failure.
    #[error("Output IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoder/decoder failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A CSV being read back does not follow the 4 x 32 layout.
    #[error("Invalid Prism layout: {0}")]
    Layout(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline::convert_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Grid parsing error.
    #[error("Parse error: {0}")]
    Grid(#[from] GridError),

    /// Experiment model error.
    #[error("Experiment error: {0}")]
    Experiment(#[from] ExperimentError),

    /// Workbook error.
    #[error("Workbook error: {0}")]
    Xls(#[from] XlsError),

    /// Output error.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// File system error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for row extraction.
pub type RowResult<T> = Result<T, RowError>;

/// Result type for grid assembly.
pub type GridResult<T> = Result<T, GridError>;

/// Result type for experiment operations.
pub type ExperimentResult<T> = Result<T, ExperimentError>;

/// Result type for workbook operations.
pub type XlsResult<T> = Result<T, XlsError>;

/// Result type for output operations.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
