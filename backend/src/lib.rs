//! # csvtoprism - Plate-reader exports to GraphPad Prism CSV
//!
//! csvtoprism reads the 96-well plate export of a plate reader (CSV or an
//! Excel workbook sheet), rebuilds the 32 triplicate samples, adjusts every
//! sample by the mean of the "unpulsed" control, and writes both the raw and
//! the adjusted data in Prism's 4 x 32 import layout.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLS / CSV   │────▶│   Parser    │────▶│   Builder   │────▶│  Adjuster   │────▶│  Prism CSV  │
//! │  (export)   │     │ (grid scan) │     │ (32 samples)│     │ (ctrl mean) │     │ (raw + adj) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvtoprism::{convert_file, write_outputs, ConvertOptions};
//! use std::path::Path;
//!
//! let result = convert_file(Path::new("plate.xlsx"), &ConvertOptions::default())?;
//! write_outputs(&result.raw, &result.adjusted, Path::new("."))?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (Sample, Experiment, RowLetter)
//! - [`parser`] - Encoding detection, line classification, grid assembly
//! - [`xls`] - Workbook sheet flattening
//! - [`transform`] - Experiment building, sorting, control adjustment, pipeline
//! - [`output`] - Prism CSV layout
//! - [`config`] - Service configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod config;

// Input
pub mod parser;
pub mod xls;

// Transformation
pub mod transform;

// Output
pub mod output;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExperimentError, GridError, OutputError, PipelineError, RowError, ServerError, XlsError,
    PipelineResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Experiment, RowLetter, Sample, SampleGroup, CONTROL_MARKER};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    classify, decode_content, detect_encoding, extract_row, parse_bytes_auto, parse_csv_file_auto,
    parse_grid, GridAssembler, GridReport, LineType, MalformedRowPolicy, ParsedPlate, PlateGrid,
};

// =============================================================================
// Re-exports - Workbooks
// =============================================================================

pub use xls::{csv_from_workbook, is_workbook_path, workbook_bytes_to_csv};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    adjust, build_experiment, build_from_grid, control_mean, group_by_controls, parse_sort_order,
    reorder, ControlGroup, GroupedExperiment,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_bytes, convert_file, experiment_name, generate_csv, read_experiment_bytes,
    read_experiment_file, write_generated, write_outputs, ConversionResult, ConvertOptions,
    GeneratedCsv, OutputFiles,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{prism_grid, read_experiment_csv, render_table, to_csv_string, write_csv};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, GenerateRequest, GenerateResponse, UploadResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
    pub use crate::config::ServerConfig;
}
