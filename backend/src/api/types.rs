//! REST API types for frontend integration.
//!
//! The experiment JSON shape is the one the browser front-end already uses:
//! `{ "name": ..., "experiment": [ { "name": ..., "values": [a, b, c] } ] }`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{Experiment, SampleGroup};
use crate::parser::ParsedPlate;
use crate::transform::pipeline::{GeneratedCsv, OutputFiles};

/// Response sent to frontend after a plate export upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Experiment name and samples
    #[serde(flatten)]
    pub experiment: Experiment,

    /// Metadata about the parse
    pub metadata: UploadMetadata,
}

/// Metadata about the parse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub encoding: String,
    pub data_rows: usize,
    pub identifier_rows: usize,
    pub discarded_lines: usize,
    pub malformed_rows: Vec<MalformedRowInfo>,
}

/// A row skipped during parsing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedRowInfo {
    pub line: usize,
    pub error: String,
}

impl UploadResponse {
    pub fn new(experiment: Experiment, parsed: &ParsedPlate) -> Self {
        let report = &parsed.report;
        Self {
            job_id: Uuid::new_v4().to_string(),
            experiment,
            metadata: UploadMetadata {
                encoding: parsed.encoding.clone(),
                data_rows: report.data_rows,
                identifier_rows: report.identifier_rows,
                discarded_lines: report.discarded,
                malformed_rows: report
                    .malformed
                    .iter()
                    .map(|m| MalformedRowInfo {
                        line: m.line,
                        error: m.error.to_string(),
                    })
                    .collect(),
            },
        }
    }
}

/// Request to produce the raw and adjusted CSV files.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub experiment: Experiment,

    /// Control groups; empty means adjust by the "unpulsed" control
    #[serde(default)]
    pub groups: Vec<SampleGroup>,
}

/// Response to a generate request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: String,
    pub name: String,
    pub raw_csv: String,
    pub adjusted_csv: String,
    /// Files written on the server
    pub files: OutputFiles,
}

impl GenerateResponse {
    pub fn new(name: &str, csv: GeneratedCsv, files: OutputFiles) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            name: name.to_string(),
            raw_csv: csv.raw_csv,
            adjusted_csv: csv.adjusted_csv,
            files,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_shape() {
        let body = json!({
            "name": "run1",
            "experiment": [
                { "name": "Ctrl_unpulsed", "values": [10, 20, 30] },
                { "name": "S1", "values": [15, 25, 35] }
            ],
            "groups": [ { "control": "Ctrl_unpulsed", "samples": ["S1"] } ]
        });

        let req: GenerateRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.experiment.name(), "run1");
        assert_eq!(req.experiment.len(), 2);
        assert_eq!(req.groups[0].samples, vec!["S1"]);
    }

    #[test]
    fn test_generate_request_without_groups() {
        let body = json!({ "name": "run1", "experiment": [] });
        let req: GenerateRequest = serde_json::from_value(body).unwrap();
        assert!(req.groups.is_empty());
    }

    #[test]
    fn test_error_response() {
        let v = error_response("no control found");
        assert_eq!(v["status"], "error");
        assert_eq!(v["error"], "no control found");
    }
}
