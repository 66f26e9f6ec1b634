//! Domain models for the csvtoprism conversion pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`RowLetter`] - Plate row letter `A`-`H` and its 0-based index
//! - [`Sample`] - One named triplicate measurement
//! - [`Experiment`] - Ordered samples read from one plate
//! - [`SampleGroup`] - A control sample and the samples measured against it

use serde::{Deserialize, Serialize};

use crate::error::{ExperimentError, ExperimentResult};

// =============================================================================
// Plate Geometry
// =============================================================================

/// Rows on a plate (`A`-`H`).
pub const PLATE_ROWS: usize = 8;

/// Integer measurements in one data row.
pub const DATA_COLUMNS: usize = 12;

/// Sample names in one identifier row.
pub const IDENTIFIER_COLUMNS: usize = 4;

/// Size of the flat data buffer.
pub const DATA_SLOTS: usize = PLATE_ROWS * DATA_COLUMNS;

/// Size of the flat identifier buffer, and the most samples an experiment holds.
pub const IDENTIFIER_SLOTS: usize = PLATE_ROWS * IDENTIFIER_COLUMNS;

/// Replicate measurements per sample.
pub const REPLICATES: usize = 3;

/// Case-insensitive marker in the negative control's name.
pub const CONTROL_MARKER: &str = "unpulsed";

// =============================================================================
// Row Letter
// =============================================================================

const ROW_LETTERS: [char; PLATE_ROWS] = ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H'];

/// A plate row letter. Only `A` through `H` exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowLetter(usize);

impl RowLetter {
    /// Parse a cell as a row letter. The cell must be exactly one of `A`-`H`.
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let letter = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::from_char(letter)
    }

    /// Row letter for a character, if it is `A`-`H`.
    pub fn from_char(letter: char) -> Option<Self> {
        ROW_LETTERS.iter().position(|&l| l == letter).map(Self)
    }

    /// Row letter for a 0-based row index.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < PLATE_ROWS).then_some(Self(index))
    }

    /// 0-based row index (`A` = 0 ... `H` = 7).
    pub fn index(self) -> usize {
        self.0
    }

    pub fn as_char(self) -> char {
        ROW_LETTERS[self.0]
    }
}

impl std::fmt::Display for RowLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// =============================================================================
// Sample
// =============================================================================

/// One plate well group's triplicate measurement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    pub values: [i64; REPLICATES],
}

impl Sample {
    pub fn new(name: impl Into<String>, values: [i64; REPLICATES]) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Whether this sample is named as a negative control.
    pub fn is_control(&self) -> bool {
        self.name.to_lowercase().contains(CONTROL_MARKER)
    }

    /// A copy of this sample with `offset` subtracted from every value.
    pub fn offset_by(&self, offset: i64) -> ExperimentResult<Self> {
        let mut values = self.values;
        for slot in values.iter_mut() {
            let value = *slot;
            *slot = value
                .checked_sub(offset)
                .ok_or_else(|| ExperimentError::ValueOverflow {
                    sample: self.name.clone(),
                    value,
                    offset,
                })?;
        }
        Ok(Self {
            name: self.name.clone(),
            values,
        })
    }
}

// =============================================================================
// Experiment
// =============================================================================

/// Ordered samples of one plate. Order defines the output column order.
///
/// Serializes as `{ "name": ..., "experiment": [ { "name", "values" }, ... ] }`,
/// the shape exchanged with the browser front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawExperiment")]
pub struct Experiment {
    name: String,
    #[serde(rename = "experiment")]
    samples: Vec<Sample>,
}

#[derive(Deserialize)]
struct RawExperiment {
    #[serde(default)]
    name: String,
    experiment: Vec<Sample>,
}

impl TryFrom<RawExperiment> for Experiment {
    type Error = ExperimentError;

    fn try_from(raw: RawExperiment) -> Result<Self, Self::Error> {
        Experiment::new(raw.name, raw.experiment)
    }
}

impl Experiment {
    /// Create an experiment, rejecting more samples than a plate holds.
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> ExperimentResult<Self> {
        if samples.len() > IDENTIFIER_SLOTS {
            return Err(ExperimentError::TooManySamples(samples.len()));
        }
        Ok(Self {
            name: name.into(),
            samples,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same samples under another name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Sample names in experiment order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.samples.iter().map(|s| s.name.as_str()).collect()
    }

    /// Look up a sample by exact name.
    pub fn sample(&self, name: &str) -> Option<&Sample> {
        self.samples.iter().find(|s| s.name == name)
    }

    /// The first sample whose name contains "unpulsed", case-insensitively.
    pub fn control(&self) -> ExperimentResult<&Sample> {
        self.samples
            .iter()
            .find(|s| s.is_control())
            .ok_or(ExperimentError::NoControl)
    }
}

impl<'a> IntoIterator for &'a Experiment {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

// =============================================================================
// Sample Group
// =============================================================================

/// A control sample followed by the experimental samples compared against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleGroup {
    pub control: String,
    #[serde(default)]
    pub samples: Vec<String>,
}

impl SampleGroup {
    pub fn new(control: impl Into<String>, samples: Vec<String>) -> Self {
        Self {
            control: control.into(),
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_letters_map_in_order() {
        for (i, letter) in "ABCDEFGH".chars().enumerate() {
            let row = RowLetter::from_token(&letter.to_string()).unwrap();
            assert_eq!(row.index(), i);
            assert_eq!(row.as_char(), letter);
        }
    }

    #[test]
    fn test_row_letter_bounds() {
        assert!(RowLetter::from_token("@").is_none());
        assert!(RowLetter::from_token("I").is_none());
        assert!(RowLetter::from_token("a").is_none());
        assert!(RowLetter::from_token("AB").is_none());
        assert!(RowLetter::from_token("").is_none());
        assert!(RowLetter::from_index(8).is_none());
    }

    #[test]
    fn test_control_is_case_insensitive_and_first_wins() {
        let e = Experiment::new(
            "plate",
            vec![
                Sample::new("S1", [1, 2, 3]),
                Sample::new("Ctrl_UNPULSED", [4, 5, 6]),
                Sample::new("unpulsed 2", [7, 8, 9]),
            ],
        )
        .unwrap();

        assert_eq!(e.control().unwrap().name, "Ctrl_UNPULSED");
    }

    #[test]
    fn test_no_control() {
        let e = Experiment::new("plate", vec![Sample::new("S1", [1, 2, 3])]).unwrap();
        assert_eq!(e.control(), Err(ExperimentError::NoControl));
    }

    #[test]
    fn test_too_many_samples() {
        let samples = (0..33).map(|i| Sample::new(format!("S{i}"), [0, 0, 0])).collect();
        assert_eq!(
            Experiment::new("plate", samples),
            Err(ExperimentError::TooManySamples(33))
        );
    }

    #[test]
    fn test_json_shape() {
        let e = Experiment::new("plate", vec![Sample::new("S1", [1, 2, 3])]).unwrap();
        let json = serde_json::to_value(&e).unwrap();

        assert_eq!(json["name"], "plate");
        assert_eq!(json["experiment"][0]["name"], "S1");
        assert_eq!(json["experiment"][0]["values"][2], 3);

        let back: Experiment = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_json_rejects_oversized_experiment() {
        let samples: Vec<_> = (0..33)
            .map(|i| serde_json::json!({ "name": format!("S{i}"), "values": [0, 0, 0] }))
            .collect();
        let json = serde_json::json!({ "name": "big", "experiment": samples });

        assert!(serde_json::from_value::<Experiment>(json).is_err());
    }
}
