//! Control-mean adjustment.

use crate::error::ExperimentResult;
use crate::models::{Experiment, Sample, REPLICATES};

/// Mean of a sample's replicates, rounded half away from zero.
///
/// Summed in `i128`, so any three `i64` values have a mean.
pub fn control_mean(control: &Sample) -> i64 {
    let sum: i128 = control.values.iter().map(|&v| i128::from(v)).sum();
    (sum as f64 / REPLICATES as f64).round() as i64
}

/// A new experiment with every value offset by the control's mean.
///
/// The control is the first sample whose name contains "unpulsed"
/// (case-insensitive). It is adjusted too. Order and names are preserved;
/// `experiment` is left untouched.
pub fn adjust(experiment: &Experiment) -> ExperimentResult<Experiment> {
    let mean = control_mean(experiment.control()?);
    offset_all(experiment, mean)
}

/// A new experiment with `offset` subtracted from every value.
///
/// Fails with [`ExperimentError::ValueOverflow`] if a result leaves the `i64` range.
///
/// [`ExperimentError::ValueOverflow`]: crate::error::ExperimentError::ValueOverflow
pub fn offset_all(experiment: &Experiment, offset: i64) -> ExperimentResult<Experiment> {
    let samples = experiment
        .iter()
        .map(|s| s.offset_by(offset))
        .collect::<ExperimentResult<Vec<_>>>()?;
    Experiment::new(experiment.name(), samples)
}
