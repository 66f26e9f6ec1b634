//! Reconstruct named triplicate samples from the flat plate buffers.
//!
//! Identifier `k` pairs with data values `3k`, `3k + 1` and `3k + 2`. Both
//! buffers are row-major over the plate (4 names and 12 values per row), so
//! the k-th name and the k-th triple cover the same wells.

use crate::error::{ExperimentError, ExperimentResult};
use crate::models::{Experiment, Sample, IDENTIFIER_SLOTS, REPLICATES};
use crate::parser::PlateGrid;

/// Pair `identifiers` with consecutive triples of `data`, optionally reordered.
///
/// `sort_order[i]` is the 1-based original position of the sample that
/// should end up at position `i`. Without a sort order the identifier order
/// is kept.
pub fn build_experiment(
    name: impl Into<String>,
    data: &[i64],
    identifiers: &[String],
    sort_order: Option<&[usize]>,
) -> ExperimentResult<Experiment> {
    if identifiers.len() > IDENTIFIER_SLOTS {
        return Err(ExperimentError::TooManySamples(identifiers.len()));
    }
    if data.len() < identifiers.len() * REPLICATES {
        return Err(ExperimentError::MissingMeasurements {
            samples: identifiers.len(),
            values: data.len(),
        });
    }

    let samples: Vec<Sample> = identifiers
        .iter()
        .zip(data.chunks_exact(REPLICATES))
        .map(|(id, triple)| Sample::new(id.clone(), [triple[0], triple[1], triple[2]]))
        .collect();

    let experiment = Experiment::new(name, samples)?;

    match sort_order {
        Some(order) => reorder(&experiment, order),
        None => Ok(experiment),
    }
}

/// Build an experiment from every identifier slot of a parsed plate.
pub fn build_from_grid(
    name: impl Into<String>,
    grid: &PlateGrid,
    sort_order: Option<&[usize]>,
) -> ExperimentResult<Experiment> {
    build_experiment(name, grid.data(), grid.identifiers(), sort_order)
}

/// A new experiment with samples taken in `order` (1-based original positions).
pub fn reorder(experiment: &Experiment, order: &[usize]) -> ExperimentResult<Experiment> {
    let samples = experiment.samples();
    validate_order(order, samples.len())?;

    let reordered = order.iter().map(|&o| samples[o - 1].clone()).collect();
    Experiment::new(experiment.name(), reordered)
}

/// The order that undoes `order`: `reorder(&reorder(e, order)?, &inverse_order(order))` is `e`.
pub fn inverse_order(order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; order.len()];
    for (position, &original) in order.iter().enumerate() {
        if let Some(slot) = original.checked_sub(1).and_then(|i| inverse.get_mut(i)) {
            *slot = position + 1;
        }
    }
    inverse
}

/// Parse a sort order such as `"3, 1, 2"`.
pub fn parse_sort_order(spec: &str) -> Result<Vec<usize>, std::num::ParseIntError> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn validate_order(order: &[usize], samples: usize) -> ExperimentResult<()> {
    if order.len() != samples {
        return Err(ExperimentError::SortLength {
            samples,
            order: order.len(),
        });
    }

    let mut seen = vec![false; samples];
    for &index in order {
        if index == 0 || index > samples {
            return Err(ExperimentError::SortIndex { index, max: samples });
        }
        if std::mem::replace(&mut seen[index - 1], true) {
            return Err(ExperimentError::DuplicateSortIndex(index));
        }
    }

    Ok(())
}
