//! Arrange samples into control groups.
//!
//! The browser front-end lets a user pick a control sample and the
//! experimental samples measured against it, several times over. Output
//! columns are then laid out per group:
//!
//! ```text
//! ┌──────────┬─────┬─────┬──────────┬─────┐
//! │ control1 │ s1a │ s1b │ control2 │ s2a │
//! └──────────┴─────┴─────┴──────────┴─────┘
//! ```

use std::collections::HashSet;

use super::adjust::control_mean;
use crate::error::{ExperimentError, ExperimentResult};
use crate::models::{Experiment, Sample, SampleGroup};

/// One control and its experimental samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlGroup {
    pub control: Sample,
    pub samples: Vec<Sample>,
}

/// An experiment split into control groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedExperiment {
    name: String,
    groups: Vec<ControlGroup>,
}

impl GroupedExperiment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[ControlGroup] {
        &self.groups
    }

    /// Columns in control-then-group order, repeated per group.
    pub fn flatten(&self) -> ExperimentResult<Experiment> {
        let samples = self
            .groups
            .iter()
            .flat_map(|g| std::iter::once(&g.control).chain(&g.samples))
            .cloned()
            .collect();
        Experiment::new(self.name.clone(), samples)
    }

    /// Every group offset by the rounded mean of its own control.
    pub fn adjusted(&self) -> ExperimentResult<GroupedExperiment> {
        let groups = self
            .groups
            .iter()
            .map(|g| {
                let mean = control_mean(&g.control);
                Ok(ControlGroup {
                    control: g.control.offset_by(mean)?,
                    samples: g
                        .samples
                        .iter()
                        .map(|s| s.offset_by(mean))
                        .collect::<ExperimentResult<Vec<_>>>()?,
                })
            })
            .collect::<ExperimentResult<Vec<_>>>()?;

        Ok(GroupedExperiment {
            name: self.name.clone(),
            groups,
        })
    }
}

/// Resolve `groups` against the samples of `experiment`.
///
/// Every name must exist in the experiment exactly once and may be used
/// only once across all groups, whether as a control or as a member.
pub fn group_by_controls(experiment: &Experiment, groups: &[SampleGroup]) -> ExperimentResult<GroupedExperiment> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut lookup = |name: &str| -> ExperimentResult<Sample> {
        let mut matches = experiment.iter().filter(|s| s.name == name);
        let sample = matches
            .next()
            .ok_or_else(|| ExperimentError::UnknownSample(name.to_string()))?;
        if matches.next().is_some() {
            return Err(ExperimentError::AmbiguousSample(name.to_string()));
        }
        if !used.insert(sample.name.as_str()) {
            return Err(ExperimentError::SampleInMultipleGroups(name.to_string()));
        }
        Ok(sample.clone())
    };

    let mut resolved = Vec::with_capacity(groups.len());
    for group in groups {
        let control = lookup(group.control.as_str())?;
        let samples = group
            .samples
            .iter()
            .map(|name| lookup(name.as_str()))
            .collect::<ExperimentResult<Vec<_>>>()?;
        resolved.push(ControlGroup { control, samples });
    }

    Ok(GroupedExperiment {
        name: experiment.name().to_string(),
        groups: resolved,
    })
}
