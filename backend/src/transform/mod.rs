//! Transformation module.
//!
//! This module turns parsed plate buffers into experiments:
//! - Builder: flat buffers to named triplicate samples, with sorting
//! - Adjust: control-mean adjustment
//! - Grouper: control-then-group column arrangement
//! - Pipeline: end-to-end conversion

pub mod adjust;
pub mod builder;
pub mod grouper;
pub mod pipeline;

pub use adjust::{adjust, control_mean, offset_all};
pub use builder::{build_experiment, build_from_grid, inverse_order, parse_sort_order, reorder};
pub use grouper::{group_by_controls, ControlGroup, GroupedExperiment};
pub use pipeline::*;
