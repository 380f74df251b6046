//! One reprocessing pass: parse the LFL, diff it, decode what the plots
//! need, and decide which parameter goes on which stacked axis.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::{debug, info};

use crate::backend::{FrameCompiler, SeriesStore};
use crate::definition::FrameDefinition;
use crate::detect::ChangeTracker;
use crate::error::{ProcessError, Result};

/// The fixed parameter anchoring axis 1 of every plot.
pub const REFERENCE_PARAMETER: &str = "Altitude STD";

// ─────────────────────────────────────────────────────────────────────────────
// AxisAssignment
// ─────────────────────────────────────────────────────────────────────────────

/// Which parameters belong on which stacked subplot.
///
/// Axis indices are contiguous and 1-based; axis 1 is never empty and always
/// starts with [`REFERENCE_PARAMETER`].
#[derive(Debug, Clone, PartialEq)]
pub struct AxisAssignment {
    axes: BTreeMap<usize, Vec<String>>,
}

impl AxisAssignment {
    /// Assemble the axis layout: axis 1 is the reference parameter, an
    /// optional reserved axis holds the changed set, then the definition's
    /// `AXIS_n` groups renumbered contiguously.
    pub fn new(changed: Option<Vec<String>>, groups: Vec<Vec<String>>) -> Self {
        let mut axes = BTreeMap::new();
        axes.insert(1, vec![REFERENCE_PARAMETER.to_string()]);
        let mut next = 2usize;
        if let Some(changed) = changed {
            axes.insert(next, changed);
            next += 1;
        }
        for group in groups {
            axes.insert(next, group);
            next += 1;
        }
        Self { axes }
    }

    /// Number of stacked axes.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Axes in display order, as `(index, parameter names)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.axes.iter().map(|(idx, names)| (*idx, names.as_slice()))
    }

    pub fn get(&self, index: usize) -> Option<&[String]> {
        self.axes.get(&index).map(Vec::as_slice)
    }

    /// The axis-1 anchor parameter.
    pub fn reference_parameter(&self) -> &str {
        &self.axes[&1][0]
    }

    /// Every parameter named on any axis.
    pub fn parameter_names(&self) -> BTreeSet<String> {
        self.axes.values().flatten().cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reprocessor
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs fixed for the lifetime of the tool.
#[derive(Debug, Clone)]
pub struct ReprocessOptions {
    pub lfl_path: PathBuf,
    pub data_path: PathBuf,
    pub output_path: PathBuf,
    /// Superframes buffered in memory before flushing; `-1` = unbounded.
    pub memory_budget: i64,
    pub frame_doubled: bool,
    /// Reserve an axis for parameters changed since the tool started.
    pub plot_changed: bool,
}

/// Runs reprocessing passes against a backend, accumulating change state
/// across them.
pub struct Reprocessor<B> {
    backend: B,
    opts: ReprocessOptions,
    tracker: ChangeTracker,
}

impl<B: FrameCompiler + SeriesStore> Reprocessor<B> {
    pub fn new(backend: B, opts: ReprocessOptions) -> Self {
        Self {
            backend,
            opts,
            tracker: ChangeTracker::new(),
        }
    }

    /// Execute one pass. On success the materialized store at
    /// `output_path` matches the returned assignment and the definition
    /// becomes the new diff baseline; on failure neither happens.
    pub fn run(&mut self) -> Result<AxisAssignment> {
        let definition = FrameDefinition::load(&self.opts.lfl_path)?;

        let changed = self.tracker.observe(&definition).clone();
        debug!("accumulated changed set: {changed:?}");

        let groups: Vec<Vec<String>> = definition
            .axis_groups()
            .into_iter()
            .map(|names| names.to_vec())
            .collect();
        if groups.is_empty() {
            return Err(ProcessError::MissingAxisGroup);
        }

        let changed_axis = (self.opts.plot_changed && !changed.is_empty())
            .then(|| changed.iter().cloned().collect::<Vec<_>>());
        let assignment = AxisAssignment::new(changed_axis, groups);

        let names = assignment.parameter_names();
        info!("resolving {} parameters", names.len());
        let (frame, plan) = self.backend.resolve(
            &self.opts.lfl_path,
            &names,
            self.opts.frame_doubled,
            log::log_enabled!(log::Level::Debug),
        )?;

        info!(
            "processing series store at {}",
            self.opts.output_path.display()
        );
        self.backend.materialize(
            &self.opts.data_path,
            &self.opts.output_path,
            &frame,
            &plan,
            self.opts.memory_budget,
        )?;
        info!("finished processing");

        self.tracker.commit(definition);
        Ok(assignment)
    }

    /// Read back the series this pass materialized.
    pub fn open_store(&self) -> Result<BTreeMap<String, crate::backend::Series>> {
        self.backend.open(&self.opts.output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_are_contiguous_from_one() {
        let assignment = AxisAssignment::new(
            Some(vec!["IAS".into()]),
            vec![vec!["ALT".into()], vec!["VS".into()]],
        );
        let indices: Vec<usize> = assignment.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(assignment.reference_parameter(), REFERENCE_PARAMETER);
        assert_eq!(assignment.get(2).unwrap(), ["IAS".to_string()]);
        assert_eq!(assignment.get(3).unwrap(), ["ALT".to_string()]);
    }

    #[test]
    fn groups_renumber_when_no_changed_axis() {
        let assignment = AxisAssignment::new(None, vec![vec!["ALT".into()], vec!["VS".into()]]);
        assert_eq!(assignment.len(), 3);
        assert_eq!(assignment.get(2).unwrap(), ["ALT".to_string()]);
        assert_eq!(assignment.get(3).unwrap(), ["VS".to_string()]);
    }

    #[test]
    fn parameter_names_cover_every_axis() {
        let assignment =
            AxisAssignment::new(Some(vec!["IAS".into()]), vec![vec!["ALT".into()]]);
        let names = assignment.parameter_names();
        assert!(names.contains(REFERENCE_PARAMETER));
        assert!(names.contains("IAS"));
        assert!(names.contains("ALT"));
    }
}
