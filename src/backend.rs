//! The seam between the engine and its external collaborators.
//!
//! The engine never decodes raw bytes itself: a [`FrameCompiler`] resolves
//! parameter names against the LFL into a decode plan, and a [`SeriesStore`]
//! materializes that plan from the raw recording into named [`Series`] on
//! disk, then reads them back for plotting. The built-in implementation
//! lives in [`crate::raw`]; tests substitute mocks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A named parameter's decoded samples for one reprocessing pass.
///
/// Immutable once produced; the next pass supersedes it with a fresh one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub samples: Vec<f64>,
    /// Samples per second. Always > 0 for a well-formed store.
    pub rate: f64,
    pub units: Option<String>,
}

impl Series {
    pub fn new(samples: Vec<f64>, rate: f64) -> Self {
        Self {
            samples,
            rate,
            units: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Frame geometry the store needs to slice the raw recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    /// Words per (possibly doubled) frame.
    pub words_per_frame: usize,
    pub frame_doubled: bool,
}

/// Where one parameter's samples sit within a frame and how to convert them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeEntry {
    pub name: String,
    /// Word offsets within one frame, in sample order.
    pub words: Vec<usize>,
    /// Samples per second.
    pub rate: f64,
    pub units: Option<String>,
    pub scale: f64,
    pub offset: f64,
}

/// Per-parameter decode instructions produced by the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodePlan {
    pub entries: Vec<DecodeEntry>,
}

/// Resolves parameter names against an LFL definition.
pub trait FrameCompiler {
    /// Compile `names` from the definition at `definition_path`.
    ///
    /// Fails with `Compile` when the definition cannot be resolved or a
    /// requested name is unknown.
    fn resolve(
        &self,
        definition_path: &Path,
        names: &BTreeSet<String>,
        frame_doubled: bool,
        verbose: bool,
    ) -> Result<(FrameDescriptor, DecodePlan)>;
}

/// Decodes raw recordings into an on-disk series store.
pub trait SeriesStore {
    /// Decode `data_path` per the plan and write the store at `output_path`,
    /// overwriting any previous pass's store.
    ///
    /// `memory_budget` caps the number of superframes buffered before a
    /// flush; `-1` means unbounded. `0` is invalid and must be rejected at
    /// the CLI boundary before this is ever called.
    fn materialize(
        &self,
        data_path: &Path,
        output_path: &Path,
        frame: &FrameDescriptor,
        plan: &DecodePlan,
        memory_budget: i64,
    ) -> Result<()>;

    /// Read every named series out of a materialized store.
    fn open(&self, path: &Path) -> Result<BTreeMap<String, Series>>;
}
