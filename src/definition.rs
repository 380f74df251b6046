//! Parsed form of the watched LFL definition file.
//!
//! The LFL is structured key-value sections: a required `Parameters` section
//! (one record per parameter), an optional `Parameter Group` section whose
//! `AXIS_1..AXIS_n` entries drive the stacked-plot layout, and an optional
//! `Frame` section consumed by the built-in raw backend. Sections are YAML;
//! anything serde_yaml rejects is a configuration error for that pass.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, Result};

/// One parameter's definition record.
///
/// Only the fields the built-in backend decodes are typed; every other key
/// is kept in `extra` so that *any* edit to a record is visible when two
/// definitions are diffed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    /// Word offsets (within one frame) holding this parameter's samples.
    /// The per-second rate of the parameter is the number of offsets.
    #[serde(default)]
    pub words: Vec<usize>,
    /// Engineering unit label, e.g. `ft` or `kt`.
    #[serde(default)]
    pub units: Option<String>,
    /// Linear conversion applied to each raw word: `value = raw * scale + offset`.
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_scale() -> f64 {
    1.0
}

/// Frame geometry for the built-in raw backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSection {
    #[serde(default)]
    pub words_per_frame: usize,
}

/// A fully parsed LFL definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDefinition {
    #[serde(rename = "Parameters")]
    pub parameters: BTreeMap<String, ParameterRecord>,
    #[serde(rename = "Parameter Group", default)]
    pub parameter_groups: BTreeMap<String, Vec<String>>,
    #[serde(rename = "Frame", default)]
    pub frame: FrameSection,
}

impl FrameDefinition {
    /// Parse the LFL file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ProcessError::Config(format!("{}: {err}", path.display())))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|err| ProcessError::Config(err.to_string()))
    }

    /// The `AXIS_1, AXIS_2, …` groups in display order.
    ///
    /// The walk stops at the first missing index, so a definition with
    /// `AXIS_1` and `AXIS_3` only yields `AXIS_1`.
    pub fn axis_groups(&self) -> Vec<&[String]> {
        let mut groups = Vec::new();
        let mut index = 1usize;
        while let Some(names) = self.parameter_groups.get(&format!("AXIS_{index}")) {
            groups.push(names.as_slice());
            index += 1;
        }
        groups
    }
}
