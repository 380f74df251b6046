//! Time alignment of variable-rate series onto a shared axis.
//!
//! Parameters come out of the store at different sampling rates; before they
//! can share a time axis every array is brought to the rate of the fastest
//! series. The designated reference parameter is aligned with linear
//! interpolation; everything else is aligned stepwise (nearest sample) so
//! that scaling artifacts stay visible to the engineer instead of being
//! smoothed away.

use std::collections::BTreeMap;

use log::warn;

use crate::backend::Series;
use crate::error::{ProcessError, Result};

/// Record of a trailing-sample truncation applied before alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    pub name: String,
    pub from_len: usize,
    pub to_len: usize,
}

/// The outcome of aligning one pass's series.
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Name of the series that set the time base (the fastest one).
    pub reference: String,
    /// Shared output rate, i.e. the maximum input rate.
    pub rate: f64,
    /// Shared output length of every aligned array.
    pub len: usize,
    arrays: BTreeMap<String, Vec<f64>>,
    pub truncations: Vec<Truncation>,
}

impl Alignment {
    pub fn array(&self, name: &str) -> Option<&[f64]> {
        self.arrays.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.arrays.keys()
    }
}

/// Align every series in `params` onto the rate of the fastest one.
///
/// `interpolated` names the one parameter (the axis-1 reference) whose
/// aligned array is linearly interpolated; all other series are stepwise.
///
/// Arrays longer than `floor(L_min * rate / min_rate)` are truncated to
/// exactly that length first; truncation is silent apart from a warning and
/// the [`Alignment::truncations`] record. Arrays are never padded.
pub fn align_series(params: &BTreeMap<String, Series>, interpolated: &str) -> Result<Alignment> {
    if params.is_empty() {
        return Err(ProcessError::Data("no series to align".into()));
    }
    for (name, series) in params {
        if !(series.rate > 0.0) {
            return Err(ProcessError::Data(format!(
                "series '{name}' has non-positive rate {}",
                series.rate
            )));
        }
    }

    let (reference, max_rate) = params
        .iter()
        .max_by(|a, b| a.1.rate.total_cmp(&b.1.rate))
        .map(|(name, series)| (name.clone(), series.rate))
        .expect("params is non-empty");
    let (min_rate, min_len) = params
        .values()
        .min_by(|a, b| a.rate.total_cmp(&b.rate))
        .map(|series| (series.rate, series.len()))
        .expect("params is non-empty");

    let mut truncations = Vec::new();
    let mut arrays = BTreeMap::new();
    let out_len = (min_len as f64 * max_rate / min_rate).floor() as usize;

    for (name, series) in params {
        let expected_len = (min_len as f64 * series.rate / min_rate).floor() as usize;
        let samples = if series.len() > expected_len {
            warn!("truncated {name} from {} to {expected_len}", series.len());
            truncations.push(Truncation {
                name: name.clone(),
                from_len: series.len(),
                to_len: expected_len,
            });
            &series.samples[..expected_len]
        } else {
            &series.samples[..]
        };

        let aligned = if name == interpolated {
            align_linear(samples, series.rate, max_rate, out_len)
        } else {
            align_nearest(samples, series.rate, max_rate, out_len)
        };
        arrays.insert(name.clone(), aligned);
    }

    Ok(Alignment {
        reference,
        rate: max_rate,
        len: out_len,
        arrays,
        truncations,
    })
}

/// Stepwise alignment: output sample `j` takes the source sample covering
/// time `j / to_rate`, preserving raw sample boundaries.
fn align_nearest(samples: &[f64], from_rate: f64, to_rate: f64, out_len: usize) -> Vec<f64> {
    if samples.is_empty() {
        return vec![0.0; out_len];
    }
    (0..out_len)
        .map(|j| {
            let src = (j as f64 * from_rate / to_rate).floor() as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

/// Linear interpolation between the two source samples bracketing each
/// output instant.
fn align_linear(samples: &[f64], from_rate: f64, to_rate: f64, out_len: usize) -> Vec<f64> {
    if samples.is_empty() {
        return vec![0.0; out_len];
    }
    (0..out_len)
        .map(|j| {
            let pos = j as f64 * from_rate / to_rate;
            let lo = pos.floor() as usize;
            let hi = lo + 1;
            if hi >= samples.len() {
                samples[samples.len() - 1]
            } else {
                let frac = pos - lo as f64;
                samples[lo] * (1.0 - frac) + samples[hi] * frac
            }
        })
        .collect()
}
