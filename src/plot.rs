//! Assembly of per-axis plot traces from a pass's decoded series.
//!
//! Pure data preparation: alignment, time base and legend labels are decided
//! here so the UI layer only draws. Axis 1 shows the bare reference
//! parameter; every other axis labels its traces with engineering units so
//! scaling issues stand out.

use std::collections::BTreeMap;

use crate::align::align_series;
use crate::backend::Series;
use crate::error::{ProcessError, Result};
use crate::reprocess::AxisAssignment;

/// One plottable trace: a legend label and `[t_seconds, value]` points.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisTrace {
    pub label: String,
    pub points: Vec<[f64; 2]>,
}

/// Build the stacked-axes trace lists for `assignment`.
///
/// Every trace shares the aligned time base, so the subplots can link their
/// X axes directly. Fails with `Data` when a named parameter is missing
/// from the store or the series cannot be aligned.
pub fn build_axis_traces(
    assignment: &AxisAssignment,
    series: &BTreeMap<String, Series>,
) -> Result<Vec<Vec<AxisTrace>>> {
    let aligned = align_series(series, assignment.reference_parameter())?;

    let mut axes = Vec::with_capacity(assignment.len());
    for (index, names) in assignment.iter() {
        let mut traces = Vec::with_capacity(names.len());
        for name in names {
            let array = aligned.array(name).ok_or_else(|| {
                ProcessError::Data(format!("parameter '{name}' missing from the series store"))
            })?;
            let label = if index == 1 {
                name.clone()
            } else {
                match series.get(name).and_then(|s| s.units.as_deref()) {
                    Some(units) => format!("{name} : {units}"),
                    None => format!("{name} [No units]"),
                }
            };
            let points = array
                .iter()
                .enumerate()
                .map(|(i, &value)| [i as f64 / aligned.rate, value])
                .collect();
            traces.push(AxisTrace { label, points });
        }
        axes.push(traces);
    }
    Ok(axes)
}
