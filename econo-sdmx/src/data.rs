//! SDMX-JSON data-message decoding: series-keyed and flat observation
//! layouts, constraint filtering, and `TIME_PERIOD` projection.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::structure::{CodeValue, Dsd};
use crate::SdmxError;

/// One decoded cross-section: the series-level codes it sits at, plus its
/// observations projected along `TIME_PERIOD` in positional (ascending)
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    /// `(dimension id, code)` for every series-level dimension.
    pub dims: Vec<(String, CodeValue)>,
    /// `(time label, value)` pairs; `None` is a known-missing observation.
    pub points: Vec<(String, Option<f64>)>,
}

impl CrossSection {
    /// The code sitting at `dimension`, when present.
    #[must_use]
    pub fn code(&self, dimension: &str) -> Option<&CodeValue> {
        self.dims
            .iter()
            .find(|(id, _)| id == dimension)
            .map(|(_, code)| code)
    }
}

/// A parsed data message, still in positional form.
#[derive(Debug, Clone)]
pub struct DataSet {
    // series-dimension indices -> (time index -> value)
    series: BTreeMap<Vec<usize>, BTreeMap<usize, Option<f64>>>,
}

impl DataSet {
    /// Parse the first dataset of an SDMX-JSON data message. Both the
    /// series-keyed layout (`series["0:1:2"].observations["3"]`) and the
    /// flat layout (`observations["0:1:2:3"]`) are accepted; in the flat
    /// layout the final component indexes `TIME_PERIOD`.
    ///
    /// # Errors
    /// `Malformed` when no dataset is present or a key does not parse.
    pub fn parse(message: &Value) -> Result<Self, SdmxError> {
        let dataset = message
            .pointer("/data/dataSets/0")
            .or_else(|| message.pointer("/dataSets/0"))
            .ok_or_else(|| SdmxError::Malformed("no dataSets in message".into()))?;

        let mut series: BTreeMap<Vec<usize>, BTreeMap<usize, Option<f64>>> = BTreeMap::new();

        if let Some(map) = dataset.get("series").and_then(Value::as_object) {
            for (key, body) in map {
                let idx = parse_colon_key(key)?;
                let obs = body
                    .get("observations")
                    .and_then(Value::as_object)
                    .ok_or_else(|| {
                        SdmxError::Malformed(format!("series {key} without observations"))
                    })?;
                let entry = series.entry(idx).or_default();
                for (time_key, value) in obs {
                    let t: usize = time_key.parse().map_err(|_| {
                        SdmxError::Malformed(format!("bad observation key {time_key}"))
                    })?;
                    entry.insert(t, observation_value(value));
                }
            }
        } else if let Some(map) = dataset.get("observations").and_then(Value::as_object) {
            for (key, value) in map {
                let mut idx = parse_colon_key(key)?;
                let t = idx.pop().ok_or_else(|| {
                    SdmxError::Malformed(format!("observation key {key} has no time component"))
                })?;
                series.entry(idx).or_default().insert(t, observation_value(value));
            }
        } else {
            return Err(SdmxError::Malformed(
                "dataset has neither series nor observations".into(),
            ));
        }

        Ok(Self { series })
    }

    /// Filter by the caller's constraints and project the remaining
    /// variation over `TIME_PERIOD`, yielding one [`CrossSection`] per
    /// distinct series-dimension combination.
    ///
    /// # Errors
    /// `UnknownDimension` for a constraint naming a dimension the DSD does
    /// not declare; `Malformed` for positional indices outside the DSD.
    pub fn cross_sections(
        &self,
        dsd: &Dsd,
        constraints: &[(&str, &str)],
    ) -> Result<Vec<CrossSection>, SdmxError> {
        let series_dims = dsd.series_dimensions();
        let time_values: Vec<CodeValue> = dsd
            .time_dimension()
            .map(|d| d.values.clone())
            .unwrap_or_default();

        // Resolve each constraint to (dimension position, code position).
        let mut positional: Vec<(usize, usize)> = Vec::with_capacity(constraints.len());
        for (dim_id, code) in constraints {
            let dim_pos = series_dims
                .iter()
                .position(|d| d.id == *dim_id)
                .ok_or_else(|| SdmxError::UnknownDimension((*dim_id).to_string()))?;
            let code_pos = series_dims[dim_pos].position_of(code).ok_or_else(|| {
                SdmxError::Malformed(format!("code {code} not in dimension {dim_id}"))
            })?;
            positional.push((dim_pos, code_pos));
        }

        let mut out = Vec::new();
        for (idx, observations) in &self.series {
            if idx.len() != series_dims.len() {
                return Err(SdmxError::Malformed(format!(
                    "series key rank {} != dimension rank {}",
                    idx.len(),
                    series_dims.len()
                )));
            }
            if !positional.iter().all(|&(d, c)| idx[d] == c) {
                continue;
            }

            let mut dims = Vec::with_capacity(idx.len());
            for (d, &code_idx) in idx.iter().enumerate() {
                let dim = series_dims[d];
                let code = dim.values.get(code_idx).ok_or_else(|| {
                    SdmxError::Malformed(format!(
                        "code index {code_idx} out of range in {}",
                        dim.id
                    ))
                })?;
                dims.push((dim.id.clone(), code.clone()));
            }

            let mut points = Vec::with_capacity(observations.len());
            for (&t, &value) in observations {
                let label = time_values
                    .get(t)
                    .map(|v| v.id.clone())
                    .ok_or_else(|| {
                        SdmxError::Malformed(format!("time index {t} out of range"))
                    })?;
                points.push((label, value));
            }
            out.push(CrossSection { dims, points });
        }
        Ok(out)
    }
}

fn parse_colon_key(key: &str) -> Result<Vec<usize>, SdmxError> {
    key.split(':')
        .map(|part| {
            part.parse::<usize>()
                .map_err(|_| SdmxError::Malformed(format!("bad series key component {part}")))
        })
        .collect()
}

/// Observation payloads are arrays whose first element is the value; a bare
/// number or null is tolerated.
fn observation_value(value: &Value) -> Option<f64> {
    let first = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match first {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
