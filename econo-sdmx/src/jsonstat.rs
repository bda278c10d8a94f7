//! JSON-stat 2.0 decoding (Eurostat's native format).
//!
//! A JSON-stat dataset declares ordered dimension ids with sizes, and a
//! flat `value` container whose index is the mixed-radix number over those
//! sizes. `value` is either a dense array or a sparse object keyed by the
//! stringified flat index.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::data::CrossSection;
use crate::radix::decode_index;
use crate::structure::CodeValue;
use crate::SdmxError;

/// A parsed JSON-stat 2.0 dataset.
#[derive(Debug, Clone)]
pub struct JsonStat {
    ids: Vec<String>,
    sizes: Vec<usize>,
    // dimension id -> codes in index order
    categories: Vec<Vec<CodeValue>>,
    // flat index -> value
    values: BTreeMap<usize, Option<f64>>,
}

impl JsonStat {
    /// Parse a JSON-stat 2.0 message.
    ///
    /// # Errors
    /// `Malformed` when `id`/`size`/`dimension`/`value` are missing or
    /// inconsistent.
    pub fn parse(message: &Value) -> Result<Self, SdmxError> {
        let ids: Vec<String> = message
            .get("id")
            .and_then(Value::as_array)
            .ok_or_else(|| SdmxError::Malformed("missing id array".into()))?
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        let sizes: Vec<usize> = message
            .get("size")
            .and_then(Value::as_array)
            .ok_or_else(|| SdmxError::Malformed("missing size array".into()))?
            .iter()
            .filter_map(Value::as_u64)
            .map(|n| n as usize)
            .collect();
        if ids.len() != sizes.len() {
            return Err(SdmxError::Malformed(format!(
                "id rank {} != size rank {}",
                ids.len(),
                sizes.len()
            )));
        }

        let dimension = message
            .get("dimension")
            .ok_or_else(|| SdmxError::Malformed("missing dimension block".into()))?;
        let mut categories = Vec::with_capacity(ids.len());
        for (id, &size) in ids.iter().zip(&sizes) {
            categories.push(parse_category(dimension, id, size)?);
        }

        let mut values = BTreeMap::new();
        match message.get("value") {
            Some(Value::Array(arr)) => {
                for (i, v) in arr.iter().enumerate() {
                    values.insert(i, numeric(v));
                }
            }
            Some(Value::Object(map)) => {
                for (k, v) in map {
                    let i: usize = k.parse().map_err(|_| {
                        SdmxError::Malformed(format!("bad value index {k}"))
                    })?;
                    values.insert(i, numeric(v));
                }
            }
            _ => return Err(SdmxError::Malformed("missing value container".into())),
        }

        Ok(Self {
            ids,
            sizes,
            categories,
            values,
        })
    }

    /// Dimension ids in declared order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Dimension sizes in declared order.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Codes of one dimension, in index order.
    #[must_use]
    pub fn codes(&self, dimension: &str) -> Option<&[CodeValue]> {
        let pos = self.ids.iter().position(|id| id == dimension)?;
        Some(&self.categories[pos])
    }

    /// Filter by constraints and project the remaining variation over the
    /// time dimension, producing one [`CrossSection`] per combination of
    /// the other dimensions.
    ///
    /// # Errors
    /// `UnknownDimension` for constraints or a `time_dim` the dataset does
    /// not declare; `IndexOutOfRange` when the value container indexes
    /// outside the cube.
    pub fn cross_sections(
        &self,
        time_dim: &str,
        constraints: &[(&str, &str)],
    ) -> Result<Vec<CrossSection>, SdmxError> {
        let time_pos = self
            .ids
            .iter()
            .position(|id| id == time_dim)
            .ok_or_else(|| SdmxError::UnknownDimension(time_dim.to_string()))?;

        let mut positional: Vec<(usize, usize)> = Vec::with_capacity(constraints.len());
        for (dim_id, code) in constraints {
            let dim_pos = self
                .ids
                .iter()
                .position(|id| id == dim_id)
                .ok_or_else(|| SdmxError::UnknownDimension((*dim_id).to_string()))?;
            let code_pos = self.categories[dim_pos]
                .iter()
                .position(|c| c.id == *code)
                .ok_or_else(|| {
                    SdmxError::Malformed(format!("code {code} not in dimension {dim_id}"))
                })?;
            positional.push((dim_pos, code_pos));
        }

        // Group observations by their non-time indices.
        let mut grouped: BTreeMap<Vec<usize>, Vec<(usize, Option<f64>)>> = BTreeMap::new();
        for (&flat, &value) in &self.values {
            let indices = decode_index(flat, &self.sizes)?;
            if !positional.iter().all(|&(d, c)| indices[d] == c) {
                continue;
            }
            let mut series_key = indices.clone();
            let time_idx = series_key.remove(time_pos);
            grouped.entry(series_key).or_default().push((time_idx, value));
        }

        let mut out = Vec::new();
        for (series_key, mut points) in grouped {
            points.sort_by_key(|&(t, _)| t);
            let mut dims = Vec::new();
            let mut key_iter = series_key.into_iter();
            for (d, id) in self.ids.iter().enumerate() {
                if d == time_pos {
                    continue;
                }
                let code_idx = key_iter.next().expect("series key matches rank");
                let code = self.categories[d]
                    .get(code_idx)
                    .cloned()
                    .ok_or_else(|| SdmxError::Malformed(format!("code index out of range in {id}")))?;
                dims.push((id.clone(), code));
            }
            let labeled = points
                .into_iter()
                .map(|(t, v)| {
                    self.categories[time_pos]
                        .get(t)
                        .map(|c| (c.id.clone(), v))
                        .ok_or(SdmxError::IndexOutOfRange {
                            index: t,
                            size: self.sizes[time_pos],
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            out.push(CrossSection {
                dims,
                points: labeled,
            });
        }
        Ok(out)
    }
}

fn parse_category(dimension: &Value, id: &str, size: usize) -> Result<Vec<CodeValue>, SdmxError> {
    let category = dimension
        .pointer(&format!("/{id}/category"))
        .ok_or_else(|| SdmxError::Malformed(format!("missing category for {id}")))?;

    let mut codes: Vec<Option<CodeValue>> = vec![None; size];
    let labels = category.get("label").and_then(Value::as_object);

    match category.get("index") {
        // {"DEU": 0, "FRA": 1}
        Some(Value::Object(map)) => {
            for (code, idx) in map {
                let i = idx
                    .as_u64()
                    .ok_or_else(|| SdmxError::Malformed(format!("bad index for {code}")))?
                    as usize;
                if i >= size {
                    return Err(SdmxError::IndexOutOfRange { index: i, size });
                }
                codes[i] = Some(CodeValue {
                    id: code.clone(),
                    name: label_for(labels, code),
                });
            }
        }
        // ["DEU", "FRA"]
        Some(Value::Array(arr)) => {
            for (i, code) in arr.iter().enumerate() {
                let code = code
                    .as_str()
                    .ok_or_else(|| SdmxError::Malformed("non-string index entry".into()))?;
                if i >= size {
                    return Err(SdmxError::IndexOutOfRange { index: i, size });
                }
                codes[i] = Some(CodeValue {
                    id: code.to_string(),
                    name: label_for(labels, code),
                });
            }
        }
        // A single-code dimension may omit index entirely.
        None => {
            if let Some(labels) = labels {
                for (i, (code, _)) in labels.iter().enumerate().take(size) {
                    codes[i] = Some(CodeValue {
                        id: code.clone(),
                        name: label_for(Some(labels), code),
                    });
                }
            }
        }
        _ => return Err(SdmxError::Malformed(format!("bad index for {id}"))),
    }

    codes
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            c.ok_or_else(|| SdmxError::Malformed(format!("dimension {id} missing index {i}")))
        })
        .collect()
}

fn label_for(labels: Option<&serde_json::Map<String, Value>>, code: &str) -> String {
    labels
        .and_then(|m| m.get(code))
        .and_then(Value::as_str)
        .unwrap_or(code)
        .to_string()
}

fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
