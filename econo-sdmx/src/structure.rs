//! SDMX structural metadata: dataflow references and Data Structure
//! Definitions.

use serde_json::Value;

use crate::SdmxError;

/// An SDMX dataflow identifier: `(agency, dataflow_code, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataflowRef {
    /// Maintaining agency (e.g. `OECD.SDD.TPS`, `ESTAT`, `BIS`).
    pub agency: String,
    /// Dataflow code.
    pub id: String,
    /// Version; providers accept `+` for "latest".
    pub version: String,
}

impl DataflowRef {
    /// Construct a reference.
    pub fn new(agency: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: version.into(),
        }
    }

    /// REST path segment: `AGENCY,ID,VERSION`.
    #[must_use]
    pub fn path_segment(&self) -> String {
        format!("{},{},{}", self.agency, self.id, self.version)
    }
}

/// One valid code of a dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeValue {
    /// Code identifier used in keys (e.g. `DEU`).
    pub id: String,
    /// Human-readable name (e.g. `Germany`).
    pub name: String,
}

/// One dimension of a cube, in declared position order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    /// Dimension identifier (e.g. `REF_AREA`, `UNIT_MEASURE`).
    pub id: String,
    /// Valid code values in positional order.
    pub values: Vec<CodeValue>,
}

impl Dimension {
    /// Positional index of a code id within this dimension.
    #[must_use]
    pub fn position_of(&self, code: &str) -> Option<usize> {
        self.values.iter().position(|v| v.id == code)
    }
}

/// A Data Structure Definition: the ordered dimensions of a dataflow plus,
/// for each, the set of valid code values. `TIME_PERIOD` is always last
/// when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsd {
    /// Ordered dimensions, series-level first, then `TIME_PERIOD`.
    pub dimensions: Vec<Dimension>,
}

impl Dsd {
    /// Sizes of the series-level dimensions (everything but `TIME_PERIOD`)
    /// in declared order.
    #[must_use]
    pub fn series_sizes(&self) -> Vec<usize> {
        self.dimensions
            .iter()
            .filter(|d| d.id != "TIME_PERIOD")
            .map(|d| d.values.len())
            .collect()
    }

    /// The dimension with the given id.
    #[must_use]
    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    /// Series-level dimensions in order.
    #[must_use]
    pub fn series_dimensions(&self) -> Vec<&Dimension> {
        self.dimensions
            .iter()
            .filter(|d| d.id != "TIME_PERIOD")
            .collect()
    }

    /// The `TIME_PERIOD` dimension, when the message carries one.
    #[must_use]
    pub fn time_dimension(&self) -> Option<&Dimension> {
        self.dimension("TIME_PERIOD")
    }

    /// Parse a DSD out of either an SDMX-JSON *data* message (the
    /// `structure`/`structures` block with `dimensions.series` and
    /// `dimensions.observation`) or a *structure* message
    /// (`data.dataStructures[0]`).
    ///
    /// # Errors
    /// `Malformed` when neither layout is present.
    pub fn parse(message: &Value) -> Result<Self, SdmxError> {
        if let Some(block) = embedded_structure(message) {
            return Self::from_dimension_block(block);
        }
        if let Some(list) = message
            .pointer("/data/dataStructures/0/dataStructureComponents/dimensionList")
        {
            return Self::from_structure_message(list);
        }
        Err(SdmxError::Malformed(
            "no structure block in message".into(),
        ))
    }

    fn from_dimension_block(dims: &Value) -> Result<Self, SdmxError> {
        let mut dimensions = Vec::new();
        for level in ["dataSet", "series", "observation"] {
            let Some(arr) = dims.get(level).and_then(Value::as_array) else {
                continue;
            };
            for dim in arr {
                dimensions.push(parse_dimension(dim)?);
            }
        }
        if dimensions.is_empty() {
            return Err(SdmxError::Malformed("empty dimension block".into()));
        }
        Ok(Self { dimensions })
    }

    fn from_structure_message(list: &Value) -> Result<Self, SdmxError> {
        let mut dimensions = Vec::new();
        if let Some(arr) = list.get("dimensions").and_then(Value::as_array) {
            for dim in arr {
                dimensions.push(parse_dimension(dim)?);
            }
        }
        if let Some(arr) = list.get("timeDimensions").and_then(Value::as_array) {
            for dim in arr {
                dimensions.push(parse_dimension(dim)?);
            }
        }
        if dimensions.is_empty() {
            return Err(SdmxError::Malformed("empty dimensionList".into()));
        }
        Ok(Self { dimensions })
    }
}

/// The `structure` block of a data message, tolerating both the singular
/// and the `structures` array form.
fn embedded_structure(message: &Value) -> Option<&Value> {
    for path in [
        "/structure/dimensions",
        "/data/structure/dimensions",
        "/data/structures/0/dimensions",
    ] {
        if let Some(block) = message.pointer(path) {
            return Some(block);
        }
    }
    None
}

fn parse_dimension(dim: &Value) -> Result<Dimension, SdmxError> {
    let id = dim
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| SdmxError::Malformed("dimension without id".into()))?
        .to_string();
    let values = dim
        .get("values")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .map(|v| CodeValue {
                    id: v
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    name: v
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(Dimension { id, values })
}
