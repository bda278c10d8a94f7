//! Positional dimension keys for SDMX data requests.

use crate::structure::Dsd;
use crate::SdmxError;

/// A dimension key with positional slots. Unset slots are wildcards, which
/// the REST convention renders as empty segments (`A.DEU..PC_ACT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionKey {
    slots: Vec<(String, Option<String>)>,
}

impl DimensionKey {
    /// A key with one wildcard slot per series-level dimension of `dsd`.
    #[must_use]
    pub fn for_dsd(dsd: &Dsd) -> Self {
        Self {
            slots: dsd
                .series_dimensions()
                .iter()
                .map(|d| (d.id.clone(), None))
                .collect(),
        }
    }

    /// Fill the slot for `dimension` with `code`.
    ///
    /// # Errors
    /// `UnknownDimension` when the DSD has no such series dimension.
    pub fn set(&mut self, dimension: &str, code: impl Into<String>) -> Result<(), SdmxError> {
        match self.slots.iter_mut().find(|(id, _)| id == dimension) {
            Some((_, slot)) => {
                *slot = Some(code.into());
                Ok(())
            }
            None => Err(SdmxError::UnknownDimension(dimension.to_string())),
        }
    }

    /// Fill the slot if the dimension exists; silently skip otherwise.
    /// Dataflows vary in which constraint dimensions they declare.
    pub fn set_if_present(&mut self, dimension: &str, code: impl Into<String>) {
        if let Some((_, slot)) = self.slots.iter_mut().find(|(id, _)| id == dimension) {
            *slot = Some(code.into());
        }
    }

    /// Render the dot-separated REST key.
    #[must_use]
    pub fn to_path(&self) -> String {
        self.slots
            .iter()
            .map(|(_, v)| v.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// The constraints that have been filled, as `(dimension, code)`.
    #[must_use]
    pub fn constraints(&self) -> Vec<(&str, &str)> {
        self.slots
            .iter()
            .filter_map(|(id, v)| v.as_deref().map(|code| (id.as_str(), code)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{CodeValue, Dimension};

    fn dsd() -> Dsd {
        let dim = |id: &str, codes: &[&str]| Dimension {
            id: id.into(),
            values: codes
                .iter()
                .map(|c| CodeValue {
                    id: (*c).into(),
                    name: String::new(),
                })
                .collect(),
        };
        Dsd {
            dimensions: vec![
                dim("FREQ", &["A", "Q"]),
                dim("REF_AREA", &["DEU", "FRA"]),
                dim("UNIT_MEASURE", &["PC_ACT", "THS_PER"]),
                dim("TIME_PERIOD", &[]),
            ],
        }
    }

    #[test]
    fn wildcards_render_as_empty_segments() {
        let mut key = DimensionKey::for_dsd(&dsd());
        key.set("FREQ", "A").unwrap();
        key.set("REF_AREA", "DEU").unwrap();
        assert_eq!(key.to_path(), "A.DEU.");
    }

    #[test]
    fn unknown_dimension_is_rejected_but_optional_set_is_not() {
        let mut key = DimensionKey::for_dsd(&dsd());
        assert!(key.set("TRANSFORMATION", "G1").is_err());
        key.set_if_present("TRANSFORMATION", "G1");
        assert_eq!(key.to_path(), "..");
    }
}
