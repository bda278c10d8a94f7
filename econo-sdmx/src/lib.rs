//! Decoding for SDMX-JSON and JSON-stat 2.0 data messages.
//!
//! Providers in this family (OECD, Eurostat, BIS) return a
//! multi-dimensional cube: a list of dimensions with positions plus
//! observation values indexed by a mixed-radix number over those
//! dimensions. This crate turns such cubes into labeled cross-sections
//! with the time dimension projected out; it knows nothing about HTTP or
//! the rest of the engine.

#![warn(missing_docs)]

pub mod data;
pub mod jsonstat;
pub mod key;
pub mod radix;
pub mod structure;

pub use data::{CrossSection, DataSet};
pub use jsonstat::JsonStat;
pub use key::DimensionKey;
pub use structure::{CodeValue, DataflowRef, Dimension, Dsd};

use thiserror::Error;

/// Decoding failures. The adapters map these into the engine taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SdmxError {
    /// The message is missing a required structural element.
    #[error("malformed SDMX message: {0}")]
    Malformed(String),
    /// A referenced dimension does not exist in the structure.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),
    /// A flat observation index does not fit the declared dimension sizes.
    #[error("observation index {index} out of range for cube of size {size}")]
    IndexOutOfRange {
        /// The offending flat index.
        index: usize,
        /// Product of the dimension sizes.
        size: usize,
    },
}
