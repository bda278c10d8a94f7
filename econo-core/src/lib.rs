//! Core traits and utilities for the econo query engine: the connector
//! capability contract, the shared HTTP pool, and time-series
//! normalization helpers.
#![warn(missing_docs)]

pub mod connector;
pub mod http;
pub mod series;

pub use connector::{
    DataDomain, EconConnector, FetchResponse, IndicatorHit, IndicatorSearchProvider,
    SeriesProvider, SeriesQuery, TradeFlowProvider, TradeQuery,
};
pub use econo_types::{
    AggregationMethod, EconError, Frequency, GeoSelector, IndicatorRequest, NormalizedPoint,
    NormalizedSeries, ParsedIntent, Qualifier, RequestFingerprint, SeriesMetadata, TimeRange,
    TradeFlow, Warning,
};
pub use http::{HttpClient, HttpResponse};
