//! Shared helpers for the flat-REST adapter family.

use econo_core::series::{
    aggregate_to_annual, default_aggregation_for_unit, infer_frequency, normalize_points,
    validate_strictly_ascending,
};
use econo_core::SeriesQuery;
use econo_index::IndicatorIndex;
use econo_types::{
    AggregationMethod, EconError, Frequency, NormalizedPoint, NormalizedSeries, Qualifier,
    SeriesMetadata,
};

/// Build a URL from a base, path, and query pairs. Values are
/// percent-encoded by the `url` crate's serializer.
pub fn build_url(base: &str, path: &str, params: &[(&str, String)]) -> String {
    let mut url = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    if !params.is_empty() {
        url.push('?');
        for (i, (k, v)) in params.iter().enumerate() {
            if i > 0 {
                url.push('&');
            }
            url.push_str(k);
            url.push('=');
            url.push_str(&urlencode(v));
        }
    }
    url
}

fn urlencode(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for b in v.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b',' | b';'
            | b':' | b'/' => out.push(b as char),
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Resolve an indicator label to a provider code through the standard
/// chain: explicit code, the adapter's static alias table, then the
/// indicator index filtered to this provider.
///
/// Returns `None` when nothing matched so the adapter can try its
/// provider-native search endpoint as the last resort.
pub fn resolve_via_tables(
    provider: &str,
    query: &SeriesQuery,
    aliases: &[(&str, &str)],
    index: Option<&IndicatorIndex>,
) -> Result<Option<String>, EconError> {
    if let Some(code) = &query.indicator.explicit_code {
        return Ok(Some(code.clone()));
    }
    let label = query.indicator.label.trim().to_lowercase();
    if let Some((_, code)) = aliases.iter().find(|(alias, _)| *alias == label) {
        return Ok(Some((*code).to_string()));
    }
    if let Some(index) = index {
        let hits = index.search(&query.indicator.label, Some(provider), 5)?;
        // Low-confidence (description-only) hits are left for the semantic
        // validation pass upstream; the adapter itself only trusts solid
        // matches.
        if let Some(best) = hits.iter().find(|h| !h.low_confidence) {
            return Ok(Some(best.record.code.clone()));
        }
    }
    Ok(None)
}

/// Error for a label that survived the whole resolution chain unmatched.
pub fn unknown_indicator(
    label: &str,
    index: Option<&IndicatorIndex>,
    provider: &str,
) -> EconError {
    let suggestions = index
        .and_then(|i| i.search(label, Some(provider), 3).ok())
        .map(|hits| {
            hits.into_iter()
                .map(|h| format!("{} ({})", h.record.display_name, h.record.code))
                .collect()
        })
        .unwrap_or_default();
    EconError::IndicatorUnknown {
        label: label.to_string(),
        suggestions,
    }
}

/// Finalize a series: order and dedup points, infer frequency when the
/// provider did not state one, convert to a coarser requested frequency by
/// aggregation, and validate the ascending invariant.
///
/// Returns the series plus a duplicate-dates flag the orchestrator turns
/// into a warning.
pub fn finalize_series(
    mut metadata: SeriesMetadata,
    points: Vec<NormalizedPoint>,
    requested: Option<Frequency>,
    qualifiers: &[Qualifier],
) -> Result<(NormalizedSeries, bool), EconError> {
    let (mut points, had_duplicates) = normalize_points(points)?;

    if metadata.frequency.is_none() {
        metadata.frequency = infer_frequency(&points);
    }

    let native = metadata.frequency;
    if requested == Some(Frequency::Annual) && native.is_some() && native != Some(Frequency::Annual)
    {
        let method = if qualifiers.contains(&Qualifier::Growth) {
            AggregationMethod::Last
        } else {
            default_aggregation_for_unit(&metadata.unit)
        };
        points = aggregate_to_annual(&points, method);
        metadata.frequency = Some(Frequency::Annual);
        metadata.aggregation = Some(method);
    }

    validate_strictly_ascending(&points)?;
    Ok((NormalizedSeries { metadata, points }, had_duplicates))
}

/// The warning attached when a provider returned duplicate dates and the
/// normalization collapsed them last-wins.
pub fn duplicate_dates_warning(provider: &str, code: &str) -> econo_types::Warning {
    econo_types::Warning::for_provider(
        provider,
        format!("{code}: duplicate dates from upstream collapsed, last value wins"),
    )
}

/// Map an empty observation list to the taxonomy: upstream answered, there
/// is just nothing there.
pub fn require_points(points: &[NormalizedPoint], what: &str) -> Result<(), EconError> {
    if points.is_empty() {
        Err(EconError::data_not_available(what))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_spaces() {
        let url = build_url(
            "https://api.example.org",
            "series/search",
            &[("search_text", "unemployment rate".to_string())],
        );
        assert_eq!(
            url,
            "https://api.example.org/series/search?search_text=unemployment%20rate"
        );
    }

    #[test]
    fn empty_points_is_data_not_available() {
        let err = require_points(&[], "gdp for ATL").unwrap_err();
        assert!(matches!(err, EconError::DataNotAvailable { .. }));
    }
}
