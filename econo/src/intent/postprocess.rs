//! Deterministic post-processing of the LLM's intent: country names to
//! ISO3, group tags, and relative time ranges normalized against the wall
//! clock.

use chrono::{DateTime, Datelike, Duration, Utc};
use econo_types::geo::{iso3_for_name, CountryGroup};
use econo_types::{GeoSelector, ParsedIntent, RelativeRange};

/// Normalize an intent in place against `now`.
pub fn normalize(intent: &mut ParsedIntent, now: DateTime<Utc>) {
    for provider in &mut intent.providers {
        *provider = provider.trim().to_lowercase();
    }

    for geo in &mut intent.geography {
        *geo = normalize_geo(geo);
    }

    let today = now.date_naive();
    let range = &mut intent.time_range;
    if let Some(relative) = range.relative.take() {
        match relative {
            RelativeRange::LastNYears { n } => {
                range.start = Some(format!("{}-01-01", today.year() - i32::try_from(n).unwrap_or(0)));
                range.end = Some(today.to_string());
            }
            RelativeRange::LastNMonths { n } => {
                let start = today - Duration::days(i64::from(n) * 30);
                range.start = Some(start.to_string());
                range.end = Some(today.to_string());
            }
            RelativeRange::SinceYear { year } => {
                range.start = Some(format!("{year}-01-01"));
                range.end = Some(today.to_string());
            }
            RelativeRange::Between { start, end } => {
                let (start, end) = if start <= end { (start, end) } else { (end, start) };
                range.start = Some(format!("{start}-01-01"));
                range.end = Some(format!("{end}-12-31"));
            }
            RelativeRange::Ytd => {
                range.start = Some(format!("{}-01-01", today.year()));
                range.end = Some(today.to_string());
            }
            RelativeRange::Latest => {
                // No range constraint; adapters fetch the tail and the
                // caller reads the last point.
                range.start = None;
                range.end = Some(today.to_string());
            }
            _ => {}
        }
    }
}

fn normalize_geo(geo: &GeoSelector) -> GeoSelector {
    match geo {
        GeoSelector::Country(raw) => {
            // The model may emit a country name, a group tag in the wrong
            // arm, or already-correct ISO3.
            if let Some(group) = CountryGroup::parse(raw) {
                return GeoSelector::Group(group);
            }
            if raw.eq_ignore_ascii_case("world") || raw.eq_ignore_ascii_case("wld") {
                return GeoSelector::World;
            }
            match iso3_for_name(raw) {
                Some(iso3) => GeoSelector::Country(iso3.to_string()),
                None => GeoSelector::Country(raw.to_uppercase()),
            }
        }
        GeoSelector::Region(raw) => match CountryGroup::parse(raw) {
            Some(group) => GeoSelector::Group(group),
            None => GeoSelector::Region(raw.clone()),
        },
        other => other.clone(),
    }
}
