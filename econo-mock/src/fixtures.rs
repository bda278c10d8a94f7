//! Deterministic fixture series: the same inputs always produce the same
//! observations, so assertions can be written against exact values.

use econo_types::{Frequency, NormalizedPoint, NormalizedSeries, SeriesMetadata};

/// A stable pseudo-value derived from the inputs. No RNG: tests rely on
/// reproducibility across runs and platforms.
#[must_use]
pub fn deterministic_value(provider: &str, code: &str, geo: &str, year: i32) -> f64 {
    let mut acc: u64 = 1469;
    for b in provider
        .bytes()
        .chain(code.bytes())
        .chain(geo.bytes())
    {
        acc = acc.wrapping_mul(31).wrapping_add(u64::from(b));
    }
    let base = (acc % 9000) as f64 / 100.0 + 10.0;
    base + f64::from(year - 2000) * 0.25
}

/// An annual fixture series spanning `start..=end`.
#[must_use]
pub fn annual_series(
    provider: &str,
    code: &str,
    geo: &str,
    start: i32,
    end: i32,
) -> NormalizedSeries {
    let points = (start..=end)
        .map(|y| NormalizedPoint::new(y.to_string(), Some(deterministic_value(provider, code, geo, y))))
        .collect();
    NormalizedSeries {
        metadata: metadata(provider, code, geo, Frequency::Annual),
        points,
    }
}

/// A monthly fixture series spanning `months` months ending at
/// `end_year`-12.
#[must_use]
pub fn monthly_series(
    provider: &str,
    code: &str,
    geo: &str,
    end_year: i32,
    months: u32,
) -> NormalizedSeries {
    let mut points = Vec::with_capacity(months as usize);
    let total = i64::from(months);
    for i in 0..total {
        let offset = total - 1 - i;
        let year = end_year - i32::try_from(offset / 12).unwrap_or(0);
        let month = 12 - (offset % 12);
        points.push(NormalizedPoint::new(
            format!("{year}-{month:02}"),
            Some(deterministic_value(provider, code, geo, year) + month as f64 * 0.01),
        ));
    }
    NormalizedSeries {
        metadata: metadata(provider, code, geo, Frequency::Monthly),
        points,
    }
}

fn metadata(provider: &str, code: &str, geo: &str, frequency: Frequency) -> SeriesMetadata {
    SeriesMetadata {
        source_provider: provider.to_string(),
        indicator_code: code.to_string(),
        indicator_display: code.replace('_', " "),
        country_or_region: geo.to_string(),
        unit: "Index".into(),
        frequency: Some(frequency),
        api_url_echo: format!("mock://{provider}/series/{code}?geo={geo}"),
        source_url: format!("mock://{provider}"),
        ..SeriesMetadata::default()
    }
}
