//! Time-series normalization helpers shared by every adapter.
//!
//! Period labels come in four shapes (`YYYY`, `YYYY-Qn`, `YYYY-MM`,
//! `YYYY-MM-DD`); ordering always goes through a parsed period key so mixed
//! provider label styles cannot corrupt the strict-ascending invariant.

use econo_types::{AggregationMethod, EconError, Frequency, NormalizedPoint, TtlClass};

/// Parsed, orderable form of a period label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PeriodKey {
    /// Calendar year.
    pub year: i32,
    /// Month (quarters map to their end month); 0 for annual labels.
    pub month: u8,
    /// Day of month; 0 for non-daily labels.
    pub day: u8,
}

/// Parse a period label into its orderable key.
#[must_use]
pub fn parse_period(label: &str) -> Option<PeriodKey> {
    let label = label.trim();
    let mut parts = label.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let Some(second) = parts.next() else {
        return Some(PeriodKey { year, month: 0, day: 0 });
    };
    if let Some(q) = second.strip_prefix(['Q', 'q']) {
        let quarter: u8 = q.parse().ok()?;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        return Some(PeriodKey {
            year,
            month: quarter * 3,
            day: 0,
        });
    }
    let month: u8 = second.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    let Some(third) = parts.next() else {
        return Some(PeriodKey { year, month, day: 0 });
    };
    let day: u8 = third.parse().ok()?;
    if !(1..=31).contains(&day) {
        return None;
    }
    Some(PeriodKey { year, month, day })
}

/// Sort points ascending by period and collapse duplicate dates, keeping the
/// last occurrence. Returns the normalized points plus whether any
/// duplicates were dropped (the caller emits a warning).
///
/// # Errors
/// `EconError::Data` when a label does not parse as a period.
pub fn normalize_points(
    points: Vec<NormalizedPoint>,
) -> Result<(Vec<NormalizedPoint>, bool), EconError> {
    let mut keyed: Vec<(PeriodKey, usize, NormalizedPoint)> = Vec::with_capacity(points.len());
    for (i, p) in points.into_iter().enumerate() {
        let key = parse_period(&p.date)
            .ok_or_else(|| EconError::Data(format!("unparseable period label: {:?}", p.date)))?;
        keyed.push((key, i, p));
    }
    // Stable on arrival order within a period so "last wins" is well defined.
    keyed.sort_by_key(|(key, i, _)| (*key, *i));

    let mut out: Vec<NormalizedPoint> = Vec::with_capacity(keyed.len());
    let mut last_key: Option<PeriodKey> = None;
    let mut had_duplicates = false;
    for (key, _, point) in keyed {
        if last_key == Some(key) {
            had_duplicates = true;
            *out.last_mut().expect("duplicate follows a kept point") = point;
        } else {
            out.push(point);
            last_key = Some(key);
        }
    }
    Ok((out, had_duplicates))
}

/// Check the strict-ascending invariant on already-normalized points.
///
/// # Errors
/// `EconError::Internal` on violation: a series reaching this check out of
/// order is a programming fault in the adapter, not bad upstream data.
pub fn validate_strictly_ascending(points: &[NormalizedPoint]) -> Result<(), EconError> {
    let mut prev: Option<PeriodKey> = None;
    for p in points {
        let key = parse_period(&p.date)
            .ok_or_else(|| EconError::Internal(format!("unparseable period: {:?}", p.date)))?;
        if let Some(prev_key) = prev {
            if key <= prev_key {
                return Err(EconError::Internal(format!(
                    "points not strictly ascending at {:?}",
                    p.date
                )));
            }
        }
        prev = Some(key);
    }
    Ok(())
}

/// Infer cadence from the label shapes of a normalized series.
#[must_use]
pub fn infer_frequency(points: &[NormalizedPoint]) -> Option<Frequency> {
    let first = points.first()?;
    if first.date.contains(['Q', 'q']) {
        return Some(Frequency::Quarterly);
    }
    match first.date.len() {
        4 => Some(Frequency::Annual),
        7 => Some(Frequency::Monthly),
        10 => {
            // Daily vs weekly: look at the gap between the first two points.
            let a = parse_period(&points.first()?.date)?;
            let b = points.get(1).and_then(|p| parse_period(&p.date));
            match b {
                Some(b) if a.year == b.year && a.month == b.month && b.day >= a.day + 6 => {
                    Some(Frequency::Weekly)
                }
                _ => Some(Frequency::Daily),
            }
        }
        _ => None,
    }
}

/// Aggregate a finer-grained series into annual buckets.
///
/// Missing (`None`) observations are skipped; a year with no observed value
/// is emitted as known-missing.
#[must_use]
pub fn aggregate_to_annual(
    points: &[NormalizedPoint],
    method: AggregationMethod,
) -> Vec<NormalizedPoint> {
    let mut out: Vec<NormalizedPoint> = Vec::new();
    let mut current_year: Option<i32> = None;
    let mut values: Vec<f64> = Vec::new();

    let mut flush = |year: Option<i32>, values: &mut Vec<f64>, out: &mut Vec<NormalizedPoint>| {
        if let Some(y) = year {
            let value = match (method, values.is_empty()) {
                (_, true) => None,
                (AggregationMethod::Mean, false) => {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
                (AggregationMethod::Sum, false) => Some(values.iter().sum::<f64>()),
                (AggregationMethod::Last, false) => values.last().copied(),
            };
            out.push(NormalizedPoint::new(y.to_string(), value));
            values.clear();
        }
    };

    for p in points {
        let Some(key) = parse_period(&p.date) else {
            continue;
        };
        if current_year != Some(key.year) {
            flush(current_year, &mut values, &mut out);
            current_year = Some(key.year);
        }
        if let Some(v) = p.value {
            values.push(v);
        }
    }
    flush(current_year, &mut values, &mut out);
    out
}

/// Default aggregation method for a unit string: mean for rate-like units,
/// sum for flows.
#[must_use]
pub fn default_aggregation_for_unit(unit: &str) -> AggregationMethod {
    let lower = unit.to_lowercase();
    if lower.contains("percent")
        || lower.contains('%')
        || lower.contains("index")
        || lower.contains("rate")
        || lower.contains("ratio")
    {
        AggregationMethod::Mean
    } else {
        AggregationMethod::Sum
    }
}

/// Cache TTL class for a series, given its cadence and whether the provider
/// serves streaming intraday data.
#[must_use]
pub fn ttl_class_for(frequency: Option<Frequency>, intraday: bool) -> TtlClass {
    if intraday {
        return TtlClass::Intraday;
    }
    match frequency {
        Some(Frequency::Daily | Frequency::Weekly) => TtlClass::Daily,
        Some(Frequency::Monthly | Frequency::Quarterly) => TtlClass::MonthlyQuarterly,
        Some(Frequency::Annual) => TtlClass::Annual,
        None => TtlClass::Daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_labels_parse_and_order() {
        let annual = parse_period("2023").unwrap();
        let quarterly = parse_period("2023-Q2").unwrap();
        let monthly = parse_period("2023-05").unwrap();
        let daily = parse_period("2023-05-14").unwrap();
        assert!(annual < quarterly);
        assert!(monthly < quarterly);
        assert!(monthly < daily);
        assert!(parse_period("2023-Q5").is_none());
        assert!(parse_period("garbage").is_none());
    }

    #[test]
    fn duplicate_dates_last_wins() {
        let (points, had_duplicates) = normalize_points(vec![
            NormalizedPoint::new("2020", Some(1.0)),
            NormalizedPoint::new("2021", Some(2.0)),
            NormalizedPoint::new("2020", Some(9.0)),
        ])
        .unwrap();
        assert!(had_duplicates);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, Some(9.0));
        validate_strictly_ascending(&points).unwrap();
    }

    #[test]
    fn annual_mean_and_sum() {
        let monthly: Vec<NormalizedPoint> = (1..=12)
            .map(|m| NormalizedPoint::new(format!("2020-{m:02}"), Some(f64::from(m))))
            .collect();
        let mean = aggregate_to_annual(&monthly, AggregationMethod::Mean);
        assert_eq!(mean, vec![NormalizedPoint::new("2020", Some(6.5))]);
        let sum = aggregate_to_annual(&monthly, AggregationMethod::Sum);
        assert_eq!(sum, vec![NormalizedPoint::new("2020", Some(78.0))]);
    }

    #[test]
    fn empty_year_is_known_missing() {
        let points = vec![
            NormalizedPoint::new("2020-01", None),
            NormalizedPoint::new("2021-01", Some(3.0)),
        ];
        let annual = aggregate_to_annual(&points, AggregationMethod::Mean);
        assert_eq!(annual[0], NormalizedPoint::new("2020", None));
        assert_eq!(annual[1], NormalizedPoint::new("2021", Some(3.0)));
    }

    #[test]
    fn frequency_inference_by_label_shape() {
        let annual = vec![NormalizedPoint::new("2020", Some(1.0))];
        assert_eq!(infer_frequency(&annual), Some(Frequency::Annual));
        let quarterly = vec![NormalizedPoint::new("2020-Q1", Some(1.0))];
        assert_eq!(infer_frequency(&quarterly), Some(Frequency::Quarterly));
        let monthly = vec![NormalizedPoint::new("2020-01", Some(1.0))];
        assert_eq!(infer_frequency(&monthly), Some(Frequency::Monthly));
        let weekly = vec![
            NormalizedPoint::new("2020-01-03", Some(1.0)),
            NormalizedPoint::new("2020-01-10", Some(1.0)),
        ];
        assert_eq!(infer_frequency(&weekly), Some(Frequency::Weekly));
    }

    #[test]
    fn unit_heuristic_picks_method() {
        assert_eq!(
            default_aggregation_for_unit("Percent of active population"),
            AggregationMethod::Mean
        );
        assert_eq!(
            default_aggregation_for_unit("Current US$"),
            AggregationMethod::Sum
        );
    }
}
