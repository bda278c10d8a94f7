//! Statistics Canada adapter (Web Data Service, vector-id based).
//!
//! Vectors go stale when a table is archived and replaced. The adapter
//! compares the advertised last release to the series' expected cadence;
//! a vector older than three cadence intervals triggers successor
//! discovery under the same product and coordinate.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use econo_core::connector::{DataDomain, EconConnector, FetchResponse, SeriesProvider, SeriesQuery};
use econo_core::HttpClient;
use econo_types::{EconError, Frequency, GeoSelector, NormalizedPoint, SeriesMetadata};
use serde_json::{json, Value};
use tracing::info;

use crate::keys;
use crate::rest;

const DEFAULT_BASE: &str = "https://www150.statcan.gc.ca/t1/wds/rest";

/// Staleness margin: a vector is archived-suspect when its last release is
/// older than this many cadence intervals.
const STALE_INTERVALS: i64 = 3;

/// Label -> `(vector id, product id, coordinate)`.
const ALIASES: &[(&str, u64, u64, &str)] = &[
    ("cpi", 41690973, 18100004, "2.2.0.0.0.0.0.0.0.0"),
    ("inflation", 41690973, 18100004, "2.2.0.0.0.0.0.0.0.0"),
    ("unemployment rate", 2062815, 14100287, "1.7.1.1.1.0.0.0.0.0"),
    ("unemployment", 2062815, 14100287, "1.7.1.1.1.0.0.0.0.0"),
    ("gdp", 65201210, 36100434, "1.1.1.0.0.0.0.0.0.0"),
    ("employment", 2062811, 14100287, "1.3.1.1.1.0.0.0.0.0"),
    ("retail sales", 52367097, 20100008, "1.1.1.0.0.0.0.0.0.0"),
];

/// Statistics Canada connector.
pub struct StatcanConnector {
    http: HttpClient,
    base: String,
    api_key: Option<String>,
}

impl StatcanConnector {
    /// Build against the production WDS base URL.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base: DEFAULT_BASE.to_string(),
            api_key: None,
        }
    }

    /// Set the API key (sent as `x-api-key`).
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Point at a different base URL (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match self.api_key.as_deref() {
            Some(key) => vec![("x-api-key", key)],
            None => Vec::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, EconError> {
        let url = format!("{}/{path}", self.base.trim_end_matches('/'));
        self.http
            .post_json(keys::STATCAN, &url, &self.headers(), &body)
            .await?
            .ensure_success(keys::STATCAN)?
            .json()
    }

    async fn series_info(&self, vector_id: u64) -> Result<Value, EconError> {
        let body = self
            .post(
                "getSeriesInfoFromVector",
                json!([{ "vectorId": vector_id }]),
            )
            .await?;
        unwrap_wds_object(&body, "getSeriesInfoFromVector")
    }

    /// Discover the successor vector for the same product/coordinate.
    async fn successor_vector(&self, product_id: u64, coordinate: &str) -> Option<u64> {
        let body = self
            .post(
                "getSeriesInfoFromCubePidCoord",
                json!([{ "productId": product_id, "coordinate": coordinate }]),
            )
            .await
            .ok()?;
        unwrap_wds_object(&body, "getSeriesInfoFromCubePidCoord")
            .ok()?
            .get("vectorId")
            .and_then(Value::as_u64)
    }

    async fn vector_data(
        &self,
        vector_id: u64,
        latest_n: u32,
    ) -> Result<Vec<NormalizedPoint>, EconError> {
        let body = self
            .post(
                "getDataFromVectorsAndLatestNPeriods",
                json!([{ "vectorId": vector_id, "latestN": latest_n }]),
            )
            .await?;
        let object = unwrap_wds_object(&body, "getDataFromVectorsAndLatestNPeriods")?;
        let points = object
            .get("vectorDataPoint")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(points
            .iter()
            .filter_map(|p| {
                let ref_per = p.get("refPer").and_then(Value::as_str)?;
                Some(NormalizedPoint::new(
                    ref_per.to_string(),
                    p.get("value").and_then(Value::as_f64),
                ))
            })
            .collect())
    }

    fn frequency_from_code(code: Option<i64>) -> Option<Frequency> {
        match code {
            Some(1) => Some(Frequency::Daily),
            Some(2) => Some(Frequency::Weekly),
            Some(6) => Some(Frequency::Monthly),
            Some(7) => Some(Frequency::Quarterly),
            Some(12) => Some(Frequency::Annual),
            _ => None,
        }
    }

    fn cadence_days(frequency: Option<Frequency>) -> i64 {
        match frequency {
            Some(Frequency::Daily) => 1,
            Some(Frequency::Weekly) => 7,
            Some(Frequency::Monthly) | None => 31,
            Some(Frequency::Quarterly) => 92,
            Some(Frequency::Annual) => 366,
        }
    }

    fn is_stale(last_release: Option<&str>, frequency: Option<Frequency>, now: DateTime<Utc>) -> bool {
        let Some(stamp) = last_release else {
            return false;
        };
        let Some(release) = parse_wds_time(stamp) else {
            return false;
        };
        let age_days = (now - release).num_days();
        age_days > Self::cadence_days(frequency) * STALE_INTERVALS
    }

    fn period_label(ref_per: &str, frequency: Option<Frequency>) -> String {
        let date = ref_per.get(..10).unwrap_or(ref_per);
        match frequency {
            Some(Frequency::Annual) => date.get(..4).unwrap_or(date).to_string(),
            Some(Frequency::Quarterly) => {
                let year = date.get(..4).unwrap_or(date);
                let month: u8 = date.get(5..7).and_then(|m| m.parse().ok()).unwrap_or(1);
                format!("{year}-Q{}", (month - 1) / 3 + 1)
            }
            Some(Frequency::Monthly) => date.get(..7).unwrap_or(date).to_string(),
            _ => date.to_string(),
        }
    }

    fn latest_n(range_years: Option<(i32, i32)>, frequency: Option<Frequency>) -> u32 {
        let years = range_years.map_or(5, |(s, e)| (e - s + 1).max(1)) as u32;
        let per_year = match frequency {
            Some(Frequency::Daily) => 260,
            Some(Frequency::Weekly) => 52,
            Some(Frequency::Monthly) | None => 12,
            Some(Frequency::Quarterly) => 4,
            Some(Frequency::Annual) => 1,
        };
        (years * per_year).min(2000)
    }
}

fn unwrap_wds_object(body: &Value, method: &str) -> Result<Value, EconError> {
    let first = body
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| EconError::Data(format!("{method}: empty WDS response")))?;
    let status = first.get("status").and_then(Value::as_str).unwrap_or("");
    if status != "SUCCESS" {
        return Err(EconError::provider(
            keys::STATCAN,
            format!("{method} returned status {status}"),
        ));
    }
    first
        .get("object")
        .cloned()
        .ok_or_else(|| EconError::Data(format!("{method}: missing object")))
}

/// WDS stamps look like `2023-05-19T08:30` (Eastern, no zone designator).
fn parse_wds_time(stamp: &str) -> Option<DateTime<Utc>> {
    let date_part = stamp.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some(DateTime::from_naive_utc_and_offset(
        date.and_hms_opt(0, 0, 0)?,
        Utc,
    ))
}

impl EconConnector for StatcanConnector {
    fn name(&self) -> &'static str {
        keys::STATCAN
    }
    fn vendor(&self) -> &'static str {
        "Statistics Canada"
    }
    fn supports(&self, domain: DataDomain) -> bool {
        matches!(domain, DataDomain::CanadaMacro)
    }
    fn as_series_provider(&self) -> Option<&dyn SeriesProvider> {
        Some(self as &dyn SeriesProvider)
    }
}

#[async_trait]
impl SeriesProvider for StatcanConnector {
    async fn fetch_series(&self, query: &SeriesQuery) -> Result<FetchResponse, EconError> {
        match &query.geo {
            GeoSelector::Country(iso3) if iso3 == "CAN" => {}
            other => {
                return Err(EconError::DataNotAvailable {
                    what: format!("Statistics Canada covers Canada, not {}", other.label()),
                    hint: Some("route to worldbank or oecd".into()),
                })
            }
        }

        let label = query.indicator.label.to_lowercase();
        let (mut vector_id, product_id, coordinate) = ALIASES
            .iter()
            .find(|(alias, _, _, _)| label.contains(alias))
            .map(|(_, v, p, c)| (*v, *p, *c))
            .ok_or_else(|| EconError::IndicatorUnknown {
                label: query.indicator.label.clone(),
                suggestions: ALIASES.iter().map(|(a, _, _, _)| (*a).to_string()).collect(),
            })?;

        let info = self.series_info(vector_id).await?;
        let frequency = Self::frequency_from_code(
            info.get("frequencyCode").and_then(Value::as_i64),
        );
        let title = info
            .get("SeriesTitleEn")
            .and_then(Value::as_str)
            .unwrap_or(&query.indicator.label)
            .to_string();
        let last_release = info
            .get("releaseTime")
            .or_else(|| info.get("lastUpdated"))
            .and_then(Value::as_str);

        if Self::is_stale(last_release, frequency, Utc::now()) {
            if let Some(successor) = self.successor_vector(product_id, coordinate).await {
                if successor != vector_id {
                    info!(
                        target = "econo::statcan",
                        stale = vector_id,
                        successor,
                        "archived vector replaced by successor"
                    );
                    vector_id = successor;
                }
            }
        }

        let latest_n = Self::latest_n(query.range.years(), frequency);
        let raw_points = self.vector_data(vector_id, latest_n).await?;
        rest::require_points(&raw_points, &format!("vector v{vector_id}"))?;

        let points: Vec<NormalizedPoint> = raw_points
            .into_iter()
            .filter(|p| {
                query.range.years().is_none_or(|(s, e)| {
                    p.date
                        .get(..4)
                        .and_then(|y| y.parse::<i32>().ok())
                        .map(|y| y >= s && y <= e)
                        .unwrap_or(true)
                })
            })
            .map(|p| NormalizedPoint::new(Self::period_label(&p.date, frequency), p.value))
            .collect();
        rest::require_points(&points, &format!("vector v{vector_id} in range"))?;

        let metadata = SeriesMetadata {
            source_provider: keys::STATCAN.to_string(),
            indicator_code: format!("v{vector_id}"),
            indicator_display: title,
            country_or_region: "Canada".to_string(),
            unit: info
                .get("scalarFactorCode")
                .and_then(Value::as_i64)
                .map_or_else(String::new, |s| if s == 0 { String::new() } else { format!("x10^{s}") }),
            frequency,
            last_updated: last_release.map(str::to_string),
            api_url_echo: format!("{}/getDataFromVectorsAndLatestNPeriods", self.base),
            source_url: format!(
                "https://www150.statcan.gc.ca/t1/tbl1/en/tv.action?pid={product_id}01"
            ),
            ..SeriesMetadata::default()
        };
        let (series, had_duplicates) = rest::finalize_series(
            metadata,
            points,
            query.frequency,
            &query.indicator.qualifiers,
        )?;
        let mut resp = FetchResponse::new(vec![series]);
        if had_duplicates {
            resp = resp.with_warning(rest::duplicate_dates_warning(
                keys::STATCAN,
                &format!("v{vector_id}"),
            ));
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_uses_cadence_margin() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        // Monthly vector released 2 months ago: fresh.
        assert!(!StatcanConnector::is_stale(
            Some("2024-04-15T08:30"),
            Some(Frequency::Monthly),
            now
        ));
        // Monthly vector released a year ago: archived-suspect.
        assert!(StatcanConnector::is_stale(
            Some("2023-05-15T08:30"),
            Some(Frequency::Monthly),
            now
        ));
        // Annual vector released a year ago: fresh.
        assert!(!StatcanConnector::is_stale(
            Some("2023-05-15T08:30"),
            Some(Frequency::Annual),
            now
        ));
    }

    #[test]
    fn period_labels_follow_cadence() {
        assert_eq!(
            StatcanConnector::period_label("2023-04-01", Some(Frequency::Monthly)),
            "2023-04"
        );
        assert_eq!(
            StatcanConnector::period_label("2023-04-01", Some(Frequency::Quarterly)),
            "2023-Q2"
        );
        assert_eq!(
            StatcanConnector::period_label("2023-01-01", Some(Frequency::Annual)),
            "2023"
        );
    }
}
