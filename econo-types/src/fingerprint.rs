//! Canonical request fingerprints used as cache and single-flight keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Query-parameter names whose values are secrets and must never reach a
/// fingerprint or a provenance echo.
const SECRET_PARAMS: &[&str] = &[
    "api_key",
    "apikey",
    "app_id",
    "access_key",
    "access_token",
    "token",
    "subscription-key",
    "key",
];

/// Query-parameter names that vary per call without changing the response.
const VOLATILE_PARAMS: &[&str] = &["nonce", "request_id", "requestid", "_"];

/// Placeholder substituted for secret values.
pub const SECRET_PLACEHOLDER: &str = "REDACTED";

/// A canonical digest of the normalized, sorted, secret-scrubbed upstream
/// request URL. Two requests that differ only in parameter order or in
/// secret values share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Fingerprint an upstream URL.
    ///
    /// Falls back to hashing the raw string when the URL does not parse;
    /// a malformed URL still needs a stable cache identity.
    #[must_use]
    pub fn from_url(raw: &str) -> Self {
        let canonical = canonicalize_url(raw);
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a URL for fingerprinting: lower-cased scheme and host, path
/// kept verbatim, query pairs sorted, secrets replaced by
/// [`SECRET_PLACEHOLDER`], volatile parameters dropped.
#[must_use]
pub fn canonicalize_url(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !VOLATILE_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
        .map(|(k, v)| {
            let key = k.to_string();
            let value = if SECRET_PARAMS.contains(&key.to_ascii_lowercase().as_str()) {
                SECRET_PLACEHOLDER.to_string()
            } else {
                v.to_string()
            };
            (key, value)
        })
        .collect();
    pairs.sort();

    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let scheme = parsed.scheme().to_ascii_lowercase();
    let mut canonical = format!("{scheme}://{host}{}", parsed.path());
    if !pairs.is_empty() {
        canonical.push('?');
        for (i, (k, v)) in pairs.iter().enumerate() {
            if i > 0 {
                canonical.push('&');
            }
            canonical.push_str(k);
            canonical.push('=');
            canonical.push_str(v);
        }
    }
    canonical
}

/// Replace secret parameter values in a URL while preserving order.
///
/// Used for `api_url_echo`: the echoed provenance URL must match what was
/// issued, minus the secret.
#[must_use]
pub fn scrub_secrets(raw: &str) -> String {
    let Ok(mut parsed) = url::Url::parse(raw) else {
        return raw.to_string();
    };
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let key = k.to_string();
            let value = if SECRET_PARAMS.contains(&key.to_ascii_lowercase().as_str()) {
                SECRET_PLACEHOLDER.to_string()
            } else {
                v.to_string()
            };
            (key, value)
        })
        .collect();
    if pairs.is_empty() {
        return parsed.to_string();
    }
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_order_does_not_matter() {
        let a = RequestFingerprint::from_url("https://api.example.org/obs?b=2&a=1");
        let b = RequestFingerprint::from_url("https://api.example.org/obs?a=1&b=2");
        assert_eq!(a, b);
    }

    #[test]
    fn secret_values_do_not_matter() {
        let a = RequestFingerprint::from_url("https://api.example.org/obs?api_key=aaa&s=UNRATE");
        let b = RequestFingerprint::from_url("https://api.example.org/obs?api_key=bbb&s=UNRATE");
        assert_eq!(a, b);
    }

    #[test]
    fn volatile_params_are_dropped() {
        let a = RequestFingerprint::from_url("https://api.example.org/obs?s=GDP&nonce=17");
        let b = RequestFingerprint::from_url("https://api.example.org/obs?s=GDP&nonce=99");
        assert_eq!(a, b);
    }

    #[test]
    fn different_series_differ() {
        let a = RequestFingerprint::from_url("https://api.example.org/obs?s=UNRATE");
        let b = RequestFingerprint::from_url("https://api.example.org/obs?s=CPIAUCSL");
        assert_ne!(a, b);
    }

    #[test]
    fn scrub_preserves_order_and_redacts() {
        let scrubbed = scrub_secrets("https://api.example.org/obs?series_id=UNRATE&api_key=s3cr3t");
        assert!(scrubbed.contains("series_id=UNRATE"));
        assert!(scrubbed.contains("api_key=REDACTED"));
        assert!(!scrubbed.contains("s3cr3t"));
    }
}
