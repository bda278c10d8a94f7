//! The shared outbound HTTP pool.
//!
//! Every provider adapter goes through one [`HttpClient`] so that timeout,
//! redirect, keepalive, and user-agent behavior is uniform. Retries are not
//! performed here; retry policy lives in adapters and the circuit breaker.

use std::time::Instant;

use econo_types::{EconError, HttpConfig};
use tracing::debug;

/// Outcome of one upstream call. Non-2xx statuses are returned, not raised;
/// the adapter decides whether to retry or bubble.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Wall-clock duration of the call.
    pub elapsed_ms: u64,
}

impl HttpResponse {
    /// Body as UTF-8, lossily.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the body as JSON.
    ///
    /// # Errors
    /// `EconError::Data` when the body is not valid JSON of type `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, EconError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| EconError::Data(format!("malformed JSON body: {e}")))
    }

    /// Convert a non-2xx status into the error taxonomy.
    ///
    /// # Errors
    /// `EconError::RateLimited` on 429 (honoring no header here; the caller
    /// reads `retry-after` from the raw response when it needs it) and
    /// `EconError::Upstream` on any other non-2xx.
    pub fn ensure_success(self, provider: &str) -> Result<Self, EconError> {
        match self.status {
            200..=299 => Ok(self),
            429 => Err(EconError::RateLimited {
                provider: provider.to_string(),
                retry_after_ms: None,
            }),
            status => Err(EconError::upstream(provider, status, &self.text())),
        }
    }
}

/// One shared connection pool with bounded keepalive, HTTP/2 where the
/// upstream negotiates it, and a per-request timeout.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Build the shared pool from configuration.
    ///
    /// # Errors
    /// `EconError::Internal` when the underlying client cannot be
    /// constructed (invalid TLS backend or user agent).
    pub fn new(cfg: &HttpConfig) -> Result<Self, EconError> {
        let inner = reqwest::Client::builder()
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host)
            .pool_idle_timeout(cfg.pool_idle_timeout)
            .timeout(cfg.request_timeout)
            .connect_timeout(cfg.connect_timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(|e| EconError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self { inner })
    }

    /// Issue a GET. Headers are `(name, value)` pairs appended per call;
    /// provider API keys travel here or in the query string, per provider.
    ///
    /// # Errors
    /// `Timeout` on deadline exceeded, `Network` on transport failure.
    pub async fn get(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse, EconError> {
        let mut req = self.inner.get(url);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        self.execute(provider, url, req).await
    }

    /// Issue a POST with a JSON body; same return shape as [`Self::get`].
    ///
    /// # Errors
    /// As [`Self::get`].
    pub async fn post_json(
        &self,
        provider: &str,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse, EconError> {
        let mut req = self.inner.post(url).json(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        self.execute(provider, url, req).await
    }

    async fn execute(
        &self,
        provider: &str,
        url: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<HttpResponse, EconError> {
        let start = Instant::now();
        let resp = req.send().await.map_err(|e| map_transport_err(provider, &e))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| map_transport_err(provider, &e))?
            .to_vec();
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            target = "econo::http",
            provider,
            status,
            elapsed_ms,
            url = %econo_types::scrub_secrets(url),
            "upstream call"
        );
        Ok(HttpResponse {
            status,
            body,
            elapsed_ms,
        })
    }
}

fn map_transport_err(provider: &str, e: &reqwest::Error) -> EconError {
    if e.is_timeout() {
        EconError::timeout(provider, "http")
    } else {
        EconError::Network {
            provider: provider.to_string(),
            msg: e.to_string(),
        }
    }
}
