//! Natural-language intent resolution via an external LLM.
//!
//! The resolver produces an intent, not a plan: free text is never
//! hard-mapped to provider codes here; that is the indicator index's job.

mod llm;
pub mod postprocess;

use std::sync::Arc;
use std::time::Duration;

use econo_types::{EconError, ParsedIntent};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

pub use llm::{HttpLlmClient, LlmClient};

const SYSTEM_PROMPT: &str = r#"You translate natural-language questions about economic data into a JSON intent. Respond with a single JSON object and nothing else. Schema:
{
  "providers": [string],            // only if the user names a source: fred, worldbank, imf, coingecko, exchangerate, comtrade, oecd, eurostat, bis, statcan
  "indicators": [{"label": string, "explicit_code": string?, "qualifiers": [string]}],
  "geography": [{"kind": "country", "value": ISO3} | {"kind": "group", "value": "G7|G20|BRICS|ASEAN|EU27|EURO_AREA|NORDIC|OECD|LATAM|MENA"} | {"kind": "world"} | {"kind": "region", "value": string}],
  "timeRange": {"start": "YYYY-MM-DD"?, "end": "YYYY-MM-DD"?, "relative": {"kind": "last_n_years", "n": int} | {"kind": "last_n_months", "n": int} | {"kind": "since_year", "year": int} | {"kind": "between", "start": int, "end": int} | {"kind": "ytd"} | {"kind": "latest"}?},
  "frequency": "daily|weekly|monthly|quarterly|annual"?,
  "isTradeQuery": bool, "isComparison": bool, "isExchangeRate": bool, "isCrypto": bool
}
Qualifiers: real, nominal, core, per_capita, growth, seasonally_adjusted, not_seasonally_adjusted.
Keep indicator labels close to the user's wording. Use country names verbatim if you are unsure of the ISO3 code."#;

const RETRY_PROMPT: &str =
    "Your previous answer was not valid JSON for the schema. Re-emit the intent as a single valid JSON object, with no commentary and no code fences.";

const VALIDATE_PROMPT: &str = r#"You check whether a catalog indicator matches what a user asked for. Answer with exactly one word: "yes" or "no"."#;

/// Resolves query text into a [`ParsedIntent`].
pub struct IntentResolver {
    llm: Option<Arc<dyn LlmClient>>,
    cache: moka::sync::Cache<String, ParsedIntent>,
}

impl IntentResolver {
    /// A resolver over the given LLM backend. `None` disables resolution;
    /// every query then fails with an intent error (the configuration had
    /// no LLM key).
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            llm,
            cache: moka::sync::Cache::builder()
                .max_capacity(512)
                .time_to_live(Duration::from_secs(3600))
                .build(),
        }
    }

    fn cache_key(query_text: &str, conversation_tail: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(query_text.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(conversation_tail.unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Resolve a query, consulting the intent cache first and retrying the
    /// LLM once on a JSON-parse failure.
    ///
    /// # Errors
    /// `EconError::Intent` when no backend is configured or the model
    /// cannot produce parseable structure after the retry.
    pub async fn resolve(
        &self,
        query_text: &str,
        conversation_tail: Option<&str>,
    ) -> Result<ParsedIntent, EconError> {
        let query_text = query_text.trim();
        if query_text.is_empty() {
            return Err(EconError::InvalidArg("empty query".into()));
        }
        let key = Self::cache_key(query_text, conversation_tail);
        if let Some(cached) = self.cache.get(&key) {
            debug!(target = "econo::intent", "intent cache hit");
            return Ok(cached);
        }

        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| EconError::Intent("no LLM backend configured".into()))?;

        let raw = llm.complete(SYSTEM_PROMPT, query_text).await?;
        let mut intent = match parse_intent(&raw) {
            Ok(intent) => intent,
            Err(first_err) => {
                debug!(target = "econo::intent", error = %first_err, "retrying after parse failure");
                let retry_user = format!("{query_text}\n\n{RETRY_PROMPT}");
                let raw = llm.complete(SYSTEM_PROMPT, &retry_user).await?;
                parse_intent(&raw)
                    .map_err(|e| EconError::Intent(format!("unparseable after retry: {e}")))?
            }
        };

        postprocess::normalize(&mut intent, chrono::Utc::now());
        self.cache.insert(key, intent.clone());
        Ok(intent)
    }

    /// Semantic validation of an indicator candidate against the user's
    /// phrasing. Fails open: an unavailable backend never blocks a
    /// confident index match, it only loses the extra guard.
    pub async fn validate_candidate(
        &self,
        query_text: &str,
        candidate_name: &str,
        candidate_description: &str,
    ) -> bool {
        let Some(llm) = self.llm.as_ref() else {
            return true;
        };
        let user = format!(
            "User asked: {query_text}\nCandidate indicator: {candidate_name}\nDescription: {candidate_description}\nDoes the candidate measure what the user asked for?"
        );
        match llm.complete(VALIDATE_PROMPT, &user).await {
            Ok(answer) => !answer.trim().to_lowercase().starts_with("no"),
            Err(e) => {
                warn!(target = "econo::intent", error = %e, "semantic validation unavailable");
                true
            }
        }
    }
}

/// Parse the model's output, tolerating markdown code fences.
fn parse_intent(raw: &str) -> Result<ParsedIntent, serde_json::Error> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim())
}

#[cfg(test)]
mod tests {
    use super::parse_intent;

    #[test]
    fn code_fences_are_tolerated() {
        let fenced = "```json\n{\"indicators\": [{\"label\": \"gdp\"}]}\n```";
        let intent = parse_intent(fenced).unwrap();
        assert_eq!(intent.indicators[0].label, "gdp");
    }

    #[test]
    fn commentary_fails_parse() {
        assert!(parse_intent("Sure! Here is the intent: {}").is_err());
    }
}
