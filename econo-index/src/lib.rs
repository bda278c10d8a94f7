//! Read-only full-text index over provider indicator catalogs.
//!
//! Physical layout: a provider-partitioned row store (`indicators`) plus an
//! FTS5 inverted index with external-content semantics over
//! `(display_name, description, keywords)`, and exact indexes on `code` and
//! `(provider, code)`. Built offline by an ingest job; opened read-only at
//! process start. Rebuilds produce a new snapshot that swaps in atomically.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use econo_types::EconError;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One catalog entry, unique by `(provider, code)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRecord {
    /// Owning provider tag.
    pub provider: String,
    /// Provider-native series code.
    pub code: String,
    /// Display name.
    pub display_name: String,
    /// Long description.
    pub description: String,
    /// Unit of measure, when known.
    pub unit: Option<String>,
    /// Native cadence, when known.
    pub frequency: Option<String>,
    /// Geographic coverage, when known.
    pub geo_coverage: Option<String>,
    /// Space-separated search keywords.
    pub keywords: String,
    /// Topical category.
    pub category: String,
    /// Precomputed popularity boost.
    pub popularity_score: f64,
}

/// Which field produced the match; description-only matches are flagged
/// low-confidence and must pass semantic validation before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// Exact code or alias hit.
    Code,
    /// Display-name hit.
    Name,
    /// Keyword hit.
    Keywords,
    /// Description-only hit.
    Description,
}

/// A scored candidate in the envelope the router and resolver consume.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredIndicator {
    /// The matched record.
    pub record: IndicatorRecord,
    /// Combined score; higher is better.
    pub score: f64,
    /// Field that produced the match.
    pub matched_in: MatchField,
    /// True for description-only matches.
    pub low_confidence: bool,
}

#[derive(Debug, Deserialize)]
struct AliasEntry {
    provider: String,
    code: String,
}

/// An immutable, queryable generation of the index.
pub struct IndexSnapshot {
    conn: Mutex<Connection>,
    generation: u64,
}

/// Builder used by the offline ingest job and by tests.
pub struct IndexBuilder {
    conn: Connection,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS indicators (
    id INTEGER PRIMARY KEY,
    provider TEXT NOT NULL,
    code TEXT NOT NULL,
    display_name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    unit TEXT,
    frequency TEXT,
    geo_coverage TEXT,
    keywords TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    popularity_score REAL NOT NULL DEFAULT 0,
    UNIQUE (provider, code)
);
CREATE INDEX IF NOT EXISTS idx_indicators_code ON indicators (code);
CREATE VIRTUAL TABLE IF NOT EXISTS indicators_fts USING fts5(
    display_name, description, keywords,
    content='indicators', content_rowid='id'
);
";

impl IndexBuilder {
    /// Start an in-memory build (tests, empty startup index).
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure.
    pub fn in_memory() -> Result<Self, EconError> {
        Self::from_conn(Connection::open_in_memory().map_err(sql_err)?)
    }

    /// Start a file-backed build at `path`.
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure.
    pub fn at_path(path: &str) -> Result<Self, EconError> {
        Self::from_conn(Connection::open(path).map_err(sql_err)?)
    }

    fn from_conn(conn: Connection) -> Result<Self, EconError> {
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self { conn })
    }

    /// Append one record (also feeds the FTS structure).
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure, including a duplicate
    /// `(provider, code)`.
    pub fn insert(&mut self, record: &IndicatorRecord) -> Result<(), EconError> {
        self.conn
            .execute(
                "INSERT INTO indicators (provider, code, display_name, description, unit,
                     frequency, geo_coverage, keywords, category, popularity_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    record.provider,
                    record.code,
                    record.display_name,
                    record.description,
                    record.unit,
                    record.frequency,
                    record.geo_coverage,
                    record.keywords,
                    record.category,
                    record.popularity_score,
                ],
            )
            .map_err(sql_err)?;
        let rowid = self.conn.last_insert_rowid();
        self.conn
            .execute(
                "INSERT INTO indicators_fts (rowid, display_name, description, keywords)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    rowid,
                    record.display_name,
                    record.description,
                    record.keywords
                ],
            )
            .map_err(sql_err)?;
        Ok(())
    }

    /// Finish the build, producing a queryable snapshot.
    #[must_use]
    pub fn finish(self) -> IndexSnapshot {
        IndexSnapshot {
            conn: Mutex::new(self.conn),
            generation: 0,
        }
    }
}

/// Handle to the current index generation. Fully read-only after open;
/// rebuilds swap the snapshot pointer under the hood.
pub struct IndicatorIndex {
    current: ArcSwap<IndexSnapshot>,
    generation: AtomicU64,
    aliases: HashMap<String, Vec<AliasEntry>>,
    not_synonyms: HashMap<String, Vec<String>>,
}

impl IndicatorIndex {
    /// Open the index file read-only; `:memory:` yields an empty index.
    ///
    /// # Errors
    /// `EconError::Internal` when the file cannot be opened or the schema
    /// is missing.
    pub fn open(path: &str) -> Result<Self, EconError> {
        let snapshot = if path == ":memory:" {
            IndexBuilder::in_memory()?.finish()
        } else {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(sql_err)?;
            IndexSnapshot {
                conn: Mutex::new(conn),
                generation: 0,
            }
        };
        let index = Self::from_snapshot(snapshot);
        info!(
            target = "econo::index",
            path,
            records = index.len().unwrap_or(0),
            "indicator index opened"
        );
        Ok(index)
    }

    /// Wrap an already-built snapshot (tests, ingest pipelines).
    #[must_use]
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            generation: AtomicU64::new(0),
            aliases: serde_json::from_str(include_str!("data/aliases.json"))
                .expect("embedded alias table is valid JSON"),
            not_synonyms: serde_json::from_str(include_str!("data/not_synonyms.json"))
                .expect("embedded not-synonym table is valid JSON"),
        }
    }

    /// Atomically swap in a rebuilt snapshot, bumping the generation.
    pub fn swap(&self, mut snapshot: IndexSnapshot) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        snapshot.generation = generation;
        self.current.store(Arc::new(snapshot));
        info!(target = "econo::index", generation, "index snapshot swapped");
    }

    /// Current generation counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of records in the current snapshot.
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure.
    pub fn len(&self) -> Result<u64, EconError> {
        let snapshot = self.current.load();
        let conn = snapshot.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM indicators", [], |row| row.get(0))
            .map_err(sql_err)
    }

    /// Whether the current snapshot is empty.
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure.
    pub fn is_empty(&self) -> Result<bool, EconError> {
        Ok(self.len()? == 0)
    }

    /// Exact lookup by `(provider, code)`.
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure.
    pub fn lookup_code(
        &self,
        provider: &str,
        code: &str,
    ) -> Result<Option<IndicatorRecord>, EconError> {
        let snapshot = self.current.load();
        let conn = snapshot.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT provider, code, display_name, description, unit, frequency,
                        geo_coverage, keywords, category, popularity_score
                 FROM indicators WHERE provider = ?1 AND code = ?2 COLLATE NOCASE",
            )
            .map_err(sql_err)?;
        let mut rows = stmt
            .query_map(rusqlite::params![provider, code], record_from_row)
            .map_err(sql_err)?;
        rows.next().transpose().map_err(sql_err)
    }

    /// Rank candidates for a free-text query.
    ///
    /// Scoring, highest first: exact code match, alias hit, exact phrase on
    /// the display name, BM25 over the combined text, each with a
    /// popularity boost. Candidates matching only in the description are
    /// flagged `low_confidence` and NOT-synonym guards (data, not code)
    /// drop known false friends.
    ///
    /// # Errors
    /// `EconError::Internal` on SQLite failure.
    pub fn search(
        &self,
        query: &str,
        provider_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredIndicator>, EconError> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let mut out: Vec<ScoredIndicator> = Vec::new();

        // 1. Exact code match.
        for record in self.exact_code_matches(query, provider_filter)? {
            let score = 1000.0 + record.popularity_score;
            out.push(ScoredIndicator {
                record,
                score,
                matched_in: MatchField::Code,
                low_confidence: false,
            });
        }

        // 2. Alias table.
        let normalized = normalize(query);
        if let Some(entries) = self.aliases.get(&normalized) {
            for (rank, entry) in entries.iter().enumerate() {
                if let Some(p) = provider_filter {
                    if p != entry.provider {
                        continue;
                    }
                }
                if let Some(record) = self.lookup_code(&entry.provider, &entry.code)? {
                    out.push(ScoredIndicator {
                        score: 900.0 - rank as f64 + record.popularity_score,
                        record,
                        matched_in: MatchField::Code,
                        low_confidence: false,
                    });
                }
            }
        }

        // 3./4. FTS with a name-phrase bonus and popularity boost.
        let banned = self.banned_phrases(&normalized);
        for (record, rank) in self.fts_matches(query, provider_filter, limit * 4)? {
            let name_lower = record.display_name.to_lowercase();
            let keywords_lower = record.keywords.to_lowercase();
            if banned.iter().any(|b| name_lower.contains(b)) {
                continue;
            }
            let matched_in = if name_lower.contains(&normalized) {
                MatchField::Name
            } else if keywords_lower.contains(&normalized)
                || query_tokens(query).iter().any(|t| keywords_lower.contains(t))
            {
                MatchField::Keywords
            } else if query_tokens(query).iter().any(|t| name_lower.contains(t)) {
                MatchField::Name
            } else {
                MatchField::Description
            };
            let phrase_bonus = if name_lower == normalized { 800.0 } else { 0.0 };
            out.push(ScoredIndicator {
                score: phrase_bonus - rank + record.popularity_score * 0.1,
                record,
                matched_in,
                low_confidence: matched_in == MatchField::Description,
            });
        }

        // Dedup by (provider, code), best score wins; stable order after.
        out.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        let mut seen: std::collections::HashSet<(String, String)> = std::collections::HashSet::new();
        out.retain(|c| seen.insert((c.record.provider.clone(), c.record.code.clone())));
        out.truncate(limit);
        Ok(out)
    }

    fn exact_code_matches(
        &self,
        query: &str,
        provider_filter: Option<&str>,
    ) -> Result<Vec<IndicatorRecord>, EconError> {
        let snapshot = self.current.load();
        let conn = snapshot.conn.lock();
        let sql = match provider_filter {
            Some(_) => {
                "SELECT provider, code, display_name, description, unit, frequency,
                        geo_coverage, keywords, category, popularity_score
                 FROM indicators WHERE code = ?1 COLLATE NOCASE AND provider = ?2"
            }
            None => {
                "SELECT provider, code, display_name, description, unit, frequency,
                        geo_coverage, keywords, category, popularity_score
                 FROM indicators WHERE code = ?1 COLLATE NOCASE"
            }
        };
        let mut stmt = conn.prepare_cached(sql).map_err(sql_err)?;
        let rows = match provider_filter {
            Some(p) => stmt
                .query_map(rusqlite::params![query, p], record_from_row)
                .map_err(sql_err)?
                .collect::<Result<Vec<_>, _>>(),
            None => stmt
                .query_map(rusqlite::params![query], record_from_row)
                .map_err(sql_err)?
                .collect::<Result<Vec<_>, _>>(),
        };
        rows.map_err(sql_err)
    }

    fn fts_matches(
        &self,
        query: &str,
        provider_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(IndicatorRecord, f64)>, EconError> {
        let tokens = query_tokens(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        // Require all tokens first; relax to any-token when nothing matches.
        let and_match = tokens
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" ");
        let or_match = tokens
            .iter()
            .map(|t| format!("\"{t}\""))
            .collect::<Vec<_>>()
            .join(" OR ");

        let strict = self.run_fts(&and_match, provider_filter, limit)?;
        if !strict.is_empty() {
            return Ok(strict);
        }
        self.run_fts(&or_match, provider_filter, limit)
    }

    fn run_fts(
        &self,
        match_expr: &str,
        provider_filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(IndicatorRecord, f64)>, EconError> {
        let snapshot = self.current.load();
        let conn = snapshot.conn.lock();
        // Weight name over keywords over description.
        let sql = match provider_filter {
            Some(_) => {
                "SELECT i.provider, i.code, i.display_name, i.description, i.unit, i.frequency,
                        i.geo_coverage, i.keywords, i.category, i.popularity_score,
                        bm25(indicators_fts, 5.0, 1.0, 3.0) AS rank
                 FROM indicators_fts
                 JOIN indicators i ON i.id = indicators_fts.rowid
                 WHERE indicators_fts MATCH ?1 AND i.provider = ?2
                 ORDER BY rank LIMIT ?3"
            }
            None => {
                "SELECT i.provider, i.code, i.display_name, i.description, i.unit, i.frequency,
                        i.geo_coverage, i.keywords, i.category, i.popularity_score,
                        bm25(indicators_fts, 5.0, 1.0, 3.0) AS rank
                 FROM indicators_fts
                 JOIN indicators i ON i.id = indicators_fts.rowid
                 WHERE indicators_fts MATCH ?1
                 ORDER BY rank LIMIT ?2"
            }
        };
        let mut stmt = conn.prepare_cached(sql).map_err(sql_err)?;
        let map_row = |row: &Row<'_>| -> rusqlite::Result<(IndicatorRecord, f64)> {
            Ok((record_from_row(row)?, row.get::<_, f64>(10)?))
        };
        let rows = match provider_filter {
            Some(p) => stmt
                .query_map(rusqlite::params![match_expr, p, limit as i64], map_row)
                .map_err(sql_err)?
                .collect::<Result<Vec<_>, _>>(),
            None => stmt
                .query_map(rusqlite::params![match_expr, limit as i64], map_row)
                .map_err(sql_err)?
                .collect::<Result<Vec<_>, _>>(),
        };
        rows.map_err(sql_err)
    }

    /// NOT-synonym phrases for any concept contained in the query.
    fn banned_phrases(&self, normalized_query: &str) -> Vec<String> {
        self.not_synonyms
            .iter()
            .filter(|(concept, _)| normalized_query.contains(concept.as_str()))
            .flat_map(|(_, phrases)| phrases.iter().map(|p| p.to_lowercase()))
            .collect()
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<IndicatorRecord> {
    Ok(IndicatorRecord {
        provider: row.get(0)?,
        code: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        unit: row.get(4)?,
        frequency: row.get(5)?,
        geo_coverage: row.get(6)?,
        keywords: row.get(7)?,
        category: row.get(8)?,
        popularity_score: row.get(9)?,
    })
}

fn normalize(query: &str) -> String {
    query_tokens(query).join(" ")
}

fn query_tokens(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '.')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn sql_err(e: rusqlite::Error) -> EconError {
    EconError::Internal(format!("indicator index: {e}"))
}
