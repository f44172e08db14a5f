//! SQLite sample store
//!
//! Reads samples from a SQLite database file. Exports open the file read-only;
//! [`SqliteSampleStore::create`] opens it read-write and creates the schema so
//! that importers and tests can populate it.
//!
//! Timestamps are stored as UTC microseconds since the Unix epoch. Samples with
//! equal end times are ordered by row id, which gives offset paging a stable
//! order.

use super::traits::{Clause, QueryLimit, SamplePredicate, SampleQuery, SampleStore, SortOrder};
use crate::domain::{
    BundleId, Metadata, PulseError, Quantity, Result, Sample, SampleKind, Source, StoreError, Unit,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS sources (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        bundle_id TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS samples (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        value REAL NOT NULL,
        unit TEXT NOT NULL,
        start_time INTEGER NOT NULL,
        end_time INTEGER NOT NULL,
        source_id INTEGER NOT NULL REFERENCES sources(id),
        device TEXT,
        metadata TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_samples_kind_end ON samples(kind, end_time);
    CREATE INDEX IF NOT EXISTS idx_samples_kind_source_end ON samples(kind, source_id, end_time);
";

/// Sample store backed by a SQLite file
pub struct SqliteSampleStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

/// Undecoded sample row
struct RawSample {
    id: i64,
    value: f64,
    unit: String,
    start_time: i64,
    end_time: i64,
    source_name: String,
    bundle_id: String,
    device: Option<String>,
    metadata: Option<String>,
}

impl SqliteSampleStore {
    /// Open an existing store read-only
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the file does not exist, cannot
    /// be opened, or lacks the samples table.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(path, e))?;

        let has_samples: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'samples'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| unavailable(path, e))?;

        if has_samples.is_none() {
            return Err(StoreError::Unavailable(format!(
                "{} has no samples table",
                path.display()
            ))
            .into());
        }

        tracing::info!(path = %path.display(), "Opened SQLite sample store (read-only)");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    /// Open or create a store read-write, creating the schema if needed
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(path, e))?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append samples in one transaction, registering their sources
    ///
    /// Fails on a read-only store.
    pub fn insert_samples(&self, samples: &[Sample]) -> Result<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
        let tx = conn.transaction()?;

        {
            let mut upsert_source = tx.prepare_cached(
                "INSERT INTO sources (name, bundle_id) VALUES (?1, ?2)
                 ON CONFLICT(bundle_id) DO UPDATE SET name = excluded.name",
            )?;
            let mut source_id =
                tx.prepare_cached("SELECT id FROM sources WHERE bundle_id = ?1")?;
            let mut insert_sample = tx.prepare_cached(
                "INSERT INTO samples
                    (kind, value, unit, start_time, end_time, source_id, device, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for sample in samples {
                upsert_source.execute(params![
                    sample.source.name,
                    sample.source.bundle_id.as_str()
                ])?;
                let id: i64 = source_id
                    .query_row(params![sample.source.bundle_id.as_str()], |row| row.get(0))?;
                let metadata = sample
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;

                insert_sample.execute(params![
                    sample.kind.as_str(),
                    sample.quantity.value,
                    sample.quantity.unit.symbol(),
                    sample.start_time.timestamp_micros(),
                    sample.end_time.timestamp_micros(),
                    id,
                    sample.device,
                    metadata,
                ])?;
            }
        }

        tx.commit()?;
        Ok(samples.len())
    }

    /// Run `f` against the connection on the blocking thread pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> std::result::Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
            f(&*conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("query task failed: {e}")))?;

        result.map_err(PulseError::from)
    }
}

fn unavailable(path: &Path, err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(format!("{}: {}", path.display(), err))
}

/// Build the WHERE clause and its parameters for a kind and predicate
fn where_clause(kind: SampleKind, predicate: &SamplePredicate) -> (String, Vec<Value>) {
    let mut sql = String::from("x.kind = ?");
    let mut values = vec![Value::Text(kind.as_str().to_string())];

    for clause in predicate.clauses() {
        match clause {
            Clause::EndTimeIn(range) => {
                sql.push_str(" AND x.end_time >= ? AND x.end_time < ?");
                values.push(Value::Integer(range.start.timestamp_micros()));
                values.push(Value::Integer(range.end.timestamp_micros()));
            }
            Clause::FromSource(bundle_id) => {
                sql.push_str(" AND s.bundle_id = ?");
                values.push(Value::Text(bundle_id.as_str().to_string()));
            }
        }
    }

    (sql, values)
}

fn decode(kind: SampleKind, raw: RawSample) -> std::result::Result<Sample, StoreError> {
    let corrupt = |reason: String| StoreError::CorruptRecord {
        id: raw.id.to_string(),
        reason,
    };

    let unit = Unit::from_str(&raw.unit).map_err(&corrupt)?;
    let start_time = DateTime::<Utc>::from_timestamp_micros(raw.start_time)
        .ok_or_else(|| corrupt(format!("start_time {} out of range", raw.start_time)))?;
    let end_time = DateTime::<Utc>::from_timestamp_micros(raw.end_time)
        .ok_or_else(|| corrupt(format!("end_time {} out of range", raw.end_time)))?;
    let bundle_id = BundleId::new(raw.bundle_id.as_str()).map_err(&corrupt)?;
    let metadata = raw
        .metadata
        .as_deref()
        .map(serde_json::from_str::<Metadata>)
        .transpose()
        .map_err(|e| corrupt(format!("metadata: {e}")))?;

    let mut builder = Sample::builder()
        .kind(kind)
        .quantity(Quantity::new(raw.value, unit))
        .start_time(start_time)
        .end_time(end_time)
        .source(Source::new(raw.source_name.as_str(), bundle_id));
    if let Some(device) = raw.device.as_deref() {
        builder = builder.device(device);
    }
    if let Some(metadata) = metadata {
        builder = builder.metadata(metadata);
    }

    builder.build().map_err(corrupt)
}

#[async_trait]
impl SampleStore for SqliteSampleStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn sources_for_kind(&self, kind: SampleKind) -> Result<Vec<Source>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT DISTINCT s.name, s.bundle_id
                 FROM samples x JOIN sources s ON s.id = x.source_id
                 WHERE x.kind = ?1
                 ORDER BY s.name, s.bundle_id",
            )?;
            let rows = stmt.query_map(params![kind.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut sources = Vec::new();
            for row in rows {
                let (name, bundle) = row?;
                let bundle_id = BundleId::new(bundle.as_str()).map_err(|reason| {
                    StoreError::CorruptRecord {
                        id: format!("source {bundle:?}"),
                        reason,
                    }
                })?;
                sources.push(Source::new(name, bundle_id));
            }
            Ok(sources)
        })
        .await
    }

    async fn query(&self, kind: SampleKind, query: &SampleQuery) -> Result<Vec<Sample>> {
        let (filter, mut values) = where_clause(kind, &query.predicate);
        let order = match query.sort {
            SortOrder::EndTimeAscending => "x.end_time ASC, x.id ASC",
            SortOrder::EndTimeDescending => "x.end_time DESC, x.id DESC",
        };
        let limit = match query.limit {
            QueryLimit::Unbounded => -1,
            QueryLimit::At(n) => i64::try_from(n).unwrap_or(i64::MAX),
        };
        values.push(Value::Integer(limit));
        values.push(Value::Integer(
            i64::try_from(query.offset).unwrap_or(i64::MAX),
        ));

        let sql = format!(
            "SELECT x.id, x.value, x.unit, x.start_time, x.end_time,
                    s.name, s.bundle_id, x.device, x.metadata
             FROM samples x JOIN sources s ON s.id = x.source_id
             WHERE {filter}
             ORDER BY {order}
             LIMIT ? OFFSET ?"
        );

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), |row| {
                Ok(RawSample {
                    id: row.get(0)?,
                    value: row.get(1)?,
                    unit: row.get(2)?,
                    start_time: row.get(3)?,
                    end_time: row.get(4)?,
                    source_name: row.get(5)?,
                    bundle_id: row.get(6)?,
                    device: row.get(7)?,
                    metadata: row.get(8)?,
                })
            })?;

            let mut samples = Vec::new();
            for row in rows {
                samples.push(decode(kind, row?)?);
            }
            Ok(samples)
        })
        .await
    }

    async fn count(&self, kind: SampleKind, predicate: &SamplePredicate) -> Result<u64> {
        let (filter, values) = where_clause(kind, predicate);
        let sql = format!(
            "SELECT COUNT(*) FROM samples x JOIN sources s ON s.id = x.source_id WHERE {filter}"
        );

        self.with_conn(move |conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }
}
