//! SQLite storage for generated forecasts, deduplicated by a content fingerprint.
//!
//! A forecast is identified by the bulletin it was generated from: its issuance time and
//! full text. Storing the same bulletin again, even with different predictions, is a
//! no-op reported as [`StoreOutcome::AlreadyStored`]. Rows are never updated.

use crate::store::error::StoreError;
use crate::types::forecast::{NewForecast, StoredForecast};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

const SELECT_COLUMNS: &str = "id, fingerprint, issued_at, generated_at, source_text, parameters, predictions, notes";

/// Fingerprint of a forecast: hex SHA-256 over the issuance instant (UTC, RFC 3339,
/// whole seconds), a NUL separator and the source text.
///
/// Generated predictions are not part of it, and neither is the offset `issued_at` was
/// written in.
///
/// ```
/// use buoy_wind::forecast_fingerprint;
/// use chrono::DateTime;
///
/// let pacific = DateTime::parse_from_rfc3339("2024-06-01T03:15:00-07:00").unwrap();
/// let utc = DateTime::parse_from_rfc3339("2024-06-01T10:15:00Z").unwrap();
/// assert_eq!(forecast_fingerprint(&pacific, "W wind 10 kt"), forecast_fingerprint(&utc, "W wind 10 kt"));
/// ```
pub fn forecast_fingerprint(issued_at: &DateTime<FixedOffset>, source_text: &str) -> String {
    let issued = issued_at
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut hasher = Sha256::new();
    hasher.update(issued.as_bytes());
    hasher.update([0u8]);
    hasher.update(source_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Result of [`ForecastStore::store`]. Both variants are successes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted { id: i64, fingerprint: String },
    /// A row with this fingerprint existed already; nothing was written.
    AlreadyStored { id: i64, fingerprint: String },
}

impl StoreOutcome {
    pub fn id(&self) -> i64 {
        match self {
            StoreOutcome::Inserted { id, .. } | StoreOutcome::AlreadyStored { id, .. } => *id,
        }
    }

    pub fn fingerprint(&self) -> &str {
        match self {
            StoreOutcome::Inserted { fingerprint, .. }
            | StoreOutcome::AlreadyStored { fingerprint, .. } => fingerprint,
        }
    }

    pub fn was_inserted(&self) -> bool {
        matches!(self, StoreOutcome::Inserted { .. })
    }
}

/// Durable forecast store over one SQLite connection.
///
/// Cloning is cheap and clones share the connection. Queries run on the blocking pool.
#[derive(Clone)]
pub struct ForecastStore {
    conn: Arc<Mutex<Connection>>,
}

impl ForecastStore {
    /// Opens (or creates) the database at `path` and its schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StoreError::Open(path.to_path_buf(), e))?;
        info!("Opened forecast store at {}", path.display());
        Self::with_connection(conn)
    }

    /// A store that lives only as long as the value.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Stores `forecast` unless a forecast with the same fingerprint exists.
    ///
    /// Safe to call repeatedly for the same forecast, including concurrently from several
    /// stores on one database file: the `UNIQUE` fingerprint column decides the race and
    /// the loser reports [`StoreOutcome::AlreadyStored`].
    pub async fn store(&self, forecast: &NewForecast) -> Result<StoreOutcome, StoreError> {
        let forecast = forecast.clone();
        self.run(move |conn| store_forecast(conn, &forecast)).await
    }

    /// The `limit` most recently generated forecasts, newest first.
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<StoredForecast>, StoreError> {
        self.run(move |conn| list_recent(conn, limit)).await
    }

    /// The forecast stored under `fingerprint`, if any.
    ///
    /// Pair it with [`forecast_fingerprint`] to look a bulletin up before generating
    /// predictions for it again:
    ///
    /// ```no_run
    /// # use buoy_wind::{forecast_fingerprint, ForecastStore, StoreError};
    /// # use chrono::DateTime;
    /// # async fn run(store: ForecastStore) -> Result<(), StoreError> {
    /// let issued_at = DateTime::parse_from_rfc3339("2024-06-01T03:15:00-07:00").unwrap();
    /// let fingerprint = forecast_fingerprint(&issued_at, "W winds 10 to 15 kt");
    /// if let Some(existing) = store.get_by_fingerprint(&fingerprint).await? {
    ///     println!("already generated at {}", existing.generated_at);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<StoredForecast>, StoreError> {
        let fingerprint = fingerprint.to_owned();
        self.run(move |conn| get_by_fingerprint(conn, &fingerprint))
            .await
    }

    /// Number of stored forecasts.
    pub async fn count(&self) -> Result<usize, StoreError> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM forecasts", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }

    async fn run<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        R: Send + 'static,
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock())).await?
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS forecasts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fingerprint TEXT NOT NULL UNIQUE,
            issued_at TEXT NOT NULL,
            generated_at TEXT NOT NULL,
            source_text TEXT NOT NULL,
            parameters TEXT NOT NULL DEFAULT '{}',
            predictions TEXT NOT NULL DEFAULT '{}',
            notes TEXT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_forecasts_generated_at ON forecasts(generated_at DESC);
        "#,
    )?;
    Ok(())
}

fn store_forecast(conn: &Connection, forecast: &NewForecast) -> Result<StoreOutcome, StoreError> {
    let fingerprint = forecast_fingerprint(&forecast.issued_at, &forecast.source_text);
    if let Some(id) = find_id(conn, &fingerprint)? {
        info!("Forecast {} already stored as #{}", fingerprint, id);
        return Ok(StoreOutcome::AlreadyStored { id, fingerprint });
    }
    insert_row(conn, forecast, fingerprint)
}

/// Inserts without the existence check; a conflicting row turns into `AlreadyStored`.
fn insert_row(
    conn: &Connection,
    forecast: &NewForecast,
    fingerprint: String,
) -> Result<StoreOutcome, StoreError> {
    let parameters = serde_json::to_string(&forecast.parameters)?;
    let predictions = serde_json::to_string(&forecast.predictions)?;
    let changed = conn.execute(
        "INSERT INTO forecasts (fingerprint, issued_at, generated_at, source_text, parameters, predictions, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(fingerprint) DO NOTHING",
        params![
            fingerprint,
            forecast.issued_at.to_rfc3339(),
            format_generated_at(&forecast.generated_at),
            forecast.source_text,
            parameters,
            predictions,
            forecast.notes,
        ],
    )?;

    if changed == 0 {
        let id: i64 = conn.query_row(
            "SELECT id FROM forecasts WHERE fingerprint = ?1",
            params![fingerprint],
            |row| row.get(0),
        )?;
        info!("Forecast {} was stored concurrently as #{}", fingerprint, id);
        return Ok(StoreOutcome::AlreadyStored { id, fingerprint });
    }

    let id = conn.last_insert_rowid();
    debug!("Stored forecast {} as #{}", fingerprint, id);
    Ok(StoreOutcome::Inserted { id, fingerprint })
}

fn find_id(conn: &Connection, fingerprint: &str) -> Result<Option<i64>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id FROM forecasts WHERE fingerprint = ?1",
            params![fingerprint],
            |row| row.get(0),
        )
        .optional()?)
}

fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<StoredForecast>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM forecasts ORDER BY generated_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], StoredRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(StoredForecast::try_from).collect()
}

fn get_by_fingerprint(
    conn: &Connection,
    fingerprint: &str,
) -> Result<Option<StoredForecast>, StoreError> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM forecasts WHERE fingerprint = ?1"),
        params![fingerprint],
        StoredRow::from_row,
    )
    .optional()?
    .map(StoredForecast::try_from)
    .transpose()
}

/// Fixed-width UTC text, so the column sorts chronologically.
fn format_generated_at(generated_at: &DateTime<Utc>) -> String {
    generated_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A row as SQLite returns it, before the text columns are decoded.
struct StoredRow {
    id: i64,
    fingerprint: String,
    issued_at: String,
    generated_at: String,
    source_text: String,
    parameters: String,
    predictions: String,
    notes: Option<String>,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            fingerprint: row.get(1)?,
            issued_at: row.get(2)?,
            generated_at: row.get(3)?,
            source_text: row.get(4)?,
            parameters: row.get(5)?,
            predictions: row.get(6)?,
            notes: row.get(7)?,
        })
    }
}

impl TryFrom<StoredRow> for StoredForecast {
    type Error = StoreError;

    fn try_from(row: StoredRow) -> Result<Self, Self::Error> {
        let parse = |column: &'static str, value: &str| {
            DateTime::parse_from_rfc3339(value).map_err(|source| StoreError::InvalidTimestamp {
                column,
                value: value.to_owned(),
                source,
            })
        };
        Ok(StoredForecast {
            id: row.id,
            issued_at: parse("issued_at", &row.issued_at)?,
            generated_at: parse("generated_at", &row.generated_at)?.with_timezone(&Utc),
            parameters: serde_json::from_str(&row.parameters)?,
            predictions: serde_json::from_str(&row.predictions)?,
            fingerprint: row.fingerprint,
            source_text: row.source_text,
            notes: row.notes,
        })
    }
}
