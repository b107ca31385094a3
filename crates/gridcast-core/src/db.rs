// SQLite persistence layer for weekly projections.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::position::PlayerId;
use crate::projection::{ProjectionRecord, WeeklyProjectionRecord};
use crate::waivers::WeeklyProjection;

/// SQLite-backed store of projection records keyed by
/// `(player_id, week, source)`.
pub struct ProjectionStore {
    conn: Mutex<Connection>,
}

const UPSERT_SQL: &str = "
    INSERT INTO projections (player_id, week, source, projected_points, variance, data, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(player_id, week, source) DO UPDATE SET
        projected_points = excluded.projected_points,
        variance         = excluded.variance,
        data             = excluded.data,
        updated_at       = excluded.updated_at";

const SELECT_COLUMNS: &str =
    "SELECT player_id, week, source, projected_points, variance, data FROM projections";

impl ProjectionStore {
    /// Open (or create) a SQLite database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS projections (
                player_id        INTEGER NOT NULL,
                week             INTEGER NOT NULL,
                source           TEXT NOT NULL,
                projected_points REAL NOT NULL,
                variance         REAL NOT NULL,
                data             TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                PRIMARY KEY (player_id, week, source)
            );

            CREATE INDEX IF NOT EXISTS idx_projections_week_source
                ON projections(week, source);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("projection store mutex poisoned"))
    }

    /// Insert or replace one record. `updated_at` is set to now.
    pub fn upsert(&self, record: &WeeklyProjectionRecord) -> Result<()> {
        let conn = self.conn()?;
        let data = serde_json::to_string(&record.projection.categories)
            .context("failed to serialize projection categories")?;
        conn.execute(
            UPSERT_SQL,
            params![
                record.player_id.0,
                record.week,
                record.source,
                record.projection.projected_points,
                record.projection.variance,
                data,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("failed to upsert projection")?;
        Ok(())
    }

    /// Upsert a batch of records in a single transaction. Returns the number
    /// written.
    pub fn save_week(&self, records: &[WeeklyProjectionRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("failed to begin save transaction")?;
        let now = Utc::now().to_rfc3339();

        {
            let mut stmt = tx
                .prepare(UPSERT_SQL)
                .context("failed to prepare projection upsert")?;
            for record in records {
                let data = serde_json::to_string(&record.projection.categories)
                    .context("failed to serialize projection categories")?;
                stmt.execute(params![
                    record.player_id.0,
                    record.week,
                    record.source,
                    record.projection.projected_points,
                    record.projection.variance,
                    data,
                    now,
                ])
                .with_context(|| {
                    format!("failed to save projection for player {}", record.player_id)
                })?;
            }
        }

        tx.commit().context("failed to commit projections")?;
        Ok(records.len())
    }

    /// All records for one week and source, ordered by player id.
    pub fn load_week(&self, week: u32, source: &str) -> Result<Vec<WeeklyProjectionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "{SELECT_COLUMNS} WHERE week = ?1 AND source = ?2 ORDER BY player_id"
            ))
            .context("failed to prepare load_week query")?;

        let rows = stmt
            .query_map(params![week, source], raw_row)
            .context("failed to query projections")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map projection rows")?;

        rows.into_iter().map(RawRecord::into_record).collect()
    }

    /// One record, or `None` when nothing is stored for the key.
    pub fn get(
        &self,
        player_id: PlayerId,
        week: u32,
        source: &str,
    ) -> Result<Option<WeeklyProjectionRecord>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE player_id = ?1 AND week = ?2 AND source = ?3"),
                params![player_id.0, week, source],
                raw_row,
            )
            .optional()
            .context("failed to query projection")?;

        raw.map(RawRecord::into_record).transpose()
    }

    /// Point values only, in the shape the lineup and waiver engines take.
    pub fn weekly_points(&self, week: u32, source: &str) -> Result<Vec<WeeklyProjection>> {
        Ok(self
            .load_week(week, source)?
            .into_iter()
            .map(|r| WeeklyProjection::new(r.player_id, r.week, r.projection.projected_points))
            .collect())
    }

    /// Most recent write time for a week and source.
    pub fn last_updated(&self, week: u32, source: &str) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let ts: Option<String> = conn
            .query_row(
                "SELECT MAX(updated_at) FROM projections WHERE week = ?1 AND source = ?2",
                params![week, source],
                |row| row.get(0),
            )
            .context("failed to query last update time")?;

        ts.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("invalid updated_at timestamp '{s}'"))
        })
        .transpose()
    }
}

/// Row as read from SQLite, before the JSON column is decoded.
struct RawRecord {
    player_id: u64,
    week: u32,
    source: String,
    projected_points: f64,
    variance: f64,
    data: String,
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        player_id: row.get(0)?,
        week: row.get(1)?,
        source: row.get(2)?,
        projected_points: row.get(3)?,
        variance: row.get(4)?,
        data: row.get(5)?,
    })
}

impl RawRecord {
    fn into_record(self) -> Result<WeeklyProjectionRecord> {
        let categories: BTreeMap<String, f64> = serde_json::from_str(&self.data)
            .with_context(|| {
                format!("failed to decode categories for player {}", self.player_id)
            })?;
        Ok(WeeklyProjectionRecord {
            player_id: PlayerId(self.player_id),
            week: self.week,
            source: self.source,
            projection: ProjectionRecord {
                categories,
                projected_points: self.projected_points,
                variance: self.variance,
            },
        })
    }
}
