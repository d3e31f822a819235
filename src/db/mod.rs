use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::league::LeagueTable;

/// Thread-safe SQLite connection (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    // ── League tables ────────────────────────────────────────────────────────

    /// Replace the stored copies of scraped tables in one transaction:
    /// either every table is written or none is.
    pub fn save_league_tables(
        &self,
        tables: &[(&str, &LeagueTable)],
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("begin league save transaction")?;
        for (name, table) in tables {
            let headers = serde_json::to_string(&table.headers)?;
            let rows = serde_json::to_string(&table.rows)?;
            tx.execute(
                "INSERT INTO league_tables (name, headers, rows, fetched_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(name) DO UPDATE SET
                    headers=excluded.headers,
                    rows=excluded.rows,
                    fetched_at=excluded.fetched_at",
                params![name, headers, rows, fetched_at],
            )
            .with_context(|| format!("Failed to save league table {}", name))?;
        }
        tx.commit().context("commit league save transaction")?;
        Ok(())
    }

    /// Load a stored table and when it was fetched
    pub fn load_league_table(&self, name: &str) -> Result<Option<(LeagueTable, DateTime<Utc>)>> {
        let conn = self.conn()?;
        let row: Option<(String, String, DateTime<Utc>)> = conn
            .query_row(
                "SELECT headers, rows, fetched_at FROM league_tables WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((headers, rows, fetched_at)) => {
                let table = LeagueTable {
                    headers: serde_json::from_str(&headers)
                        .with_context(|| format!("Corrupt headers for league table {}", name))?,
                    rows: serde_json::from_str(&rows)
                        .with_context(|| format!("Corrupt rows for league table {}", name))?,
                };
                Ok(Some((table, fetched_at)))
            }
            None => Ok(None),
        }
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS league_tables (
    name        TEXT    PRIMARY KEY,
    headers     TEXT    NOT NULL,
    rows        TEXT    NOT NULL,
    fetched_at  TEXT    NOT NULL
);
"#;
