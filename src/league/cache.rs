use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;
use tracing::{info, warn};

use super::source::{fetch_with_retry, LeagueSource, RetryPolicy};
use super::LeagueTable;
use crate::db::Database;

const STANDINGS: &str = "standings";
const RESULTS: &str = "results";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CachedTable {
    pub table: LeagueTable,
    /// `None` until the table has been scraped at least once.
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CachedSnapshot {
    pub standings: CachedTable,
    pub results: CachedTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub standings_updated: bool,
    pub results_updated: bool,
}

/// Most recently scraped league tables, kept in memory and in SQLite.
pub struct LeagueCache {
    db: Database,
    snapshot: RwLock<CachedSnapshot>,
    /// One scrape at a time.
    refreshing: tokio::sync::Mutex<()>,
}

impl LeagueCache {
    /// Load whatever was stored by earlier runs.
    pub fn load(db: Database) -> Result<Self> {
        let mut snapshot = CachedSnapshot::default();
        for (name, slot) in [
            (STANDINGS, &mut snapshot.standings),
            (RESULTS, &mut snapshot.results),
        ] {
            if let Some((table, fetched_at)) = db.load_league_table(name)? {
                info!(
                    "Loaded cached league {} ({} rows, fetched {})",
                    name,
                    table.rows.len(),
                    fetched_at
                );
                *slot = CachedTable {
                    table,
                    fetched_at: Some(fetched_at),
                };
            }
        }

        Ok(LeagueCache {
            db,
            snapshot: RwLock::new(snapshot),
            refreshing: tokio::sync::Mutex::new(()),
        })
    }

    pub fn snapshot(&self) -> CachedSnapshot {
        self.snapshot
            .read()
            .map(|s| s.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Scrape and replace whichever tables the page provided. On failure the
    /// previous snapshot is kept and the error returned.
    pub async fn refresh(
        &self,
        source: &dyn LeagueSource,
        policy: RetryPolicy,
    ) -> Result<RefreshSummary> {
        let _guard = self.refreshing.lock().await;

        let fetched = match fetch_with_retry(source, policy).await {
            Ok(s) => s,
            Err(e) => {
                warn!("League refresh failed, keeping previous snapshot: {}", e);
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let mut summary = RefreshSummary {
            standings_updated: false,
            results_updated: false,
        };
        let mut updated = self.snapshot();

        let mut changed: Vec<(&str, &LeagueTable)> = Vec::new();
        match &fetched.standings {
            Some(table) => changed.push((STANDINGS, table)),
            None => warn!("League page had no standings table; keeping cached copy"),
        }
        match &fetched.results {
            Some(table) => changed.push((RESULTS, table)),
            None => warn!("League page had no results table; keeping cached copy"),
        }
        if !changed.is_empty() {
            self.db.save_league_tables(&changed, now)?;
        }

        if let Some(table) = fetched.standings {
            updated.standings = CachedTable {
                table,
                fetched_at: Some(now),
            };
            summary.standings_updated = true;
        }
        if let Some(table) = fetched.results {
            updated.results = CachedTable {
                table,
                fetched_at: Some(now),
            };
            summary.results_updated = true;
        }

        match self.snapshot.write() {
            Ok(mut s) => *s = updated,
            Err(e) => *e.into_inner() = updated,
        }
        info!(
            "League snapshot refreshed (standings={}, results={})",
            summary.standings_updated, summary.results_updated
        );
        Ok(summary)
    }
}
