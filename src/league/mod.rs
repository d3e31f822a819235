pub mod cache;
pub mod display;
pub mod source;
pub mod spawtz;

pub use cache::{CachedSnapshot, LeagueCache, RefreshSummary};
pub use display::{results_view, standings_view, DisplayOptions, DisplayTable};
pub use source::{LeagueSource, RetryPolicy, ScrapeError};
pub use spawtz::SpawtzLeague;

use serde::{Deserialize, Serialize};

/// Columns of the scraped results table.
pub const RESULTS_HEADERS: [&str; 6] = ["Date", "Time", "Pitch", "Home Team", "Score", "Away Team"];

/// Opaque scraped table: header names plus rows of text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LeagueTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        LeagueTable { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Remove the named columns if present.
    pub fn without_columns(&self, names: &[&str]) -> LeagueTable {
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| !names.contains(&self.headers[i].as_str()))
            .collect();
        LeagueTable {
            headers: keep.iter().map(|&i| self.headers[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    keep.iter()
                        .map(|&i| row.get(i).cloned().unwrap_or_default())
                        .collect()
                })
                .collect(),
        }
    }
}

/// One fetch of the league page. A table missing from the page is `None`
/// and leaves the cached copy of that table untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeagueSnapshot {
    pub standings: Option<LeagueTable>,
    pub results: Option<LeagueTable>,
}
