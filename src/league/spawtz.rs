//! Scraper for Spawtz-hosted league pages (standings + fixtures/results on
//! one page).

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

use super::source::{LeagueSource, ScrapeError};
use super::{LeagueSnapshot, LeagueTable, RESULTS_HEADERS};

/// The site serves an empty shell to unknown agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Standings cells kept per row: the first (position badge) is dropped.
const STANDINGS_FIRST_CELL: usize = 1;
const STANDINGS_LAST_CELL: usize = 13;

pub struct SpawtzLeague {
    http: Client,
    url: String,
}

impl SpawtzLeague {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SpawtzLeague {
            http,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl LeagueSource for SpawtzLeague {
    fn name(&self) -> &str {
        "Spawtz"
    }

    async fn fetch_league_snapshot(&self) -> Result<LeagueSnapshot, ScrapeError> {
        debug!("Fetching league page {}", self.url);

        let resp = self.http.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(ScrapeError::Status(resp.status()));
        }
        let html = resp.text().await?;

        let snapshot = parse_page(&html);
        info!(
            "Scraped league page: standings={} rows, results={} rows",
            snapshot.standings.as_ref().map_or(0, |t| t.rows.len()),
            snapshot.results.as_ref().map_or(0, |t| t.rows.len()),
        );
        Ok(snapshot)
    }
}

pub fn parse_page(html: &str) -> LeagueSnapshot {
    let document = Html::parse_document(html);
    LeagueSnapshot {
        standings: parse_standings(&document),
        results: parse_results(&document),
    }
}

fn parse_standings(document: &Html) -> Option<LeagueTable> {
    let table_sel = Selector::parse("table.STTable").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;
    let head_sel = Selector::parse("th").ok()?;

    let table = document.select(&table_sel).next()?;
    let mut rows = table.select(&row_sel);

    let header_row = rows.next()?;
    let mut header_cells: Vec<String> = header_row.select(&cell_sel).map(cell_text).collect();
    if header_cells.is_empty() {
        header_cells = header_row.select(&head_sel).map(cell_text).collect();
    }
    let headers = standings_slice(header_cells);

    let mut body = Vec::new();
    for row in rows {
        let cells = standings_slice(row.select(&cell_sel).map(cell_text).collect());
        if cells.is_empty() {
            continue;
        }
        body.push(fit_to(cells, headers.len()));
    }

    let mut standings = LeagueTable::new(headers, body);
    if let Some(pts) = standings.column("Pts") {
        for row in &mut standings.rows {
            row[pts] = leading_integer(&row[pts]).to_string();
        }
    }
    Some(standings)
}

fn parse_results(document: &Html) -> Option<LeagueTable> {
    let table_sel = Selector::parse("table.FTable").ok()?;
    let row_sel = Selector::parse("tr").ok()?;
    let cell_sel = Selector::parse("td").ok()?;

    let mut tables = document.select(&table_sel).peekable();
    tables.peek()?;

    let mut body = Vec::new();
    for table in tables {
        let mut match_date = String::new();
        for row in table.select(&row_sel) {
            if row.value().classes().any(|c| c == "FHeader") {
                match_date = cell_text(row);
            }
            let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
            if cells.len() == 5 {
                let mut line = Vec::with_capacity(6);
                line.push(match_date.clone());
                line.extend(cells);
                line[4] = line[4].replace("LIVE", "").trim().to_string();
                body.push(line);
            }
        }
    }

    Some(LeagueTable::new(
        RESULTS_HEADERS.iter().map(|h| h.to_string()).collect(),
        body,
    ))
}

fn cell_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn standings_slice(cells: Vec<String>) -> Vec<String> {
    cells
        .into_iter()
        .skip(STANDINGS_FIRST_CELL)
        .take(STANDINGS_LAST_CELL - STANDINGS_FIRST_CELL)
        .collect()
}

fn fit_to(mut cells: Vec<String>, width: usize) -> Vec<String> {
    cells.resize(width, String::new());
    cells
}

/// First run of digits in `s`, or 0.
fn leading_integer(s: &str) -> u64 {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}
