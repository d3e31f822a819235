use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::auth::{basic_credentials, Authenticator, Role};
use crate::league::{
    results_view, standings_view, CachedSnapshot, DisplayOptions, DisplayTable, LeagueCache,
    LeagueSource, RefreshSummary, RetryPolicy, ScrapeError,
};
use crate::records::{Loaded, MatchSubmission, RecordStore, Squad, StoreError};
use crate::stats::{leaderboard, team, Leaderboard, PlayerAggregator, StatField, TeamMetrics};

pub const EMPTY_NOTICE: &str = "No data found. Please add match results first.";

#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub league: Arc<LeagueCache>,
    pub source: Arc<dyn LeagueSource>,
    pub auth: Arc<dyn Authenticator>,
    pub retry: RetryPolicy,
    pub display: DisplayOptions,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/squad", get(squad_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/players", get(players_handler))
        .route("/api/matches", get(matches_handler).post(create_match_handler))
        .route("/api/league", get(league_handler))
        .route("/api/league/refresh", post(refresh_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "valid credentials required")
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        error!("Dashboard request failed: {}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            other => ApiError::internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        let mut response = (self.status, body).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="squad-dashboard""#),
            );
        }
        response
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<Role, ApiError> {
    let (role, password) = basic_credentials(headers).ok_or_else(ApiError::unauthorized)?;
    state.auth.authenticate(&role, &password).ok_or_else(|| {
        warn!("Rejected write attempt for role '{}'", role);
        ApiError::unauthorized()
    })
}

// ── Pure views ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderEntry {
    pub stat: &'static str,
    pub title: &'static str,
    pub leaders: Leaderboard,
    /// Names joined for display, or "N/A".
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub notice: Option<&'static str>,
    pub team: TeamMetrics,
    pub leaders: Vec<LeaderEntry>,
    pub skipped_rows: usize,
    pub skipped_entries: usize,
}

pub fn summarize(loaded: &Loaded, squad: &Squad) -> Summary {
    let players = PlayerAggregator::new(squad).aggregate(&loaded.records);
    let leaders = StatField::ALL
        .iter()
        .map(|&field| {
            let board = leaderboard(&players, field);
            LeaderEntry {
                stat: field.key(),
                title: field.title(),
                text: board.to_string(),
                leaders: board,
            }
        })
        .collect();

    Summary {
        notice: loaded.records.is_empty().then_some(EMPTY_NOTICE),
        team: team::aggregate(&loaded.records),
        leaders,
        skipped_rows: loaded.report.rows_skipped,
        skipped_entries: loaded.report.entries_skipped,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueView {
    pub standings: DisplayTable,
    pub results: DisplayTable,
    pub standings_fetched_at: Option<DateTime<Utc>>,
    pub results_fetched_at: Option<DateTime<Utc>>,
}

pub fn league_view(snapshot: &CachedSnapshot, opts: &DisplayOptions) -> LeagueView {
    LeagueView {
        standings: standings_view(&snapshot.standings.table, opts),
        results: results_view(&snapshot.results.table, opts),
        standings_fetched_at: snapshot.standings.fetched_at,
        results_fetched_at: snapshot.results.fetched_at,
    }
}

#[derive(Serialize)]
struct SquadView {
    players: Vec<String>,
    max_per_match: usize,
}

#[derive(Serialize)]
struct RefreshResponse {
    refreshed: RefreshSummary,
    league: LeagueView,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// Serve the dashboard HTML page, injecting the team name.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = DASHBOARD_HTML.replace(
        r#"<body>"#,
        &format!(r#"<body data-team="{}">"#, escape_attr(&state.display.team_name)),
    );
    Html(html)
}

/// GET /api/squad
async fn squad_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let squad = state.store.squad();
    Json(SquadView {
        players: squad.players().to_vec(),
        max_per_match: squad.max_per_match(),
    })
}

/// GET /api/summary
async fn summary_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let loaded = state.store.load_with_report()?;
    Ok(Json(summarize(&loaded, state.store.squad())))
}

/// GET /api/players
async fn players_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let records = state.store.load_all()?;
    let table = PlayerAggregator::new(state.store.squad()).aggregate(&records);
    Ok(Json(table.sorted_for_display()))
}

/// GET /api/matches
async fn matches_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.load_all()?))
}

/// POST /api/matches
async fn create_match_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<MatchSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let role = authorize(&state, &headers)?;
    let Json(submission) =
        payload.map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;

    let record = submission.into_record(state.store.squad()).map_err(|e| {
        info!("Refused match submission ({}): {}", e.reason(), e);
        ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;

    state.store.append(record.clone())?;
    info!(
        "{} recorded {} vs {} ({}-{})",
        role.0, record.date, record.opposition, record.goals_scored, record.goals_conceded
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/league
async fn league_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(league_view(&state.league.snapshot(), &state.display))
}

/// POST /api/league/refresh
async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    match state.league.refresh(state.source.as_ref(), state.retry).await {
        Ok(refreshed) => Ok(Json(RefreshResponse {
            refreshed,
            league: league_view(&state.league.snapshot(), &state.display),
        })),
        Err(e) if e.downcast_ref::<ScrapeError>().is_some() => Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            format!("Could not refresh league data from {}: {}", state.source.name(), e),
        )),
        Err(e) => Err(ApiError::internal(e)),
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Squad Dashboard</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --accent: #6c63ff;
    --green: #00c896;
    --red: #ff4f6a;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  nav { display: flex; gap: .5rem; margin-left: auto; }
  nav button { background: none; border: 1px solid var(--border); color: var(--muted); padding: .35rem .9rem; border-radius: 6px; cursor: pointer; }
  nav button.active { border-color: var(--accent); color: var(--accent); }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .tab { display: none; gap: 1.5rem; }
  .tab.active { display: grid; }
  .stats-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 1rem; }
  .stat-card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1.2rem; }
  .stat-card .label { color: var(--muted); font-size: .8rem; text-transform: uppercase; letter-spacing: .06em; margin-bottom: .4rem; }
  .stat-card .value { font-size: 1.5rem; font-weight: 700; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; display: flex; justify-content: space-between; align-items: center; }
  .panel-body { padding: 1rem 1.2rem; display: grid; gap: .8rem; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: left; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .65rem 1rem; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  label { font-size: .8rem; color: var(--muted); display: grid; gap: .25rem; }
  input { background: var(--bg); border: 1px solid var(--border); color: var(--text); padding: .4rem .6rem; border-radius: 6px; }
  input[type=number] { width: 5rem; }
  .row { display: flex; flex-wrap: wrap; gap: 1rem; }
  .players { display: flex; flex-wrap: wrap; gap: .6rem 1.2rem; }
  .players label { display: flex; align-items: center; gap: .4rem; color: var(--text); font-size: .9rem; }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  .notice { padding: .8rem 1.2rem; border-radius: 8px; background: rgba(108,99,255,.15); color: var(--accent); }
  .notice.error { background: rgba(255,79,106,.15); color: var(--red); }
  .notice.ok { background: rgba(0,200,150,.15); color: var(--green); }
  .btn { background: var(--accent); border: none; color: #fff; padding: .5rem 1.2rem; border-radius: 6px; cursor: pointer; font-weight: 600; }
  .refresh-btn { background: none; border: 1px solid var(--border); color: var(--muted); padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  .refresh-btn:hover { border-color: var(--accent); color: var(--accent); }
</style>
</head>
<body>
<header>
  <h1 id="title">⚽ Squad Dashboard</h1>
  <nav>
    <button data-tab="enter" class="active">Enter Match</button>
    <button data-tab="stats">Stats</button>
    <button data-tab="league">League</button>
  </nav>
</header>

<main>
  <div id="message"></div>

  <section class="tab active" id="tab-enter">
    <div class="panel">
      <div class="panel-header">Match Details</div>
      <div class="panel-body">
        <div class="row">
          <label>Date <input type="date" id="f-date"></label>
          <label>Kick-off <input type="time" id="f-time" value="21:00"></label>
          <label>Pitch <input type="text" id="f-pitch"></label>
          <label>Opposition <input type="text" id="f-opposition"></label>
          <label>Goals Scored <input type="number" min="0" id="f-scored" value="0"></label>
          <label>Goals Conceded <input type="number" min="0" id="f-conceded" value="0"></label>
        </div>
        <div>
          <label>Players (<span id="max-players">8</span> max)</label>
          <div class="players" id="f-players"></div>
        </div>
      </div>
    </div>
    <div class="panel">
      <div class="panel-header">Contributions</div>
      <table>
        <thead><tr><th>Player</th><th>Goals</th><th>Assists</th><th>Own Goals</th><th>Blue</th><th>Yellow</th><th>Red</th></tr></thead>
        <tbody id="f-contrib"><tr><td colspan="7" class="empty">Select players above</td></tr></tbody>
      </table>
    </div>
    <div class="panel">
      <div class="panel-body">
        <div class="row">
          <label>Role <input type="text" id="f-role" placeholder="Manager"></label>
          <label>Password <input type="password" id="f-password"></label>
        </div>
        <div><button class="btn" id="submit">Save Match</button></div>
      </div>
    </div>
  </section>

  <section class="tab" id="tab-stats">
    <div class="stats-grid" id="team-grid"></div>
    <div class="panel">
      <div class="panel-header">Leaders</div>
      <table>
        <thead><tr><th>Stat</th><th>Players</th><th>Value</th></tr></thead>
        <tbody id="leaders-tbody"><tr><td colspan="3" class="empty">Loading…</td></tr></tbody>
      </table>
    </div>
    <div class="panel">
      <div class="panel-header">Players</div>
      <table>
        <thead><tr><th>Player</th><th>Apps</th><th>Goals</th><th>Assists</th><th>OG</th><th>Blue</th><th>Yellow</th><th>Red</th><th>Missed</th></tr></thead>
        <tbody id="players-tbody"><tr><td colspan="9" class="empty">Loading…</td></tr></tbody>
      </table>
    </div>
    <div class="panel">
      <div class="panel-header">Match History</div>
      <table>
        <thead><tr><th>Date</th><th>Opposition</th><th>Score</th><th>Scorers</th></tr></thead>
        <tbody id="matches-tbody"><tr><td colspan="4" class="empty">Loading…</td></tr></tbody>
      </table>
    </div>
  </section>

  <section class="tab" id="tab-league">
    <div class="panel">
      <div class="panel-header"><span>Standings <small id="standings-at" style="color:var(--muted)"></small></span>
        <button class="refresh-btn" id="refresh">↻ Refresh</button></div>
      <table><thead id="standings-head"></thead><tbody id="standings-tbody"></tbody></table>
    </div>
    <div class="panel">
      <div class="panel-header"><span>Results <small id="results-at" style="color:var(--muted)"></small></span></div>
      <table><thead id="results-head"></thead><tbody id="results-tbody"></tbody></table>
    </div>
  </section>
</main>

<script>
const esc = s => String(s).replace(/[&<>"]/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));
const $ = id => document.getElementById(id);
const STATS = ['goals','assists','own_goals','blue_cards','yellow_cards','red_cards'];
let squad = { players: [], max_per_match: 8 };

function show(text, kind) {
  $('message').innerHTML = text ? `<div class="notice ${kind || ''}">${esc(text)}</div>` : '';
}

function authHeader() {
  return 'Basic ' + btoa($('f-role').value + ':' + $('f-password').value);
}

async function errorText(r) {
  try { return (await r.json()).error || r.statusText; } catch (_) { return r.statusText; }
}

function tally(t) {
  return Object.entries(t || {}).map(([p, n]) => `${p} (${n})`).join(', ');
}

async function loadSquad() {
  const r = await fetch('/api/squad');
  if (!r.ok) return;
  squad = await r.json();
  $('max-players').textContent = squad.max_per_match;
  $('f-players').innerHTML = squad.players.map(p =>
    `<label><input type="checkbox" value="${esc(p)}"> ${esc(p)}</label>`).join('');
  $('f-players').querySelectorAll('input').forEach(cb => cb.addEventListener('change', renderContrib));
}

function selected() {
  return [...$('f-players').querySelectorAll('input:checked')].map(cb => cb.value);
}

function renderContrib() {
  const players = selected();
  if (!players.length) { $('f-contrib').innerHTML = '<tr><td colspan="7" class="empty">Select players above</td></tr>'; return; }
  $('f-contrib').innerHTML = players.map(p => `<tr data-player="${esc(p)}"><td>${esc(p)}</td>` +
    STATS.map(s => `<td><input type="number" min="0" value="0" data-stat="${s}"></td>`).join('') + '</tr>').join('');
}

async function submitMatch() {
  const contributions = {};
  $('f-contrib').querySelectorAll('tr[data-player]').forEach(tr => {
    const c = {};
    tr.querySelectorAll('input').forEach(i => { c[i.dataset.stat] = Number(i.value) || 0; });
    contributions[tr.dataset.player] = c;
  });
  const body = {
    date: $('f-date').value,
    time: $('f-time').value + ':00',
    pitch: $('f-pitch').value,
    opposition: $('f-opposition').value,
    goals_scored: Number($('f-scored').value) || 0,
    goals_conceded: Number($('f-conceded').value) || 0,
    players: selected(),
    contributions,
  };
  const r = await fetch('/api/matches', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json', 'Authorization': authHeader() },
    body: JSON.stringify(body),
  });
  if (r.status === 201) { show('Match saved.', 'ok'); loadStats(); }
  else show(await errorText(r), 'error');
}

async function loadStats() {
  const [s, p, m] = await Promise.all(['/api/summary', '/api/players', '/api/matches'].map(u => fetch(u)));
  if (s.ok) {
    const summary = await s.json();
    const t = summary.team;
    const cards = [['Games', t.total_games], ['W-D-L', `${t.wins}-${t.draws}-${t.losses}`],
      ['Points', t.total_points], ['Scored', t.total_goals_scored], ['Conceded', t.total_goals_conceded],
      ['Avg Scored', t.avg_scored.toFixed(2)], ['Avg Conceded', t.avg_conceded.toFixed(2)],
      ['Win Rate', t.win_rate.toFixed(2) + '%'], ['Clean Sheets', t.clean_sheets]];
    $('team-grid').innerHTML = cards.map(([l, v]) =>
      `<div class="stat-card"><div class="label">${l}</div><div class="value">${esc(v)}</div></div>`).join('');
    $('leaders-tbody').innerHTML = summary.leaders.map(e =>
      `<tr><td>${esc(e.title)}</td><td>${esc(e.text)}</td><td>${e.leaders.value ?? '–'}</td></tr>`).join('');
    const skipped = summary.skipped_rows + summary.skipped_entries;
    if (summary.notice) show(summary.notice);
    else if (skipped) show(`${skipped} malformed historical entries were skipped.`);
  }
  if (p.ok) {
    const rows = await p.json();
    $('players-tbody').innerHTML = rows.map(r => `<tr><td>${esc(r.player)}</td><td>${r.appearances}</td>
      <td>${r.goals}</td><td>${r.assists}</td><td>${r.own_goals}</td><td>${r.blue_cards}</td>
      <td>${r.yellow_cards}</td><td>${r.red_cards}</td><td>${r.missed_games}</td></tr>`).join('');
  }
  if (m.ok) {
    const matches = await m.json();
    $('matches-tbody').innerHTML = matches.length ? matches.slice().reverse().map(r => `<tr>
      <td>${esc(r.date)}</td><td>${esc(r.opposition)}</td><td>${r.goals_scored}–${r.goals_conceded}</td>
      <td>${esc(tally(r.scorers))}</td></tr>`).join('')
      : '<tr><td colspan="4" class="empty">No matches yet</td></tr>';
  }
}

function renderTable(prefix, table, fetchedAt) {
  $(prefix + '-head').innerHTML = '<tr>' + table.headers.map(h => `<th>${esc(h)}</th>`).join('') + '</tr>';
  $(prefix + '-tbody').innerHTML = table.rows.length
    ? table.rows.map(r => '<tr>' + r.map(c => `<td>${esc(c)}</td>`).join('') + '</tr>').join('')
    : '<tr><td class="empty">Not fetched yet</td></tr>';
  $(prefix + '-at').textContent = fetchedAt ? 'updated ' + new Date(fetchedAt).toLocaleString() : '';
}

function renderLeague(v) {
  renderTable('standings', v.standings, v.standings_fetched_at);
  renderTable('results', v.results, v.results_fetched_at);
}

async function loadLeague() {
  const r = await fetch('/api/league');
  if (r.ok) renderLeague(await r.json());
}

async function refreshLeague() {
  const r = await fetch('/api/league/refresh', { method: 'POST', headers: { 'Authorization': authHeader() } });
  if (r.ok) { renderLeague((await r.json()).league); show('League data refreshed.', 'ok'); }
  else { show(await errorText(r), 'error'); loadLeague(); }
}

document.querySelectorAll('nav button').forEach(b => b.addEventListener('click', () => {
  document.querySelectorAll('nav button').forEach(x => x.classList.toggle('active', x === b));
  document.querySelectorAll('.tab').forEach(t => t.classList.toggle('active', t.id === 'tab-' + b.dataset.tab));
  show('');
  if (b.dataset.tab === 'stats') loadStats();
  if (b.dataset.tab === 'league') loadLeague();
}));

document.addEventListener('DOMContentLoaded', () => {
  const team = document.body.dataset.team;
  if (team) $('title').textContent = '⚽ ' + team;
  $('f-date').value = new Date().toISOString().slice(0, 10);
  $('submit').addEventListener('click', submitMatch);
  $('refresh').addEventListener('click', refreshLeague);
  loadSquad();
});
</script>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCredentials;
    use crate::db::Database;
    use crate::league::source::tests::{policy, snapshot, ScriptedSource};
    use crate::records::tests::{squad, submission};
    use crate::records::store::LoadReport;

    fn state_in(dir: &tempfile::TempDir, source: ScriptedSource) -> Arc<AppState> {
        let store = RecordStore::open(dir.path().join("results.csv"), squad()).unwrap();
        let db = Database::open(dir.path().join("league.db").to_str().unwrap()).unwrap();
        Arc::new(AppState {
            store,
            league: Arc::new(LeagueCache::load(db).unwrap()),
            source: Arc::new(source),
            auth: Arc::new(StaticCredentials::new(vec![(
                "Player".to_string(),
                "p-secret".to_string(),
            )])),
            retry: policy(),
            display: DisplayOptions {
                team_name: "Maradonners".into(),
                promotion_places: 2,
                relegation_from: 9,
            },
        })
    }

    fn player_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        // "Player:p-secret"
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic UGxheWVyOnAtc2VjcmV0"),
        );
        headers
    }

    #[test]
    fn test_summary_of_empty_store() {
        let summary = summarize(&Loaded::default(), &squad());
        assert_eq!(summary.notice, Some(EMPTY_NOTICE));
        assert_eq!(summary.team, TeamMetrics::default());
        assert_eq!(summary.leaders.len(), StatField::ALL.len());
        assert!(summary
            .leaders
            .iter()
            .all(|e| e.leaders == Leaderboard::NoQualifyingPlayer && e.text == "N/A"));
    }

    #[test]
    fn test_summary_reports_leaders_and_skips() {
        let record = submission(4, 1, &[("AJ", 2), ("Bir", 2)])
            .into_record(&squad())
            .unwrap();
        let loaded = Loaded {
            records: vec![record],
            report: LoadReport {
                rows_skipped: 1,
                entries_skipped: 2,
            },
        };
        let summary = summarize(&loaded, &squad());
        assert_eq!(summary.notice, None);
        assert_eq!(summary.team.total_points, 3);
        assert_eq!(summary.skipped_rows, 1);
        assert_eq!(summary.skipped_entries, 2);

        let goals = summary.leaders.iter().find(|e| e.stat == "goals").unwrap();
        assert_eq!(goals.text, "AJ, Bir");
        assert_eq!(
            goals.leaders,
            Leaderboard::Leaders {
                value: 2,
                players: vec!["AJ".into(), "Bir".into()]
            }
        );
    }

    #[test]
    fn test_league_view_before_first_refresh() {
        let opts = DisplayOptions {
            team_name: "Maradonners".into(),
            promotion_places: 2,
            relegation_from: 9,
        };
        let view = league_view(&CachedSnapshot::default(), &opts);
        assert!(view.standings.rows.is_empty());
        assert!(view.standings_fetched_at.is_none());
        assert!(view.results_fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_create_match_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, ScriptedSource::new(vec![]));
        let body = submission(1, 0, &[("AJ", 1)]);

        let err = create_match_handler(State(state.clone()), HeaderMap::new(), Ok(Json(body)))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(state.store.load_all().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_create_match_validates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, ScriptedSource::new(vec![]));

        let bad = submission(3, 0, &[("AJ", 1)]);
        let err = create_match_handler(State(state.clone()), player_headers(), Ok(Json(bad)))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.message.starts_with("goal mismatch"));

        let good = submission(1, 0, &[("AJ", 1)]);
        let ok = create_match_handler(State(state.clone()), player_headers(), Ok(Json(good))).await;
        assert!(ok.is_ok());
        assert_eq!(state.store.load_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, ScriptedSource::new(vec![]));

        let err = refresh_handler(State(state.clone()), player_headers())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert!(state.league.snapshot().standings.fetched_at.is_none());
    }

    #[tokio::test]
    async fn test_refresh_updates_league() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir, ScriptedSource::new(vec![Some(snapshot())]));

        let unauthorized = refresh_handler(State(state.clone()), HeaderMap::new()).await;
        assert_eq!(unauthorized.err().unwrap().status, StatusCode::UNAUTHORIZED);

        assert!(refresh_handler(State(state.clone()), player_headers())
            .await
            .is_ok());
        let view = league_view(&state.league.snapshot(), &state.display);
        assert_eq!(view.standings.rows[0][1], "🔥Maradonners🔥");
    }

    #[test]
    fn test_unauthorized_response_prompts_for_basic_auth() {
        let response = ApiError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr(r#"A&B "FC""#), "A&amp;B &quot;FC&quot;");
    }
}
