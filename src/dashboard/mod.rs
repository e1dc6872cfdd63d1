use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::analysis::build_metrics;
use crate::config::ALPHA_RANGE;
use crate::store::Database;
use crate::teams::TeamMap;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub teams: TeamMap,
    /// Alpha preselected in the UI; every request still carries its own.
    pub default_alpha: f64,
}

/// Build the Axum router for the dashboard.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/seasons", get(seasons_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/games", get(games_handler))
        .route("/api/ingest", get(ingest_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

type HandlerError = (StatusCode, String);

fn internal(e: anyhow::Error) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// Serve the dashboard HTML page, injecting the default alpha.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let html = DASHBOARD_HTML.replace(
        r#"<body>"#,
        &format!(r#"<body data-alpha="{}">"#, state.default_alpha),
    );
    Html(html)
}

/// GET /api/seasons
async fn seasons_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    state.db.list_years().map(Json).map_err(internal)
}

#[derive(Debug, Deserialize)]
struct MetricsQuery {
    year: u16,
    alpha: Option<f64>,
    /// Keep only rows significant for `metric` when true.
    significant_only: Option<bool>,
    /// "win" (default) or "score"; which comparison drives the filter.
    metric: Option<String>,
    /// Comma-separated canonical team names to include.
    teams: Option<String>,
}

/// GET /api/metrics?year=2023&alpha=0.1&significant_only=true&metric=win&teams=a,b
///
/// Metrics are recomputed from the stored games on every request; alpha and
/// team filters are plain request parameters, never persisted state.
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<MetricsQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let alpha = q.alpha.unwrap_or(state.default_alpha);
    let (lo, hi) = ALPHA_RANGE;
    if !(lo..=hi).contains(&alpha) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("alpha must be between {} and {}", lo, hi),
        ));
    }

    let games = state.db.list_games(q.year).map_err(internal)?;
    let mut table = build_metrics(&games, q.year, alpha, |t| {
        state.teams.is_eligible(t, q.year)
    });

    if let Some(teams) = &q.teams {
        let wanted: HashSet<&str> = teams.split(',').map(str::trim).collect();
        table.rows.retain(|r| wanted.contains(r.team.as_str()));
    }
    if q.significant_only.unwrap_or(false) {
        let by_score = q.metric.as_deref() == Some("score");
        table.rows.retain(|r| {
            if by_score {
                r.score.significant
            } else {
                r.win.significant
            }
        });
    }

    Ok(Json(table))
}

#[derive(Debug, Deserialize)]
struct GamesQuery {
    year: u16,
    team: String,
}

/// One game from a team's perspective for the drill-down view.
#[derive(Debug, Serialize)]
struct GameDetail {
    game_id: String,
    home_team: String,
    away_team: String,
    home_score: u32,
    away_score: u32,
    /// Runs scored by the selected team in this game.
    runs_for: u32,
    win: u8,
    /// Cumulative win rate through this game.
    cume_win_rate: f64,
}

/// GET /api/games?year=2023&team=CTBC%20Brothers
async fn games_handler(
    State(state): State<Arc<AppState>>,
    Query(q): Query<GamesQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let games = state
        .db
        .list_games_for_team(q.year, &q.team)
        .map_err(internal)?;

    let mut wins = 0u32;
    let details: Vec<GameDetail> = games
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let at_home = g.home_team == q.team;
            let win = if at_home { g.home_win } else { g.away_win };
            wins += u32::from(win);
            GameDetail {
                game_id: g.game_id.clone(),
                home_team: g.home_team.clone(),
                away_team: g.away_team.clone(),
                home_score: g.home_score,
                away_score: g.away_score,
                runs_for: if at_home { g.home_score } else { g.away_score },
                win,
                cume_win_rate: f64::from(wins) / (i + 1) as f64,
            }
        })
        .collect();

    Ok(Json(details))
}

/// GET /api/ingest: drop counts per season so omissions are never silent.
async fn ingest_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    state.db.list_ingest_reports().map(Json).map_err(internal)
}

/// Embedded single-file dashboard (HTML + CSS + JS)
const DASHBOARD_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>CPBL Home/Away Analytics</title>
<style>
  :root {
    --bg: #0f1117;
    --card: #1a1d27;
    --border: #2a2d3a;
    --home: #0060B0;
    --away: #05AF7A;
    --accent: #6c63ff;
    --red: #ff4f6a;
    --text: #e0e0e0;
    --muted: #8888aa;
  }
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; border-bottom: 1px solid var(--border); }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .controls { display: flex; flex-wrap: wrap; gap: 1.2rem; align-items: center; background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 1rem 1.2rem; }
  .controls label { color: var(--muted); font-size: .8rem; text-transform: uppercase; letter-spacing: .05em; margin-right: .4rem; }
  select, input[type=range] { background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 6px; padding: .3rem .5rem; }
  .pillbox { display: flex; flex-wrap: wrap; gap: .4rem; }
  .team-pill { padding: .25rem .7rem; border: 1px solid var(--home); border-radius: 20px; font-size: .8rem; cursor: pointer; color: var(--home); background: white; }
  .team-pill.on { background: var(--home); color: white; }
  .panel { background: var(--card); border: 1px solid var(--border); border-radius: 10px; overflow: hidden; }
  .panel-header { padding: .9rem 1.2rem; border-bottom: 1px solid var(--border); font-weight: 600; }
  .panel-note { padding: .6rem 1.2rem; color: var(--muted); font-size: .82rem; }
  table { width: 100%; border-collapse: collapse; }
  th { padding: .7rem 1rem; text-align: center; font-size: .75rem; text-transform: uppercase; color: var(--muted); border-bottom: 1px solid var(--border); }
  td { padding: .6rem 1rem; text-align: center; font-size: .88rem; border-bottom: 1px solid #1e2130; }
  tr:last-child td { border-bottom: none; }
  .sig { color: var(--away); font-weight: 700; }
  .insight { padding: .8rem 1.2rem; border-left: 4px solid var(--accent); background: rgba(108,99,255,.08); font-size: .9rem; }
  .insight + .insight { border-left-color: var(--muted); background: rgba(136,136,170,.08); }
  .chart-box { padding: 1rem; position: relative; }
  canvas { width: 100% !important; }
  .two-col { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
  @media (max-width: 900px) { .two-col { grid-template-columns: 1fr; } }
  .empty { color: var(--muted); text-align: center; padding: 2rem; font-size: .9rem; }
  footer { padding: 1rem 2rem; color: var(--muted); font-size: .8rem; border-top: 1px solid var(--border); }
</style>
</head>
<body>
<header>
  <h1>⚾ CPBL Home/Away Analytics</h1>
  <span style="margin-left:auto;color:var(--muted);font-size:.8rem;" id="subtitle"></span>
</header>

<main>
  <div class="controls">
    <span><label for="year">Year</label><select id="year"></select></span>
    <span><label for="alpha">α</label><input type="range" id="alpha" min="0.01" max="0.3" step="0.01"> <span id="alpha-val"></span></span>
    <span><label for="metric">Metric</label>
      <select id="metric">
        <option value="win">Win Rate</option>
        <option value="score">Score</option>
      </select>
    </span>
    <span><label><input type="checkbox" id="sig-only"> Significant only</label></span>
    <span class="pillbox" id="team-pills"></span>
    <span><label for="drill">Drill-down</label><select id="drill"><option value="">—</option></select></span>
  </div>

  <div class="insight" id="insight-sig">Loading…</div>
  <div class="insight" id="insight-nonsig"></div>

  <div class="panel">
    <div class="panel-header">Metrics Table</div>
    <table>
      <thead id="metrics-head"></thead>
      <tbody id="metrics-tbody"><tr><td class="empty">Loading…</td></tr></tbody>
    </table>
    <div class="panel-note" id="excluded-note"></div>
  </div>

  <div class="two-col">
    <div class="panel">
      <div class="panel-header" id="grouped-title">Home vs Away</div>
      <div class="chart-box"><canvas id="grouped-chart" height="240"></canvas></div>
    </div>
    <div class="panel">
      <div class="panel-header" id="diff-title">Difference (Home − Away)</div>
      <div class="chart-box"><canvas id="diff-chart" height="240"></canvas></div>
    </div>
  </div>

  <div class="panel" id="drill-panel" style="display:none;">
    <div class="panel-header" id="drill-title">Drill-down</div>
    <table>
      <thead><tr><th>Game</th><th>Home</th><th>Away</th><th>Score</th><th>Runs For</th><th>Win</th><th>Cume Win Rate</th></tr></thead>
      <tbody id="drill-tbody"></tbody>
    </table>
    <div class="chart-box"><canvas id="cume-chart" height="200"></canvas></div>
  </div>

  <div class="panel">
    <div class="panel-header">Data Quality</div>
    <table>
      <thead><tr><th>Year</th><th>Source</th><th>Rows Read</th><th>Games Kept</th><th>Unmapped</th><th>Malformed</th></tr></thead>
      <tbody id="ingest-tbody"><tr><td colspan="6" class="empty">Loading…</td></tr></tbody>
    </table>
  </div>
</main>

<footer>
  ★ indicates p &lt; selected α · Cohen's d bands: negligible (&lt;0.2), small (0.2–0.5), medium (0.5–0.8), large (≥0.8) ·
  Pairing is positional (i-th home game vs i-th away game), a deliberate simplification.
</footer>

<script>
const HOME = '#0060B0', AWAY = '#05AF7A';
const r3 = v => v == null ? '–' : v.toFixed(3);
let seasons = [], selectedTeams = new Set(), knownTeams = new Set();

const el = id => document.getElementById(id);

async function loadSeasons() {
  const r = await fetch('/api/seasons');
  if (!r.ok) return;
  seasons = await r.json();
  el('year').innerHTML = seasons.map(y => `<option value="${y}">${y}</option>`).join('');
  if (seasons.length) el('year').value = seasons[seasons.length - 1];
}

async function loadIngest() {
  const r = await fetch('/api/ingest');
  if (!r.ok) return;
  const reports = await r.json();
  const tbody = el('ingest-tbody');
  if (!reports.length) { tbody.innerHTML = '<tr><td colspan="6" class="empty">No ingests recorded</td></tr>'; return; }
  tbody.innerHTML = reports.map(x => `<tr>
    <td>${x.year}</td><td>${x.source}</td><td>${x.rows_read}</td>
    <td>${x.games_kept}</td><td>${x.dropped_unmapped}</td><td>${x.dropped_malformed}</td>
  </tr>`).join('');
}

function metricsUrl() {
  const p = new URLSearchParams({ year: el('year').value, alpha: el('alpha').value });
  if (el('sig-only').checked) { p.set('significant_only', 'true'); p.set('metric', el('metric').value); }
  return '/api/metrics?' + p.toString();
}

async function loadMetrics() {
  if (!seasons.length) {
    el('insight-sig').textContent = 'No seasons ingested yet.';
    return;
  }
  const r = await fetch(metricsUrl());
  if (!r.ok) return;
  const table = await r.json();

  // Team pills reflect all rows of the season; filtering is client-side
  renderPills(table.rows.map(x => x.team));
  const rows = table.rows.filter(x => selectedTeams.has(x.team));
  renderInsights(rows);
  renderTable(rows);
  renderExcluded(table.excluded);
  renderGrouped(rows);
  renderDiff(rows);
  renderDrillOptions(table.rows.map(x => x.team));
  el('subtitle').textContent = `Year ${table.year} · α=${table.alpha}`;
}

function renderPills(teams) {
  // Teams seen for the first time start selected
  for (const t of teams) if (!knownTeams.has(t)) { knownTeams.add(t); selectedTeams.add(t); }
  el('team-pills').innerHTML = teams.map(t =>
    `<span class="team-pill ${selectedTeams.has(t) ? 'on' : ''}" data-team="${t}">${t}</span>`).join('');
  for (const pill of el('team-pills').children) {
    pill.onclick = () => {
      const t = pill.dataset.team;
      if (selectedTeams.has(t)) selectedTeams.delete(t); else selectedTeams.add(t);
      loadMetrics();
    };
  }
}

function cmpOf(row) { return el('metric').value === 'score' ? row.score : row.win; }

function renderInsights(rows) {
  const label = el('metric').value === 'score' ? 'score differences' : 'win rates';
  const sig = rows.filter(x => cmpOf(x).significant).map(x => x.team);
  const non = rows.filter(x => !cmpOf(x).significant).map(x => x.team);
  el('insight-sig').textContent = (sig.length ? sig.join(', ') : 'None') +
    ` have significant home/away differences in ${label}.`;
  el('insight-nonsig').textContent = (non.length ? non.join(', ') : 'None') +
    ` show no meaningful difference in ${label}.`;
}

function renderTable(rows) {
  const byScore = el('metric').value === 'score';
  el('metrics-head').innerHTML = byScore
    ? '<tr><th>Team</th><th>Home Avg</th><th>Away Avg</th><th>Diff</th><th>t</th><th>p</th><th>Effect</th><th>Sig</th></tr>'
    : '<tr><th>Team</th><th>Home WR</th><th>Away WR</th><th>Diff</th><th>t</th><th>p</th><th>Effect</th><th>Sig</th></tr>';
  const tbody = el('metrics-tbody');
  if (!rows.length) { tbody.innerHTML = '<tr><td colspan="8" class="empty">No teams match the current filters</td></tr>'; return; }
  tbody.innerHTML = rows.map(x => {
    const c = byScore ? x.score : x.win;
    const a = byScore ? x.home.avg_score : x.home.win_rate;
    const b = byScore ? x.away.avg_score : x.away.win_rate;
    const d = byScore ? x.score_diff : x.win_rate_diff;
    return `<tr>
      <td>${x.team}</td><td>${r3(a)}</td><td>${r3(b)}</td><td>${r3(d)}</td>
      <td>${r3(c.t_statistic)}</td><td>${r3(c.p_value)}</td>
      <td>${c.effect ?? '–'}</td><td>${c.significant ? '<span class="sig">★</span>' : ''}</td>
    </tr>`;
  }).join('');
}

function renderExcluded(excluded) {
  el('excluded-note').textContent = excluded.length
    ? 'Excluded for insufficient sample: ' + excluded.map(x =>
        `${x.team} (${x.home_games} home / ${x.away_games} away)`).join(', ')
    : '';
}

function prepCanvas(id) {
  const canvas = el(id);
  const ctx = canvas.getContext('2d');
  const W = canvas.parentElement.clientWidth - 32;
  const H = canvas.height;
  canvas.width = W;
  ctx.clearRect(0, 0, W, H);
  return { ctx, W, H };
}

function renderGrouped(rows) {
  const byScore = el('metric').value === 'score';
  el('grouped-title').textContent = byScore ? 'Home vs Away Average Score' : 'Home vs Away Win Rate';
  const { ctx, W, H } = prepCanvas('grouped-chart');
  if (!rows.length) return;
  const vals = rows.flatMap(x => byScore ? [x.home.avg_score, x.away.avg_score] : [x.home.win_rate, x.away.win_rate]);
  const max = Math.max(...vals) * 1.15 || 1;
  const pad = 24, baseY = H - pad;
  const group = (W - pad * 2) / rows.length;
  const bar = Math.min(28, group / 3);
  ctx.font = '11px system-ui';
  rows.forEach((x, i) => {
    const cx = pad + group * i + group / 2;
    const hv = byScore ? x.home.avg_score : x.home.win_rate;
    const av = byScore ? x.away.avg_score : x.away.win_rate;
    ctx.fillStyle = HOME;
    ctx.fillRect(cx - bar - 2, baseY - (hv / max) * (H - pad * 2), bar, (hv / max) * (H - pad * 2));
    ctx.fillStyle = AWAY;
    ctx.fillRect(cx + 2, baseY - (av / max) * (H - pad * 2), bar, (av / max) * (H - pad * 2));
    ctx.fillStyle = '#8888aa';
    ctx.textAlign = 'center';
    ctx.fillText(x.team.split(' ')[0], cx, H - 6);
  });
}

function renderDiff(rows) {
  const byScore = el('metric').value === 'score';
  el('diff-title').textContent = byScore ? 'Score Difference (Home − Away)' : 'Win Rate Difference (Home − Away)';
  const { ctx, W, H } = prepCanvas('diff-chart');
  if (!rows.length) return;
  const sorted = rows.slice().sort((a, b) =>
    (byScore ? a.score_diff - b.score_diff : a.win_rate_diff - b.win_rate_diff));
  const vals = sorted.map(x => byScore ? x.score_diff : x.win_rate_diff);
  const maxAbs = Math.max(...vals.map(Math.abs)) * 1.2 || 1;
  const pad = 110, zero = pad + (W - pad - 20) / 2, scale = (W - pad - 20) / 2 / maxAbs;
  const rowH = (H - 20) / sorted.length;
  ctx.font = '11px system-ui';
  sorted.forEach((x, i) => {
    const v = vals[i], y = 10 + rowH * i + rowH * 0.2, h = rowH * 0.6;
    ctx.fillStyle = byScore ? AWAY : HOME;
    if (v >= 0) ctx.fillRect(zero, y, v * scale, h);
    else ctx.fillRect(zero + v * scale, y, -v * scale, h);
    ctx.fillStyle = '#8888aa';
    ctx.textAlign = 'right';
    ctx.fillText(x.team, pad - 8, y + h - 2);
  });
  ctx.strokeStyle = '#555';
  ctx.setLineDash([4, 3]);
  ctx.beginPath(); ctx.moveTo(zero, 6); ctx.lineTo(zero, H - 6); ctx.stroke();
  ctx.setLineDash([]);
}

function renderDrillOptions(teams) {
  const current = el('drill').value;
  el('drill').innerHTML = '<option value="">—</option>' +
    teams.map(t => `<option value="${t}" ${t === current ? 'selected' : ''}>${t}</option>`).join('');
}

async function loadDrill() {
  const team = el('drill').value;
  const panel = el('drill-panel');
  if (!team) { panel.style.display = 'none'; return; }
  const p = new URLSearchParams({ year: el('year').value, team });
  const r = await fetch('/api/games?' + p.toString());
  if (!r.ok) return;
  const games = await r.json();
  panel.style.display = '';
  el('drill-title').textContent = `Details for ${team} (${el('year').value})`;
  el('drill-tbody').innerHTML = games.map(g => `<tr>
    <td>${g.game_id}</td><td>${g.home_team}</td><td>${g.away_team}</td>
    <td>${g.home_score}–${g.away_score}</td><td>${g.runs_for}</td>
    <td>${g.win ? 'W' : ''}</td><td>${r3(g.cume_win_rate)}</td>
  </tr>`).join('');

  const { ctx, W, H } = prepCanvas('cume-chart');
  if (games.length < 2) return;
  const step = (W - 30) / (games.length - 1);
  const toY = v => (H - 24) - v * (H - 34);
  ctx.strokeStyle = HOME;
  ctx.lineWidth = 2;
  ctx.beginPath();
  games.forEach((g, i) => i === 0
    ? ctx.moveTo(15, toY(g.cume_win_rate))
    : ctx.lineTo(15 + i * step, toY(g.cume_win_rate)));
  ctx.stroke();
}

async function refresh() {
  el('alpha-val').textContent = el('alpha').value;
  await loadMetrics();
  await loadDrill();
}

el('year').addEventListener('change', refresh);
el('alpha').addEventListener('input', refresh);
el('metric').addEventListener('change', refresh);
el('sig-only').addEventListener('change', refresh);
el('drill').addEventListener('change', loadDrill);

(async () => {
  el('alpha').value = document.body.dataset.alpha || '0.1';
  el('alpha-val').textContent = el('alpha').value;
  await loadSeasons();
  await loadIngest();
  await loadMetrics();
})();
</script>
</body>
</html>"#;
