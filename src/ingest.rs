//! Season CSV ingest and metrics CSV export.
//!
//! Export values are rounded to 3 decimals (display precision); the
//! dashboard API serves full precision straight from the core.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::paired::PairedComparison;
use crate::analysis::schema::RawTable;
use crate::analysis::TeamMetricsRow;

/// Read a season CSV into a raw table. Header validation is the schema
/// normalizer's job, not ours.
pub fn read_season_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open season file {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read row in {}", path.display()))?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }

    Ok(RawTable { headers, rows })
}

/// One exported metrics row, flat per the output schema. Also the shape we
/// read back when re-parsing an export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsCsvRow {
    pub team: String,
    pub home_games: usize,
    pub away_games: usize,
    pub home_win_rate: f64,
    pub away_win_rate: f64,
    pub win_rate_diff: f64,
    pub home_avg_score: f64,
    pub away_avg_score: f64,
    pub score_diff: f64,
    pub t_statistic_win: Option<f64>,
    pub p_value_win: Option<f64>,
    pub cohens_d_win: Option<f64>,
    pub effect_class_win: Option<String>,
    pub significant_win: bool,
    pub t_statistic_score: Option<f64>,
    pub p_value_score: Option<f64>,
    pub cohens_d_score: Option<f64>,
    pub effect_class_score: Option<String>,
    pub significant_score: bool,
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round3_opt(v: Option<f64>) -> Option<f64> {
    v.map(round3)
}

fn effect_label(cmp: &PairedComparison) -> Option<String> {
    cmp.effect.map(|e| e.label().to_string())
}

impl From<&TeamMetricsRow> for MetricsCsvRow {
    fn from(row: &TeamMetricsRow) -> Self {
        MetricsCsvRow {
            team: row.team.clone(),
            home_games: row.home.games,
            away_games: row.away.games,
            home_win_rate: round3(row.home.win_rate),
            away_win_rate: round3(row.away.win_rate),
            win_rate_diff: round3(row.win_rate_diff),
            home_avg_score: round3(row.home.avg_score),
            away_avg_score: round3(row.away.avg_score),
            score_diff: round3(row.score_diff),
            t_statistic_win: round3_opt(row.win.t_statistic),
            p_value_win: round3_opt(row.win.p_value),
            cohens_d_win: round3_opt(row.win.cohens_d),
            effect_class_win: effect_label(&row.win),
            significant_win: row.win.significant,
            t_statistic_score: round3_opt(row.score.t_statistic),
            p_value_score: round3_opt(row.score.p_value),
            cohens_d_score: round3_opt(row.score.cohens_d),
            effect_class_score: effect_label(&row.score),
            significant_score: row.score.significant,
        }
    }
}

/// Export a season's metrics rows as a flat CSV.
pub fn write_metrics_csv(path: &Path, rows: &[TeamMetricsRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create export file {}", path.display()))?;
    for row in rows {
        writer.serialize(MetricsCsvRow::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

/// Re-parse a metrics export (round-trip checks and downstream tooling).
#[allow(dead_code)]
pub fn read_metrics_csv(path: &Path) -> Result<Vec<MetricsCsvRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open metrics file {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.with_context(|| format!("Bad metrics row in {}", path.display()))?);
    }
    Ok(rows)
}
