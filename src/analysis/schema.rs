use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::teams::TeamMap;

/// Columns that must exist in every season file. `game_id` is used when
/// present; otherwise the 1-based row ordinal stands in.
pub const REQUIRED_COLUMNS: [&str; 4] = ["home_team", "away_team", "home_score", "away_score"];

/// Structural failure of an input table. Per-row problems (unmapped teams,
/// unparseable scores) are not errors; those rows are dropped and counted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("required columns missing from input: {0:?}")]
    MissingColumns(Vec<String>),
}

/// A raw tabular input: header row plus string cells, exactly as read from
/// a season CSV (or handed over by the fetch layer).
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }
}

/// One completed game in canonical form. Created by `normalize`, immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub game_id: String,
    pub year: u16,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    /// 1 if the home side won, 0 otherwise (ties yield 0/0).
    pub home_win: u8,
    pub away_win: u8,
}

/// Counts of rows dropped during normalization, reported alongside the
/// still-valid result so callers can surface them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropReport {
    /// Rows where the home or away label had no mapping entry.
    pub unmapped: usize,
    /// Rows with unparseable or negative scores, or a team playing itself.
    pub malformed: usize,
}

impl DropReport {
    pub fn total(&self) -> usize {
        self.unmapped + self.malformed
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub games: Vec<GameRecord>,
    pub report: DropReport,
}

/// Validate and reshape a raw season table into canonical `GameRecord`s.
///
/// Team labels are translated through `teams`; a row where either side fails
/// to map is dropped and counted, never defaulted. Win indicators are derived
/// here so downstream code only ever sees them precomputed.
pub fn normalize(table: &RawTable, teams: &TeamMap, year: u16) -> Result<Normalized, SchemaError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|&c| table.column(c).is_none())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns(missing));
    }

    let home_team_col = table.column("home_team").unwrap();
    let away_team_col = table.column("away_team").unwrap();
    let home_score_col = table.column("home_score").unwrap();
    let away_score_col = table.column("away_score").unwrap();
    let game_id_col = table.column("game_id");

    let mut games = Vec::with_capacity(table.rows.len());
    let mut report = DropReport::default();

    for (i, row) in table.rows.iter().enumerate() {
        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

        let home_team = match teams.canonical(cell(home_team_col)) {
            Some(name) => name.to_string(),
            None => {
                report.unmapped += 1;
                continue;
            }
        };
        let away_team = match teams.canonical(cell(away_team_col)) {
            Some(name) => name.to_string(),
            None => {
                report.unmapped += 1;
                continue;
            }
        };

        let scores = (
            cell(home_score_col).trim().parse::<u32>(),
            cell(away_score_col).trim().parse::<u32>(),
        );
        let (home_score, away_score) = match scores {
            (Ok(h), Ok(a)) => (h, a),
            _ => {
                report.malformed += 1;
                continue;
            }
        };

        if home_team == away_team {
            report.malformed += 1;
            continue;
        }

        let game_id = game_id_col
            .map(|c| cell(c).trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| (i + 1).to_string());

        games.push(GameRecord {
            game_id,
            year,
            home_team,
            away_team,
            home_score,
            away_score,
            home_win: u8::from(home_score > away_score),
            away_win: u8::from(away_score > home_score),
        });
    }

    Ok(Normalized { games, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    fn cpbl() -> TeamMap {
        TeamMap::cpbl_default()
    }

    const HEADERS: [&str; 5] = ["game_id", "home_team", "away_team", "home_score", "away_score"];

    #[test]
    fn test_normalize_basic_row() {
        let t = table(&HEADERS, &[&["001", "中信兄弟", "味全龍", "5", "3"]]);
        let out = normalize(&t, &cpbl(), 2022).unwrap();
        assert_eq!(out.report.total(), 0);
        assert_eq!(out.games.len(), 1);
        let g = &out.games[0];
        assert_eq!(g.game_id, "001");
        assert_eq!(g.home_team, "CTBC Brothers");
        assert_eq!(g.away_team, "WeiChuan Dragons");
        assert_eq!((g.home_win, g.away_win), (1, 0));
    }

    #[test]
    fn test_tie_yields_no_winner() {
        let t = table(&HEADERS, &[&["002", "中信兄弟", "味全龍", "4", "4"]]);
        let out = normalize(&t, &cpbl(), 2022).unwrap();
        assert_eq!((out.games[0].home_win, out.games[0].away_win), (0, 0));
    }

    #[test]
    fn test_unmapped_team_dropped_and_counted() {
        let t = table(
            &HEADERS,
            &[
                &["001", "UnknownTeam", "味全龍", "5", "3"],
                &["002", "中信兄弟", "味全龍", "2", "1"],
            ],
        );
        let out = normalize(&t, &cpbl(), 2022).unwrap();
        assert_eq!(out.games.len(), 1);
        assert_eq!(out.report.unmapped, 1);
        assert_eq!(out.report.total(), 1);
    }

    #[test]
    fn test_missing_columns_is_structural_error() {
        let t = table(&["game_id", "home_team", "home_score"], &[]);
        let err = normalize(&t, &cpbl(), 2022).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns(vec!["away_team".into(), "away_score".into()])
        );
    }

    #[test]
    fn test_bad_score_dropped_as_malformed() {
        let t = table(&HEADERS, &[&["001", "中信兄弟", "味全龍", "five", "3"]]);
        let out = normalize(&t, &cpbl(), 2022).unwrap();
        assert!(out.games.is_empty());
        assert_eq!(out.report.malformed, 1);
    }

    #[test]
    fn test_negative_score_dropped() {
        let t = table(&HEADERS, &[&["001", "中信兄弟", "味全龍", "-2", "3"]]);
        let out = normalize(&t, &cpbl(), 2022).unwrap();
        assert!(out.games.is_empty());
        assert_eq!(out.report.malformed, 1);
    }

    #[test]
    fn test_missing_game_id_column_uses_row_ordinal() {
        let t = table(
            &["home_team", "away_team", "home_score", "away_score"],
            &[
                &["中信兄弟", "味全龍", "5", "3"],
                &["味全龍", "中信兄弟", "2", "6"],
            ],
        );
        let out = normalize(&t, &cpbl(), 2023).unwrap();
        assert_eq!(out.games[0].game_id, "1");
        assert_eq!(out.games[1].game_id, "2");
    }
}
