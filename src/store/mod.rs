use anyhow::Result;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

use crate::analysis::schema::GameRecord;

pub mod models;
use models::IngestReport;

/// Thread-safe SQLite handle (single connection behind a mutex).
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent).
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Games ─────────────────────────────────────────────────────────────────

    /// Replace one season's canonical games atomically. Insertion order is
    /// preserved via rowid so the chronological order of the source file
    /// survives into every later read.
    pub fn replace_season(&self, year: u16, games: &[GameRecord]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM games WHERE year = ?1", params![year])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO games (
                    game_id, year, home_team, away_team,
                    home_score, away_score, home_win, away_win
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
            )?;
            for g in games {
                stmt.execute(params![
                    g.game_id,
                    g.year,
                    g.home_team,
                    g.away_team,
                    g.home_score,
                    g.away_score,
                    g.home_win,
                    g.away_win,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// All games of one season in stored (chronological) order.
    pub fn list_games(&self, year: u16) -> Result<Vec<GameRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, year, home_team, away_team,
                    home_score, away_score, home_win, away_win
             FROM games WHERE year = ?1 ORDER BY id ASC",
        )?;
        let games = stmt
            .query_map(params![year], map_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// One team's games (either role) for the drill-down view.
    pub fn list_games_for_team(&self, year: u16, team: &str) -> Result<Vec<GameRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT game_id, year, home_team, away_team,
                    home_score, away_score, home_win, away_win
             FROM games WHERE year = ?1 AND (home_team = ?2 OR away_team = ?2)
             ORDER BY id ASC",
        )?;
        let games = stmt
            .query_map(params![year, team], map_game)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(games)
    }

    /// Seasons with at least one stored game, ascending.
    pub fn list_years(&self) -> Result<Vec<u16>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT DISTINCT year FROM games ORDER BY year ASC")?;
        let years = stmt
            .query_map([], |row| row.get::<_, u16>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(years)
    }

    // ── Ingest log ────────────────────────────────────────────────────────────

    /// Record the outcome of one season-file ingest.
    pub fn record_ingest(&self, report: &IngestReport) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ingest_log (
                source, year, rows_read, games_kept,
                dropped_unmapped, dropped_malformed, ingested_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                report.source,
                report.year,
                report.rows_read,
                report.games_kept,
                report.dropped_unmapped,
                report.dropped_malformed,
                report.ingested_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent ingest report per season, newest first.
    pub fn list_ingest_reports(&self) -> Result<Vec<IngestReport>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, source, year, rows_read, games_kept,
                    dropped_unmapped, dropped_malformed, ingested_at
             FROM ingest_log
             WHERE id IN (SELECT MAX(id) FROM ingest_log GROUP BY year)
             ORDER BY year DESC",
        )?;
        let reports = stmt
            .query_map([], |row| {
                Ok(IngestReport {
                    id: row.get(0)?,
                    source: row.get(1)?,
                    year: row.get(2)?,
                    rows_read: row.get(3)?,
                    games_kept: row.get(4)?,
                    dropped_unmapped: row.get(5)?,
                    dropped_malformed: row.get(6)?,
                    ingested_at: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(reports)
    }
}

fn map_game(row: &rusqlite::Row) -> rusqlite::Result<GameRecord> {
    Ok(GameRecord {
        game_id: row.get(0)?,
        year: row.get(1)?,
        home_team: row.get(2)?,
        away_team: row.get(3)?,
        home_score: row.get(4)?,
        away_score: row.get(5)?,
        home_win: row.get(6)?,
        away_win: row.get(7)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS games (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    game_id     TEXT    NOT NULL,
    year        INTEGER NOT NULL,
    home_team   TEXT    NOT NULL,
    away_team   TEXT    NOT NULL,
    home_score  INTEGER NOT NULL,
    away_score  INTEGER NOT NULL,
    home_win    INTEGER NOT NULL,
    away_win    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS ingest_log (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    source            TEXT    NOT NULL,
    year              INTEGER NOT NULL,
    rows_read         INTEGER NOT NULL,
    games_kept        INTEGER NOT NULL,
    dropped_unmapped  INTEGER NOT NULL,
    dropped_malformed INTEGER NOT NULL,
    ingested_at       TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_games_year ON games(year);
CREATE INDEX IF NOT EXISTS idx_games_home ON games(home_team);
CREATE INDEX IF NOT EXISTS idx_games_away ON games(away_team);
"#;
