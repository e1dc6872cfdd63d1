pub mod cpbl;

pub use cpbl::CpblSite;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A box score exactly as the source labels it (raw team names, untranslated).
/// The ingest path runs these through the schema normalizer like any other
/// season file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBoxScore {
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
}

/// Trait every box-score source must implement.
#[async_trait]
pub trait BoxScoreSource: Send + Sync {
    /// Fetch one game's final box score. `Ok(None)` means the game page
    /// exists but carries no usable scoreline (not played yet, rained out).
    async fn fetch_box_score(&self, year: u16, game_no: u32) -> Result<Option<RawBoxScore>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Walk a season's game numbers in order, politely spaced with a jittered
/// delay. Individual failures are logged and skipped; the season fetch never
/// aborts over one bad game page.
pub async fn fetch_season(
    source: &dyn BoxScoreSource,
    year: u16,
    max_games: u32,
    delay: Duration,
) -> Vec<RawBoxScore> {
    info!(
        "Fetching season {} from {} (up to {} games)",
        year,
        source.name(),
        max_games
    );

    let mut results = Vec::new();
    for game_no in 1..=max_games {
        match source.fetch_box_score(year, game_no).await {
            Ok(Some(box_score)) => {
                debug!(
                    "Game {:03}: {} {} : {} {}",
                    game_no,
                    box_score.away_team,
                    box_score.away_score,
                    box_score.home_score,
                    box_score.home_team
                );
                results.push(box_score);
            }
            Ok(None) => debug!("Game {:03}: no scoreline yet, skipped", game_no),
            Err(e) => warn!("Game {:03}: fetch failed: {}", game_no, e),
        }

        let jitter = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 2);
        tokio::time::sleep(delay + Duration::from_millis(jitter)).await;
    }

    info!("Season {} fetch complete: {} games", year, results.len());
    results
}

/// Write fetched box scores as a season CSV consumable by the ingest path.
pub fn write_season_csv(path: &Path, rows: &[RawBoxScore]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create season file {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::read_season_csv;

    struct CannedSource {
        games: Vec<Option<RawBoxScore>>,
    }

    #[async_trait]
    impl BoxScoreSource for CannedSource {
        async fn fetch_box_score(&self, _year: u16, game_no: u32) -> Result<Option<RawBoxScore>> {
            match self.games.get((game_no - 1) as usize) {
                Some(g) => Ok(g.clone()),
                None => anyhow::bail!("page not found"),
            }
        }

        fn name(&self) -> &str {
            "Canned"
        }
    }

    fn score(id: &str, hs: u32, aws: u32) -> RawBoxScore {
        RawBoxScore {
            game_id: id.into(),
            home_team: "中信兄弟".into(),
            away_team: "味全龍".into(),
            home_score: hs,
            away_score: aws,
        }
    }

    #[tokio::test]
    async fn test_fetch_season_skips_gaps_and_errors() {
        let source = CannedSource {
            games: vec![Some(score("001", 5, 3)), None, Some(score("003", 2, 2))],
        };
        // max_games of 4 also exercises the error path (page 4 missing)
        let rows = fetch_season(&source, 2022, 4, Duration::from_millis(0)).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].game_id, "001");
        assert_eq!(rows[1].game_id, "003");
    }

    #[tokio::test]
    async fn test_written_csv_round_trips_through_ingest() {
        let rows = vec![score("001", 5, 3), score("002", 1, 4)];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpbl_2022.csv");
        write_season_csv(&path, &rows).unwrap();

        let table = read_season_csv(&path).unwrap();
        assert!(table.headers.iter().any(|h| h == "home_team"));
        assert_eq!(table.rows.len(), 2);
    }
}
