use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

mod analysis;
mod config;
mod dashboard;
mod fetch;
mod ingest;
mod store;
mod teams;

use analysis::build_metrics;
use config::Config;
use dashboard::AppState;
use fetch::{BoxScoreSource, CpblSite};
use store::models::IngestReport;
use store::Database;
use teams::TeamMap;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::parse();
    config.validate()?;

    let team_map = match &config.team_map {
        Some(path) => {
            let map = TeamMap::load(path)?;
            info!("Team map loaded from {} ({} teams)", path.display(), map.len());
            map
        }
        None => TeamMap::cpbl_default(),
    };

    // Optional acquisition step: fetch a season from the CPBL site and feed
    // the written CSV straight into the ingest list.
    if let Some(year) = config.fetch_year {
        let site = CpblSite::new(&config.fetch_base_url)?;
        info!("Fetching season {} via {}", year, site.name());
        let rows = fetch::fetch_season(
            &site,
            year,
            config.fetch_max_games,
            Duration::from_millis(config.fetch_delay_ms),
        )
        .await;
        fetch::write_season_csv(&config.fetch_out, &rows)?;
        info!(
            "Wrote {} box scores to {}",
            rows.len(),
            config.fetch_out.display()
        );
        if !config.seasons.iter().any(|s| s.year == year) {
            config.seasons.push(config::SeasonSource {
                year,
                path: config.fetch_out.clone(),
            });
        }
    }

    // Open database
    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // Ingest every configured season: read → normalize → store, with drop
    // counts recorded so nothing is omitted silently.
    for source in &config.seasons {
        let table = ingest::read_season_csv(&source.path)?;
        let rows_read = table.rows.len();
        let normalized = analysis::normalize(&table, &team_map, source.year)
            .with_context(|| format!("Season file {} rejected", source.path.display()))?;

        let report = IngestReport {
            id: None,
            source: source.path.display().to_string(),
            year: source.year,
            rows_read,
            games_kept: normalized.games.len(),
            dropped_unmapped: normalized.report.unmapped,
            dropped_malformed: normalized.report.malformed,
            ingested_at: Utc::now(),
        };
        if report.dropped_total() > 0 {
            warn!(
                "Season {}: dropped {} rows ({} unmapped, {} malformed)",
                report.year, report.dropped_total(), report.dropped_unmapped, report.dropped_malformed
            );
        }
        info!(
            "Season {}: {} games ingested from {}",
            report.year,
            report.games_kept,
            source.path.display()
        );

        db.replace_season(source.year, &normalized.games)?;
        db.record_ingest(&report)?;
    }

    // Per-season metrics export
    if let Some(dir) = &config.export_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export dir {}", dir.display()))?;
        for year in db.list_years()? {
            let games = db.list_games(year)?;
            let table = build_metrics(&games, year, config.alpha, |t| {
                team_map.is_eligible(t, year)
            });
            for ex in &table.excluded {
                warn!(
                    "Season {}: {} excluded ({} home / {} away games)",
                    year, ex.team, ex.home_games, ex.away_games
                );
            }
            let path = dir.join(format!("team_metrics_{}.csv", year));
            ingest::write_metrics_csv(&path, &table.rows)?;
            info!(
                "Season {}: exported {} teams to {} (alpha={})",
                year,
                table.rows.len(),
                path.display(),
                config.alpha
            );
        }
    }

    if config.export_only {
        info!("Export-only mode, exiting without dashboard");
        return Ok(());
    }

    // Serve the dashboard (blocks until shutdown)
    let state = AppState {
        db,
        teams: team_map,
        default_alpha: config.dashboard_alpha,
    };
    let app = dashboard::router(state);
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
