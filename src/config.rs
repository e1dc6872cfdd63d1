use std::path::PathBuf;

use clap::Parser;

/// One season source: an explicit `YEAR=PATH` pair. Season files are always
/// passed in; the pipeline never scans directories for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSource {
    pub year: u16,
    pub path: PathBuf,
}

fn parse_season(s: &str) -> Result<SeasonSource, String> {
    let (year, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected YEAR=PATH, got '{}'", s))?;
    let year: u16 = year
        .trim()
        .parse()
        .map_err(|_| format!("invalid season year '{}'", year))?;
    if path.trim().is_empty() {
        return Err(format!("empty path in season source '{}'", s));
    }
    Ok(SeasonSource {
        year,
        path: PathBuf::from(path.trim()),
    })
}

/// CPBL home/away advantage analyzer
#[derive(Parser, Debug, Clone)]
#[command(name = "homefield", version, about)]
pub struct Config {
    /// Season source as YEAR=PATH (repeatable, e.g. --season 2022=cpbl_2022.csv)
    #[arg(long = "season", value_parser = parse_season)]
    pub seasons: Vec<SeasonSource>,

    /// Team-name mapping file (JSON array of {label, name, first_season}).
    /// Defaults to the built-in CPBL mapping when omitted.
    #[arg(long, env = "TEAM_MAP")]
    pub team_map: Option<PathBuf>,

    /// Significance level for the batch/export pipeline
    #[arg(long, env = "ALPHA", default_value = "0.05")]
    pub alpha: f64,

    /// Default significance level preselected in the dashboard
    #[arg(long, env = "DASHBOARD_ALPHA", default_value = "0.1")]
    pub dashboard_alpha: f64,

    /// Dashboard listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "homefield.db")]
    pub database_path: String,

    /// Directory to write per-season metrics CSV exports into
    #[arg(long, env = "EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Run the ingest/export pipeline and exit without serving the dashboard
    #[arg(long, env = "EXPORT_ONLY", default_value = "false")]
    pub export_only: bool,

    /// Fetch box scores for this season from the CPBL site before ingesting
    #[arg(long, env = "FETCH_YEAR")]
    pub fetch_year: Option<u16>,

    /// Highest game number to try when fetching a season
    #[arg(long, env = "FETCH_MAX_GAMES", default_value = "300")]
    pub fetch_max_games: u32,

    /// Output CSV path for fetched box scores
    #[arg(long, env = "FETCH_OUT", default_value = "cpbl_scores.csv")]
    pub fetch_out: PathBuf,

    /// Base URL of the CPBL site
    #[arg(long, env = "FETCH_BASE_URL", default_value = "https://www.cpbl.com.tw")]
    pub fetch_base_url: String,

    /// Base delay between box-score requests in milliseconds (jitter is added)
    #[arg(long, env = "FETCH_DELAY_MS", default_value = "300")]
    pub fetch_delay_ms: u64,
}

/// Bounds for any user-supplied significance level.
pub const ALPHA_RANGE: (f64, f64) = (0.01, 0.3);

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let (lo, hi) = ALPHA_RANGE;
        if !(lo..=hi).contains(&self.alpha) {
            anyhow::bail!("alpha must be between {} and {}", lo, hi);
        }
        if !(lo..=hi).contains(&self.dashboard_alpha) {
            anyhow::bail!("dashboard-alpha must be between {} and {}", lo, hi);
        }
        if self.seasons.is_empty() && self.fetch_year.is_none() {
            anyhow::bail!("no input: pass at least one --season YEAR=PATH or a --fetch-year");
        }
        if self.export_only && self.export_dir.is_none() {
            anyhow::bail!("--export-only requires --export-dir");
        }
        if self.fetch_year.is_some() && self.fetch_max_games == 0 {
            anyhow::bail!("fetch-max-games must be at least 1");
        }
        let mut years: Vec<u16> = self.seasons.iter().map(|s| s.year).collect();
        years.sort_unstable();
        years.dedup();
        if years.len() != self.seasons.len() {
            anyhow::bail!("duplicate season year in --season arguments");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["homefield", "--season", "2022=cpbl_2022.csv"])
    }

    #[test]
    fn test_parse_season_source() {
        let src = parse_season("2023=data/cpbl_2023.csv").unwrap();
        assert_eq!(src.year, 2023);
        assert_eq!(src.path, PathBuf::from("data/cpbl_2023.csv"));
    }

    #[test]
    fn test_parse_season_source_rejects_garbage() {
        assert!(parse_season("cpbl_2023.csv").is_err());
        assert!(parse_season("abcd=x.csv").is_err());
        assert!(parse_season("2023=").is_err());
    }

    #[test]
    fn test_validate_defaults_ok() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_alpha_bounds() {
        let mut c = base_config();
        c.alpha = 0.5;
        assert!(c.validate().is_err());
        c.alpha = 0.01;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_some_input() {
        let mut c = base_config();
        c.seasons.clear();
        assert!(c.validate().is_err());
        c.fetch_year = Some(2024);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_years() {
        let c = Config::parse_from([
            "homefield",
            "--season",
            "2022=a.csv",
            "--season",
            "2022=b.csv",
        ]);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_export_only_needs_export_dir() {
        let mut c = base_config();
        c.export_only = true;
        assert!(c.validate().is_err());
        c.export_dir = Some(PathBuf::from("out"));
        assert!(c.validate().is_ok());
    }
}
