use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{BoxScoreSource, RawBoxScore};

/// Box-score source backed by the official CPBL site's box pages.
pub struct CpblSite {
    http: Client,
    /// Base URL, overridable for tests.
    base_url: String,
}

impl CpblSite {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(CpblSite {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BoxScoreSource for CpblSite {
    fn name(&self) -> &str {
        "CPBL"
    }

    async fn fetch_box_score(&self, year: u16, game_no: u32) -> Result<Option<RawBoxScore>> {
        let url = format!(
            "{}/box?year={}&KindCode=A&gameSno={:03}",
            self.base_url, year, game_no
        );
        debug!("Fetching box score from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("CPBL box page request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("CPBL box page error: {}", resp.status());
        }

        let html = resp.text().await.context("Failed to read CPBL box page")?;
        Ok(parse_box_page(&html, game_no))
    }
}

/// Extract the final scoreline from a box page's ScoreBoard section.
///
/// The markup of interest looks like:
/// `<div class="item ScoreBoard"> … <div class="team away"> …
///  <div class="team_name"><a …>味全龍</a> … <div class="score">3</div> …`
/// followed by the equivalent `team home` block. Lightweight string scanning
/// is enough; a missing or incomplete board yields `None`.
fn parse_box_page(html: &str, game_no: u32) -> Option<RawBoxScore> {
    let board = after(html, r#"class="item ScoreBoard""#)?;
    let away_block = after(board, r#"class="team away""#)?;
    // The home block follows the away block on the page
    let home_block = after(away_block, r#"class="team home""#)?;
    // Only scan the away block up to where home starts
    let away_only = &away_block[..away_block.len() - home_block.len()];

    let away_team = team_name(away_only)?;
    let away_score = score(away_only)?;
    let home_team = team_name(home_block)?;
    let home_score = score(home_block)?;

    Some(RawBoxScore {
        game_id: format!("{:03}", game_no),
        home_team,
        away_team,
        home_score,
        away_score,
    })
}

fn team_name(block: &str) -> Option<String> {
    let name_block = after(block, r#"class="team_name""#)?;
    let anchor = after(name_block, "<a")?;
    let text = between(anchor, ">", "</a>")?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn score(block: &str) -> Option<u32> {
    let score_block = after(block, r#"class="score""#)?;
    between(score_block, ">", "<")?.trim().parse().ok()
}

fn after<'a>(s: &'a str, marker: &str) -> Option<&'a str> {
    s.find(marker).map(|i| &s[i + marker.len()..])
}

fn between<'a>(s: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let rest = after(s, start)?;
    rest.find(end).map(|i| &rest[..i])
}
