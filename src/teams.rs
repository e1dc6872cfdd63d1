use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// One entry of the team-name mapping file.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamEntry {
    /// Raw label as it appears in the source data (e.g. "中信兄弟").
    pub label: String,
    /// Canonical English name used everywhere downstream.
    pub name: String,
    /// First season the team fielded games. Teams are excluded from earlier
    /// seasons (e.g. the TSG Hawks joined the league in 2024).
    #[serde(default)]
    pub first_season: Option<u16>,
}

/// Translation table from raw team labels to canonical names, plus per-team
/// eligibility data. Rows whose labels are absent from the map are dropped by
/// the schema normalizer, never silently defaulted.
#[derive(Debug, Clone)]
pub struct TeamMap {
    by_label: HashMap<String, String>,
    first_season: HashMap<String, u16>,
}

impl TeamMap {
    pub fn from_entries(entries: Vec<TeamEntry>) -> Self {
        let mut by_label = HashMap::new();
        let mut first_season = HashMap::new();
        for e in entries {
            if let Some(year) = e.first_season {
                first_season.insert(e.name.clone(), year);
            }
            by_label.insert(e.label, e.name);
        }
        TeamMap {
            by_label,
            first_season,
        }
    }

    /// Load a mapping from a JSON file (an array of `TeamEntry` objects).
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read team map {}", path.display()))?;
        let entries: Vec<TeamEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse team map {}", path.display()))?;
        Ok(Self::from_entries(entries))
    }

    /// Built-in CPBL mapping (Chinese label → English name).
    pub fn cpbl_default() -> Self {
        let entries = vec![
            entry("中信兄弟", "CTBC Brothers", None),
            entry("味全龍", "WeiChuan Dragons", None),
            entry("樂天桃猿", "Rakuten Monkeys", None),
            entry("統一7-ELEVEn獅", "Uni-Lions", None),
            entry("富邦悍將", "Fubon Guardians", None),
            entry("台鋼雄鷹", "TSG Hawks", Some(2024)),
        ];
        Self::from_entries(entries)
    }

    /// Translate a raw label to its canonical name.
    pub fn canonical(&self, label: &str) -> Option<&str> {
        self.by_label.get(label.trim()).map(String::as_str)
    }

    /// Whether a (canonical) team is eligible for the given season.
    pub fn is_eligible(&self, name: &str, year: u16) -> bool {
        match self.first_season.get(name) {
            Some(first) => *first <= year,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

impl Default for TeamMap {
    fn default() -> Self {
        Self::cpbl_default()
    }
}

fn entry(label: &str, name: &str, first_season: Option<u16>) -> TeamEntry {
    TeamEntry {
        label: label.to_string(),
        name: name.to_string(),
        first_season,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_map_translates_labels() {
        let map = TeamMap::cpbl_default();
        assert_eq!(map.canonical("中信兄弟"), Some("CTBC Brothers"));
        assert_eq!(map.canonical("味全龍"), Some("WeiChuan Dragons"));
        assert_eq!(map.canonical("NotATeam"), None);
    }

    #[test]
    fn test_label_whitespace_is_trimmed() {
        let map = TeamMap::cpbl_default();
        assert_eq!(map.canonical(" 樂天桃猿 "), Some("Rakuten Monkeys"));
    }

    #[test]
    fn test_expansion_team_eligibility() {
        let map = TeamMap::cpbl_default();
        assert!(!map.is_eligible("TSG Hawks", 2023));
        assert!(map.is_eligible("TSG Hawks", 2024));
        // Teams without a first_season are always eligible
        assert!(map.is_eligible("Uni-Lions", 2022));
    }

    #[test]
    fn test_parse_entries_json() {
        let json = r#"[
            {"label": "中信兄弟", "name": "CTBC Brothers"},
            {"label": "台鋼雄鷹", "name": "TSG Hawks", "first_season": 2024}
        ]"#;
        let entries: Vec<TeamEntry> = serde_json::from_str(json).unwrap();
        let map = TeamMap::from_entries(entries);
        assert_eq!(map.len(), 2);
        assert!(!map.is_eligible("TSG Hawks", 2022));
    }
}
