use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of ingesting one season file, kept so the dashboard can show
/// analysts exactly what was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub id: Option<i64>,
    /// Season file path (or fetch source) the games came from.
    pub source: String,
    pub year: u16,
    pub rows_read: usize,
    pub games_kept: usize,
    pub dropped_unmapped: usize,
    pub dropped_malformed: usize,
    pub ingested_at: DateTime<Utc>,
}

impl IngestReport {
    pub fn dropped_total(&self) -> usize {
        self.dropped_unmapped + self.dropped_malformed
    }
}
