use serde::Serialize;

use super::schema::GameRecord;

/// Which side of the scoreline a team played on. A team's home and away game
/// sets are disjoint subsets of the same season's games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Home,
    Away,
}

/// A team's per-game values for one role, in source (chronological) order.
/// Order matters: the paired comparison pairs entries by position.
#[derive(Debug, Clone, Default)]
pub struct RoleSample {
    pub wins: Vec<f64>,
    pub scores: Vec<f64>,
}

impl RoleSample {
    pub fn len(&self) -> usize {
        self.wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }
}

/// Mean statistics for one (team, role) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleAggregate {
    pub games: usize,
    /// Mean of the win indicator, in [0, 1].
    pub win_rate: f64,
    pub avg_score: f64,
}

/// Collect a team's per-game values for the requested role only. Home
/// aggregates look at `home_team` exclusively, away aggregates at
/// `away_team`.
pub fn role_sample(games: &[GameRecord], team: &str, role: Role) -> RoleSample {
    let mut sample = RoleSample::default();
    for g in games {
        match role {
            Role::Home if g.home_team == team => {
                sample.wins.push(f64::from(g.home_win));
                sample.scores.push(f64::from(g.home_score));
            }
            Role::Away if g.away_team == team => {
                sample.wins.push(f64::from(g.away_win));
                sample.scores.push(f64::from(g.away_score));
            }
            _ => {}
        }
    }
    sample
}

/// Arithmetic means over a role sample. `None` for an empty sample; an
/// undefined aggregate is reported, never silently zero.
pub fn aggregate(sample: &RoleSample) -> Option<RoleAggregate> {
    if sample.is_empty() {
        return None;
    }
    let n = sample.len();
    let games = n as f64;
    Some(RoleAggregate {
        games: n,
        win_rate: sample.wins.iter().sum::<f64>() / games,
        avg_score: sample.scores.iter().sum::<f64>() / games,
    })
}

/// Canonical team names appearing as home teams, sorted ascending. This is
/// the candidate set for the metrics table.
pub fn home_teams(games: &[GameRecord]) -> Vec<String> {
    let mut teams: Vec<String> = games.iter().map(|g| g.home_team.clone()).collect();
    teams.sort();
    teams.dedup();
    teams
}
