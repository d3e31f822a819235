use serde::Serialize;

use crate::records::{MatchRecord, Outcome};

/// Derived team performance numbers. All zero for an empty record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamMetrics {
    pub total_games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub total_goals_scored: u32,
    pub total_goals_conceded: u32,
    pub total_points: u32,
    pub avg_scored: f64,
    pub avg_conceded: f64,
    /// Percentage of games won, rounded to 2 decimal places.
    pub win_rate: f64,
    pub clean_sheets: u32,
}

pub fn aggregate(records: &[MatchRecord]) -> TeamMetrics {
    let mut m = TeamMetrics::default();

    for record in records {
        m.total_games = m.total_games.saturating_add(1);
        m.total_goals_scored = m.total_goals_scored.saturating_add(record.goals_scored);
        m.total_goals_conceded = m.total_goals_conceded.saturating_add(record.goals_conceded);

        let outcome = record.outcome();
        m.total_points = m.total_points.saturating_add(outcome.points());
        match outcome {
            Outcome::Win => m.wins += 1,
            Outcome::Draw => m.draws += 1,
            Outcome::Loss => m.losses += 1,
        }
        if record.is_clean_sheet() {
            m.clean_sheets += 1;
        }
    }

    if m.total_games > 0 {
        let games = m.total_games as f64;
        m.avg_scored = m.total_goals_scored as f64 / games;
        m.avg_conceded = m.total_goals_conceded as f64 / games;
        m.win_rate = round2(m.wins as f64 / games * 100.0);
    }

    m
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
