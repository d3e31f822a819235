//! Superlative queries: who leads the squad in a counted field.
//!
//! Ties are never broken: every player level with the maximum is returned,
//! in squad order. A maximum of zero means nobody qualifies.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::players::PlayerTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Goals,
    Assists,
    Appearances,
    MissedGames,
    OwnGoals,
    BlueCards,
    YellowCards,
    RedCards,
}

impl StatField {
    pub const ALL: [StatField; 8] = [
        StatField::Goals,
        StatField::Assists,
        StatField::Appearances,
        StatField::MissedGames,
        StatField::OwnGoals,
        StatField::BlueCards,
        StatField::YellowCards,
        StatField::RedCards,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatField::Goals => "goals",
            StatField::Assists => "assists",
            StatField::Appearances => "appearances",
            StatField::MissedGames => "missed_games",
            StatField::OwnGoals => "own_goals",
            StatField::BlueCards => "blue_cards",
            StatField::YellowCards => "yellow_cards",
            StatField::RedCards => "red_cards",
        }
    }

    /// Dashboard caption for the leader of this field.
    pub fn title(self) -> &'static str {
        match self {
            StatField::Goals => "Top Scorer(s)",
            StatField::Assists => "Most Assists",
            StatField::Appearances => "Most Appearances",
            StatField::MissedGames => "Most Games Missed",
            StatField::OwnGoals => "Most Own Goals",
            StatField::BlueCards => "Most Blue Cards",
            StatField::YellowCards => "Most Yellow Cards",
            StatField::RedCards => "Most Red Cards",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Leaderboard {
    NoQualifyingPlayer,
    Leaders { value: u32, players: Vec<String> },
}

impl fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaderboard::NoQualifyingPlayer => write!(f, "N/A"),
            Leaderboard::Leaders { players, .. } => write!(f, "{}", players.join(", ")),
        }
    }
}

pub fn leaderboard(table: &PlayerTable, field: StatField) -> Leaderboard {
    let max = table
        .rows()
        .iter()
        .map(|r| r.stats.get(field))
        .max()
        .unwrap_or(0);
    if max == 0 {
        return Leaderboard::NoQualifyingPlayer;
    }

    let players = table
        .rows()
        .iter()
        .filter(|r| r.stats.get(field) == max)
        .map(|r| r.player.clone())
        .collect();
    Leaderboard::Leaders { value: max, players }
}
