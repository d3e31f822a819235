use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use super::leaderboard::StatField;
use crate::records::{MatchRecord, Squad};

/// Derived per-player totals. Never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStatLine {
    pub appearances: u32,
    pub missed_games: u32,
    pub goals: u32,
    pub own_goals: u32,
    pub assists: u32,
    pub blue_cards: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
}

impl PlayerStatLine {
    pub fn get(&self, field: StatField) -> u32 {
        match field {
            StatField::Appearances => self.appearances,
            StatField::MissedGames => self.missed_games,
            StatField::Goals => self.goals,
            StatField::OwnGoals => self.own_goals,
            StatField::Assists => self.assists,
            StatField::BlueCards => self.blue_cards,
            StatField::YellowCards => self.yellow_cards,
            StatField::RedCards => self.red_cards,
        }
    }

    fn get_mut(&mut self, field: StatField) -> &mut u32 {
        match field {
            StatField::Appearances => &mut self.appearances,
            StatField::MissedGames => &mut self.missed_games,
            StatField::Goals => &mut self.goals,
            StatField::OwnGoals => &mut self.own_goals,
            StatField::Assists => &mut self.assists,
            StatField::BlueCards => &mut self.blue_cards,
            StatField::YellowCards => &mut self.yellow_cards,
            StatField::RedCards => &mut self.red_cards,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRow {
    pub player: String,
    #[serde(flatten)]
    pub stats: PlayerStatLine,
}

/// Player → stat line, in squad order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlayerTable {
    rows: Vec<PlayerRow>,
}

impl PlayerTable {
    #[cfg(test)]
    pub fn get(&self, player: &str) -> Option<&PlayerStatLine> {
        self.rows
            .iter()
            .find(|r| r.player == player)
            .map(|r| &r.stats)
    }

    pub fn rows(&self) -> &[PlayerRow] {
        &self.rows
    }

    /// Goals descending, then name ascending.
    pub fn sorted_for_display(&self) -> Vec<PlayerRow> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            b.stats
                .goals
                .cmp(&a.stats.goals)
                .then_with(|| a.player.cmp(&b.player))
        });
        rows
    }
}

/// Recomputes player stat lines from the full record sequence.
pub struct PlayerAggregator<'a> {
    squad: &'a Squad,
}

impl<'a> PlayerAggregator<'a> {
    pub fn new(squad: &'a Squad) -> Self {
        PlayerAggregator { squad }
    }

    pub fn aggregate(&self, records: &[MatchRecord]) -> PlayerTable {
        let mut rows: Vec<PlayerRow> = self
            .squad
            .players()
            .iter()
            .map(|p| PlayerRow {
                player: p.clone(),
                stats: PlayerStatLine::default(),
            })
            .collect();
        let index: HashMap<&str, usize> = self
            .squad
            .players()
            .iter()
            .enumerate()
            .map(|(i, p)| (p.as_str(), i))
            .collect();

        let credit = |rows: &mut [PlayerRow],
                      record: &MatchRecord,
                      player: &str,
                      field: StatField,
                      n: u32| {
            match index.get(player) {
                Some(&i) => {
                    let total = rows[i].stats.get_mut(field);
                    *total = total.saturating_add(n);
                }
                None => warn!(
                    "Ignoring {} for unknown player '{}' in match on {} vs {}",
                    field.key(),
                    player,
                    record.date.format("%d/%m/%Y"),
                    record.opposition
                ),
            }
        };

        for record in records {
            for player in &record.players {
                credit(&mut rows, record, player.as_str(), StatField::Appearances, 1);
            }
            for player in &record.missed {
                credit(&mut rows, record, player.as_str(), StatField::MissedGames, 1);
            }
            let tallies = [
                (StatField::Goals, &record.scorers),
                (StatField::OwnGoals, &record.own_goals),
                (StatField::Assists, &record.assists),
                (StatField::BlueCards, &record.blue_cards),
                (StatField::YellowCards, &record.yellow_cards),
                (StatField::RedCards, &record.red_cards),
            ];
            for (field, tally) in tallies {
                for (player, count) in tally.iter() {
                    credit(&mut rows, record, player, field, count);
                }
            }
        }

        PlayerTable { rows }
    }
}
