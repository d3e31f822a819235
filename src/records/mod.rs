use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod store;
pub mod tally;

pub use store::{Loaded, RecordStore, StoreError};
pub use tally::{PlayerTally, Roster};

/// Default roster used when no `--squad` is configured.
pub const DEFAULT_SQUAD: &[&str] = &[
    "AJ", "Himza", "Bir", "Bhavs", "Speirs", "Jakes", "Viv", "Minal", "Deelan", "Rush B",
    "Rush N", "Joe",
];

/// Default number of players allowed on the pitch in one fixture.
pub const DEFAULT_MAX_PLAYERS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SquadError {
    #[error("squad must contain at least one player")]
    Empty,
    #[error("squad contains a blank player name")]
    BlankName,
    #[error("player '{0}' is listed twice in the squad")]
    Duplicate(String),
    #[error("max players per match must be between 1 and {squad_size}, got {max}")]
    MaxPlayers { max: usize, squad_size: usize },
}

/// The fixed, ordered roster every record is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Squad {
    players: Vec<String>,
    max_per_match: usize,
}

impl Squad {
    pub fn new<I, S>(names: I, max_per_match: usize) -> Result<Self, SquadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut players: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(SquadError::BlankName);
            }
            if players.iter().any(|p| p == name) {
                return Err(SquadError::Duplicate(name.to_string()));
            }
            players.push(name.to_string());
        }
        if players.is_empty() {
            return Err(SquadError::Empty);
        }
        if max_per_match == 0 || max_per_match > players.len() {
            return Err(SquadError::MaxPlayers {
                max: max_per_match,
                squad_size: players.len(),
            });
        }
        Ok(Squad {
            players,
            max_per_match,
        })
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    pub fn contains(&self, player: &str) -> bool {
        self.players.iter().any(|p| p == player)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn max_per_match(&self) -> usize {
        self.max_per_match
    }

    /// Squad members not in `roster`.
    pub fn absent_from(&self, roster: &Roster) -> Roster {
        self.players
            .iter()
            .filter(|p| !roster.contains(p.as_str()))
            .cloned()
            .collect()
    }
}

/// Why a record was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("goal mismatch: {declared} goals declared but scorers account for {scored}")]
    GoalMismatch { declared: u32, scored: u32 },
    #[error("unknown player '{player}' in {field}")]
    UnknownPlayer { player: String, field: &'static str },
    #[error("too many players: {count} selected, at most {max} allowed")]
    TooManyPlayers { count: usize, max: usize },
    #[error("roster mismatch: '{player}' {problem}")]
    RosterMismatch {
        player: String,
        problem: &'static str,
    },
}

impl ValidationError {
    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::GoalMismatch { .. } => "goal mismatch",
            ValidationError::UnknownPlayer { .. } => "unknown player",
            ValidationError::TooManyPlayers { .. } => "too many players",
            ValidationError::RosterMismatch { .. } => "roster mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn points(self) -> u32 {
        match self {
            Outcome::Win => 3,
            Outcome::Draw => 1,
            Outcome::Loss => 0,
        }
    }
}

/// One played fixture. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub pitch: String,
    pub opposition: String,
    pub goals_scored: u32,
    /// Includes own goals conceded by our players.
    pub goals_conceded: u32,
    pub own_goals: PlayerTally,
    pub players: Roster,
    pub scorers: PlayerTally,
    pub assists: PlayerTally,
    pub blue_cards: PlayerTally,
    pub yellow_cards: PlayerTally,
    pub red_cards: PlayerTally,
    pub missed: Roster,
}

impl MatchRecord {
    pub fn outcome(&self) -> Outcome {
        match self.goals_scored.cmp(&self.goals_conceded) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Loss,
        }
    }

    pub fn is_clean_sheet(&self) -> bool {
        self.goals_conceded == 0
    }

    /// Every per-player tally with its column name.
    pub fn tallies(&self) -> [(&'static str, &PlayerTally); 6] {
        [
            ("scorers", &self.scorers),
            ("own goals", &self.own_goals),
            ("assists", &self.assists),
            ("blue cards", &self.blue_cards),
            ("yellow cards", &self.yellow_cards),
            ("red cards", &self.red_cards),
        ]
    }

    /// Check the record against the squad before it is stored.
    pub fn validate(&self, squad: &Squad) -> Result<(), ValidationError> {
        if self.players.len() > squad.max_per_match() {
            return Err(ValidationError::TooManyPlayers {
                count: self.players.len(),
                max: squad.max_per_match(),
            });
        }

        for (field, roster) in [("players", &self.players), ("missed", &self.missed)] {
            if let Some(player) = roster.iter().find(|p| !squad.contains(p)) {
                return Err(ValidationError::UnknownPlayer {
                    player: player.clone(),
                    field,
                });
            }
        }

        for (field, tally) in self.tallies() {
            if let Some(player) = tally.players().find(|p| !squad.contains(p)) {
                return Err(ValidationError::UnknownPlayer {
                    player: player.to_string(),
                    field,
                });
            }
        }

        if let Some(player) = self.players.intersection(&self.missed).next() {
            return Err(ValidationError::RosterMismatch {
                player: player.clone(),
                problem: "is listed as both playing and missing",
            });
        }
        if let Some(player) = squad
            .players()
            .iter()
            .find(|p| !self.players.contains(p.as_str()) && !self.missed.contains(p.as_str()))
        {
            return Err(ValidationError::RosterMismatch {
                player: player.clone(),
                problem: "is neither playing nor missing",
            });
        }

        let scored = self.scorers.total();
        if scored != self.goals_scored {
            return Err(ValidationError::GoalMismatch {
                declared: self.goals_scored,
                scored,
            });
        }

        Ok(())
    }
}

/// Per-player numbers entered on the match form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contribution {
    pub goals: u32,
    pub assists: u32,
    pub own_goals: u32,
    pub blue_cards: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
}

/// Raw match form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSubmission {
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub pitch: String,
    #[serde(default)]
    pub opposition: String,
    pub goals_scored: u32,
    /// Goals the opposition scored themselves, not counting our own goals.
    pub goals_conceded: u32,
    pub players: Vec<String>,
    #[serde(default)]
    pub contributions: BTreeMap<String, Contribution>,
}

impl MatchSubmission {
    /// Build and validate the stored record. Own goals are added to the
    /// conceded count and `missed` is derived from the squad.
    pub fn into_record(self, squad: &Squad) -> Result<MatchRecord, ValidationError> {
        if let Some(player) = self.contributions.keys().find(|p| !squad.contains(p)) {
            return Err(ValidationError::UnknownPlayer {
                player: player.clone(),
                field: "contributions",
            });
        }

        let players: Roster = self
            .players
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if let Some(player) = self.contributions.keys().find(|p| !players.contains(p.as_str())) {
            return Err(ValidationError::RosterMismatch {
                player: player.clone(),
                problem: "has contributions but did not play",
            });
        }
        let missed = squad.absent_from(&players);

        let tally = |pick: fn(&Contribution) -> u32| -> PlayerTally {
            self.contributions
                .iter()
                .map(|(player, c)| (player.as_str(), pick(c)))
                .collect()
        };
        let own_goals = tally(|c| c.own_goals);
        let goals_conceded = self.goals_conceded.saturating_add(own_goals.total());

        let record = MatchRecord {
            date: self.date,
            // The table stores minutes only.
            time: NaiveTime::from_hms_opt(self.time.hour(), self.time.minute(), 0)
                .unwrap_or(self.time),
            pitch: self.pitch.trim().to_string(),
            opposition: self.opposition.trim().to_string(),
            goals_scored: self.goals_scored,
            goals_conceded,
            scorers: tally(|c| c.goals),
            assists: tally(|c| c.assists),
            blue_cards: tally(|c| c.blue_cards),
            yellow_cards: tally(|c| c.yellow_cards),
            red_cards: tally(|c| c.red_cards),
            own_goals,
            players,
            missed,
        };
        record.validate(squad)?;
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn squad() -> Squad {
        Squad::new(DEFAULT_SQUAD.iter().copied(), DEFAULT_MAX_PLAYERS).unwrap()
    }

    pub(crate) fn submission(scored: u32, conceded: u32, goals: &[(&str, u32)]) -> MatchSubmission {
        let mut contributions = BTreeMap::new();
        for (player, g) in goals {
            contributions.insert(
                player.to_string(),
                Contribution {
                    goals: *g,
                    ..Default::default()
                },
            );
        }
        MatchSubmission {
            date: NaiveDate::from_ymd_opt(2025, 1, 14).unwrap(),
            time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            pitch: "Pitch 4".into(),
            opposition: "Real Ale Madrid".into(),
            goals_scored: scored,
            goals_conceded: conceded,
            players: DEFAULT_SQUAD[..8].iter().map(|p| p.to_string()).collect(),
            contributions,
        }
    }

    #[test]
    fn test_squad_rejects_duplicates_and_blanks() {
        assert_eq!(
            Squad::new(["AJ", "Bir", "AJ"], 2),
            Err(SquadError::Duplicate("AJ".into()))
        );
        assert_eq!(Squad::new(["AJ", " "], 1), Err(SquadError::BlankName));
        assert_eq!(Squad::new(Vec::<&str>::new(), 1), Err(SquadError::Empty));
        assert!(matches!(
            Squad::new(["AJ"], 2),
            Err(SquadError::MaxPlayers { .. })
        ));
    }

    #[test]
    fn test_into_record_derives_missed() {
        let record = submission(4, 1, &[("AJ", 2), ("Bir", 2)])
            .into_record(&squad())
            .unwrap();
        assert_eq!(record.players.len(), 8);
        let missed: Vec<&str> = record.missed.iter().map(String::as_str).collect();
        assert_eq!(missed, vec!["Deelan", "Joe", "Rush B", "Rush N"]);
        assert!(!record.missed.contains("Minal"));
    }

    #[test]
    fn test_own_goals_added_to_conceded() {
        let mut sub = submission(2, 2, &[("AJ", 2)]);
        sub.contributions.insert(
            "Jakes".into(),
            Contribution {
                own_goals: 1,
                ..Default::default()
            },
        );
        let record = sub.into_record(&squad()).unwrap();
        assert_eq!(record.goals_conceded, 3);
        assert_eq!(record.own_goals.get("Jakes"), 1);
        assert_eq!(record.outcome(), Outcome::Loss);
    }

    #[test]
    fn test_goal_mismatch_rejected() {
        let err = submission(3, 0, &[("AJ", 2)])
            .into_record(&squad())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::GoalMismatch {
                declared: 3,
                scored: 2
            }
        );
        assert_eq!(err.reason(), "goal mismatch");
    }

    #[test]
    fn test_unknown_player_rejected() {
        let err = submission(1, 0, &[("Messi", 1)])
            .into_record(&squad())
            .unwrap_err();
        assert_eq!(err.reason(), "unknown player");

        let mut sub = submission(0, 0, &[]);
        sub.players[0] = "Ronaldo".into();
        let err = sub.into_record(&squad()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownPlayer {
                player: "Ronaldo".into(),
                field: "players"
            }
        );
    }

    #[test]
    fn test_contributions_from_absent_player_rejected() {
        // Joe is in the squad but not among the eight who played.
        let err = submission(1, 0, &[("Joe", 1)])
            .into_record(&squad())
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::RosterMismatch {
                player: "Joe".into(),
                problem: "has contributions but did not play"
            }
        );
    }

    #[test]
    fn test_too_many_players_rejected() {
        let mut sub = submission(0, 0, &[]);
        sub.players = DEFAULT_SQUAD.iter().map(|p| p.to_string()).collect();
        let err = sub.into_record(&squad()).unwrap_err();
        assert_eq!(err, ValidationError::TooManyPlayers { count: 12, max: 8 });
    }

    #[test]
    fn test_validate_catches_broken_partition() {
        let mut record = submission(0, 0, &[]).into_record(&squad()).unwrap();
        record.missed.remove("Joe");
        let err = record.validate(&squad()).unwrap_err();
        assert_eq!(err.reason(), "roster mismatch");

        record.missed.insert("Joe".into());
        record.missed.insert("AJ".into());
        let err = record.validate(&squad()).unwrap_err();
        assert_eq!(err.reason(), "roster mismatch");
    }

    #[test]
    fn test_outcome_points() {
        let win = submission(2, 1, &[("AJ", 2)]).into_record(&squad()).unwrap();
        let draw = submission(1, 1, &[("AJ", 1)]).into_record(&squad()).unwrap();
        assert_eq!(win.outcome().points(), 3);
        assert_eq!(draw.outcome().points(), 1);
        assert!(!win.is_clean_sheet());
    }
}
