//! Player → count tallies and the text format the match records table uses
//! for them: `"AJ (2), Bir (1)"` for tallies and `"AJ, Bir"` for rosters.
//!
//! This is the only place that knows about the string encoding; everything
//! else works with [`PlayerTally`] and [`Roster`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A set of player names (who played, who missed).
pub type Roster = BTreeSet<String>;

/// A single `Name (n)` token that could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed tally entry '{token}': {reason}")]
pub struct ParseError {
    pub token: String,
    pub reason: &'static str,
}

/// Mapping player → count. Zero counts are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct PlayerTally(BTreeMap<String, u32>);

impl PlayerTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` to `player`. Repeated entries for one player accumulate.
    pub fn add(&mut self, player: &str, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.0.entry(player.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    #[cfg(test)]
    pub fn get(&self, player: &str) -> u32 {
        self.0.get(player).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u32 {
        self.0.values().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(p, c)| (p.as_str(), *c))
    }

    pub fn players(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Encode as `"Name (n), Name (n)"`, names in sorted order.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(player, count)| format!("{} ({})", player, count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Decode a tally column. Malformed tokens are skipped and returned
    /// alongside the tally; decoding itself never fails.
    pub fn decode(text: &str) -> (Self, Vec<ParseError>) {
        let mut tally = PlayerTally::new();
        let mut errors = Vec::new();

        for token in text.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_token(token) {
                Ok((player, count)) => tally.add(player, count),
                Err(e) => errors.push(e),
            }
        }

        (tally, errors)
    }
}

impl From<BTreeMap<String, u32>> for PlayerTally {
    fn from(map: BTreeMap<String, u32>) -> Self {
        let mut tally = PlayerTally::new();
        for (player, count) in map {
            tally.add(&player, count);
        }
        tally
    }
}

impl From<PlayerTally> for BTreeMap<String, u32> {
    fn from(tally: PlayerTally) -> Self {
        tally.0
    }
}

impl<S: AsRef<str>> FromIterator<(S, u32)> for PlayerTally {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut tally = PlayerTally::new();
        for (player, count) in iter {
            tally.add(player.as_ref(), count);
        }
        tally
    }
}

/// Parse one `Name (n)` token. The split is on the last `" ("` so names may
/// themselves contain spaces.
fn parse_token(token: &str) -> Result<(&str, u32), ParseError> {
    let fail = |reason| ParseError {
        token: token.to_string(),
        reason,
    };

    let (name, rest) = token
        .rsplit_once(" (")
        .ok_or_else(|| fail("missing ' (' before count"))?;
    let digits = rest
        .strip_suffix(')')
        .ok_or_else(|| fail("missing closing ')'"))?;
    let count: u32 = digits
        .trim()
        .parse()
        .map_err(|_| fail("count is not a non-negative integer"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(fail("empty player name"));
    }

    Ok((name, count))
}

/// Encode a roster as `"Name, Name"`.
pub fn encode_roster(roster: &Roster) -> String {
    roster.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Decode a roster column. Blank tokens are ignored.
pub fn decode_roster(text: &str) -> Roster {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
