//! Presentation of the cached league tables: trimmed columns, numbered rows,
//! our team highlighted, promotion and relegation places marked.

use serde::Serialize;

use super::LeagueTable;

/// Standings columns not worth showing.
pub const HIDDEN_STANDINGS_COLUMNS: [&str; 3] = ["FF", "FA", "B"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Substring identifying our team in the scraped tables.
    pub team_name: String,
    /// Positions 1..=promotion_places are marked as going up.
    pub promotion_places: usize,
    /// Positions from this one down are marked as going down.
    pub relegation_from: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn standings_view(table: &LeagueTable, opts: &DisplayOptions) -> DisplayTable {
    let trimmed = table.without_columns(&HIDDEN_STANDINGS_COLUMNS);
    let team_col = trimmed.column("Team");
    let decorate_places = trimmed.rows.len() >= 2;

    let mut view = numbered(&trimmed);
    if let Some(col) = team_col.map(|c| c + 1) {
        for (i, row) in view.rows.iter_mut().enumerate() {
            let position = i + 1;
            let mut name = highlight(&row[col], &opts.team_name);
            if decorate_places && position <= opts.promotion_places {
                name.push_str(" ⬆️");
            }
            if decorate_places && position >= opts.relegation_from {
                name.push_str(" ⬇️");
            }
            row[col] = name;
        }
    }
    view
}

pub fn results_view(table: &LeagueTable, opts: &DisplayOptions) -> DisplayTable {
    let mut view = numbered(table);
    let cols: Vec<usize> = ["Home Team", "Away Team"]
        .iter()
        .filter_map(|name| table.column(name))
        .map(|c| c + 1)
        .collect();
    for row in &mut view.rows {
        for &col in &cols {
            row[col] = highlight(&row[col], &opts.team_name);
        }
    }
    view
}

/// Prefix a 1-based position column.
fn numbered(table: &LeagueTable) -> DisplayTable {
    let mut headers = Vec::with_capacity(table.headers.len() + 1);
    headers.push("#".to_string());
    headers.extend(table.headers.iter().cloned());

    let rows = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut out = Vec::with_capacity(headers.len());
            out.push((i + 1).to_string());
            out.extend(row.iter().cloned());
            out.resize(headers.len(), String::new());
            out
        })
        .collect();

    DisplayTable { headers, rows }
}

fn highlight(name: &str, team: &str) -> String {
    if !team.is_empty() && name.contains(team) {
        format!("🔥{}🔥", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> DisplayOptions {
        DisplayOptions {
            team_name: "Maradonners".into(),
            promotion_places: 2,
            relegation_from: 4,
        }
    }

    fn standings() -> LeagueTable {
        let teams = ["Maradonners FC", "Ball Street Boys", "Real Ale Madrid", "Inter Manchego"];
        LeagueTable::new(
            vec!["Team".into(), "FF".into(), "FA".into(), "B".into(), "Pts".into()],
            teams
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    vec![
                        t.to_string(),
                        "0".into(),
                        "0".into(),
                        "1".into(),
                        (12 - i * 3).to_string(),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_standings_view() {
        let view = standings_view(&standings(), &opts());
        assert_eq!(view.headers, vec!["#", "Team", "Pts"]);
        assert_eq!(view.rows[0], vec!["1", "🔥Maradonners FC🔥 ⬆️", "12"]);
        assert_eq!(view.rows[1][1], "Ball Street Boys ⬆️");
        assert_eq!(view.rows[2][1], "Real Ale Madrid");
        assert_eq!(view.rows[3][1], "Inter Manchego ⬇️");
    }

    #[test]
    fn test_single_row_has_no_place_markers() {
        let mut table = standings();
        table.rows.truncate(1);
        let view = standings_view(&table, &opts());
        assert_eq!(view.rows[0][1], "🔥Maradonners FC🔥");
    }

    #[test]
    fn test_results_view_highlights_both_sides() {
        let table = LeagueTable::new(
            vec!["Date".into(), "Home Team".into(), "Score".into(), "Away Team".into()],
            vec![
                vec!["Tue".into(), "Inter Manchego".into(), "0 - 3".into(), "Maradonners FC".into()],
                vec!["Tue".into(), "Real Ale Madrid".into(), "1 - 1".into(), "Ball Street Boys".into()],
            ],
        );
        let view = results_view(&table, &opts());
        assert_eq!(view.headers[0], "#");
        assert_eq!(view.rows[0][4], "🔥Maradonners FC🔥");
        assert_eq!(view.rows[1][0], "2");
        assert_eq!(view.rows[1][2], "Real Ale Madrid");
    }
}
