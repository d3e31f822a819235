//! CSV-backed match records table.
//!
//! The table is the single source of truth and is only ever appended to. An
//! append copies the bytes already on disk, adds one row, and renames the copy
//! into place, so rows this version cannot read survive untouched and a crash
//! mid-write never leaves a truncated table.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::tally::{decode_roster, encode_roster, PlayerTally};
use super::{MatchRecord, Squad, ValidationError};

/// Column order of the records table.
pub const HEADERS: [&str; 14] = [
    "Date",
    "Time",
    "Pitch",
    "Opposition",
    "Goals Scored",
    "Goals Conceded",
    "Own Goals",
    "Players",
    "Scorers",
    "Assists",
    "Blue Cards",
    "Yellow Cards",
    "Red Cards",
    "Missed",
];

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("records table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("records table {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// What was dropped while reading historical rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Rows that could not be read at all (bad date/time, unreadable CSV row).
    pub rows_skipped: usize,
    /// Malformed `Name (n)` tokens skipped inside otherwise readable rows.
    pub entries_skipped: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rows_skipped == 0 && self.entries_skipped == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Loaded {
    pub records: Vec<MatchRecord>,
    pub report: LoadReport,
}

/// Append-only store of match records.
#[derive(Clone)]
pub struct RecordStore {
    path: Arc<PathBuf>,
    squad: Arc<Squad>,
    /// Held across load-validate-append-persist so writers never interleave.
    writer: Arc<Mutex<()>>,
}

impl RecordStore {
    /// Open the table at `path`, creating a header-only table if it does not exist.
    pub fn open(path: impl Into<PathBuf>, squad: Squad) -> Result<Self, StoreError> {
        let path = path.into();
        let store = RecordStore {
            path: Arc::new(path),
            squad: Arc::new(squad),
            writer: Arc::new(Mutex::new(())),
        };

        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| store.io_err(e))?;
            }
            let header = append_row(&[], None).map_err(|e| store.csv_err(e))?;
            store.persist(&header)?;
            info!("Created records table {}", store.path.display());
        }

        Ok(store)
    }

    pub fn squad(&self) -> &Squad {
        &self.squad
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// All records in stored order.
    pub fn load_all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self.load_with_report()?.records)
    }

    /// All records plus a count of what had to be skipped.
    pub fn load_with_report(&self) -> Result<Loaded, StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        self.read_table()
    }

    /// Validate and append one record.
    /// On any error the table is left as it was.
    pub fn append(&self, record: MatchRecord) -> Result<(), StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        record.validate(&self.squad)?;

        let existing = match std::fs::read(self.path.as_path()) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(self.io_err(e)),
        };
        let table = append_row(&existing, Some(&record)).map_err(|e| self.csv_err(e))?;
        self.persist(&table)?;

        info!("Match record appended to {}", self.path.display());
        Ok(())
    }

    fn read_table(&self) -> Result<Loaded, StoreError> {
        match std::fs::File::open(self.path.as_path()) {
            Ok(file) => read_records(file).map_err(|e| self.csv_err(e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Loaded::default()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    /// Write `table` to a temporary file beside the target, fsync, rename.
    fn persist(&self, table: &[u8]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        tmp.write_all(table).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(self.path.as_path())
            .map_err(|e| self.io_err(e.error))?;

        debug!("Persisted {} bytes to {}", table.len(), self.path.display());
        Ok(())
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> StoreError {
        StoreError::Csv {
            path: self.path.display().to_string(),
            source,
        }
    }
}

// ── Row codec ────────────────────────────────────────────────────────────────

/// One row as read from disk. Every column is optional so tables written by
/// older versions (a single `Score` column, no cards or own goals) still load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Pitch")]
    pitch: String,
    #[serde(rename = "Opposition")]
    opposition: String,
    #[serde(rename = "Goals Scored")]
    goals_scored: Option<String>,
    #[serde(rename = "Goals Conceded")]
    goals_conceded: Option<String>,
    #[serde(rename = "Score")]
    score: Option<String>,
    #[serde(rename = "Own Goals")]
    own_goals: String,
    #[serde(rename = "Players")]
    players: String,
    #[serde(rename = "Scorers")]
    scorers: String,
    #[serde(rename = "Assists")]
    assists: String,
    #[serde(rename = "Blue Cards")]
    blue_cards: String,
    #[serde(rename = "Yellow Cards")]
    yellow_cards: String,
    #[serde(rename = "Red Cards")]
    red_cards: String,
    #[serde(rename = "Missed")]
    missed: String,
}

fn read_records<R: Read>(rdr: R) -> Result<Loaded, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let mut loaded = Loaded::default();

    for (idx, result) in reader.deserialize::<RawRow>().enumerate() {
        let row_no = idx + 2; // header is row 1
        match result {
            Ok(raw) => match row_to_record(raw, row_no, &mut loaded.report) {
                Some(record) => loaded.records.push(record),
                None => loaded.report.rows_skipped += 1,
            },
            Err(e) if e.is_io_error() => return Err(e),
            Err(e) => {
                warn!("Skipping unreadable records row {}: {}", row_no, e);
                loaded.report.rows_skipped += 1;
            }
        }
    }

    Ok(loaded)
}

fn row_to_record(raw: RawRow, row_no: usize, report: &mut LoadReport) -> Option<MatchRecord> {
    let date = match NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT) {
        Ok(d) => d,
        Err(e) => {
            warn!("Skipping records row {}: bad date '{}' ({})", row_no, raw.date, e);
            return None;
        }
    };
    let time = match parse_time(&raw.time) {
        Some(t) => t,
        None => {
            warn!("Skipping records row {}: bad time '{}'", row_no, raw.time);
            return None;
        }
    };

    // Each side comes from its own column, falling back to the legacy `Score`.
    let legacy = raw.score.as_deref().and_then(parse_score);
    if legacy.is_none() && (raw.goals_scored.is_none() || raw.goals_conceded.is_none()) {
        warn!("Records row {} is missing part of its score; counting it as 0", row_no);
    }
    let goals_scored = match raw.goals_scored.as_deref() {
        Some(s) => parse_goals(s, row_no),
        None => legacy.map_or(0, |(ours, _)| ours),
    };
    let goals_conceded = match raw.goals_conceded.as_deref() {
        Some(c) => parse_goals(c, row_no),
        None => legacy.map_or(0, |(_, theirs)| theirs),
    };

    let mut tally = |column: &str, text: &str| -> PlayerTally {
        let (tally, errors) = PlayerTally::decode(text);
        for e in &errors {
            warn!("Records row {} {}: {}", row_no, column, e);
        }
        report.entries_skipped += errors.len();
        tally
    };

    Some(MatchRecord {
        date,
        time,
        pitch: raw.pitch,
        opposition: raw.opposition,
        goals_scored,
        goals_conceded,
        own_goals: tally("Own Goals", &raw.own_goals),
        scorers: tally("Scorers", &raw.scorers),
        assists: tally("Assists", &raw.assists),
        blue_cards: tally("Blue Cards", &raw.blue_cards),
        yellow_cards: tally("Yellow Cards", &raw.yellow_cards),
        red_cards: tally("Red Cards", &raw.red_cards),
        players: decode_roster(&raw.players),
        missed: decode_roster(&raw.missed),
    })
}

/// The bytes of `table` with `record` added as a new last row.
///
/// Existing rows are copied verbatim. If the header lacks any current column
/// it is rewritten with the missing ones added at the end, so older rows stay
/// aligned and simply read those columns as empty. With no record, only the
/// header is produced.
fn append_row(table: &[u8], record: Option<&MatchRecord>) -> Result<Vec<u8>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(table);
    let existing = reader.headers()?.clone();
    let body_start = reader.position().byte() as usize;

    let mut columns: Vec<&str> = existing.iter().collect();
    for name in HEADERS {
        if !columns.contains(&name) {
            columns.push(name);
        }
    }

    let mut out = if columns.len() == existing.len() {
        table.to_vec()
    } else {
        let mut rebuilt = encode_line(&columns)?;
        rebuilt.extend_from_slice(table.get(body_start..).unwrap_or_default());
        rebuilt
    };

    if let Some(r) = record {
        if !out.is_empty() && !out.ends_with(b"\n") {
            out.push(b'\n');
        }
        let cells: Vec<String> = columns.iter().map(|c| encode_cell(c, r)).collect();
        out.extend_from_slice(&encode_line(&cells)?);
    }
    Ok(out)
}

fn encode_line<I, T>(fields: I) -> Result<Vec<u8>, csv::Error>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(fields)?;
    wtr.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

fn encode_cell(column: &str, r: &MatchRecord) -> String {
    match column {
        "Date" => r.date.format(DATE_FORMAT).to_string(),
        "Time" => r.time.format(TIME_FORMAT).to_string(),
        "Pitch" => r.pitch.clone(),
        "Opposition" => r.opposition.clone(),
        "Goals Scored" => r.goals_scored.to_string(),
        "Goals Conceded" => r.goals_conceded.to_string(),
        "Score" => format!("{} - {}", r.goals_scored, r.goals_conceded),
        "Own Goals" => r.own_goals.encode(),
        "Players" => encode_roster(&r.players),
        "Scorers" => r.scorers.encode(),
        "Assists" => r.assists.encode(),
        "Blue Cards" => r.blue_cards.encode(),
        "Yellow Cards" => r.yellow_cards.encode(),
        "Red Cards" => r.red_cards.encode(),
        "Missed" => encode_roster(&r.missed),
        _ => String::new(),
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

fn parse_goals(s: &str, row_no: usize) -> u32 {
    s.trim().parse().unwrap_or_else(|_| {
        warn!("Records row {}: unreadable goal count '{}', using 0", row_no, s);
        0
    })
}

/// Legacy `"4 - 3"` score column (ours first).
fn parse_score(s: &str) -> Option<(u32, u32)> {
    let (ours, theirs) = s.split_once('-')?;
    Some((ours.trim().parse().ok()?, theirs.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{squad, submission};
    use crate::records::Contribution;

    fn store_in(dir: &tempfile::TempDir) -> RecordStore {
        RecordStore::open(dir.path().join("results.csv"), squad()).unwrap()
    }

    #[test]
    fn test_open_creates_header_only_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(text.trim_end(), HEADERS.join(","));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_missing_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("results.csv");
        let store = RecordStore::open(&path, squad()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut sub = submission(3, 1, &[("AJ", 2), ("Bir", 1)]);
        sub.contributions.insert(
            "Viv".into(),
            Contribution {
                assists: 2,
                yellow_cards: 1,
                own_goals: 1,
                ..Default::default()
            },
        );
        sub.opposition = "Sporting, Lisbon".into();
        let first = sub.into_record(store.squad()).unwrap();
        let second = submission(0, 0, &[]).into_record(store.squad()).unwrap();

        store.append(first.clone()).unwrap();
        store.append(second.clone()).unwrap();

        let loaded = store.load_with_report().unwrap();
        assert!(loaded.report.is_clean());
        assert_eq!(loaded.records, vec![first, second]);
    }

    #[test]
    fn test_rejected_append_leaves_table_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .append(submission(1, 0, &[("AJ", 1)]).into_record(store.squad()).unwrap())
            .unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        let mut bad = submission(2, 0, &[("AJ", 2)]).into_record(store.squad()).unwrap();
        bad.goals_scored = 5;
        let err = store.append(bad).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::GoalMismatch { declared: 5, scored: 2 })
        ));

        assert_eq!(store.load_all().unwrap().len(), 1);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_reads_legacy_score_column() {
        let csv = "Date,Time,Pitch,Opposition,Score,Players,Scorers,Assists,Missed\n\
                   07/01/2025,21:00,Pitch 4,Ball Street Boys,4 - 3,\"AJ, Bir\",\"AJ (3), Bir (1)\",Bir (2),Joe\n";
        let loaded = read_records(csv.as_bytes()).unwrap();
        assert_eq!(loaded.records.len(), 1);
        let r = &loaded.records[0];
        assert_eq!((r.goals_scored, r.goals_conceded), (4, 3));
        assert_eq!(r.scorers.get("AJ"), 3);
        assert_eq!(r.assists.get("Bir"), 2);
        assert!(r.red_cards.is_empty());
        assert!(r.missed.contains("Joe"));
    }

    #[test]
    fn test_skips_bad_rows_and_tokens() {
        let csv = "Date,Time,Pitch,Opposition,Goals Scored,Goals Conceded,Scorers\n\
                   not-a-date,21:00,P1,X,1,0,AJ (1)\n\
                   14/01/2025,20:00,P1,Y,2,2,\"AJ (1), Bir (one)\"\n";
        let loaded = read_records(csv.as_bytes()).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.report.rows_skipped, 1);
        assert_eq!(loaded.report.entries_skipped, 1);
        assert_eq!(loaded.records[0].scorers.get("AJ"), 1);
    }

    #[test]
    fn test_append_keeps_rows_it_cannot_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let original = format!(
            "{}\n\
             2025-01-07,21:00,Pitch 2,Old Opp,1,0,,AJ,AJ (1)\n\
             14/01/2025,20:00,Pitch 4,Y,2,2,,\"AJ, Bir\",\"AJ (1), Bir (one)\"\n",
            HEADERS.join(",")
        );
        std::fs::write(&path, &original).unwrap();
        let store = RecordStore::open(&path, squad()).unwrap();

        let record = submission(1, 0, &[("AJ", 1)]).into_record(store.squad()).unwrap();
        store.append(record.clone()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&original));
        assert!(text.contains("Old Opp"));
        assert!(text.contains("AJ (1), Bir (one)"));

        let loaded = store.load_with_report().unwrap();
        assert_eq!(loaded.report.rows_skipped, 1);
        assert_eq!(loaded.report.entries_skipped, 1);
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1], record);
    }

    #[test]
    fn test_append_to_legacy_table_adds_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let old_row = "07/01/2025,21:00,Pitch 4,Ball Street Boys,4 - 3,\"AJ, Bir\",\"AJ (3), Bir (1)\",Bir (2),Joe\n";
        std::fs::write(
            &path,
            format!("Date,Time,Pitch,Opposition,Score,Players,Scorers,Assists,Missed\n{old_row}"),
        )
        .unwrap();
        let store = RecordStore::open(&path, squad()).unwrap();

        let mut sub = submission(2, 1, &[("Bir", 2)]);
        sub.contributions.insert(
            "Viv".into(),
            Contribution {
                red_cards: 1,
                ..Default::default()
            },
        );
        let record = sub.into_record(store.squad()).unwrap();
        store.append(record.clone()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("Date,Time,Pitch,Opposition,Score,"));
        assert!(header.ends_with("Red Cards"));
        assert!(text.contains(old_row));

        let loaded = store.load_with_report().unwrap();
        assert!(loaded.report.is_clean());
        assert_eq!(loaded.records.len(), 2);
        assert_eq!((loaded.records[0].goals_scored, loaded.records[0].goals_conceded), (4, 3));
        assert_eq!(loaded.records[1], record);
    }

    #[test]
    fn test_seconds_are_dropped_before_storage() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let mut sub = submission(0, 0, &[]);
        sub.time = NaiveTime::from_hms_opt(21, 0, 30).unwrap();
        let record = sub.into_record(store.squad()).unwrap();
        assert_eq!(record.time, NaiveTime::from_hms_opt(21, 0, 0).unwrap());

        store.append(record.clone()).unwrap();
        assert_eq!(store.load_all().unwrap(), vec![record]);
    }

    #[test]
    fn test_goal_columns_read_independently() {
        let csv = "Date,Time,Pitch,Opposition,Goals Scored,Goals Conceded,Score\n\
                   14/01/2025,20:00,P1,Y,3,,\n\
                   21/01/2025,20:00,P1,Z,,2,5 - 2\n";
        let loaded = read_records(csv.as_bytes()).unwrap();
        let scores: Vec<(u32, u32)> = loaded
            .records
            .iter()
            .map(|r| (r.goals_scored, r.goals_conceded))
            .collect();
        assert_eq!(scores, vec![(3, 0), (5, 2)]);
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("4 - 3"), Some((4, 3)));
        assert_eq!(parse_score("0-0"), Some((0, 0)));
        assert_eq!(parse_score("abandoned"), None);
    }
}
