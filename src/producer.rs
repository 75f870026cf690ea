// 🏗️ Producer Framework
//
// Upstream collaborators (scrapers, archives, exports) hand the driver one
// matchday at a time. This module defines that interface and ships three
// producers:
// - VecProducer: batches already in memory
// - JsonFileProducer: the scraper's championship{year}.json archive
// - CsvProducer: one row per match, consecutive rows grouped by matchday

use crate::error::ProducerError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// CORE TYPES
// ============================================================================

/// One raw match as the producer saw it, before any validation
///
/// Goals and names are kept raw on purpose: negative goals or blank names
/// are rejected by the ingestor, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub home_team: String,
    pub away_team: String,
    pub home_goals: i64,
    pub away_goals: i64,

    #[serde(default)]
    pub home_scorers: Vec<String>,
    #[serde(default)]
    pub away_scorers: Vec<String>,
}

impl RawMatch {
    pub fn new(home_team: &str, away_team: &str, home_goals: i64, away_goals: i64) -> Self {
        RawMatch {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals,
            away_goals,
            home_scorers: Vec::new(),
            away_scorers: Vec::new(),
        }
    }

    /// Builder pattern: add scorers
    pub fn with_scorers(mut self, home: Vec<String>, away: Vec<String>) -> Self {
        self.home_scorers = home;
        self.away_scorers = away;
        self
    }
}

/// All raw matches of one matchday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchdayBatch {
    /// Raw matchday number (validated at ingestion)
    pub matchday: i64,
    pub date: NaiveDate,
    pub matches: Vec<RawMatch>,
}

impl MatchdayBatch {
    pub fn new(matchday: i64, date: NaiveDate, matches: Vec<RawMatch>) -> Self {
        MatchdayBatch {
            matchday,
            date,
            matches,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

// ============================================================================
// PRODUCER TRAIT
// ============================================================================

/// Source of matchday batches, pulled in order by the driver
///
/// - `Ok(Some(batch))`: next matchday
/// - `Ok(None)`: exhausted
/// - `Err(_)`: transport or parse failure upstream
pub trait MatchdayProducer {
    fn next_batch(&mut self) -> Result<Option<MatchdayBatch>, ProducerError>;

    /// Name used in logs and errors
    fn name(&self) -> &str {
        "producer"
    }
}

// ============================================================================
// IN-MEMORY PRODUCER
// ============================================================================

/// Replays a fixed sequence of results; an `Err` entry simulates an upstream failure
pub struct VecProducer {
    items: VecDeque<Result<MatchdayBatch, ProducerError>>,
}

impl VecProducer {
    pub fn new(batches: Vec<MatchdayBatch>) -> Self {
        VecProducer {
            items: batches.into_iter().map(Ok).collect(),
        }
    }

    pub fn from_results(items: Vec<Result<MatchdayBatch, ProducerError>>) -> Self {
        VecProducer {
            items: items.into_iter().collect(),
        }
    }

    /// Batches not yet pulled
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl MatchdayProducer for VecProducer {
    fn next_batch(&mut self) -> Result<Option<MatchdayBatch>, ProducerError> {
        self.items.pop_front().transpose()
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// JSON ARCHIVE PRODUCER
// ============================================================================

#[derive(Debug, Deserialize)]
struct JsonDate {
    day: u32,
    month: u32,
    year: i32,
}

#[derive(Debug, Deserialize)]
struct JsonSide {
    name: String,
    goals: i64,
    #[serde(default)]
    scorers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JsonMatch {
    team1: JsonSide,
    team2: JsonSide,
}

#[derive(Debug, Deserialize)]
struct JsonMatchday {
    number: i64,
    date: JsonDate,
    #[serde(default)]
    refyear: Option<i32>,
    matches: Vec<JsonMatch>,
}

/// Reads the scraper's archive: a JSON array of matchdays
///
/// ```json
/// [{"number": 1, "date": {"day": 14, "month": 9, "year": 1986},
///   "matches": [{"team1": {"name": "Ascoli", "goals": 1, "scorers": []},
///                "team2": {"name": "Inter", "goals": 0}}]}]
/// ```
///
/// The file is read when the first batch is pulled, so a missing or
/// malformed archive surfaces as a producer error from `next_batch`.
pub struct JsonFileProducer {
    path: PathBuf,
    expected_year: Option<i32>,
    pending: Option<VecDeque<JsonMatchday>>,
}

impl JsonFileProducer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileProducer {
            path: path.into(),
            expected_year: None,
            pending: None,
        }
    }

    /// Builder pattern: reject matchdays whose `refyear` names another season
    pub fn with_expected_year(mut self, start_year: i32) -> Self {
        self.expected_year = Some(start_year);
        self
    }

    /// Archive path for a season inside a data directory
    pub fn season_file(data_dir: &Path, start_year: i32) -> PathBuf {
        data_dir.join(format!("championship{}.json", start_year))
    }

    fn load(&self) -> Result<VecDeque<JsonMatchday>, ProducerError> {
        let file = File::open(&self.path).map_err(|e| {
            ProducerError::new("json", format!("Failed to open {}", self.path.display()))
                .with_cause(e)
        })?;

        let days: Vec<JsonMatchday> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ProducerError::new("json", format!("Failed to parse {}", self.path.display()))
                .with_cause(e)
        })?;

        debug!(path = %self.path.display(), matchdays = days.len(), "archive loaded");
        Ok(days.into())
    }
}

impl MatchdayProducer for JsonFileProducer {
    fn next_batch(&mut self) -> Result<Option<MatchdayBatch>, ProducerError> {
        if self.pending.is_none() {
            self.pending = Some(self.load()?);
        }

        let Some(day) = self.pending.as_mut().and_then(|days| days.pop_front()) else {
            return Ok(None);
        };

        if let (Some(expected), Some(refyear)) = (self.expected_year, day.refyear) {
            if expected != refyear {
                return Err(ProducerError::new(
                    "json",
                    format!(
                        "Matchday {} in {} belongs to season {}, expected {}",
                        day.number,
                        self.path.display(),
                        refyear,
                        expected
                    ),
                ));
            }
        }

        let date = NaiveDate::from_ymd_opt(day.date.year, day.date.month, day.date.day)
            .ok_or_else(|| {
                ProducerError::new(
                    "json",
                    format!(
                        "Matchday {} has an invalid date {}/{}/{}",
                        day.number, day.date.day, day.date.month, day.date.year
                    ),
                )
            })?;

        let matches = day
            .matches
            .into_iter()
            .map(|m| {
                RawMatch::new(&m.team1.name, &m.team2.name, m.team1.goals, m.team2.goals)
                    .with_scorers(m.team1.scorers, m.team2.scorers)
            })
            .collect();

        Ok(Some(MatchdayBatch::new(day.number, date, matches)))
    }

    fn name(&self) -> &str {
        "json"
    }
}

// ============================================================================
// CSV PRODUCER
// ============================================================================

/// CSV format: matchday,date,home_team,away_team,home_goals,away_goals
#[derive(Debug, Deserialize)]
struct CsvRow {
    matchday: i64,
    date: NaiveDate,
    home_team: String,
    away_team: String,
    home_goals: i64,
    away_goals: i64,
}

/// Reads matches row by row; consecutive rows with the same matchday form a batch
pub struct CsvProducer {
    source: String,
    rows: csv::DeserializeRecordsIntoIter<Box<dyn std::io::Read>, CsvRow>,
    lookahead: Option<CsvRow>,
    line: usize,
}

impl CsvProducer {
    pub fn open(path: &Path) -> Result<Self, ProducerError> {
        let file = File::open(path).map_err(|e| {
            ProducerError::new("csv", format!("Failed to open file: {}", path.display()))
                .with_cause(e)
        })?;
        Ok(Self::from_reader(
            &path.display().to_string(),
            Box::new(BufReader::new(file)),
        ))
    }

    pub fn from_reader(source: &str, reader: Box<dyn std::io::Read>) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        CsvProducer {
            source: source.to_string(),
            rows: reader.into_deserialize(),
            lookahead: None,
            line: 1,
        }
    }

    fn next_row(&mut self) -> Result<Option<CsvRow>, ProducerError> {
        if let Some(row) = self.lookahead.take() {
            return Ok(Some(row));
        }

        match self.rows.next() {
            None => Ok(None),
            Some(Ok(row)) => {
                self.line += 1;
                Ok(Some(row))
            }
            Some(Err(e)) => Err(ProducerError::new(
                "csv",
                format!("Failed to parse CSV line {} in {}", self.line + 1, self.source),
            )
            .with_cause(e)),
        }
    }
}

impl MatchdayProducer for CsvProducer {
    fn next_batch(&mut self) -> Result<Option<MatchdayBatch>, ProducerError> {
        let Some(first) = self.next_row()? else {
            return Ok(None);
        };

        let mut batch = MatchdayBatch::new(first.matchday, first.date, Vec::new());
        batch.matches.push(RawMatch::new(
            &first.home_team,
            &first.away_team,
            first.home_goals,
            first.away_goals,
        ));

        while let Some(row) = self.next_row()? {
            if row.matchday != batch.matchday {
                self.lookahead = Some(row);
                break;
            }
            batch.matches.push(RawMatch::new(
                &row.home_team,
                &row.away_team,
                row.home_goals,
                row.away_goals,
            ));
        }

        Ok(Some(batch))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(1986, 9, d).unwrap()
    }

    #[test]
    fn test_vec_producer_replays_in_order() {
        let mut producer = VecProducer::new(vec![
            MatchdayBatch::new(1, date(14), vec![RawMatch::new("Ascoli", "Inter", 1, 0)]),
            MatchdayBatch::new(2, date(21), vec![RawMatch::new("Inter", "Como", 2, 2)]),
        ]);

        assert_eq!(producer.next_batch().unwrap().unwrap().matchday, 1);
        assert_eq!(producer.remaining(), 1);
        assert_eq!(producer.next_batch().unwrap().unwrap().matchday, 2);
        assert!(producer.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_vec_producer_surfaces_errors() {
        let mut producer = VecProducer::from_results(vec![Err(ProducerError::new(
            "memory",
            "page not reachable",
        ))]);
        let err = producer.next_batch().unwrap_err();
        assert_eq!(err.message, "page not reachable");
    }

    #[test]
    fn test_json_producer_reads_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = JsonFileProducer::season_file(dir.path(), 1986);
        assert!(path.ends_with("championship1986.json"));

        std::fs::write(
            &path,
            r#"[
                {"number": 1, "date": {"day": 14, "month": 9, "year": 1986}, "refyear": 1986,
                 "matches": [
                    {"team1": {"name": "Ascoli", "goals": 1, "scorers": ["Barbuti"]},
                     "team2": {"name": "Inter", "goals": 0, "scorers": []}},
                    {"team1": {"name": "Napoli", "goals": 1},
                     "team2": {"name": "Brescia", "goals": 0}}
                 ]},
                {"number": 2, "date": {"day": 21, "month": 9, "year": 1986}, "matches": []}
            ]"#,
        )
        .unwrap();

        let mut producer = JsonFileProducer::new(&path);

        let first = producer.next_batch().unwrap().unwrap();
        assert_eq!(first.matchday, 1);
        assert_eq!(first.date, date(14));
        assert_eq!(first.matches.len(), 2);
        assert_eq!(first.matches[0].home_team, "Ascoli");
        assert_eq!(first.matches[0].home_scorers, vec!["Barbuti".to_string()]);
        assert!(first.matches[1].home_scorers.is_empty());

        let second = producer.next_batch().unwrap().unwrap();
        assert!(second.is_empty());

        assert!(producer.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_json_producer_rejects_archive_of_another_season() {
        let dir = tempfile::tempdir().unwrap();
        let path = JsonFileProducer::season_file(dir.path(), 1987);
        std::fs::write(
            &path,
            r#"[{"number": 1, "date": {"day": 14, "month": 9, "year": 1986}, "refyear": 1986,
                 "matches": [{"team1": {"name": "Ascoli", "goals": 1},
                              "team2": {"name": "Inter", "goals": 0}}]}]"#,
        )
        .unwrap();

        let mut producer = JsonFileProducer::new(&path).with_expected_year(1987);
        let err = producer.next_batch().unwrap_err();
        assert!(err.message.contains("belongs to season 1986"));

        // Without an expected year the archive is taken as is
        let mut producer = JsonFileProducer::new(&path);
        assert_eq!(producer.next_batch().unwrap().unwrap().matches.len(), 1);

        // Matching year passes
        let mut producer = JsonFileProducer::new(&path).with_expected_year(1986);
        assert!(producer.next_batch().unwrap().is_some());
    }

    #[test]
    fn test_json_producer_missing_file_is_producer_error() {
        let mut producer = JsonFileProducer::new("/nonexistent/championship1900.json");
        let err = producer.next_batch().unwrap_err();
        assert_eq!(err.source_name, "json");
        assert!(err.cause.is_some());
    }

    #[test]
    fn test_json_producer_rejects_invalid_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"[{"number": 1, "date": {"day": 31, "month": 2, "year": 1987}, "matches": []}]"#,
        )
        .unwrap();

        let mut producer = JsonFileProducer::new(&path);
        assert!(producer.next_batch().is_err());
    }

    #[test]
    fn test_csv_producer_groups_by_matchday() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("season.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "matchday,date,home_team,away_team,home_goals,away_goals").unwrap();
        writeln!(file, "1,1986-09-14,Ascoli,Inter,1,0").unwrap();
        writeln!(file, "1,1986-09-14, Napoli ,Brescia,1,0").unwrap();
        writeln!(file, "2,1986-09-21,Inter,Como,2,2").unwrap();
        drop(file);

        let mut producer = CsvProducer::open(&path).unwrap();

        let first = producer.next_batch().unwrap().unwrap();
        assert_eq!(first.matchday, 1);
        assert_eq!(first.matches.len(), 2);
        assert_eq!(first.matches[1].home_team, "Napoli");

        let second = producer.next_batch().unwrap().unwrap();
        assert_eq!(second.matchday, 2);
        assert_eq!(second.date, date(21));
        assert_eq!(second.matches, vec![RawMatch::new("Inter", "Como", 2, 2)]);

        assert!(producer.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_csv_producer_bad_row_is_producer_error() {
        let data = "matchday,date,home_team,away_team,home_goals,away_goals\n\
                    1,1986-09-14,Ascoli,Inter,one,0\n";
        let mut producer = CsvProducer::from_reader("inline", Box::new(data.as_bytes()));

        let err = producer.next_batch().unwrap_err();
        assert!(err.message.contains("line 2"));
    }
}
