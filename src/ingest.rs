// 📥 Match Ingestor - Validate, resolve, construct, then commit
//
// Order of work for every raw match:
// 1. Validate raw values (goals, matchday, names, season year). No side effects.
// 2. Resolve season and teams through the registry (may create entities).
// 3. Build the Match (identity check on the resolved teams).
// 4. Write it. Only this step touches the match collection.
//
// A failure at any step before 4 leaves no match behind.

use crate::entities::{Match, Scorers, Season, Team};
use crate::error::{Result, ValidationError};
use crate::producer::RawMatch;
use crate::registry::EntityRegistry;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, info};

// ============================================================================
// RAW VALUE CHECKS
// ============================================================================

/// Highest goal count accepted for one side of a match
pub const MAX_GOALS: u32 = 99;

fn check_goals(field: &str, goals: i64) -> std::result::Result<u32, ValidationError> {
    match u32::try_from(goals) {
        Ok(n) if n <= MAX_GOALS => Ok(n),
        _ => Err(ValidationError::new(
            "Match",
            field,
            format!("Must be a goal count in 0..={}, got {}", MAX_GOALS, goals),
        )),
    }
}

fn check_matchday(matchday: i64) -> std::result::Result<u32, ValidationError> {
    match u32::try_from(matchday) {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::new(
            "Match",
            "matchday",
            format!("Must be >= 1, got {}", matchday),
        )),
    }
}

/// Natural keys for both sides; rejects the same club under different casing
fn check_team_names(
    raw_home: &str,
    raw_away: &str,
) -> std::result::Result<(String, String), ValidationError> {
    let home = Team::natural_key(raw_home)?;
    let away = Team::natural_key(raw_away)?;

    if home.to_lowercase() == away.to_lowercase() {
        return Err(ValidationError::new(
            "Match",
            "away_team",
            format!("Home and away team are the same team ({} / {})", home, away),
        ));
    }

    Ok((home, away))
}

// ============================================================================
// MATCH INGESTOR
// ============================================================================

#[derive(Clone, Copy)]
pub struct MatchIngestor<'a> {
    registry: &'a EntityRegistry,
}

impl<'a> MatchIngestor<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        MatchIngestor { registry }
    }

    pub fn registry(&self) -> &'a EntityRegistry {
        self.registry
    }

    /// Validate and build a match without writing it
    #[allow(clippy::too_many_arguments)]
    pub fn prepare(
        &self,
        season_year: i32,
        matchday: i64,
        date: NaiveDate,
        raw_home_team: &str,
        raw_away_team: &str,
        home_goals: i64,
        away_goals: i64,
    ) -> Result<Match> {
        let home_goals = check_goals("home_goals", home_goals)?;
        let away_goals = check_goals("away_goals", away_goals)?;
        let matchday = check_matchday(matchday)?;
        let (home_name, away_name) = check_team_names(raw_home_team, raw_away_team)?;
        Season::validate_start_year(season_year)?;

        let season = self.registry.resolve_season(season_year)?;
        let home_team = self.registry.resolve_team(&home_name)?;
        let away_team = self.registry.resolve_team(&away_name)?;

        let m = Match::try_new(season, matchday, date, home_team, away_team, home_goals, away_goals)?;
        Ok(m)
    }

    /// Record one observed match. Every call creates a new historical record.
    #[allow(clippy::too_many_arguments)]
    pub fn ingest(
        &self,
        season_year: i32,
        matchday: i64,
        date: NaiveDate,
        raw_home_team: &str,
        raw_away_team: &str,
        home_goals: i64,
        away_goals: i64,
    ) -> Result<Match> {
        let m = self.prepare(
            season_year,
            matchday,
            date,
            raw_home_team,
            raw_away_team,
            home_goals,
            away_goals,
        )?;
        self.commit_one(m)
    }

    /// Validate and build a producer record (scorers included) without writing it
    pub fn prepare_record(
        &self,
        season_year: i32,
        matchday: i64,
        date: NaiveDate,
        raw: &RawMatch,
    ) -> Result<Match> {
        let m = self.prepare(
            season_year,
            matchday,
            date,
            &raw.home_team,
            &raw.away_team,
            raw.home_goals,
            raw.away_goals,
        )?;

        Ok(m.with_scorers(Scorers {
            home: raw.home_scorers.clone(),
            away: raw.away_scorers.clone(),
        }))
    }

    /// Record one producer record
    pub fn ingest_record(
        &self,
        season_year: i32,
        matchday: i64,
        date: NaiveDate,
        raw: &RawMatch,
    ) -> Result<Match> {
        let m = self.prepare_record(season_year, matchday, date, raw)?;
        self.commit_one(m)
    }

    /// Start a session whose staged matches are committed as one unit
    pub fn session(&self) -> IngestSession<'a> {
        IngestSession {
            ingestor: *self,
            staged: Vec::new(),
            fingerprints: HashSet::new(),
        }
    }

    fn commit_one(&self, m: Match) -> Result<Match> {
        self.registry.store().append_matches(std::slice::from_ref(&m))?;
        debug!(
            season = %m.season,
            matchday = m.matchday,
            home = %m.home_team,
            away = %m.away_team,
            score = %format!("{}-{}", m.home_goals, m.away_goals),
            "match ingested"
        );
        Ok(m)
    }
}

// ============================================================================
// INGEST SESSION
// ============================================================================

/// Unit of work over several matches
///
/// Staging validates and builds; nothing reaches the store until `commit`,
/// which appends everything staged at once. Dropping the session discards it.
pub struct IngestSession<'a> {
    ingestor: MatchIngestor<'a>,
    staged: Vec<Match>,
    fingerprints: HashSet<String>,
}

impl<'a> IngestSession<'a> {
    /// Validate and stage a producer record
    ///
    /// The same fixture (season, matchday, home, away) cannot be staged twice.
    pub fn stage(
        &mut self,
        season_year: i32,
        matchday: i64,
        date: NaiveDate,
        raw: &RawMatch,
    ) -> Result<&Match> {
        let m = self
            .ingestor
            .prepare_record(season_year, matchday, date, raw)?;

        let fingerprint = m.fingerprint();
        if self.fingerprints.contains(&fingerprint) {
            return Err(ValidationError::new(
                "Match",
                "fixture",
                format!(
                    "{} vs {} appears twice in matchday {}",
                    m.home_team, m.away_team, m.matchday
                ),
            )
            .into());
        }

        self.fingerprints.insert(fingerprint);
        self.staged.push(m);
        Ok(&self.staged[self.staged.len() - 1])
    }

    pub fn staged(&self) -> &[Match] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Append every staged match atomically
    pub fn commit(self) -> Result<Vec<Match>> {
        if self.staged.is_empty() {
            return Ok(self.staged);
        }

        self.ingestor
            .registry
            .store()
            .append_matches(&self.staged)?;
        info!(matches = self.staged.len(), "session committed");
        Ok(self.staged)
    }

    /// Drop everything staged; returns how many matches were discarded
    pub fn discard(self) -> usize {
        let dropped = self.staged.len();
        if dropped > 0 {
            debug!(matches = dropped, "session discarded");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Outcome;
    use crate::store::{MemoryStore, SqliteStore, Store};
    use std::sync::Arc;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(Arc::new(MemoryStore::new()))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 9, 19).unwrap()
    }

    #[test]
    fn test_ingest_valid_match() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let m = ingestor
            .ingest(2020, 1, date(), "Fiorentina", "Torino", 1, 0)
            .unwrap();

        assert_eq!(m.season.start_year, 2020);
        assert_eq!(m.matchday, 1);
        assert_eq!(m.outcome(), Outcome::HomeWin);
        assert_eq!(m.winner().unwrap().name, "Fiorentina");

        let season = registry.find_season(2020).unwrap().unwrap();
        assert_eq!(registry.store().matches_for_season(&season).unwrap().len(), 1);
    }

    #[test]
    fn test_winner_follows_score_for_many_scores() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        for (hg, ag) in [(0, 0), (1, 0), (0, 1), (4, 4), (5, 2), (2, 5)] {
            let m = ingestor
                .ingest(2020, 1, date(), "Home", "Away", hg, ag)
                .unwrap();
            let expected = if hg > ag {
                Some("Home")
            } else if ag > hg {
                Some("Away")
            } else {
                None
            };
            assert_eq!(m.winner().map(|t| t.name.as_str()), expected);
        }
    }

    #[test]
    fn test_same_team_is_rejected() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let err = ingestor
            .ingest(2020, 1, date(), "Milan", "Milan", 1, 1)
            .unwrap_err();
        assert!(err.is_validation());

        // Casing and whitespace do not bypass the check
        let err = ingestor
            .ingest(2020, 1, date(), "Milan", " milan ", 1, 1)
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(registry.store().count_matches().unwrap(), 0);
    }

    #[test]
    fn test_negative_goals_are_rejected_before_any_write() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let err = ingestor
            .ingest(2020, 1, date(), "Spezia", "Udinese", -1, 0)
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().field, "home_goals");

        let err = ingestor
            .ingest(2020, 1, date(), "Spezia", "Udinese", 0, -3)
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().field, "away_goals");

        // Raw checks run before resolution, so nothing was created
        assert_eq!(registry.team_count().unwrap(), 0);
        assert_eq!(registry.season_count().unwrap(), 0);
        assert_eq!(registry.store().count_matches().unwrap(), 0);
    }

    #[test]
    fn test_implausible_goal_count_is_rejected() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        ingestor
            .ingest(2020, 1, date(), "Spezia", "Udinese", i64::from(MAX_GOALS), 0)
            .unwrap();

        for bad in [i64::from(MAX_GOALS) + 1, i64::from(u32::MAX)] {
            let err = ingestor
                .ingest(2020, 1, date(), "Spezia", "Udinese", bad, 0)
                .unwrap_err();
            assert_eq!(err.as_validation().unwrap().field, "home_goals");
        }
        assert_eq!(registry.store().count_matches().unwrap(), 1);
    }

    #[test]
    fn test_matchday_must_be_positive() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        for bad in [0, -1] {
            let err = ingestor
                .ingest(2020, bad, date(), "Spezia", "Udinese", 0, 0)
                .unwrap_err();
            assert_eq!(err.as_validation().unwrap().field, "matchday");
        }
    }

    #[test]
    fn test_bad_season_year_is_rejected() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let err = ingestor
            .ingest(-1, 1, date(), "Spezia", "Udinese", 0, 0)
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().field, "start_year");
        assert_eq!(registry.team_count().unwrap(), 0);
    }

    #[test]
    fn test_reingest_creates_second_record() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let a = ingestor.ingest(2020, 1, date(), "Roma", "Verona", 0, 0).unwrap();
        let b = ingestor.ingest(2020, 1, date(), "Roma", "Verona", 0, 0).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.home_team, b.home_team);
        assert_eq!(registry.store().count_matches().unwrap(), 2);
        assert_eq!(registry.team_count().unwrap(), 2);
    }

    #[test]
    fn test_ingest_record_keeps_scorers() {
        let registry = EntityRegistry::new(Arc::new(SqliteStore::open_in_memory().unwrap()));
        let ingestor = MatchIngestor::new(&registry);

        let raw = RawMatch::new("Inter", "Benevento", 5, 2).with_scorers(
            vec!["Lukaku".to_string(), "Lukaku".to_string()],
            vec!["Caprari".to_string()],
        );
        let m = ingestor.ingest_record(2020, 2, date(), &raw).unwrap();

        let stored = registry.store().matches_for_season(&m.season).unwrap();
        assert_eq!(stored[0].scorers.home.len(), 2);
        assert_eq!(stored[0].scorers.away, vec!["Caprari".to_string()]);
    }

    #[test]
    fn test_session_commits_all_at_once() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let mut session = ingestor.session();
        session.stage(2020, 1, date(), &RawMatch::new("Parma", "Napoli", 0, 2)).unwrap();
        session.stage(2020, 1, date(), &RawMatch::new("Genoa", "Crotone", 4, 1)).unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.staged()[1].home_team.name, "Genoa");

        // Nothing visible before commit
        assert_eq!(registry.store().count_matches().unwrap(), 0);

        let committed = session.commit().unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(registry.store().count_matches().unwrap(), 2);
    }

    #[test]
    fn test_session_failure_does_not_corrupt_staged() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let mut session = ingestor.session();
        session.stage(2020, 1, date(), &RawMatch::new("Parma", "Napoli", 0, 2)).unwrap();
        assert!(session
            .stage(2020, 1, date(), &RawMatch::new("Genoa", "Genoa", 1, 1))
            .is_err());
        assert_eq!(session.len(), 1);

        assert_eq!(session.discard(), 1);
        assert_eq!(registry.store().count_matches().unwrap(), 0);
    }

    #[test]
    fn test_session_rejects_duplicate_fixture() {
        let registry = registry();
        let ingestor = MatchIngestor::new(&registry);

        let mut session = ingestor.session();
        session.stage(2020, 3, date(), &RawMatch::new("Lazio", "Atalanta", 1, 4)).unwrap();
        let err = session
            .stage(2020, 3, date(), &RawMatch::new("Lazio", "Atalanta", 1, 4))
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().field, "fixture");

        // The reverse fixture is a different match
        session.stage(2020, 3, date(), &RawMatch::new("Atalanta", "Lazio", 0, 0)).unwrap();
        assert_eq!(session.len(), 2);
    }
}
