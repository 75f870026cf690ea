// 📇 Entity Registry - Canonical teams and seasons
//
// "Juventus" seen on matchday 1 and "Juventus" seen on matchday 38 must be
// the same entity, in this run and in every later run against the same store.
//
// The registry validates natural keys, delegates insert-if-absent to the
// store, and keeps an identity map. If the store ever answers with a
// different identity for a key already mapped, that is a consistency error:
// nothing is silently picked.

use crate::entities::{Season, Team};
use crate::error::{LeagueError, Result};
use crate::store::Store;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

pub struct EntityRegistry {
    store: Arc<dyn Store>,

    /// name -> Team
    teams: RwLock<HashMap<String, Team>>,

    /// start year -> Season
    seasons: RwLock<HashMap<i32, Season>>,
}

impl EntityRegistry {
    /// Create a registry over an injected store. One per run.
    pub fn new(store: Arc<dyn Store>) -> Self {
        EntityRegistry {
            store,
            teams: RwLock::new(HashMap::new()),
            seasons: RwLock::new(HashMap::new()),
        }
    }

    /// Backing store, for match writes and queries
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    // ========================================================================
    // TEAMS
    // ========================================================================

    /// Get-or-create the team with this exact (trimmed) name
    pub fn resolve_team(&self, raw_name: &str) -> Result<Team> {
        let name = Team::natural_key(raw_name)?;

        if let Some(team) = self.teams.read()?.get(&name) {
            return Ok(team.clone());
        }

        let team = self.store.get_or_create_team(&name)?;
        self.remember_team(&name, team)
    }

    /// Lookup without creating
    pub fn find_team(&self, raw_name: &str) -> Result<Option<Team>> {
        let name = Team::natural_key(raw_name)?;

        if let Some(team) = self.teams.read()?.get(&name) {
            return Ok(Some(team.clone()));
        }

        match self.store.find_team(&name)? {
            Some(team) => self.remember_team(&name, team).map(Some),
            None => Ok(None),
        }
    }

    fn remember_team(&self, name: &str, team: Team) -> Result<Team> {
        let mut teams = self.teams.write()?;

        // Another caller may have mapped the key while we were in the store
        if let Some(known) = teams.get(name) {
            if !known.same_identity(&team) {
                return Err(LeagueError::Consistency {
                    entity: "team",
                    key: name.to_string(),
                    detail: format!("registry holds {} but store returned {}", known.id, team.id),
                });
            }
            return Ok(known.clone());
        }

        debug!(team = %team.name, id = %team.id, "team resolved");
        teams.insert(name.to_string(), team.clone());
        Ok(team)
    }

    // ========================================================================
    // SEASONS
    // ========================================================================

    /// Get-or-create the season starting in `start_year`
    pub fn resolve_season(&self, start_year: i32) -> Result<Season> {
        let start_year = Season::validate_start_year(start_year)?;

        if let Some(season) = self.seasons.read()?.get(&start_year) {
            return Ok(season.clone());
        }

        let season = self.store.get_or_create_season(start_year)?;
        self.remember_season(start_year, season)
    }

    /// Lookup without creating
    pub fn find_season(&self, start_year: i32) -> Result<Option<Season>> {
        let start_year = Season::validate_start_year(start_year)?;

        if let Some(season) = self.seasons.read()?.get(&start_year) {
            return Ok(Some(season.clone()));
        }

        match self.store.find_season(start_year)? {
            Some(season) => self.remember_season(start_year, season).map(Some),
            None => Ok(None),
        }
    }

    fn remember_season(&self, start_year: i32, season: Season) -> Result<Season> {
        let mut seasons = self.seasons.write()?;

        if let Some(known) = seasons.get(&start_year) {
            if known.id != season.id {
                return Err(LeagueError::Consistency {
                    entity: "season",
                    key: start_year.to_string(),
                    detail: format!(
                        "registry holds {} but store returned {}",
                        known.id, season.id
                    ),
                });
            }
            return Ok(known.clone());
        }

        debug!(season = %season.label(), id = %season.id, "season resolved");
        seasons.insert(start_year, season.clone());
        Ok(season)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Number of teams known to the store
    pub fn team_count(&self) -> Result<usize> {
        Ok(self.store.all_teams()?.len())
    }

    /// Number of seasons known to the store
    pub fn season_count(&self) -> Result<usize> {
        Ok(self.store.all_seasons()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore};

    fn registry() -> EntityRegistry {
        EntityRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_resolve_team_is_idempotent() {
        let registry = registry();

        let a = registry.resolve_team("Juventus").unwrap();
        let b = registry.resolve_team("Juventus").unwrap();
        let c = registry.resolve_team("  Juventus ").unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(registry.team_count().unwrap(), 1);
    }

    #[test]
    fn test_resolve_team_many_names() {
        let registry = registry();
        let names = ["Inter", "Milan", "Roma", "Lazio", "Inter", "Roma"];

        for name in names {
            registry.resolve_team(name).unwrap();
        }

        // Never two teams for one name
        let teams = registry.store().all_teams().unwrap();
        assert_eq!(teams.len(), 4);
        let unique: std::collections::HashSet<&str> =
            teams.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(unique.len(), teams.len());
    }

    #[test]
    fn test_resolve_team_rejects_empty_name() {
        let registry = registry();
        let err = registry.resolve_team("   ").unwrap_err();
        assert!(err.is_validation());
        assert_eq!(registry.team_count().unwrap(), 0);
    }

    #[test]
    fn test_resolve_season_is_idempotent() {
        let registry = registry();
        let a = registry.resolve_season(2020).unwrap();
        let b = registry.resolve_season(2020).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.end_year(), 2021);
        assert_eq!(registry.season_count().unwrap(), 1);
    }

    #[test]
    fn test_resolve_season_rejects_implausible_year() {
        let registry = registry();
        assert!(registry.resolve_season(0).unwrap_err().is_validation());
        assert!(registry.resolve_season(-5).unwrap_err().is_validation());
        assert!(registry.resolve_season(99999).unwrap_err().is_validation());
        assert_eq!(registry.season_count().unwrap(), 0);
    }

    #[test]
    fn test_find_does_not_create() {
        let registry = registry();
        assert!(registry.find_team("Verona").unwrap().is_none());
        assert!(registry.find_season(1990).unwrap().is_none());

        let created = registry.resolve_team("Verona").unwrap();
        assert_eq!(registry.find_team("Verona").unwrap(), Some(created));
    }

    #[test]
    fn test_identity_survives_new_registry_on_durable_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("league.db");

        let (team_id, season_id) = {
            let registry = EntityRegistry::new(Arc::new(SqliteStore::open(&path).unwrap()));
            (
                registry.resolve_team("Napoli").unwrap().id,
                registry.resolve_season(1986).unwrap().id,
            )
        };

        // Simulated restart
        let registry = EntityRegistry::new(Arc::new(SqliteStore::open(&path).unwrap()));
        assert_eq!(registry.resolve_team("Napoli").unwrap().id, team_id);
        assert_eq!(registry.resolve_season(1986).unwrap().id, season_id);
        assert_eq!(registry.team_count().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_resolution_yields_one_identity() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve_team("Bologna").unwrap().id)
            })
            .collect();

        let ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(registry.team_count().unwrap(), 1);
    }

    /// Store that mints a fresh identity on every call
    struct ForgetfulStore(MemoryStore);

    impl Store for ForgetfulStore {
        fn get_or_create_team(&self, name: &str) -> Result<Team> {
            Ok(Team::new(name.to_string()))
        }
        fn get_or_create_season(&self, start_year: i32) -> Result<Season> {
            Ok(Season::new(start_year))
        }
        fn find_team(&self, name: &str) -> Result<Option<Team>> {
            Ok(Some(Team::new(name.to_string())))
        }
        fn find_season(&self, start_year: i32) -> Result<Option<Season>> {
            Ok(Some(Season::new(start_year)))
        }
        fn all_teams(&self) -> Result<Vec<Team>> {
            self.0.all_teams()
        }
        fn all_seasons(&self) -> Result<Vec<Season>> {
            self.0.all_seasons()
        }
        fn append_matches(&self, matches: &[crate::entities::Match]) -> Result<()> {
            self.0.append_matches(matches)
        }
        fn matches_for_season(&self, season: &Season) -> Result<Vec<crate::entities::Match>> {
            self.0.matches_for_season(season)
        }
        fn team_history(&self, team: &Team) -> Result<Vec<crate::entities::Match>> {
            self.0.team_history(team)
        }
        fn count_matches(&self) -> Result<usize> {
            self.0.count_matches()
        }
    }

    #[test]
    fn test_conflicting_identity_is_a_consistency_error() {
        let registry = EntityRegistry::new(Arc::new(ForgetfulStore(MemoryStore::new())));

        // First sight maps the key
        registry.resolve_team("Lecce").unwrap();

        // Cache hit short-circuits the store, so force a store round trip
        let fresh = Team::new("Lecce".to_string());
        let err = registry.remember_team("Lecce", fresh).unwrap_err();
        assert!(err.is_consistency());

        registry.resolve_season(2019).unwrap();
        let err = registry.remember_season(2019, Season::new(2019)).unwrap_err();
        assert!(err.is_consistency());
    }
}
