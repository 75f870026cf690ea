// In-memory store: one lock over all state, so every get-or-create and
// every append is atomic.

use super::Store;
use crate::entities::{Match, Season, Team};
use crate::error::{LeagueError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct MemoryState {
    teams: Vec<Team>,
    team_index: HashMap<String, usize>,
    seasons: Vec<Season>,
    season_index: HashMap<i32, usize>,
    /// Append-only
    matches: Vec<Match>,
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_or_create_team(&self, name: &str) -> Result<Team> {
        let mut state = self.state.write()?;

        if let Some(&idx) = state.team_index.get(name) {
            return Ok(state.teams[idx].clone());
        }

        let team = Team::new(name.to_string());
        let idx = state.teams.len();
        state.teams.push(team.clone());
        state.team_index.insert(name.to_string(), idx);
        Ok(team)
    }

    fn get_or_create_season(&self, start_year: i32) -> Result<Season> {
        let mut state = self.state.write()?;

        if let Some(&idx) = state.season_index.get(&start_year) {
            return Ok(state.seasons[idx].clone());
        }

        let season = Season::new(start_year);
        let idx = state.seasons.len();
        state.seasons.push(season.clone());
        state.season_index.insert(start_year, idx);
        Ok(season)
    }

    fn find_team(&self, name: &str) -> Result<Option<Team>> {
        let state = self.state.read()?;
        Ok(state.team_index.get(name).map(|&idx| state.teams[idx].clone()))
    }

    fn find_season(&self, start_year: i32) -> Result<Option<Season>> {
        let state = self.state.read()?;
        Ok(state
            .season_index
            .get(&start_year)
            .map(|&idx| state.seasons[idx].clone()))
    }

    fn all_teams(&self) -> Result<Vec<Team>> {
        Ok(self.state.read()?.teams.clone())
    }

    fn all_seasons(&self) -> Result<Vec<Season>> {
        let mut seasons = self.state.read()?.seasons.clone();
        seasons.sort_by_key(|s| s.start_year);
        Ok(seasons)
    }

    fn append_matches(&self, matches: &[Match]) -> Result<()> {
        let mut state = self.state.write()?;

        // Check every reference before touching the collection
        for m in matches {
            let season_known = state
                .season_index
                .get(&m.season.start_year)
                .map(|&idx| state.seasons[idx].id == m.season.id)
                .unwrap_or(false);
            if !season_known {
                return Err(LeagueError::Consistency {
                    entity: "season",
                    key: m.season.start_year.to_string(),
                    detail: format!("match {} references a season this store does not hold", m.id),
                });
            }

            for team in [&m.home_team, &m.away_team] {
                let team_known = state
                    .team_index
                    .get(&team.name)
                    .map(|&idx| state.teams[idx].id == team.id)
                    .unwrap_or(false);
                if !team_known {
                    return Err(LeagueError::Consistency {
                        entity: "team",
                        key: team.name.clone(),
                        detail: format!("match {} references a team this store does not hold", m.id),
                    });
                }
            }
        }

        state.matches.extend(matches.iter().cloned());
        Ok(())
    }

    fn matches_for_season(&self, season: &Season) -> Result<Vec<Match>> {
        let state = self.state.read()?;
        Ok(state
            .matches
            .iter()
            .filter(|m| m.season == *season)
            .cloned()
            .collect())
    }

    fn team_history(&self, team: &Team) -> Result<Vec<Match>> {
        let state = self.state.read()?;
        let mut history: Vec<Match> = state
            .matches
            .iter()
            .filter(|m| m.involves(team))
            .cloned()
            .collect();
        // Stable: same-day matches keep creation order
        history.sort_by_key(|m| m.date);
        Ok(history)
    }

    fn count_matches(&self) -> Result<usize> {
        Ok(self.state.read()?.matches.len())
    }
}
