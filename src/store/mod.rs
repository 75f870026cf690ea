// 🗄️ Persistence boundary
//
// The engine only needs get-or-create by natural key for teams and seasons,
// an atomic append for matches, and a few queries. Two backends:
// - MemoryStore: lives for one run
// - SqliteStore: durable, survives restarts

pub mod memory;
pub mod sqlite;

use crate::entities::{Match, Season, Team};
use crate::error::Result;
use std::collections::BTreeSet;

pub use memory::MemoryStore;
pub use sqlite::{Event, SqliteStore};

/// Storage the registry, ingestor and aggregator run against
///
/// Keys handed to the store are already validated natural keys.
/// `get_or_create_*` must be an atomic insert-if-absent per key.
pub trait Store: Send + Sync {
    /// Existing team with this exact name, or a newly created one
    fn get_or_create_team(&self, name: &str) -> Result<Team>;

    /// Existing season with this start year, or a newly created one
    fn get_or_create_season(&self, start_year: i32) -> Result<Season>;

    fn find_team(&self, name: &str) -> Result<Option<Team>>;

    fn find_season(&self, start_year: i32) -> Result<Option<Season>>;

    /// All teams in creation order
    fn all_teams(&self) -> Result<Vec<Team>>;

    /// All seasons ordered by start year
    fn all_seasons(&self) -> Result<Vec<Season>>;

    /// Append matches as one unit: either all are stored or none
    fn append_matches(&self, matches: &[Match]) -> Result<()>;

    /// Matches of a season in creation order
    fn matches_for_season(&self, season: &Season) -> Result<Vec<Match>>;

    /// Matches of a season where `team` played either side, in creation order
    fn matches_for_team(&self, team: &Team, season: &Season) -> Result<Vec<Match>> {
        Ok(self
            .matches_for_season(season)?
            .into_iter()
            .filter(|m| m.involves(team))
            .collect())
    }

    /// Every match of a team across all seasons, ordered by date
    fn team_history(&self, team: &Team) -> Result<Vec<Match>>;

    /// Matchday numbers of the season that already hold at least one match
    fn ingested_matchdays(&self, season: &Season) -> Result<BTreeSet<u32>> {
        Ok(self
            .matches_for_season(season)?
            .iter()
            .map(|m| m.matchday)
            .collect())
    }

    /// Total number of stored matches
    fn count_matches(&self) -> Result<usize>;
}
