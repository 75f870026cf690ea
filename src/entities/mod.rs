// Entity Models
//
// Each entity has a stable identity (UUID) that never changes and a natural
// key the registry deduplicates on. Matches reference teams and seasons by
// identity.

pub mod matches;
pub mod season;
pub mod team;

pub use matches::{fixture_fingerprint, Match, Outcome, Scorers, SideResult, TeamOutcome};
pub use season::{matchdays_for_start_year, Season, MAX_SEASON_YEAR, MIN_SEASON_YEAR};
pub use team::{Team, MAX_TEAM_NAME_LEN};
