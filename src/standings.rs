// 🏆 Standings Aggregator - Season table from recorded matches
//
// Pure read over the store. Rows are rebuilt from matches on every call,
// nothing is cached or written.

use crate::entities::{Match, Season, Team, TeamOutcome};
use crate::error::Result;
use crate::store::Store;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

// ============================================================================
// STANDINGS ROW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsRow {
    pub team: String,
    pub points: u32,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_scored: u32,
    pub goals_taken: u32,
    pub goal_difference: i64,
}

impl StandingsRow {
    fn empty(team: &Team) -> Self {
        StandingsRow {
            team: team.name.clone(),
            points: 0,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_scored: 0,
            goals_taken: 0,
            goal_difference: 0,
        }
    }

    fn record(&mut self, m: &Match, team: &Team) {
        let Some(side) = m.result_for(team) else {
            return;
        };

        self.played += 1;
        match side.outcome {
            TeamOutcome::Won => self.won += 1,
            TeamOutcome::Drawn => self.drawn += 1,
            TeamOutcome::Lost => self.lost += 1,
        }
        self.goals_scored = self.goals_scored.saturating_add(side.scored);
        self.goals_taken = self.goals_taken.saturating_add(side.taken);

        self.points = WIN_POINTS * self.won + DRAW_POINTS * self.drawn;
        self.goal_difference = i64::from(self.goals_scored) - i64::from(self.goals_taken);
    }
}

// ============================================================================
// TIE BREAK
// ============================================================================

/// How rows level on points are ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    /// Keep order of first appearance in the season
    #[default]
    EnumerationOrder,

    /// Goal difference, then goals scored, then order of first appearance
    GoalDifference,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::EnumerationOrder => "enumeration",
            TieBreak::GoalDifference => "goal-difference",
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enumeration" | "enumeration-order" => Ok(TieBreak::EnumerationOrder),
            "goal-difference" | "goal_difference" | "gd" => Ok(TieBreak::GoalDifference),
            other => Err(format!(
                "unknown tie-break '{}' (expected 'enumeration' or 'goal-difference')",
                other
            )),
        }
    }
}

// ============================================================================
// TABULATION
// ============================================================================

/// Teams in order of first appearance, home before away
fn playing_teams(matches: &[Match]) -> Vec<&Team> {
    let mut teams: Vec<&Team> = Vec::new();
    for m in matches {
        for team in [&m.home_team, &m.away_team] {
            if !teams.contains(&team) {
                teams.push(team);
            }
        }
    }
    teams
}

/// Build the table for a set of matches of one season
pub fn tabulate(matches: &[Match], tie_break: TieBreak) -> Vec<StandingsRow> {
    let mut rows: Vec<StandingsRow> = playing_teams(matches)
        .into_iter()
        .map(|team| {
            let mut row = StandingsRow::empty(team);
            for m in matches.iter().filter(|m| m.involves(team)) {
                row.record(m, team);
            }
            row
        })
        .collect();

    // sort_by is stable: equal keys keep enumeration order
    match tie_break {
        TieBreak::EnumerationOrder => rows.sort_by(|a, b| b.points.cmp(&a.points)),
        TieBreak::GoalDifference => rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(b.goal_difference.cmp(&a.goal_difference))
                .then(b.goals_scored.cmp(&a.goals_scored))
        }),
    }

    rows
}

// ============================================================================
// AGGREGATOR
// ============================================================================

pub struct StandingsAggregator<'a> {
    store: &'a dyn Store,
    tie_break: TieBreak,
}

impl<'a> StandingsAggregator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        StandingsAggregator {
            store,
            tie_break: TieBreak::default(),
        }
    }

    /// Builder pattern: choose the tie-break policy
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Table of a season, best first. A season without matches gives an empty table.
    pub fn compute_standings(&self, season: &Season) -> Result<Vec<StandingsRow>> {
        let matches = self.store.matches_for_season(season)?;
        let rows = tabulate(&matches, self.tie_break);
        debug!(
            season = %season.label(),
            matches = matches.len(),
            teams = rows.len(),
            tie_break = %self.tie_break,
            "standings computed"
        );
        Ok(rows)
    }

    /// Table of the season starting in `start_year`; unknown seasons are not created
    pub fn compute_standings_for_year(&self, start_year: i32) -> Result<Vec<StandingsRow>> {
        let start_year = Season::validate_start_year(start_year)?;
        match self.store.find_season(start_year)? {
            Some(season) => self.compute_standings(&season),
            None => Ok(Vec::new()),
        }
    }

    /// One team's row for one season
    pub fn team_record(&self, team: &Team, season: &Season) -> Result<StandingsRow> {
        let mut row = StandingsRow::empty(team);
        for m in self.store.matches_for_team(team, season)? {
            row.record(&m, team);
        }
        Ok(row)
    }
}
