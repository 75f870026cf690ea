// 🏟️ Match Entity - One historical result, never mutated after creation

use super::{Season, Team};
use crate::error::ValidationError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of a match from the neutral point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    HomeWin,
    AwayWin,
    Draw,
}

/// Result of a match from one team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamOutcome {
    Won,
    Drawn,
    Lost,
}

/// What one side of a match contributes to that team's record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideResult {
    pub outcome: TeamOutcome,
    pub scored: u32,
    pub taken: u32,
}

/// Goal scorers as captured by the scraper, per side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorers {
    #[serde(default)]
    pub home: Vec<String>,
    #[serde(default)]
    pub away: Vec<String>,
}

impl Scorers {
    pub fn is_empty(&self) -> bool {
        self.home.is_empty() && self.away.is_empty()
    }
}

// ============================================================================
// MATCH ENTITY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    /// Stable identity (UUID)
    pub id: String,

    /// Owning season
    pub season: Season,

    /// Matchday number within the season (>= 1)
    pub matchday: u32,

    /// Indicative date of the matchday
    pub date: NaiveDate,

    pub home_team: Team,
    pub away_team: Team,
    pub home_goals: u32,
    pub away_goals: u32,

    #[serde(default)]
    #[serde(skip_serializing_if = "Scorers::is_empty")]
    pub scorers: Scorers,

    /// When this record entered the store
    pub ingested_at: DateTime<Utc>,
}

impl Match {
    /// Build a fully validated match. Nothing is written here.
    pub fn try_new(
        season: Season,
        matchday: u32,
        date: NaiveDate,
        home_team: Team,
        away_team: Team,
        home_goals: u32,
        away_goals: u32,
    ) -> Result<Self, ValidationError> {
        if matchday < 1 {
            return Err(ValidationError::new(
                "Match",
                "matchday",
                format!("Must be >= 1, got {}", matchday),
            ));
        }

        if home_team.same_identity(&away_team) {
            return Err(ValidationError::new(
                "Match",
                "away_team",
                format!("Home and away team are the same team ({})", home_team.name),
            ));
        }

        Ok(Match {
            id: uuid::Uuid::new_v4().to_string(),
            season,
            matchday,
            date,
            home_team,
            away_team,
            home_goals,
            away_goals,
            scorers: Scorers::default(),
            ingested_at: Utc::now(),
        })
    }

    /// Builder pattern: attach scorers
    pub fn with_scorers(mut self, scorers: Scorers) -> Self {
        self.scorers = scorers;
        self
    }

    pub fn outcome(&self) -> Outcome {
        match self.home_goals.cmp(&self.away_goals) {
            std::cmp::Ordering::Greater => Outcome::HomeWin,
            std::cmp::Ordering::Less => Outcome::AwayWin,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }

    /// Winning team, None on a draw
    pub fn winner(&self) -> Option<&Team> {
        match self.outcome() {
            Outcome::HomeWin => Some(&self.home_team),
            Outcome::AwayWin => Some(&self.away_team),
            Outcome::Draw => None,
        }
    }

    pub fn is_draw(&self) -> bool {
        self.outcome() == Outcome::Draw
    }

    /// Whether the team played either side
    pub fn involves(&self, team: &Team) -> bool {
        self.home_team == *team || self.away_team == *team
    }

    /// The match seen from `team`'s side, None if it did not play
    pub fn result_for(&self, team: &Team) -> Option<SideResult> {
        let (scored, taken) = if self.home_team == *team {
            (self.home_goals, self.away_goals)
        } else if self.away_team == *team {
            (self.away_goals, self.home_goals)
        } else {
            return None;
        };

        let outcome = match self.winner() {
            None => TeamOutcome::Drawn,
            Some(winner) if winner == team => TeamOutcome::Won,
            Some(_) => TeamOutcome::Lost,
        };

        Some(SideResult { outcome, scored, taken })
    }

    /// Fingerprint of (season, matchday, home, away) for duplicate detection
    ///
    /// Two observations of the same fixture share a fingerprint even when
    /// their scores differ.
    pub fn fingerprint(&self) -> String {
        fixture_fingerprint(
            self.season.start_year,
            self.matchday,
            &self.home_team.name,
            &self.away_team.name,
        )
    }
}

/// Fingerprint a fixture from its natural keys
pub fn fixture_fingerprint(start_year: i32, matchday: u32, home: &str, away: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}|{}|{}|{}", start_year, matchday, home, away));
    format!("{:x}", hasher.finalize())
}

impl fmt::Display for Match {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} the {}/{}/{}",
            self.home_team,
            self.away_team,
            self.date.day(),
            self.date.month(),
            self.date.year()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 9, 20).unwrap()
    }

    fn build(home_goals: u32, away_goals: u32) -> (Match, Team, Team) {
        let home = Team::new("Lazio".to_string());
        let away = Team::new("Napoli".to_string());
        let m = Match::try_new(
            Season::new(2020),
            1,
            date(),
            home.clone(),
            away.clone(),
            home_goals,
            away_goals,
        )
        .unwrap();
        (m, home, away)
    }

    #[test]
    fn test_winner_rule() {
        let (m, home, _) = build(2, 1);
        assert_eq!(m.outcome(), Outcome::HomeWin);
        assert_eq!(m.winner(), Some(&home));

        let (m, _, away) = build(0, 3);
        assert_eq!(m.outcome(), Outcome::AwayWin);
        assert_eq!(m.winner(), Some(&away));

        let (m, _, _) = build(1, 1);
        assert!(m.is_draw());
        assert!(m.winner().is_none());
    }

    #[test]
    fn test_result_for_each_side() {
        let (m, home, away) = build(3, 1);

        let h = m.result_for(&home).unwrap();
        assert_eq!(h.outcome, TeamOutcome::Won);
        assert_eq!((h.scored, h.taken), (3, 1));

        let a = m.result_for(&away).unwrap();
        assert_eq!(a.outcome, TeamOutcome::Lost);
        assert_eq!((a.scored, a.taken), (1, 3));

        let stranger = Team::new("Torino".to_string());
        assert!(m.result_for(&stranger).is_none());
        assert!(!m.involves(&stranger));
    }

    #[test]
    fn test_rejects_same_team() {
        let team = Team::new("Genoa".to_string());
        let err = Match::try_new(Season::new(2020), 1, date(), team.clone(), team, 1, 0)
            .unwrap_err();
        assert_eq!(err.field, "away_team");
    }

    #[test]
    fn test_rejects_matchday_zero() {
        let err = Match::try_new(
            Season::new(2020),
            0,
            date(),
            Team::new("Bari".to_string()),
            Team::new("Lecce".to_string()),
            0,
            0,
        )
        .unwrap_err();
        assert_eq!(err.field, "matchday");
    }

    #[test]
    fn test_fingerprint_ignores_score() {
        let (m1, home, away) = build(1, 0);
        let mut m2 = m1.clone();
        m2.home_goals = 4;
        assert_eq!(m1.fingerprint(), m2.fingerprint());

        // Swapped sides are a different fixture
        let reversed = fixture_fingerprint(2020, 1, &away.name, &home.name);
        assert_ne!(m1.fingerprint(), reversed);
    }

    #[test]
    fn test_display() {
        let (m, _, _) = build(0, 0);
        assert_eq!(m.to_string(), "Lazio vs Napoli the 20/9/2020");
    }
}
