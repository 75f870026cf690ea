// 📅 Season Entity - One edition of the competition, keyed by start year

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Plausible start years
pub const MIN_SEASON_YEAR: i32 = 1850;
pub const MAX_SEASON_YEAR: i32 = 2100;

/// Season - start year is the natural key, end year is derived
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    /// Stable identity (UUID)
    pub id: String,

    /// Natural key
    pub start_year: i32,

    pub created_at: DateTime<Utc>,
}

impl Season {
    pub fn new(start_year: i32) -> Self {
        Season {
            id: uuid::Uuid::new_v4().to_string(),
            start_year,
            created_at: Utc::now(),
        }
    }

    /// Reject implausible start years
    pub fn validate_start_year(start_year: i32) -> Result<i32, ValidationError> {
        if !(MIN_SEASON_YEAR..=MAX_SEASON_YEAR).contains(&start_year) {
            return Err(ValidationError::new(
                "Season",
                "start_year",
                format!(
                    "Must be between {} and {}, got {}",
                    MIN_SEASON_YEAR, MAX_SEASON_YEAR, start_year
                ),
            ));
        }

        Ok(start_year)
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    /// Display label, e.g. "1986-87"
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.start_year, self.end_year() % 100)
    }

    /// Number of matchdays scheduled in this season
    pub fn matchday_count(&self) -> u32 {
        matchdays_for_start_year(self.start_year)
    }
}

/// Calendar length by era: 16 teams until 1987-88, 18 until 2003-04, 20 since.
pub fn matchdays_for_start_year(start_year: i32) -> u32 {
    if start_year < 1988 {
        30
    } else if start_year < 2004 {
        34
    } else {
        38
    }
}

impl PartialEq for Season {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Season {}

impl Hash for Season {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
