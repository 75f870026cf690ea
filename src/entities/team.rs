// ⚽ Team Entity - Stable identity keyed by name
//
// The name is the natural key (exact, case-sensitive after trimming).
// The UUID is the identity every match references.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Longest team name accepted as a natural key
pub const MAX_TEAM_NAME_LEN: usize = 100;

// ============================================================================
// TEAM ENTITY
// ============================================================================

/// Team - created once per distinct name, never mutated
///
/// Equality and hashing use the identity only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Stable identity (UUID)
    pub id: String,

    /// Natural key
    pub name: String,

    /// When this team was first seen
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team with a fresh UUID. Callers go through the registry.
    pub fn new(name: String) -> Self {
        Team {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            created_at: Utc::now(),
        }
    }

    /// Turn a raw scraped name into its natural key
    ///
    /// Surrounding whitespace is dropped, casing is kept.
    pub fn natural_key(raw: &str) -> Result<String, ValidationError> {
        let name = raw.trim();

        if name.is_empty() {
            return Err(ValidationError::new("Team", "name", "Required field is empty"));
        }

        if name.chars().count() > MAX_TEAM_NAME_LEN {
            return Err(ValidationError::new(
                "Team",
                "name",
                format!("Longer than {} characters", MAX_TEAM_NAME_LEN),
            ));
        }

        Ok(name.to_string())
    }

    /// Same identity (not just same name)
    pub fn same_identity(&self, other: &Team) -> bool {
        self.id == other.id
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Team {}

impl Hash for Team {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_creation() {
        let team = Team::new("Juventus".to_string());

        assert!(!team.id.is_empty());
        assert_eq!(team.name, "Juventus");
        assert_eq!(team.to_string(), "Juventus");
    }

    #[test]
    fn test_natural_key_trims_but_keeps_case() {
        assert_eq!(Team::natural_key("  Inter  ").unwrap(), "Inter");
        assert_eq!(Team::natural_key("AC Milan").unwrap(), "AC Milan");
        assert_ne!(
            Team::natural_key("milan").unwrap(),
            Team::natural_key("Milan").unwrap()
        );
    }

    #[test]
    fn test_natural_key_rejects_empty() {
        assert!(Team::natural_key("").is_err());

        let err = Team::natural_key("   ").unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.context, "Team");
    }

    #[test]
    fn test_natural_key_rejects_overlong() {
        let long = "x".repeat(MAX_TEAM_NAME_LEN + 1);
        assert!(Team::natural_key(&long).is_err());

        let max = "x".repeat(MAX_TEAM_NAME_LEN);
        assert!(Team::natural_key(&max).is_ok());
    }

    #[test]
    fn test_equality_is_identity() {
        let a = Team::new("Roma".to_string());
        let b = Team::new("Roma".to_string());

        // Same name, different identity
        assert_ne!(a, b);
        assert!(!a.same_identity(&b));

        let a2 = a.clone();
        assert_eq!(a, a2);
        assert!(a.same_identity(&a2));
    }
}
