// 🗄️ SQLite store - durable teams, seasons and matches
//
// Natural keys carry UNIQUE constraints, so get-or-create stays correct even
// with several processes writing to the same file. Every entity creation and
// every appended matchday is recorded in the events table.

use super::Store;
use crate::entities::{Match, Scorers, Season, Team};
use crate::error::{LeagueError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const ACTOR: &str = "league_ledger";

// ============================================================================
// EVENTS (audit trail)
// ============================================================================

/// Event for audit trail: "Every change is an event"
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_uuid TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS seasons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            season_uuid TEXT UNIQUE NOT NULL,
            start_year INTEGER UNIQUE NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_uuid TEXT UNIQUE NOT NULL,
            season_id TEXT NOT NULL REFERENCES seasons(season_uuid),
            matchday INTEGER NOT NULL CHECK (matchday >= 1),
            date TEXT NOT NULL,
            home_team_id TEXT NOT NULL REFERENCES teams(team_uuid),
            away_team_id TEXT NOT NULL REFERENCES teams(team_uuid),
            home_goals INTEGER NOT NULL CHECK (home_goals >= 0),
            away_goals INTEGER NOT NULL CHECK (away_goals >= 0),
            scorers TEXT,
            fingerprint TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            CHECK (home_team_id <> away_team_id)
        );

        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season_id, matchday);
        CREATE INDEX IF NOT EXISTS idx_matches_home ON matches(home_team_id);
        CREATE INDEX IF NOT EXISTS idx_matches_away ON matches(away_team_id);
        CREATE INDEX IF NOT EXISTS idx_matches_fingerprint ON matches(fingerprint);
        CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);",
    )?;

    Ok(())
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp,
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

const MATCH_SELECT: &str = "SELECT m.match_uuid, m.matchday, m.date, m.home_goals, m.away_goals,
        m.scorers, m.ingested_at,
        s.season_uuid, s.start_year, s.created_at,
        h.team_uuid, h.name, h.created_at,
        a.team_uuid, a.name, a.created_at
     FROM matches m
     JOIN seasons s ON s.season_uuid = m.season_id
     JOIN teams h ON h.team_uuid = m.home_team_id
     JOIN teams a ON a.team_uuid = m.away_team_id";

fn team_from_row(row: &Row) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn season_from_row(row: &Row) -> rusqlite::Result<Season> {
    Ok(Season {
        id: row.get(0)?,
        start_year: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn match_from_row(row: &Row) -> rusqlite::Result<Match> {
    let scorers_json: Option<String> = row.get(5)?;
    let scorers = match scorers_json {
        Some(json) => serde_json::from_str::<Scorers>(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        None => Scorers::default(),
    };

    Ok(Match {
        id: row.get(0)?,
        matchday: row.get(1)?,
        date: row.get(2)?,
        home_goals: row.get(3)?,
        away_goals: row.get(4)?,
        scorers,
        ingested_at: row.get(6)?,
        season: Season {
            id: row.get(7)?,
            start_year: row.get(8)?,
            created_at: row.get(9)?,
        },
        home_team: Team {
            id: row.get(10)?,
            name: row.get(11)?,
            created_at: row.get(12)?,
        },
        away_team: Team {
            id: row.get(13)?,
            name: row.get(14)?,
            created_at: row.get(15)?,
        },
    })
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file, WAL mode for crash recovery
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::from_connection(conn)
    }

    /// Scratch database, gone when dropped
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Events for a specific entity, newest first
    pub fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY id DESC",
        )?;

        let events = stmt
            .query_map(params![entity_type, entity_id], |row| {
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                    })?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }

    fn query_matches(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Match>> {
        let conn = self.conn.lock()?;
        let sql = format!("{} {}", MATCH_SELECT, filter);
        let mut stmt = conn.prepare(&sql)?;

        let matches = stmt
            .query_map(args, match_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(matches)
    }
}

impl Store for SqliteStore {
    fn get_or_create_team(&self, name: &str) -> Result<Team> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        let candidate = Team::new(name.to_string());
        let inserted = tx.execute(
            "INSERT INTO teams (team_uuid, name, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO NOTHING",
            params![candidate.id, candidate.name, candidate.created_at],
        )?;

        let team = tx
            .query_row(
                "SELECT team_uuid, name, created_at FROM teams WHERE name = ?1",
                params![name],
                team_from_row,
            )
            .optional()?
            .ok_or_else(|| LeagueError::Consistency {
                entity: "team",
                key: name.to_string(),
                detail: "insert-if-absent left no row behind".to_string(),
            })?;

        if inserted == 1 {
            if team.id != candidate.id {
                return Err(LeagueError::Consistency {
                    entity: "team",
                    key: name.to_string(),
                    detail: format!("created {} but read back {}", candidate.id, team.id),
                });
            }

            let event = Event::new(
                "team_created",
                "team",
                &team.id,
                serde_json::json!({ "name": team.name }),
                ACTOR,
            );
            insert_event(&tx, &event)?;
            debug!(team = %team.name, id = %team.id, "team created");
        }

        tx.commit()?;
        Ok(team)
    }

    fn get_or_create_season(&self, start_year: i32) -> Result<Season> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        let candidate = Season::new(start_year);
        let inserted = tx.execute(
            "INSERT INTO seasons (season_uuid, start_year, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(start_year) DO NOTHING",
            params![candidate.id, candidate.start_year, candidate.created_at],
        )?;

        let season = tx
            .query_row(
                "SELECT season_uuid, start_year, created_at FROM seasons WHERE start_year = ?1",
                params![start_year],
                season_from_row,
            )
            .optional()?
            .ok_or_else(|| LeagueError::Consistency {
                entity: "season",
                key: start_year.to_string(),
                detail: "insert-if-absent left no row behind".to_string(),
            })?;

        if inserted == 1 {
            if season.id != candidate.id {
                return Err(LeagueError::Consistency {
                    entity: "season",
                    key: start_year.to_string(),
                    detail: format!("created {} but read back {}", candidate.id, season.id),
                });
            }

            let event = Event::new(
                "season_created",
                "season",
                &season.id,
                serde_json::json!({ "start_year": start_year }),
                ACTOR,
            );
            insert_event(&tx, &event)?;
            debug!(season = %season.label(), id = %season.id, "season created");
        }

        tx.commit()?;
        Ok(season)
    }

    fn find_team(&self, name: &str) -> Result<Option<Team>> {
        let conn = self.conn.lock()?;
        let team = conn
            .query_row(
                "SELECT team_uuid, name, created_at FROM teams WHERE name = ?1",
                params![name],
                team_from_row,
            )
            .optional()?;
        Ok(team)
    }

    fn find_season(&self, start_year: i32) -> Result<Option<Season>> {
        let conn = self.conn.lock()?;
        let season = conn
            .query_row(
                "SELECT season_uuid, start_year, created_at FROM seasons WHERE start_year = ?1",
                params![start_year],
                season_from_row,
            )
            .optional()?;
        Ok(season)
    }

    fn all_teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare("SELECT team_uuid, name, created_at FROM teams ORDER BY id")?;
        let teams = stmt
            .query_map([], team_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(teams)
    }

    fn all_seasons(&self) -> Result<Vec<Season>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT season_uuid, start_year, created_at FROM seasons ORDER BY start_year",
        )?;
        let seasons = stmt
            .query_map([], season_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(seasons)
    }

    fn append_matches(&self, matches: &[Match]) -> Result<()> {
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;

        // (season id, matchday) -> match count, for the audit trail
        let mut per_matchday: BTreeMap<(String, u32), usize> = BTreeMap::new();

        for m in matches {
            let scorers_json = if m.scorers.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&m.scorers)?)
            };

            tx.execute(
                "INSERT INTO matches (
                    match_uuid, season_id, matchday, date, home_team_id, away_team_id,
                    home_goals, away_goals, scorers, fingerprint, ingested_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    m.id,
                    m.season.id,
                    m.matchday,
                    m.date,
                    m.home_team.id,
                    m.away_team.id,
                    m.home_goals,
                    m.away_goals,
                    scorers_json,
                    m.fingerprint(),
                    m.ingested_at,
                ],
            )?;

            *per_matchday.entry((m.season.id.clone(), m.matchday)).or_insert(0) += 1;
        }

        for ((season_id, matchday), count) in per_matchday {
            let event = Event::new(
                "matches_appended",
                "season",
                &season_id,
                serde_json::json!({ "matchday": matchday, "matches": count }),
                ACTOR,
            );
            insert_event(&tx, &event)?;
        }

        // Dropping tx without commit rolls the whole append back
        tx.commit()?;
        Ok(())
    }

    fn matches_for_season(&self, season: &Season) -> Result<Vec<Match>> {
        self.query_matches("WHERE m.season_id = ?1 ORDER BY m.id", params![season.id])
    }

    fn matches_for_team(&self, team: &Team, season: &Season) -> Result<Vec<Match>> {
        self.query_matches(
            "WHERE m.season_id = ?1 AND (m.home_team_id = ?2 OR m.away_team_id = ?2)
             ORDER BY m.id",
            params![season.id, team.id],
        )
    }

    fn team_history(&self, team: &Team) -> Result<Vec<Match>> {
        self.query_matches(
            "WHERE m.home_team_id = ?1 OR m.away_team_id = ?1 ORDER BY m.date, m.id",
            params![team.id],
        )
    }

    fn ingested_matchdays(&self, season: &Season) -> Result<BTreeSet<u32>> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT matchday FROM matches WHERE season_id = ?1")?;
        let days = stmt
            .query_map(params![season.id], |row| row.get::<_, u32>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(days)
    }

    fn count_matches(&self) -> Result<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM matches", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
