// League Ledger - Core Library
// Ingests matchday results and aggregates season standings.
// Exposes all modules for use in the CLI and tests.

pub mod config;     // Environment configuration
pub mod driver;     // Batch-by-batch ingestion runs
pub mod entities;   // Team, Season, Match
pub mod error;      // Error taxonomy
pub mod ingest;     // Validate + resolve + record one match
pub mod producer;   // Matchday sources (memory, JSON archive, CSV)
pub mod registry;   // Canonical teams and seasons
pub mod standings;  // Season table
pub mod store;      // Persistence (memory, SQLite)

// Re-export commonly used types
pub use config::LeagueConfig;
pub use driver::{
    DriverOptions, IngestionDriver, IngestionReport, InvalidRecordPolicy, StopHandle, StopReason,
};
pub use entities::{Match, Outcome, Scorers, Season, Team};
pub use error::{LeagueError, ProducerError, Result, ValidationError};
pub use ingest::{IngestSession, MatchIngestor};
pub use producer::{
    CsvProducer, JsonFileProducer, MatchdayBatch, MatchdayProducer, RawMatch, VecProducer,
};
pub use registry::EntityRegistry;
pub use standings::{StandingsAggregator, StandingsRow, TieBreak};
pub use store::{MemoryStore, SqliteStore, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
