// 🚚 Ingestion Driver - Pull matchday batches and commit them one by one
//
// Batches are applied strictly in order. Each batch is one unit of work:
// staged in an IngestSession, then committed in a single append. Committed
// batches are never rolled back, whatever happens afterwards.

use crate::entities::Season;
use crate::error::{LeagueError, Result};
use crate::ingest::MatchIngestor;
use crate::producer::{MatchdayBatch, MatchdayProducer};
use crate::registry::EntityRegistry;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// CANCELLATION
// ============================================================================

/// Caller-side stop signal, checked between batches
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        StopHandle::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// OPTIONS
// ============================================================================

/// What to do with a record that fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum InvalidRecordPolicy {
    /// Discard the whole batch and surface the error
    #[default]
    FailBatch,

    /// Log and count the record, commit the rest of the batch
    SkipRecord,
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Batch cap; None means the season's calendar length
    pub max_matchdays: Option<u32>,

    /// Skip batches whose matchday already holds matches
    pub skip_ingested_matchdays: bool,

    pub invalid_records: InvalidRecordPolicy,
}

impl Default for DriverOptions {
    fn default() -> Self {
        DriverOptions {
            max_matchdays: None,
            skip_ingested_matchdays: true,
            invalid_records: InvalidRecordPolicy::default(),
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// Producer returned no further batch
    Exhausted,
    /// Producer returned a batch without matches
    EmptyBatch,
    /// Batch cap reached
    MaxMatchdays,
    /// StopHandle was triggered
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Exhausted => "producer exhausted",
            StopReason::EmptyBatch => "empty batch",
            StopReason::MaxMatchdays => "matchday limit reached",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Summary of one run
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub season: Season,
    pub batches_applied: u32,
    pub matches_ingested: usize,
    pub matchdays_skipped: Vec<u32>,
    pub records_rejected: usize,
    pub stop_reason: StopReason,
}

impl IngestionReport {
    fn new(season: Season) -> Self {
        IngestionReport {
            season,
            batches_applied: 0,
            matches_ingested: 0,
            matchdays_skipped: Vec::new(),
            records_rejected: 0,
            stop_reason: StopReason::Exhausted,
        }
    }
}

// ============================================================================
// DRIVER
// ============================================================================

pub struct IngestionDriver<'a> {
    ingestor: MatchIngestor<'a>,
    options: DriverOptions,
    stop: StopHandle,
}

impl<'a> IngestionDriver<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        IngestionDriver {
            ingestor: MatchIngestor::new(registry),
            options: DriverOptions::default(),
            stop: StopHandle::new(),
        }
    }

    /// Builder pattern: replace options
    pub fn with_options(mut self, options: DriverOptions) -> Self {
        self.options = options;
        self
    }

    /// Builder pattern: share a stop signal with the caller
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Ingest every batch the producer yields for one season
    ///
    /// Stops without error on exhaustion, on an empty batch, at the matchday
    /// cap, or on cancellation. A producer failure is returned as
    /// `LeagueError::Producer`; batches committed before it stay committed.
    pub fn run_ingestion(
        &self,
        season_year: i32,
        producer: &mut dyn MatchdayProducer,
    ) -> Result<IngestionReport> {
        let season = self.ingestor.registry().resolve_season(season_year)?;
        let max_matchdays = self
            .options
            .max_matchdays
            .unwrap_or_else(|| season.matchday_count());

        let mut already_ingested = if self.options.skip_ingested_matchdays {
            self.ingestor
                .registry()
                .store()
                .ingested_matchdays(&season)?
        } else {
            BTreeSet::new()
        };

        info!(
            season = %season.label(),
            source = producer.name(),
            max_matchdays,
            already_ingested = already_ingested.len(),
            "ingestion started"
        );

        let mut report = IngestionReport::new(season);
        let mut pulled: u32 = 0;

        let stop_reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Cancelled;
            }
            if pulled >= max_matchdays {
                break StopReason::MaxMatchdays;
            }

            let batch = match producer.next_batch()? {
                Some(batch) => batch,
                None => break StopReason::Exhausted,
            };
            if batch.is_empty() {
                break StopReason::EmptyBatch;
            }
            pulled += 1;

            if let Some(matchday) = already_ingested_matchday(&batch, &already_ingested) {
                debug!(matchday, "matchday already ingested, skipping");
                report.matchdays_skipped.push(matchday);
                continue;
            }

            let committed = self.apply_batch(&batch, &mut report)?;

            // A repeated matchday later in the same run is skipped too
            if committed > 0 && self.options.skip_ingested_matchdays {
                if let Ok(matchday) = u32::try_from(batch.matchday) {
                    already_ingested.insert(matchday);
                }
            }
        };
        report.stop_reason = stop_reason;

        info!(
            season = %report.season.label(),
            batches = report.batches_applied,
            matches = report.matches_ingested,
            skipped = report.matchdays_skipped.len(),
            rejected = report.records_rejected,
            stop = %report.stop_reason,
            "ingestion finished"
        );

        Ok(report)
    }

    /// Stage and commit one batch; returns the number of matches written
    fn apply_batch(&self, batch: &MatchdayBatch, report: &mut IngestionReport) -> Result<usize> {
        let season_year = report.season.start_year;
        let mut session = self.ingestor.session();

        for raw in &batch.matches {
            match session
                .stage(season_year, batch.matchday, batch.date, raw)
                .map(|_| ())
            {
                Ok(()) => {}
                Err(LeagueError::Validation(err))
                    if self.options.invalid_records == InvalidRecordPolicy::SkipRecord =>
                {
                    warn!(
                        matchday = batch.matchday,
                        home = %raw.home_team,
                        away = %raw.away_team,
                        error = %err,
                        "invalid record skipped"
                    );
                    report.records_rejected += 1;
                }
                Err(err) => {
                    let discarded = session.discard();
                    warn!(
                        matchday = batch.matchday,
                        discarded,
                        error = %err,
                        "batch rejected"
                    );
                    return Err(err);
                }
            }
        }

        let committed = session.commit()?;
        if !committed.is_empty() {
            report.batches_applied += 1;
            report.matches_ingested += committed.len();
            info!(
                matchday = batch.matchday,
                matches = committed.len(),
                "matchday applied"
            );
        }
        Ok(committed.len())
    }
}

fn already_ingested_matchday(batch: &MatchdayBatch, ingested: &BTreeSet<u32>) -> Option<u32> {
    u32::try_from(batch.matchday)
        .ok()
        .filter(|matchday| ingested.contains(matchday))
}
