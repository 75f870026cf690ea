use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use league_ledger::{
    CsvProducer, EntityRegistry, IngestionDriver, IngestionReport, JsonFileProducer,
    LeagueConfig, MatchdayProducer, SqliteStore, StandingsAggregator, StandingsRow, VERSION,
};

const USAGE: &str = "\
Usage:
  league import <year> [file]        Import one season (JSON archive or CSV)
  league import-range <from> <to>    Import every archived season in [from, to)
  league standings <year> [--json]   Print the season table
  league history <team> [year]       Print a team's matches";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LeagueConfig::from_env().context("Failed to load configuration")?;
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("import") => {
            let year = parse_year(args.get(1))?;
            let file = args.get(2).map(PathBuf::from);
            run_import(&config, year, file)
        }
        Some("import-range") => {
            let from = parse_year(args.get(1))?;
            let to = parse_year(args.get(2))?;
            run_import_range(&config, from, to)
        }
        Some("standings") => {
            let year = parse_year(args.get(1))?;
            let json = args.iter().skip(2).any(|a| a == "--json");
            run_standings(&config, year, json)
        }
        Some("history") => {
            let Some(team) = args.get(1) else {
                bail!("Missing team name\n\n{}", USAGE);
            };
            let year = args.get(2).map(|y| parse_year(Some(y))).transpose()?;
            run_history(&config, team, year)
        }
        _ => {
            println!("league-ledger {}\n\n{}", VERSION, USAGE);
            Ok(())
        }
    }
}

fn parse_year(arg: Option<&String>) -> Result<i32> {
    let Some(raw) = arg else {
        bail!("Missing season year\n\n{}", USAGE);
    };
    raw.parse::<i32>()
        .with_context(|| format!("Invalid season year: {}", raw))
}

fn open_registry(config: &LeagueConfig) -> Result<EntityRegistry> {
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    Ok(EntityRegistry::new(Arc::new(store)))
}

fn open_producer(path: &Path, year: i32) -> Result<Box<dyn MatchdayProducer>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let producer = CsvProducer::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(Box::new(producer))
    } else {
        Ok(Box::new(JsonFileProducer::new(path).with_expected_year(year)))
    }
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_import(config: &LeagueConfig, year: i32, file: Option<PathBuf>) -> Result<()> {
    let path = file.unwrap_or_else(|| JsonFileProducer::season_file(&config.data_dir, year));

    println!("🗄️  Importing season {} from {}", year, path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let registry = open_registry(config)?;
    let report = import_file(config, &registry, year, &path)?;
    print_report(&report);

    Ok(())
}

fn run_import_range(config: &LeagueConfig, from: i32, to: i32) -> Result<()> {
    if from >= to {
        bail!("Empty range: {} >= {}", from, to);
    }

    let registry = open_registry(config)?;
    let mut imported = 0;

    for year in from..to {
        let path = JsonFileProducer::season_file(&config.data_dir, year);
        if !path.exists() {
            warn!(year, path = %path.display(), "no archive for season, skipping");
            continue;
        }

        let report = import_file(config, &registry, year, &path)?;
        print_report(&report);
        imported += 1;
    }

    info!(seasons = imported, teams = registry.team_count()?, "range imported");
    println!("\n✅ Imported {} season(s)", imported);
    Ok(())
}

fn import_file(
    config: &LeagueConfig,
    registry: &EntityRegistry,
    year: i32,
    path: &Path,
) -> Result<IngestionReport> {
    let mut producer = open_producer(path, year)?;
    let driver = IngestionDriver::new(registry).with_options(config.driver_options());

    driver
        .run_ingestion(year, producer.as_mut())
        .with_context(|| format!("Import of season {} failed", year))
}

fn run_standings(config: &LeagueConfig, year: i32, json: bool) -> Result<()> {
    let registry = open_registry(config)?;
    let table = StandingsAggregator::new(registry.store())
        .with_tie_break(config.tie_break)
        .compute_standings_for_year(year)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    if table.is_empty() {
        println!("No matches recorded for season {}", year);
        return Ok(());
    }

    print_table(year, &table);
    Ok(())
}

fn run_history(config: &LeagueConfig, team_name: &str, year: Option<i32>) -> Result<()> {
    let registry = open_registry(config)?;
    let Some(team) = registry.find_team(team_name)? else {
        bail!("Unknown team: {}", team_name.trim());
    };

    let season = match year {
        Some(year) => registry.find_season(year)?,
        None => None,
    };
    let matches = match (&season, year) {
        (Some(season), _) => registry.store().matches_for_team(&team, season)?,
        (None, Some(_)) => Vec::new(),
        (None, None) => registry.store().team_history(&team)?,
    };

    println!("📜 {} - {} match(es)", team, matches.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for m in &matches {
        println!(
            "  {} [{} md {}] {}-{}",
            m,
            m.season.label(),
            m.matchday,
            m.home_goals,
            m.away_goals
        );
    }

    if let Some(season) = &season {
        let row = StandingsAggregator::new(registry.store()).team_record(&team, season)?;
        println!(
            "\n  {} pts | W{} D{} L{} | {}:{}",
            row.points, row.won, row.drawn, row.lost, row.goals_scored, row.goals_taken
        );
    }

    Ok(())
}

// ============================================================================
// OUTPUT
// ============================================================================

fn print_report(report: &IngestionReport) {
    println!("\n📥 Season {}", report.season.label());
    println!("   ✓ Matchdays applied: {}", report.batches_applied);
    println!("   ✓ Matches ingested:  {}", report.matches_ingested);
    if !report.matchdays_skipped.is_empty() {
        println!("   ↷ Already ingested:  {:?}", report.matchdays_skipped);
    }
    if report.records_rejected > 0 {
        println!("   ⚠️  Records rejected:  {}", report.records_rejected);
    }
    println!("   Stopped: {}", report.stop_reason);
}

fn print_table(year: i32, table: &[StandingsRow]) {
    println!("🏆 Standings {}", year);
    println!(
        "{:>3}  {:<24} {:>4} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>5}",
        "#", "Team", "Pts", "P", "W", "D", "L", "GF", "GA", "GD"
    );
    for (i, row) in table.iter().enumerate() {
        println!(
            "{:>3}  {:<24} {:>4} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>+5}",
            i + 1,
            row.team,
            row.points,
            row.played,
            row.won,
            row.drawn,
            row.lost,
            row.goals_scored,
            row.goals_taken,
            row.goal_difference
        );
    }
}
