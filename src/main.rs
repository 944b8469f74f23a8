use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use turnout_history::{
    load_history, load_participation_csv, save_engine, seed_engine, setup_database,
    verify_counts, Config, ElectionType, ReconciliationEngine, TurnoutScorer,
};

#[derive(Parser)]
#[command(name = "turnout-history", version, about = "Voter participation history and turnout scores")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database (overrides the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a participation CSV into the database
    Import {
        /// CSV with voter_id,state,city,county,year,election_type,vote_method,party,...
        csv: PathBuf,
    },
    /// Print turnout scores for a voter as JSON
    Score {
        voter_id: String,
        /// Score as of this date (default: today)
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Print a voter's participation history as JSON
    History { voter_id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Validate the code table before touching any data
    ElectionType::verify_code_table()?;

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let db_path = cli.db.clone().unwrap_or_else(|| config.storage.database.clone());
    let conn = open_database(&db_path)?;

    match cli.command {
        Command::Import { csv } => run_import(&conn, &csv),
        Command::Score { voter_id, as_of } => run_score(&conn, &config, &voter_id, as_of),
        Command::History { voter_id } => run_history(&conn, &voter_id),
    }
}

fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_import(conn: &Connection, csv_path: &Path) -> Result<()> {
    let records = load_participation_csv(csv_path)?;
    info!("Loaded {} participation records from {}", records.len(), csv_path.display());

    // Seed with the stored elections this file touches so "first cast wins"
    // holds across runs
    let mut engine = ReconciliationEngine::new();
    let seeded = seed_engine(conn, &mut engine, &records)?;
    info!("Seeded {} stored elections", seeded);

    let report = engine.ingest_batch(&records);
    for error in &report.errors {
        eprintln!("record {}: {}", error.record, error.message);
    }

    save_engine(conn, &engine)?;
    let counts = verify_counts(conn)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    info!(
        "Database contains {} elections, {} vote methods, {} casts",
        counts.elections, counts.vote_methods, counts.vote_casts
    );
    Ok(())
}

fn run_score(conn: &Connection, config: &Config, voter_id: &str, as_of: Option<NaiveDate>) -> Result<()> {
    let history = load_history(conn, voter_id)?;
    let scorer = TurnoutScorer::new(config.scoring_config());

    let scores = match as_of {
        Some(date) => scorer.score(&history, date),
        None => scorer.score_today(&history),
    };

    println!("{}", serde_json::to_string_pretty(&scores)?);
    Ok(())
}

fn run_history(conn: &Connection, voter_id: &str) -> Result<()> {
    let history = load_history(conn, voter_id)?;
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}
