// Turnout History - Core Library
// Identity reconciliation for election participation records + turnout scoring

pub mod codes;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod identity;
pub mod parser;
pub mod reconciliation;
pub mod scoring;

// Re-export commonly used types
pub use codes::{ElectionType, PoliticalParty, VoteMethod};
pub use config::Config;
pub use db::{
    Event, EventKind, InsertStats, RowCounts,
    setup_database, save_election, save_engine, insert_event,
    load_election, load_all_elections, load_history, seed_engine,
    events_for_election, verify_counts,
};
pub use entities::{
    Election, ElectionAttrs, ElectionHistoryEntry, MergeOutcome,
    VoteCast, VoteMethodAttrs, VoteMethodRecord,
};
pub use error::{ConfigError, DomainError, IdentityError, IngestError, ReconcileError};
pub use identity::{election_key, vote_cast_key, vote_method_key};
pub use parser::{load_participation_csv, ParticipationRecord};
pub use reconciliation::{IngestOutcome, IngestReport, ReconciliationEngine, RecordError};
pub use scoring::{ScoringConfig, TurnoutScorer, TurnoutScores};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
