// ⚠️ Error taxonomy
// Record-level failures reject one participation fact and leave everything
// already reconciled untouched. I/O boundaries (db, csv, cli) use anyhow.

use thiserror::Error;

// ============================================================================
// DOMAIN ERRORS (closed code tables)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Source value is not a member of the code table
    #[error("unknown {domain} code: '{value}'")]
    UnknownCode { domain: &'static str, value: String },

    /// Two members of a code table resolve to the same short code
    #[error("{domain} code '{code}' is shared by {first} and {second}")]
    DuplicateCode {
        domain: &'static str,
        code: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

// ============================================================================
// IDENTITY ERRORS (key derivation)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("{entity}: required field '{field}' is missing")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}

// ============================================================================
// RECONCILE ERRORS (merge operations)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// A child record was offered to an election that does not own it
    #[error("{kind} '{child_id}' belongs to election '{child_election}', not '{election}'")]
    ForeignChild {
        kind: &'static str,
        child_id: String,
        child_election: String,
        election: String,
    },

    /// Vote cast references a vote method the election does not know about
    #[error("vote method '{vote_method_id}' is not registered on election '{election}'")]
    UnknownVoteMethod {
        vote_method_id: String,
        election: String,
    },
}

// ============================================================================
// INGEST ERRORS (one raw record)
// ============================================================================

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("invalid year '{0}'")]
    InvalidYear(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD or MM/DD/YYYY)")]
    InvalidDate(String),
}

// ============================================================================
// CONFIG ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
