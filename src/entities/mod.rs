// Entity Models - Election history
//
// Each entity has:
// - Content-derived identity, computed once by its factory
// - Equality/hash over that identity only
// - Timestamps owned by the storage layer

pub mod election;
pub mod vote_cast;
pub mod vote_method;

pub use election::{Election, ElectionAttrs};
pub use vote_cast::VoteCast;
pub use vote_method::{VoteMethodAttrs, VoteMethodRecord};

use serde::Serialize;

/// Result of an insert-or-ignore merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeOutcome {
    /// Candidate was new and has been appended
    Inserted,
    /// An equivalent record already existed; candidate discarded
    Unchanged,
}

/// One instance of a voter's participation: (election, vote method, vote cast)
#[derive(Debug, Clone, Serialize)]
pub struct ElectionHistoryEntry {
    pub election: Election,
    pub vote_method: VoteMethodRecord,
    pub vote_cast: VoteCast,
}

impl ElectionHistoryEntry {
    pub fn new(election: Election, vote_method: VoteMethodRecord, vote_cast: VoteCast) -> Self {
        ElectionHistoryEntry {
            election,
            vote_method,
            vote_cast,
        }
    }
}
