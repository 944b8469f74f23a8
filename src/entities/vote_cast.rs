// ✋ Vote Cast Entity - One voter's participation in one election by one method
// Never mutated: a repeat observation is a no-op, not an update.

use crate::error::IdentityError;
use crate::identity;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Equality and hashing cover the (voter, election, vote method) triple.
#[derive(Debug, Clone, Serialize)]
pub struct VoteCast {
    voter_id: String,
    election_id: String,
    vote_method_id: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl VoteCast {
    pub fn new(
        voter_id: impl Into<String>,
        election_id: impl Into<String>,
        vote_method_id: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let voter_id = voter_id.into().trim().to_string();
        let election_id = election_id.into();
        let vote_method_id = vote_method_id.into();

        // Validates all three parts
        identity::vote_cast_key(&voter_id, &election_id, &vote_method_id)?;

        Ok(VoteCast {
            voter_id,
            election_id,
            vote_method_id,
            created_at: None,
            updated_at: None,
        })
    }

    /// Attach storage-assigned timestamps
    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// The uniqueness triple as a single string
    pub fn key(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.voter_id,
            self.election_id,
            self.vote_method_id,
            sep = identity::CAST_KEY_SEPARATOR
        )
    }

    pub fn voter_id(&self) -> &str {
        &self.voter_id
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    pub fn vote_method_id(&self) -> &str {
        &self.vote_method_id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl PartialEq for VoteCast {
    fn eq(&self, other: &Self) -> bool {
        self.voter_id == other.voter_id
            && self.election_id == other.election_id
            && self.vote_method_id == other.vote_method_id
    }
}

impl Eq for VoteCast {}

impl std::hash::Hash for VoteCast {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.voter_id.hash(state);
        self.election_id.hash(state);
        self.vote_method_id.hash(state);
    }
}
