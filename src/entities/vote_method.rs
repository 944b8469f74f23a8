// 📬 Vote Method Entity - One (election, method, date, party) combination
// Immutable once built; owned by exactly one election.

use crate::codes::{PoliticalParty, VoteMethod};
use crate::error::IdentityError;
use crate::identity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq)]
pub struct VoteMethodAttrs {
    pub election_id: String,
    pub vote_method: VoteMethod,
    pub vote_date: Option<NaiveDate>,
    pub party: Option<PoliticalParty>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteMethodRecord {
    id: String,
    election_id: String,
    vote_method: VoteMethod,
    vote_date: Option<NaiveDate>,
    party: Option<PoliticalParty>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl VoteMethodRecord {
    pub fn new(attrs: VoteMethodAttrs) -> Result<Self, IdentityError> {
        let id = identity::vote_method_key(
            &attrs.election_id,
            Some(attrs.vote_method),
            attrs.vote_date,
            attrs.party,
        )?;

        Ok(VoteMethodRecord {
            id,
            election_id: attrs.election_id,
            vote_method: attrs.vote_method,
            vote_date: attrs.vote_date,
            party: attrs.party,
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

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn election_id(&self) -> &str {
        &self.election_id
    }

    pub fn vote_method(&self) -> VoteMethod {
        self.vote_method
    }

    pub fn vote_date(&self) -> Option<NaiveDate> {
        self.vote_date
    }

    pub fn party(&self) -> Option<PoliticalParty> {
        self.party
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

impl PartialEq for VoteMethodRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VoteMethodRecord {}

impl Hash for VoteMethodRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_method_record_identity() {
        let record = VoteMethodRecord::new(VoteMethodAttrs {
            election_id: "TX-Travis-2024-PR".to_string(),
            vote_method: VoteMethod::MailIn,
            vote_date: NaiveDate::from_ymd_opt(2024, 2, 20),
            party: Some(PoliticalParty::Democratic),
        })
        .unwrap();

        assert_eq!(record.id(), "TX-Travis-2024-PR-MI-20240220-DEM");
        assert_eq!(record.election_id(), "TX-Travis-2024-PR");
        assert_eq!(record.party(), Some(PoliticalParty::Democratic));
    }

    #[test]
    fn test_vote_method_record_requires_election() {
        let err = VoteMethodRecord::new(VoteMethodAttrs {
            election_id: " ".to_string(),
            vote_method: VoteMethod::InPerson,
            vote_date: None,
            party: None,
        })
        .unwrap_err();

        assert!(matches!(err, IdentityError::MissingField { field: "election_id", .. }));
    }
}
