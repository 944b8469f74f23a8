// 🗳️ Election Entity - One election event + everything observed about it
//
// Identity is derived from (state, city, county, year, type) and computed once
// at construction. The election owns its vote method records and vote casts;
// both collections only grow, and repeat observations are no-ops.

use super::vote_cast::VoteCast;
use super::vote_method::{VoteMethodAttrs, VoteMethodRecord};
use super::MergeOutcome;
use crate::codes::{ElectionType, PoliticalParty, VoteMethod};
use crate::error::{IdentityError, ReconcileError};
use crate::identity;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use tracing::debug;

// ============================================================================
// ELECTION ATTRIBUTES (input to the factory)
// ============================================================================

/// Raw attributes of an election, before identity derivation
#[derive(Debug, Clone, PartialEq)]
pub struct ElectionAttrs {
    pub state: String,
    pub year: i32,
    pub election_type: ElectionType,
    pub city: Option<String>,
    pub county: Option<String>,
    pub dates: Option<Vec<NaiveDate>>,
    pub desc: Option<String>,
}

impl ElectionAttrs {
    pub fn new(state: impl Into<String>, year: i32, election_type: ElectionType) -> Self {
        ElectionAttrs {
            state: state.into(),
            year,
            election_type,
            city: None,
            county: None,
            dates: None,
            desc: None,
        }
    }

    /// Builder pattern: add optional city
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Builder pattern: add optional county
    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    /// Builder pattern: add election dates
    pub fn with_dates(mut self, dates: Vec<NaiveDate>) -> Self {
        self.dates = Some(dates);
        self
    }

    /// Builder pattern: add free-text description
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }
}

/// Trim a free-text value; blank becomes absent
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// ELECTION ENTITY
// ============================================================================

/// One election event.
///
/// Equality and hashing look at the identity only, so an `Election` stays a
/// stable map key even when descriptive fields are corrected upstream.
#[derive(Debug, Clone, Serialize)]
pub struct Election {
    id: String,
    year: i32,
    election_type: ElectionType,
    state: String,
    city: Option<String>,
    county: Option<String>,
    dates: Option<Vec<NaiveDate>>,
    desc: Option<String>,

    /// Assigned by the storage layer
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,

    vote_methods: Vec<VoteMethodRecord>,
    vote_casts: Vec<VoteCast>,

    /// vote method id -> position in `vote_methods`
    #[serde(skip)]
    method_index: HashMap<String, usize>,

    /// voter ids that already have a cast on this election
    #[serde(skip)]
    voter_index: HashSet<String>,
}

impl Election {
    /// Validate attributes and build an election with its identity
    pub fn new(attrs: ElectionAttrs) -> Result<Self, IdentityError> {
        let state = attrs.state.trim().to_string();
        let city = clean(attrs.city);
        let county = clean(attrs.county);

        let id = identity::election_key(
            &state,
            city.as_deref(),
            county.as_deref(),
            attrs.year,
            attrs.election_type,
        )?;

        Ok(Election {
            id,
            year: attrs.year,
            election_type: attrs.election_type,
            state,
            city,
            county,
            dates: attrs.dates,
            desc: clean(attrs.desc),
            created_at: None,
            updated_at: None,
            vote_methods: Vec::new(),
            vote_casts: Vec::new(),
            method_index: HashMap::new(),
            voter_index: HashSet::new(),
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

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn election_type(&self) -> ElectionType {
        self.election_type
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }

    pub fn dates(&self) -> Option<&[NaiveDate]> {
        self.dates.as_deref()
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn vote_methods(&self) -> &[VoteMethodRecord] {
        &self.vote_methods
    }

    pub fn vote_casts(&self) -> &[VoteCast] {
        &self.vote_casts
    }

    /// Find an owned vote method record by its identity
    pub fn vote_method(&self, id: &str) -> Option<&VoteMethodRecord> {
        self.method_index.get(id).map(|&i| &self.vote_methods[i])
    }

    /// Find the vote cast recorded for a voter, if any
    pub fn vote_cast_for(&self, voter_id: &str) -> Option<&VoteCast> {
        if !self.voter_index.contains(voter_id) {
            return None;
        }
        self.vote_casts.iter().find(|c| c.voter_id() == voter_id)
    }

    /// Copy of the election's own attributes, without owned records.
    ///
    /// History entries carry one of these so a voter's history does not drag
    /// along every other voter's casts.
    pub fn detached(&self) -> Election {
        Election {
            id: self.id.clone(),
            year: self.year,
            election_type: self.election_type,
            state: self.state.clone(),
            city: self.city.clone(),
            county: self.county.clone(),
            dates: self.dates.clone(),
            desc: self.desc.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            vote_methods: Vec::new(),
            vote_casts: Vec::new(),
            method_index: HashMap::new(),
            voter_index: HashSet::new(),
        }
    }

    /// Build a vote method record owned by this election (not yet merged)
    pub fn vote_method_for(
        &self,
        vote_method: VoteMethod,
        vote_date: Option<NaiveDate>,
        party: Option<PoliticalParty>,
    ) -> Result<VoteMethodRecord, IdentityError> {
        VoteMethodRecord::new(VoteMethodAttrs {
            election_id: self.id.clone(),
            vote_method,
            vote_date,
            party,
        })
    }

    // ========================================================================
    // MERGE OPERATIONS
    // ========================================================================

    /// Insert-or-ignore a vote method record.
    ///
    /// A record with the same (method, party, date) already owned by this
    /// election wins; the candidate is dropped. Within one election that
    /// triple is exactly what the record identity encodes, so the lookup goes
    /// through the identity index.
    pub fn add_or_update_vote_method(
        &mut self,
        candidate: VoteMethodRecord,
    ) -> Result<MergeOutcome, ReconcileError> {
        if candidate.election_id() != self.id {
            return Err(ReconcileError::ForeignChild {
                kind: "vote method",
                child_id: candidate.id().to_string(),
                child_election: candidate.election_id().to_string(),
                election: self.id.clone(),
            });
        }

        if self.method_index.contains_key(candidate.id()) {
            debug!(election = %self.id, vote_method = %candidate.id(), "vote method already known");
            return Ok(MergeOutcome::Unchanged);
        }

        debug!(election = %self.id, vote_method = %candidate.id(), "vote method added");
        self.method_index
            .insert(candidate.id().to_string(), self.vote_methods.len());
        self.vote_methods.push(candidate);
        Ok(MergeOutcome::Inserted)
    }

    /// Insert-or-ignore a vote cast.
    ///
    /// Only the voter identity is compared: the first cast seen for a voter on
    /// this election is kept, even if a later one names a different method.
    /// The cast must reference a vote method this election owns.
    pub fn add_voter_or_update(&mut self, candidate: VoteCast) -> Result<MergeOutcome, ReconcileError> {
        if candidate.election_id() != self.id {
            return Err(ReconcileError::ForeignChild {
                kind: "vote cast",
                child_id: candidate.key(),
                child_election: candidate.election_id().to_string(),
                election: self.id.clone(),
            });
        }

        if !self.method_index.contains_key(candidate.vote_method_id()) {
            return Err(ReconcileError::UnknownVoteMethod {
                vote_method_id: candidate.vote_method_id().to_string(),
                election: self.id.clone(),
            });
        }

        if self.voter_index.contains(candidate.voter_id()) {
            debug!(election = %self.id, voter = %candidate.voter_id(), "voter already recorded");
            return Ok(MergeOutcome::Unchanged);
        }

        debug!(election = %self.id, voter = %candidate.voter_id(), "voter recorded");
        self.voter_index.insert(candidate.voter_id().to_string());
        self.vote_casts.push(candidate);
        Ok(MergeOutcome::Inserted)
    }
}

impl PartialEq for Election {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Election {}

impl Hash for Election {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// TESTS
// ============================================================================
