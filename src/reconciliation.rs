// ⚖️ Reconciliation Engine - Converge overlapping source data to one record set
//
// Every raw participation fact resolves to three identities:
//   election     = state[-city][-county]-year-type
//   vote method  = election[-method][-YYYYMMDD][-party]
//   vote cast    = voter | election | vote method
//
// Re-ingesting the same facts (or overlapping exports) is a no-op. A record
// that fails validation is rejected before anything is touched.

use crate::codes::{ElectionType, PoliticalParty, VoteMethod};
use crate::entities::{
    Election, ElectionAttrs, ElectionHistoryEntry, MergeOutcome, VoteCast, VoteMethodRecord,
};
use crate::error::{IngestError, ReconcileError};
use crate::parser::{non_blank, parse_date, parse_date_list, parse_year, ParticipationRecord};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info, warn};

// ============================================================================
// INGEST OUTCOME
// ============================================================================

/// What a single ingested record changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    pub election: MergeOutcome,
    pub vote_method: MergeOutcome,
    pub vote_cast: MergeOutcome,
}

impl IngestOutcome {
    /// True when the record added nothing new
    pub fn is_duplicate(&self) -> bool {
        self.election == MergeOutcome::Unchanged
            && self.vote_method == MergeOutcome::Unchanged
            && self.vote_cast == MergeOutcome::Unchanged
    }
}

// ============================================================================
// INGEST REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    /// 1-based position of the record in the batch
    pub record: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub processed: usize,
    pub new_elections: usize,
    pub new_vote_methods: usize,
    pub new_vote_casts: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub errors: Vec<RecordError>,
}

impl IngestReport {
    pub fn summary(&self) -> String {
        format!(
            "{} records: {} new elections, {} new vote methods, {} new casts, {} duplicates, {} rejected",
            self.processed,
            self.new_elections,
            self.new_vote_methods,
            self.new_vote_casts,
            self.duplicates,
            self.rejected
        )
    }
}

// ============================================================================
// RESOLVED RECORD (validated, not yet merged)
// ============================================================================

struct ResolvedRecord {
    election: Election,
    vote_method: VoteMethodRecord,
    vote_cast: VoteCast,
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

/// In-memory reconciled election set.
///
/// Not synchronized: callers feeding the same engine from several threads
/// must serialize access themselves.
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    elections: Vec<Election>,
    /// election id -> position in `elections`
    index: HashMap<String, usize>,
    /// vote cast keys seen so far (voter | election | vote method)
    cast_keys: HashSet<String>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the election a raw record refers to, without its children
    fn resolve_election(record: &ParticipationRecord) -> Result<Election, IngestError> {
        let year = parse_year(&record.year)?;
        let election_type = ElectionType::from_code(&record.election_type)?;
        let dates = match non_blank(&record.election_dates) {
            Some(raw) => parse_date_list(raw)?,
            None => None,
        };

        let mut attrs = ElectionAttrs::new(record.state.as_str(), year, election_type);
        attrs.city = non_blank(&record.city).map(str::to_string);
        attrs.county = non_blank(&record.county).map(str::to_string);
        attrs.dates = dates;
        attrs.desc = non_blank(&record.description).map(str::to_string);

        Ok(Election::new(attrs)?)
    }

    /// Resolve code tables and identities for one raw record
    fn resolve(record: &ParticipationRecord) -> Result<ResolvedRecord, IngestError> {
        let election = Self::resolve_election(record)?;
        let vote_method = VoteMethod::from_code(&record.vote_method)?;
        let party = non_blank(&record.party)
            .map(PoliticalParty::from_code)
            .transpose()?;
        let vote_date = non_blank(&record.vote_date).map(parse_date).transpose()?;

        let vote_method = election.vote_method_for(vote_method, vote_date, party)?;
        let vote_cast = VoteCast::new(record.voter_id.as_str(), election.id(), vote_method.id())?;

        Ok(ResolvedRecord {
            election,
            vote_method,
            vote_cast,
        })
    }

    /// Distinct election ids a batch refers to. Records whose election
    /// cannot be resolved are skipped here and rejected on ingest.
    pub fn election_ids(records: &[ParticipationRecord]) -> BTreeSet<String> {
        records
            .iter()
            .filter_map(|record| Self::resolve_election(record).ok())
            .map(|election| election.id().to_string())
            .collect()
    }

    /// Merge one raw participation record.
    ///
    /// On error the engine is left exactly as it was.
    pub fn ingest(&mut self, record: &ParticipationRecord) -> Result<IngestOutcome, IngestError> {
        let resolved = Self::resolve(record)?;
        Ok(self.merge(resolved)?)
    }

    /// Merge an already-built election, with its owned records, into the set.
    ///
    /// Used to seed the engine from storage before ingesting new facts.
    pub fn absorb(&mut self, election: Election) -> IngestReport {
        let mut report = IngestReport::default();

        for (i, cast) in election.vote_casts().iter().enumerate() {
            let merged = match election.vote_method(cast.vote_method_id()) {
                Some(vote_method) => self.merge(ResolvedRecord {
                    election: election.detached(),
                    vote_method: vote_method.clone(),
                    vote_cast: cast.clone(),
                }),
                None => Err(ReconcileError::UnknownVoteMethod {
                    vote_method_id: cast.vote_method_id().to_string(),
                    election: election.id().to_string(),
                }),
            };
            match merged {
                Ok(outcome) => report.record(outcome),
                Err(err) => report.reject(i + 1, election.id(), &err),
            }
        }

        // Vote methods nobody has cast with yet
        let idx = self.election_slot(election.detached(), &mut report);
        for vote_method in election.vote_methods() {
            match self.elections[idx].add_or_update_vote_method(vote_method.clone()) {
                Ok(MergeOutcome::Inserted) => report.new_vote_methods += 1,
                Ok(MergeOutcome::Unchanged) => {}
                Err(err) => warn!(election = %election.id(), error = %err, "stored vote method skipped"),
            }
        }

        report
    }

    /// Get or insert the election, returning its position
    fn election_slot(&mut self, election: Election, report: &mut IngestReport) -> usize {
        match self.index.get(election.id()) {
            Some(&idx) => idx,
            None => {
                report.new_elections += 1;
                self.insert_election(election)
            }
        }
    }

    fn insert_election(&mut self, election: Election) -> usize {
        let idx = self.elections.len();
        self.index.insert(election.id().to_string(), idx);
        self.elections.push(election);
        idx
    }

    /// The three parts of a record must describe one election before any of
    /// them is merged
    fn check_ownership(resolved: &ResolvedRecord) -> Result<(), ReconcileError> {
        let ResolvedRecord {
            election,
            vote_method,
            vote_cast,
        } = resolved;

        if vote_method.election_id() != election.id() {
            return Err(ReconcileError::ForeignChild {
                kind: "vote method",
                child_id: vote_method.id().to_string(),
                child_election: vote_method.election_id().to_string(),
                election: election.id().to_string(),
            });
        }
        if vote_cast.election_id() != election.id() {
            return Err(ReconcileError::ForeignChild {
                kind: "vote cast",
                child_id: vote_cast.key(),
                child_election: vote_cast.election_id().to_string(),
                election: election.id().to_string(),
            });
        }
        if vote_cast.vote_method_id() != vote_method.id() {
            return Err(ReconcileError::UnknownVoteMethod {
                vote_method_id: vote_cast.vote_method_id().to_string(),
                election: election.id().to_string(),
            });
        }
        Ok(())
    }

    fn merge(&mut self, resolved: ResolvedRecord) -> Result<IngestOutcome, ReconcileError> {
        Self::check_ownership(&resolved)?;
        let ResolvedRecord {
            election,
            vote_method,
            vote_cast,
        } = resolved;

        let (idx, election_outcome) = match self.index.get(election.id()) {
            Some(&idx) => (idx, MergeOutcome::Unchanged),
            None => (self.insert_election(election), MergeOutcome::Inserted),
        };
        let target = &mut self.elections[idx];

        let vote_method_outcome = target.add_or_update_vote_method(vote_method)?;

        let cast_key = vote_cast.key();
        let vote_cast_outcome = if self.cast_keys.contains(&cast_key) {
            MergeOutcome::Unchanged
        } else {
            let outcome = target.add_voter_or_update(vote_cast)?;
            if outcome == MergeOutcome::Inserted {
                self.cast_keys.insert(cast_key);
            }
            outcome
        };

        Ok(IngestOutcome {
            election: election_outcome,
            vote_method: vote_method_outcome,
            vote_cast: vote_cast_outcome,
        })
    }

    /// Ingest a batch, isolating failures to the record that caused them
    pub fn ingest_batch(&mut self, records: &[ParticipationRecord]) -> IngestReport {
        let mut report = IngestReport::default();

        for (i, record) in records.iter().enumerate() {
            match self.ingest(record) {
                Ok(outcome) => {
                    debug!(record = i + 1, ?outcome, "record reconciled");
                    report.record(outcome);
                }
                Err(err) => report.reject(i + 1, &record.voter_id, &err),
            }
        }

        info!("{}", report.summary());
        report
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn elections(&self) -> &[Election] {
        &self.elections
    }

    pub fn election(&self, id: &str) -> Option<&Election> {
        self.index.get(id).map(|&idx| &self.elections[idx])
    }

    pub fn election_count(&self) -> usize {
        self.elections.len()
    }

    pub fn vote_method_count(&self) -> usize {
        self.elections.iter().map(|e| e.vote_methods().len()).sum()
    }

    pub fn vote_cast_count(&self) -> usize {
        self.elections.iter().map(|e| e.vote_casts().len()).sum()
    }

    /// Every (election, vote method, vote cast) triple for a voter, oldest first
    pub fn history_for(&self, voter_id: &str) -> Vec<ElectionHistoryEntry> {
        let voter_id = voter_id.trim();

        let mut history: Vec<ElectionHistoryEntry> = self
            .elections
            .iter()
            .filter_map(|election| {
                let cast = election.vote_cast_for(voter_id)?;
                let vote_method = election.vote_method(cast.vote_method_id())?;
                Some(ElectionHistoryEntry::new(
                    election.detached(),
                    vote_method.clone(),
                    cast.clone(),
                ))
            })
            .collect();

        history.sort_by(|a, b| {
            a.election
                .year()
                .cmp(&b.election.year())
                .then_with(|| a.election.id().cmp(b.election.id()))
        });
        history
    }
}

impl IngestReport {
    fn record(&mut self, outcome: IngestOutcome) {
        self.processed += 1;
        if outcome.election == MergeOutcome::Inserted {
            self.new_elections += 1;
        }
        if outcome.vote_method == MergeOutcome::Inserted {
            self.new_vote_methods += 1;
        }
        if outcome.vote_cast == MergeOutcome::Inserted {
            self.new_vote_casts += 1;
        }
        if outcome.is_duplicate() {
            self.duplicates += 1;
        }
    }

    fn reject(&mut self, record: usize, source: &str, err: &dyn std::error::Error) {
        warn!(record, source, error = %err, "record rejected");
        self.processed += 1;
        self.rejected += 1;
        self.errors.push(RecordError {
            record,
            message: err.to_string(),
        });
    }
}

// ============================================================================
// TESTS
// ============================================================================
