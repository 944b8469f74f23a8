// 🗄️ Storage - SQLite persistence keyed by derived identities
//
// The database owns what the core does not: created/updated timestamps,
// foreign-key integrity and the (voter, election, vote method) uniqueness
// constraint. Writes are insert-or-ignore; the first stored version wins.

use crate::codes::{ElectionType, PoliticalParty, VoteMethod};
use crate::entities::{
    Election, ElectionAttrs, ElectionHistoryEntry, VoteCast, VoteMethodAttrs, VoteMethodRecord,
};
use crate::parser::ParticipationRecord;
use crate::reconciliation::ReconciliationEngine;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What an audit event records. Rows are only ever added, so every event
/// marks the first time an identity reached storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ElectionAdded,
    VoteMethodAdded,
    VoteCastAdded,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ElectionAdded => "election_added",
            EventKind::VoteMethodAdded => "vote_method_added",
            EventKind::VoteCastAdded => "vote_cast_added",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        [
            EventKind::ElectionAdded,
            EventKind::VoteMethodAdded,
            EventKind::VoteCastAdded,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == value)
    }
}

/// Audit trail entry, keyed by the derived identity it refers to
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub recorded_at: DateTime<Utc>,
    pub kind: EventKind,
    /// Election id, vote method id or vote cast key
    pub identity: String,
    /// Election the identity belongs to
    pub election_id: String,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(kind: EventKind, identity: &str, election_id: &str, data: serde_json::Value) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            recorded_at: Utc::now(),
            kind,
            identity: identity.to_string(),
            election_id: election_id.to_string(),
            data,
        }
    }

    fn election(election: &Election) -> Self {
        Self::new(
            EventKind::ElectionAdded,
            election.id(),
            election.id(),
            serde_json::json!({
                "state": election.state(),
                "year": election.year(),
                "type": election.election_type().code(),
            }),
        )
    }

    fn vote_method(vote_method: &VoteMethodRecord) -> Self {
        Self::new(
            EventKind::VoteMethodAdded,
            vote_method.id(),
            vote_method.election_id(),
            serde_json::json!({
                "method": vote_method.vote_method().code(),
                "party": vote_method.party().map(|p| p.code()),
            }),
        )
    }

    fn vote_cast(cast: &VoteCast) -> Self {
        Self::new(
            EventKind::VoteCastAdded,
            &cast.key(),
            cast.election_id(),
            serde_json::json!({
                "voter_id": cast.voter_id(),
                "vote_method_id": cast.vote_method_id(),
            }),
        )
    }
}

/// Rows written by a save call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertStats {
    pub elections: usize,
    pub vote_methods: usize,
    pub vote_casts: usize,
    pub duplicates: usize,
}

impl InsertStats {
    fn add(&mut self, other: InsertStats) {
        self.elections += other.elections;
        self.vote_methods += other.vote_methods;
        self.vote_casts += other.vote_casts;
        self.duplicates += other.duplicates;
    }
}

/// Row counts per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    pub elections: i64,
    pub vote_methods: i64,
    pub vote_casts: i64,
    pub events: i64,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Elections
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS elections (
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            election_type TEXT NOT NULL,
            state TEXT NOT NULL,
            city TEXT,
            county TEXT,
            dates TEXT,
            description TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Vote methods (owned by one election)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vote_methods (
            id TEXT PRIMARY KEY,
            election_id TEXT NOT NULL REFERENCES elections(id),
            vote_method TEXT NOT NULL,
            vote_date TEXT,
            party TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Vote casts - at most one per (voter, election, vote method)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vote_casts (
            voter_id TEXT NOT NULL,
            election_id TEXT NOT NULL REFERENCES elections(id),
            vote_method_id TEXT NOT NULL REFERENCES vote_methods(id),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (voter_id, election_id, vote_method_id)
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            recorded_at TEXT NOT NULL,
            kind TEXT NOT NULL,
            identity TEXT NOT NULL,
            election_id TEXT NOT NULL REFERENCES elections(id),
            data TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vote_methods_election ON vote_methods(election_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_vote_casts_voter ON vote_casts(voter_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_election ON events(election_id)",
        [],
    )?;

    Ok(())
}

/// Run an INSERT; `Ok(false)` when the row already exists
fn insert_or_ignore(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<bool> {
    match conn.execute(sql, params) {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// WRITES
// ============================================================================

/// Store an election with all its vote methods and casts
pub fn save_election(conn: &Connection, election: &Election) -> Result<InsertStats> {
    let tx = conn.unchecked_transaction()?;
    let mut stats = InsertStats::default();

    let dates_json = election.dates().map(|d| serde_json::to_string(d)).transpose()?;
    let inserted = insert_or_ignore(
        &tx,
        "INSERT INTO elections (id, year, election_type, state, city, county, dates, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            election.id(),
            election.year(),
            election.election_type().code(),
            election.state(),
            election.city(),
            election.county(),
            dates_json,
            election.desc(),
        ],
    )?;
    if inserted {
        stats.elections += 1;
        insert_event(&tx, &Event::election(election))?;
    } else {
        stats.duplicates += 1;
    }

    for vote_method in election.vote_methods() {
        let inserted = insert_or_ignore(
            &tx,
            "INSERT INTO vote_methods (id, election_id, vote_method, vote_date, party)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                vote_method.id(),
                vote_method.election_id(),
                vote_method.vote_method().code(),
                vote_method.vote_date().map(|d| d.to_string()),
                vote_method.party().map(|p| p.code()),
            ],
        )?;
        if inserted {
            stats.vote_methods += 1;
            insert_event(&tx, &Event::vote_method(vote_method))?;
        } else {
            stats.duplicates += 1;
        }
    }

    for cast in election.vote_casts() {
        let inserted = insert_or_ignore(
            &tx,
            "INSERT INTO vote_casts (voter_id, election_id, vote_method_id) VALUES (?1, ?2, ?3)",
            params![cast.voter_id(), cast.election_id(), cast.vote_method_id()],
        )?;
        if inserted {
            stats.vote_casts += 1;
            insert_event(&tx, &Event::vote_cast(cast))?;
        } else {
            stats.duplicates += 1;
        }
    }

    tx.commit()?;
    debug!(election = %election.id(), ?stats, "election saved");
    Ok(stats)
}

/// Store every election held by a reconciliation engine
pub fn save_engine(conn: &Connection, engine: &ReconciliationEngine) -> Result<InsertStats> {
    let mut total = InsertStats::default();
    for election in engine.elections() {
        total.add(save_election(conn, election)?);
    }

    info!(
        "Stored {} elections, {} vote methods, {} casts ({} already present)",
        total.elections, total.vote_methods, total.vote_casts, total.duplicates
    );
    Ok(total)
}

/// Append one event to the audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        "INSERT INTO events (event_id, recorded_at, kind, identity, election_id, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.event_id,
            event.recorded_at.to_rfc3339(),
            event.kind.as_str(),
            event.identity,
            event.election_id,
            serde_json::to_string(&event.data)?,
        ],
    )?;
    Ok(())
}

// ============================================================================
// READS
// ============================================================================

/// SQLite CURRENT_TIMESTAMP format, always UTC
fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok())
        .map(|dt| dt.and_utc())
}

struct ElectionRow {
    id: String,
    year: i32,
    election_type: String,
    state: String,
    city: Option<String>,
    county: Option<String>,
    dates: Option<String>,
    description: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

const ELECTION_COLUMNS: &str =
    "e.id, e.year, e.election_type, e.state, e.city, e.county, e.dates, e.description, e.created_at, e.updated_at";

impl ElectionRow {
    fn from_row(row: &Row, offset: usize) -> rusqlite::Result<Self> {
        Ok(ElectionRow {
            id: row.get(offset)?,
            year: row.get(offset + 1)?,
            election_type: row.get(offset + 2)?,
            state: row.get(offset + 3)?,
            city: row.get(offset + 4)?,
            county: row.get(offset + 5)?,
            dates: row.get(offset + 6)?,
            description: row.get(offset + 7)?,
            created_at: row.get(offset + 8)?,
            updated_at: row.get(offset + 9)?,
        })
    }

    /// Rebuild through the factory; the stored key must match the derived one
    fn into_election(self) -> Result<Election> {
        let mut attrs = ElectionAttrs::new(
            self.state,
            self.year,
            ElectionType::from_code(&self.election_type)?,
        );
        attrs.city = self.city;
        attrs.county = self.county;
        attrs.dates = self
            .dates
            .map(|json| serde_json::from_str::<Vec<NaiveDate>>(&json))
            .transpose()
            .context("Failed to decode election dates")?;
        attrs.desc = self.description;

        let election = Election::new(attrs)?;
        if election.id() != self.id {
            bail!(
                "stored election id '{}' does not match derived id '{}'",
                self.id,
                election.id()
            );
        }

        Ok(election.with_timestamps(
            parse_timestamp(self.created_at),
            parse_timestamp(self.updated_at),
        ))
    }
}

struct VoteMethodRow {
    id: String,
    election_id: String,
    vote_method: String,
    vote_date: Option<String>,
    party: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

const VOTE_METHOD_COLUMNS: &str =
    "vm.id, vm.election_id, vm.vote_method, vm.vote_date, vm.party, vm.created_at, vm.updated_at";

impl VoteMethodRow {
    fn from_row(row: &Row, offset: usize) -> rusqlite::Result<Self> {
        Ok(VoteMethodRow {
            id: row.get(offset)?,
            election_id: row.get(offset + 1)?,
            vote_method: row.get(offset + 2)?,
            vote_date: row.get(offset + 3)?,
            party: row.get(offset + 4)?,
            created_at: row.get(offset + 5)?,
            updated_at: row.get(offset + 6)?,
        })
    }

    fn into_record(self) -> Result<VoteMethodRecord> {
        let record = VoteMethodRecord::new(VoteMethodAttrs {
            election_id: self.election_id,
            vote_method: VoteMethod::from_code(&self.vote_method)?,
            vote_date: self
                .vote_date
                .map(|d| d.parse::<NaiveDate>())
                .transpose()
                .context("Failed to decode vote date")?,
            party: self
                .party
                .map(|p| PoliticalParty::from_code(&p))
                .transpose()?,
        })?;
        if record.id() != self.id {
            bail!(
                "stored vote method id '{}' does not match derived id '{}'",
                self.id,
                record.id()
            );
        }

        Ok(record.with_timestamps(
            parse_timestamp(self.created_at),
            parse_timestamp(self.updated_at),
        ))
    }
}

struct VoteCastRow {
    voter_id: String,
    election_id: String,
    vote_method_id: String,
    created_at: Option<String>,
    updated_at: Option<String>,
}

const VOTE_CAST_COLUMNS: &str =
    "vc.voter_id, vc.election_id, vc.vote_method_id, vc.created_at, vc.updated_at";

impl VoteCastRow {
    fn from_row(row: &Row, offset: usize) -> rusqlite::Result<Self> {
        Ok(VoteCastRow {
            voter_id: row.get(offset)?,
            election_id: row.get(offset + 1)?,
            vote_method_id: row.get(offset + 2)?,
            created_at: row.get(offset + 3)?,
            updated_at: row.get(offset + 4)?,
        })
    }

    fn into_cast(self) -> Result<VoteCast> {
        let cast = VoteCast::new(self.voter_id, self.election_id, self.vote_method_id)?;
        Ok(cast.with_timestamps(
            parse_timestamp(self.created_at),
            parse_timestamp(self.updated_at),
        ))
    }
}

/// Load one election with its vote methods and casts
pub fn load_election(conn: &Connection, id: &str) -> Result<Option<Election>> {
    let row = conn
        .query_row(
            &format!("SELECT {ELECTION_COLUMNS} FROM elections e WHERE e.id = ?1"),
            [id],
            |row| ElectionRow::from_row(row, 0),
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut election = row.into_election()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {VOTE_METHOD_COLUMNS} FROM vote_methods vm WHERE vm.election_id = ?1 ORDER BY vm.rowid"
    ))?;
    let method_rows = stmt
        .query_map([id], |row| VoteMethodRow::from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    for method_row in method_rows {
        election.add_or_update_vote_method(method_row.into_record()?)?;
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {VOTE_CAST_COLUMNS} FROM vote_casts vc WHERE vc.election_id = ?1 ORDER BY vc.rowid"
    ))?;
    let cast_rows = stmt
        .query_map([id], |row| VoteCastRow::from_row(row, 0))?
        .collect::<Result<Vec<_>, _>>()?;
    for cast_row in cast_rows {
        election.add_voter_or_update(cast_row.into_cast()?)?;
    }

    Ok(Some(election))
}

/// Load every stored election, fully populated
pub fn load_all_elections(conn: &Connection) -> Result<Vec<Election>> {
    let mut stmt = conn.prepare("SELECT id FROM elections ORDER BY year, id")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut elections = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(election) = load_election(conn, &id)? {
            elections.push(election);
        }
    }
    Ok(elections)
}

/// Load the stored elections a batch of records refers to into an engine,
/// so that casts already on disk keep winning over the new batch.
/// Returns how many elections were found.
pub fn seed_engine(
    conn: &Connection,
    engine: &mut ReconciliationEngine,
    records: &[ParticipationRecord],
) -> Result<usize> {
    let mut found = 0;
    for id in ReconciliationEngine::election_ids(records) {
        if let Some(election) = load_election(conn, &id)? {
            engine.absorb(election);
            found += 1;
        }
    }
    debug!(found, records = records.len(), "engine seeded from storage");
    Ok(found)
}

/// One (election, vote method, vote cast) triple per election a voter took
/// part in, oldest first.
///
/// When storage holds several casts for the same voter and election, the
/// earliest stored one wins, as it does in `load_election`.
pub fn load_history(conn: &Connection, voter_id: &str) -> Result<Vec<ElectionHistoryEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ELECTION_COLUMNS}, {VOTE_METHOD_COLUMNS}, {VOTE_CAST_COLUMNS}
         FROM vote_casts vc
         JOIN elections e ON e.id = vc.election_id
         JOIN vote_methods vm ON vm.id = vc.vote_method_id
         WHERE vc.voter_id = ?1
           AND vc.rowid = (
               SELECT MIN(earliest.rowid) FROM vote_casts earliest
               WHERE earliest.voter_id = vc.voter_id AND earliest.election_id = vc.election_id
           )
         ORDER BY e.year, e.id"
    ))?;

    let rows = stmt
        .query_map([voter_id.trim()], |row| {
            Ok((
                ElectionRow::from_row(row, 0)?,
                VoteMethodRow::from_row(row, 10)?,
                VoteCastRow::from_row(row, 17)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(election, vote_method, cast)| -> Result<ElectionHistoryEntry> {
            Ok(ElectionHistoryEntry::new(
                election.into_election()?,
                vote_method.into_record()?,
                cast.into_cast()?,
            ))
        })
        .collect()
}

/// Audit trail of one election and everything stored under it, oldest first
pub fn events_for_election(conn: &Connection, election_id: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, recorded_at, kind, identity, election_id, data
         FROM events
         WHERE election_id = ?1
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map([election_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(event_id, recorded_at, kind, identity, election_id, data)| -> Result<Event> {
            Ok(Event {
                event_id,
                recorded_at: DateTime::parse_from_rfc3339(&recorded_at)
                    .with_context(|| format!("Bad event timestamp '{recorded_at}'"))?
                    .with_timezone(&Utc),
                kind: EventKind::parse(&kind)
                    .with_context(|| format!("Unknown event kind '{kind}'"))?,
                identity,
                election_id,
                data: serde_json::from_str(&data).context("Failed to decode event data")?,
            })
        })
        .collect()
}

pub fn verify_counts(conn: &Connection) -> Result<RowCounts> {
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
    };

    Ok(RowCounts {
        elections: count("elections")?,
        vote_methods: count("vote_methods")?,
        vote_casts: count("vote_casts")?,
        events: count("events")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn create_test_engine() -> ReconciliationEngine {
        let mut engine = ReconciliationEngine::new();
        engine.ingest_batch(&[
            ParticipationRecord::new("V1", "TX", "2024", "GE", "MI")
                .with_county("Travis")
                .with_party("DEM")
                .with_vote_date("2024-10-28")
                .with_election_dates("2024-11-05"),
            ParticipationRecord::new("V1", "TX", "2024", "PR", "EV")
                .with_county("Travis")
                .with_party("REP"),
            ParticipationRecord::new("V2", "TX", "2024", "GE", "IP").with_county("Travis"),
        ]);
        engine
    }

    #[test]
    fn test_idempotency_save_twice() {
        let conn = create_test_db();
        let engine = create_test_engine();

        let first = save_engine(&conn, &engine).unwrap();
        let counts1 = verify_counts(&conn).unwrap();

        let second = save_engine(&conn, &engine).unwrap();
        let counts2 = verify_counts(&conn).unwrap();

        assert_eq!(first.elections, 2);
        assert_eq!(first.vote_methods, 3);
        assert_eq!(first.vote_casts, 3);
        assert_eq!(first.duplicates, 0);

        assert_eq!(second.elections + second.vote_methods + second.vote_casts, 0);
        assert_eq!(second.duplicates, 8);

        assert_eq!(counts1, counts2);
        assert_eq!(counts2.vote_casts, 3);
        assert_eq!(counts2.events, 8);
    }

    #[test]
    fn test_storage_assigns_timestamps() {
        let conn = create_test_db();
        save_engine(&conn, &create_test_engine()).unwrap();

        let election = load_election(&conn, "TX-Travis-2024-GE").unwrap().unwrap();
        assert!(election.created_at().is_some());
        assert!(election.updated_at().is_some());
        assert!(election.vote_methods().iter().all(|m| m.created_at().is_some()));
    }

    #[test]
    fn test_load_election_round_trip() {
        let conn = create_test_db();
        let engine = create_test_engine();
        save_engine(&conn, &engine).unwrap();

        let original = engine.election("TX-Travis-2024-GE").unwrap();
        let loaded = load_election(&conn, original.id()).unwrap().unwrap();

        assert_eq!(&loaded, original);
        assert_eq!(loaded.dates(), original.dates());
        assert_eq!(loaded.vote_methods().len(), 2);
        assert_eq!(loaded.vote_casts().len(), 2);

        assert!(load_election(&conn, "ZZ-1900-GE").unwrap().is_none());
    }

    #[test]
    fn test_load_history() {
        let conn = create_test_db();
        save_engine(&conn, &create_test_engine()).unwrap();

        let history = load_history(&conn, "V1").unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.vote_cast.voter_id() == "V1"));

        let general = history
            .iter()
            .find(|h| h.election.election_type() == ElectionType::General)
            .unwrap();
        assert_eq!(general.vote_method.id(), "TX-Travis-2024-GE-MI-20241028-DEM");
        assert_eq!(general.vote_method.party(), Some(PoliticalParty::Democratic));

        assert!(load_history(&conn, "nobody").unwrap().is_empty());
    }

    #[test]
    fn test_triple_uniqueness_enforced_by_storage() {
        let conn = create_test_db();
        save_engine(&conn, &create_test_engine()).unwrap();

        let result = conn.execute(
            "INSERT INTO vote_casts (voter_id, election_id, vote_method_id) VALUES (?1, ?2, ?3)",
            params!["V2", "TX-Travis-2024-GE", "TX-Travis-2024-GE-IP"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = create_test_db();

        let result = conn.execute(
            "INSERT INTO vote_casts (voter_id, election_id, vote_method_id) VALUES (?1, ?2, ?3)",
            params!["V1", "XX-2024-GE", "XX-2024-GE-IP"],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_all_elections_seeds_engine() {
        let conn = create_test_db();
        save_engine(&conn, &create_test_engine()).unwrap();

        let mut engine = ReconciliationEngine::new();
        for election in load_all_elections(&conn).unwrap() {
            engine.absorb(election);
        }

        assert_eq!(engine.election_count(), 2);
        assert_eq!(engine.vote_cast_count(), 3);
        assert_eq!(engine.history_for("V1").len(), 2);
    }

    #[test]
    fn test_csv_to_scores_end_to_end() {
        use crate::parser::read_participation_csv;
        use crate::scoring::TurnoutScorer;

        let csv_text = "\
voter_id,state,city,county,year,election_type,vote_method,party,vote_date,election_dates,description
V7,TX,,Travis,2020,PR,IP,REP,,,
V7,TX,,Travis,2022,PR,EV,DEM,,,
V7,TX,,Travis,2024,GE,MI,,,,
V7,TX,,Travis,2024,GE,MI,,,,
V7,TX,,Travis,2024,GE,XX,,,,
";
        let records = read_participation_csv(csv::Reader::from_reader(csv_text.as_bytes())).unwrap();

        let mut engine = ReconciliationEngine::new();
        let report = engine.ingest_batch(&records);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.rejected, 1);

        let conn = create_test_db();
        save_engine(&conn, &engine).unwrap();

        let history = load_history(&conn, "V7").unwrap();
        assert_eq!(history.len(), 3);

        let as_of = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let scores = TurnoutScorer::default().score(&history, as_of);
        assert_eq!(scores.primary_score, 0.67);
        assert_eq!(scores.general_score, 0.33);
        assert_eq!(scores.gop_primary_score, 0.5);
        assert_eq!(scores.dem_primary_score, 0.5);
    }

    #[test]
    fn test_event_log() {
        let conn = create_test_db();
        let engine = create_test_engine();
        save_engine(&conn, &engine).unwrap();
        save_engine(&conn, &engine).unwrap();

        let events = events_for_election(&conn, "TX-Travis-2024-GE").unwrap();
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();

        // Re-saving adds nothing: one event per stored row
        assert_eq!(
            kinds,
            vec![
                EventKind::ElectionAdded,
                EventKind::VoteMethodAdded,
                EventKind::VoteMethodAdded,
                EventKind::VoteCastAdded,
                EventKind::VoteCastAdded,
            ]
        );
        assert_eq!(events[0].identity, "TX-Travis-2024-GE");
        assert_eq!(events[0].data["type"], "GE");
        assert_eq!(events[1].identity, "TX-Travis-2024-GE-MI-20241028-DEM");
        assert_eq!(events[1].data["party"], "DEM");
        assert_eq!(events[3].identity, "V1|TX-Travis-2024-GE|TX-Travis-2024-GE-MI-20241028-DEM");
        assert!(events.iter().all(|e| e.election_id == "TX-Travis-2024-GE"));

        assert!(events_for_election(&conn, "ZZ-1900-GE").unwrap().is_empty());
    }

    #[test]
    fn test_history_keeps_first_stored_cast_per_election() {
        let conn = create_test_db();
        let engine = create_test_engine();
        save_engine(&conn, &engine).unwrap();

        // A second method for V1 on the same election, written by someone else
        conn.execute(
            "INSERT INTO vote_casts (voter_id, election_id, vote_method_id) VALUES (?1, ?2, ?3)",
            params!["V1", "TX-Travis-2024-GE", "TX-Travis-2024-GE-IP"],
        )
        .unwrap();

        let history = load_history(&conn, "V1").unwrap();
        assert_eq!(history.len(), 2);
        let general = history
            .iter()
            .find(|h| h.election.election_type() == ElectionType::General)
            .unwrap();
        assert_eq!(general.vote_method.vote_method(), VoteMethod::MailIn);

        // Same answer as an engine rebuilt from storage
        let mut seeded = ReconciliationEngine::new();
        for election in load_all_elections(&conn).unwrap() {
            seeded.absorb(election);
        }
        let from_engine: Vec<String> = seeded.history_for("V1").iter().map(|h| h.vote_cast.key()).collect();
        let from_storage: Vec<String> = history.iter().map(|h| h.vote_cast.key()).collect();
        assert_eq!(from_engine, from_storage);
    }

    #[test]
    fn test_seed_engine_loads_only_touched_elections() {
        let conn = create_test_db();
        save_engine(&conn, &create_test_engine()).unwrap();

        let batch = vec![
            ParticipationRecord::new("V1", "TX", "2024", "GE", "IP").with_county("Travis"),
            ParticipationRecord::new("V9", "TX", "2026", "GE", "IP").with_county("Travis"),
        ];

        let mut engine = ReconciliationEngine::new();
        let found = seed_engine(&conn, &mut engine, &batch).unwrap();
        assert_eq!(found, 1);
        assert_eq!(engine.election_count(), 1);
        assert!(engine.election("TX-Travis-2024-PR").is_none());

        // V1 already voted by mail in storage, so the new method does not replace it
        let report = engine.ingest_batch(&batch);
        assert_eq!(report.new_vote_casts, 1);
        assert_eq!(engine.history_for("V1")[0].vote_method.vote_method(), VoteMethod::MailIn);

        save_engine(&conn, &engine).unwrap();
        let history = load_history(&conn, "V1").unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.vote_method.vote_method() != VoteMethod::InPerson));
    }
}
