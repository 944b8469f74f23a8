// 🔑 Identity - Content-derived keys for election history entities
// Same attributes in, same key out. The key is the primary key in storage and
// the only basis for equality/hash of the owning entity.

use crate::codes::{ElectionType, PoliticalParty, VoteMethod};
use crate::error::IdentityError;
use chrono::NaiveDate;

/// Separator used inside election and vote method keys
pub const KEY_SEPARATOR: char = '-';

/// Separator used in the implicit vote cast key
pub const CAST_KEY_SEPARATOR: char = '|';

/// Remove every whitespace character (spaces, tabs, non-breaking spaces...)
pub fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Treat empty or whitespace-only optional values as absent
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// ELECTION KEY
// ============================================================================

/// `state[-city][-county]-year-electionType`, whitespace stripped.
///
/// ```
/// use turnout_history::codes::ElectionType;
/// use turnout_history::identity::election_key;
///
/// let key = election_key("TX", None, Some("Travis"), 2024, ElectionType::General).unwrap();
/// assert_eq!(key, "TX-Travis-2024-GE");
/// ```
pub fn election_key(
    state: &str,
    city: Option<&str>,
    county: Option<&str>,
    year: i32,
    election_type: ElectionType,
) -> Result<String, IdentityError> {
    if state.trim().is_empty() {
        return Err(IdentityError::MissingField {
            entity: "election",
            field: "state",
        });
    }

    let mut key = state.to_string();
    if let Some(city) = present(city) {
        key.push(KEY_SEPARATOR);
        key.push_str(city);
    }
    if let Some(county) = present(county) {
        key.push(KEY_SEPARATOR);
        key.push_str(county);
    }
    key.push_str(&format!("-{}-{}", year, election_type.code()));

    Ok(strip_whitespace(&key))
}

// ============================================================================
// VOTE METHOD KEY
// ============================================================================

/// `electionId[-voteMethod][-YYYYMMDD][-party]`, each optional part appended
/// only when present, always in that order.
pub fn vote_method_key(
    election_id: &str,
    vote_method: Option<VoteMethod>,
    vote_date: Option<NaiveDate>,
    party: Option<PoliticalParty>,
) -> Result<String, IdentityError> {
    if election_id.trim().is_empty() {
        return Err(IdentityError::MissingField {
            entity: "vote method",
            field: "election_id",
        });
    }

    let mut key = election_id.to_string();
    if let Some(method) = vote_method {
        key.push(KEY_SEPARATOR);
        key.push_str(method.code());
    }
    if let Some(date) = vote_date {
        key.push(KEY_SEPARATOR);
        key.push_str(&date.format("%Y%m%d").to_string());
    }
    if let Some(party) = party {
        key.push(KEY_SEPARATOR);
        key.push_str(party.code());
    }

    Ok(key)
}

// ============================================================================
// VOTE CAST KEY
// ============================================================================

/// `voterId|electionId|voteMethodId` - the uniqueness triple as one string.
pub fn vote_cast_key(
    voter_id: &str,
    election_id: &str,
    vote_method_id: &str,
) -> Result<String, IdentityError> {
    let parts = [
        ("voter_id", voter_id),
        ("election_id", election_id),
        ("vote_method_id", vote_method_id),
    ];
    for (field, value) in parts {
        if value.trim().is_empty() {
            return Err(IdentityError::MissingField {
                entity: "vote cast",
                field,
            });
        }
    }

    Ok(format!(
        "{}{sep}{}{sep}{}",
        voter_id,
        election_id,
        vote_method_id,
        sep = CAST_KEY_SEPARATOR
    ))
}

// ============================================================================
// TESTS
// ============================================================================
