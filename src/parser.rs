// 🏗️ Participation Parser - Raw source rows → ParticipationRecord
// Rows stay string-typed here; code tables and identities are resolved by the
// reconciliation engine so one bad row never poisons the batch.

use crate::error::IngestError;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// PARTICIPATION RECORD
// ============================================================================

/// One raw participation fact, as delivered by a voter file export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub voter_id: String,
    pub state: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub county: Option<String>,
    pub year: String,
    pub election_type: String,
    pub vote_method: String,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub vote_date: Option<String>,
    /// `;`-separated list of election dates
    #[serde(default)]
    pub election_dates: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ParticipationRecord {
    /// Create a record with the required fields
    pub fn new(
        voter_id: &str,
        state: &str,
        year: &str,
        election_type: &str,
        vote_method: &str,
    ) -> Self {
        ParticipationRecord {
            voter_id: voter_id.to_string(),
            state: state.to_string(),
            year: year.to_string(),
            election_type: election_type.to_string(),
            vote_method: vote_method.to_string(),
            ..Default::default()
        }
    }

    /// Builder pattern: add optional city
    pub fn with_city(mut self, city: &str) -> Self {
        self.city = Some(city.to_string());
        self
    }

    /// Builder pattern: add optional county
    pub fn with_county(mut self, county: &str) -> Self {
        self.county = Some(county.to_string());
        self
    }

    /// Builder pattern: add party code
    pub fn with_party(mut self, party: &str) -> Self {
        self.party = Some(party.to_string());
        self
    }

    /// Builder pattern: add the date the vote was cast
    pub fn with_vote_date(mut self, vote_date: &str) -> Self {
        self.vote_date = Some(vote_date.to_string());
        self
    }

    /// Builder pattern: add election dates (`;`-separated)
    pub fn with_election_dates(mut self, dates: &str) -> Self {
        self.election_dates = Some(dates.to_string());
        self
    }

    /// Builder pattern: add description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

// ============================================================================
// FIELD PARSING
// ============================================================================

/// Blank optional fields count as absent
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_year(raw: &str) -> Result<i32, IngestError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|year| *year > 0)
        .ok_or_else(|| IngestError::InvalidYear(raw.to_string()))
}

/// Parse date from string (supports YYYY-MM-DD and MM/DD/YYYY)
pub fn parse_date(raw: &str) -> Result<NaiveDate, IngestError> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%m/%d/%Y") {
        return Ok(date);
    }

    Err(IngestError::InvalidDate(raw.to_string()))
}

/// Parse a `;`-separated date list; empty list becomes `None`
pub fn parse_date_list(raw: &str) -> Result<Option<Vec<NaiveDate>>, IngestError> {
    let dates = raw
        .split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_date)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if dates.is_empty() { None } else { Some(dates) })
}

// ============================================================================
// CSV LOADING
// ============================================================================

pub fn load_participation_csv(csv_path: &Path) -> Result<Vec<ParticipationRecord>> {
    let rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    read_participation_csv(rdr)
}

pub fn read_participation_csv<R: std::io::Read>(
    mut rdr: csv::Reader<R>,
) -> Result<Vec<ParticipationRecord>> {
    let mut records = Vec::new();

    for (i, result) in rdr.deserialize().enumerate() {
        let record: ParticipationRecord =
            result.with_context(|| format!("Failed to deserialize participation row {}", i + 1))?;
        records.push(record);
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
voter_id,state,city,county,year,election_type,vote_method,party,vote_date,election_dates,description
V1,TX,,Travis,2024,GE,MI,DEM,10/28/2024,2024-11-05,General election
V1,TX,,Travis,2024,PR,EV,REP,2024-02-27,,
V2,TX,Austin,Travis,2022,PRR,IP,,,,
";

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("2024-03-05").unwrap(), expected);
        assert_eq!(parse_date("03/05/2024").unwrap(), expected);
        assert_eq!(parse_date(" 2024-03-05 ").unwrap(), expected);
        assert!(matches!(parse_date("March 5"), Err(IngestError::InvalidDate(_))));
    }

    #[test]
    fn test_parse_date_list() {
        let dates = parse_date_list("2024-03-05; 2024-05-28").unwrap().unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!(parse_date_list(" ; ").unwrap(), None);
        assert!(parse_date_list("2024-03-05;bogus").is_err());
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year(" 2024 ").unwrap(), 2024);
        assert!(matches!(parse_year("twenty"), Err(IngestError::InvalidYear(_))));
        assert!(parse_year("-4").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(&Some("  ".to_string())), None);
        assert_eq!(non_blank(&Some(" Travis ".to_string())), Some("Travis"));
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn test_read_participation_csv() {
        let rdr = csv::Reader::from_reader(SAMPLE.as_bytes());
        let records = read_participation_csv(rdr).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].voter_id, "V1");
        assert_eq!(non_blank(&records[0].county), Some("Travis"));
        assert_eq!(non_blank(&records[0].city), None);
        assert_eq!(records[1].election_type, "PR");
        assert_eq!(non_blank(&records[2].party), None);
    }

    #[test]
    fn test_load_participation_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let records = load_participation_csv(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].city.as_deref(), Some("Austin"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = load_participation_csv(Path::new("/nonexistent/participation.csv"));
        assert!(result.is_err());
    }
}
