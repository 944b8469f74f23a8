// 🗂️ Code Domain - Closed value sets for election history
// Election type, vote method and political party. Unknown source values are
// rejected, never coerced into a catch-all.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resolve a raw source value against a code table.
///
/// Matches either the short code or the member name, after trimming and
/// ASCII-uppercasing the input.
fn lookup<T: Copy>(
    domain: &'static str,
    all: &[T],
    code: impl Fn(&T) -> &'static str,
    name: impl Fn(&T) -> &'static str,
    raw: &str,
) -> Result<T, DomainError> {
    let wanted = raw.trim().to_ascii_uppercase();

    all.iter()
        .find(|member| code(*member) == wanted)
        .or_else(|| all.iter().find(|member| name(*member) == wanted))
        .copied()
        .ok_or_else(|| DomainError::UnknownCode {
            domain,
            value: raw.to_string(),
        })
}

/// First pair of (code, name) entries that share a code
fn check_unique_codes(
    domain: &'static str,
    entries: &[(&'static str, &'static str)],
) -> Result<(), DomainError> {
    for (i, &(code, first)) in entries.iter().enumerate() {
        if let Some(&(_, second)) = entries[i + 1..].iter().find(|(other, _)| *other == code) {
            return Err(DomainError::DuplicateCode {
                domain,
                code,
                first,
                second,
            });
        }
    }
    Ok(())
}

// ============================================================================
// VOTE METHOD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteMethod {
    #[serde(rename = "IP")]
    InPerson,
    #[serde(rename = "MI")]
    MailIn,
    #[serde(rename = "EV")]
    EarlyVote,
    #[serde(rename = "PV")]
    Provisional,
    #[serde(rename = "AB")]
    Absentee,
}

impl VoteMethod {
    pub const ALL: [VoteMethod; 5] = [
        VoteMethod::InPerson,
        VoteMethod::MailIn,
        VoteMethod::EarlyVote,
        VoteMethod::Provisional,
        VoteMethod::Absentee,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            VoteMethod::InPerson => "IP",
            VoteMethod::MailIn => "MI",
            VoteMethod::EarlyVote => "EV",
            VoteMethod::Provisional => "PV",
            VoteMethod::Absentee => "AB",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VoteMethod::InPerson => "IN_PERSON",
            VoteMethod::MailIn => "MAIL_IN",
            VoteMethod::EarlyVote => "EARLY_VOTE",
            VoteMethod::Provisional => "PROVISIONAL",
            VoteMethod::Absentee => "ABSENTEE",
        }
    }

    pub fn from_code(raw: &str) -> Result<Self, DomainError> {
        lookup("vote method", &Self::ALL, Self::code, Self::name, raw)
    }
}

// ============================================================================
// POLITICAL PARTY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoliticalParty {
    #[serde(rename = "DEM")]
    Democratic,
    #[serde(rename = "REP")]
    Republican,
    #[serde(rename = "LIB")]
    Libertarian,
    #[serde(rename = "GRN")]
    Green,
    #[serde(rename = "CON")]
    Constitution,
    #[serde(rename = "ASP")]
    AmericanSolidarity,
    #[serde(rename = "ALL")]
    Alliance,
    #[serde(rename = "IND")]
    Independent,
    #[serde(rename = "PRO")]
    Progressive,
    #[serde(rename = "CEN")]
    Centrist,
    #[serde(rename = "MAGA")]
    Maga,
    #[serde(rename = "NL")]
    NoLabels,
    #[serde(rename = "LAB")]
    Labour,
    /// Catch-all for parties outside the table; still has to be sent explicitly
    #[serde(rename = "OTH")]
    Other,
}

impl PoliticalParty {
    pub const ALL: [PoliticalParty; 14] = [
        PoliticalParty::Democratic,
        PoliticalParty::Republican,
        PoliticalParty::Libertarian,
        PoliticalParty::Green,
        PoliticalParty::Constitution,
        PoliticalParty::AmericanSolidarity,
        PoliticalParty::Alliance,
        PoliticalParty::Independent,
        PoliticalParty::Progressive,
        PoliticalParty::Centrist,
        PoliticalParty::Maga,
        PoliticalParty::NoLabels,
        PoliticalParty::Labour,
        PoliticalParty::Other,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PoliticalParty::Democratic => "DEM",
            PoliticalParty::Republican => "REP",
            PoliticalParty::Libertarian => "LIB",
            PoliticalParty::Green => "GRN",
            PoliticalParty::Constitution => "CON",
            PoliticalParty::AmericanSolidarity => "ASP",
            PoliticalParty::Alliance => "ALL",
            PoliticalParty::Independent => "IND",
            PoliticalParty::Progressive => "PRO",
            PoliticalParty::Centrist => "CEN",
            PoliticalParty::Maga => "MAGA",
            PoliticalParty::NoLabels => "NL",
            PoliticalParty::Labour => "LAB",
            PoliticalParty::Other => "OTH",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PoliticalParty::Democratic => "DEMOCRATIC",
            PoliticalParty::Republican => "REPUBLICAN",
            PoliticalParty::Libertarian => "LIBERTARIAN",
            PoliticalParty::Green => "GREEN",
            PoliticalParty::Constitution => "CONSTITUTION",
            PoliticalParty::AmericanSolidarity => "AMERICAN_SOLIDARITY",
            PoliticalParty::Alliance => "ALLIANCE",
            PoliticalParty::Independent => "INDEPENDENT",
            PoliticalParty::Progressive => "PROGRESSIVE",
            PoliticalParty::Centrist => "CENTRIST",
            PoliticalParty::Maga => "MAGA",
            PoliticalParty::NoLabels => "NO_LABELS",
            PoliticalParty::Labour => "LABOUR",
            PoliticalParty::Other => "OTHER",
        }
    }

    pub fn from_code(raw: &str) -> Result<Self, DomainError> {
        lookup("political party", &Self::ALL, Self::code, Self::name, raw)
    }
}

// ============================================================================
// ELECTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionType {
    #[serde(rename = "GE")]
    General,
    #[serde(rename = "GR")]
    GeneralRunoff,
    #[serde(rename = "GA")]
    GovernmentalAuthority,
    #[serde(rename = "GL")]
    GovernmentLegislative,
    #[serde(rename = "ME")]
    Municipal,
    #[serde(rename = "SE")]
    Special,
    #[serde(rename = "RE")]
    Recall,
    #[serde(rename = "PR")]
    Primary,
    #[serde(rename = "PRR")]
    PrimaryRunoff,
    #[serde(rename = "OP")]
    OpenPrimary,
    #[serde(rename = "CP")]
    ClosedPrimary,
    #[serde(rename = "NP")]
    NonpartisanPrimary,
    #[serde(rename = "SB")]
    SchoolBoard,
    #[serde(rename = "JE")]
    Judicial,
    #[serde(rename = "LE")]
    Local,
    #[serde(rename = "LR")]
    LocalRunoff,
    #[serde(rename = "CE")]
    Congressional,
    /// "ME" is taken by Municipal; midterms get their own code
    #[serde(rename = "MT")]
    Midterm,
    #[serde(rename = "RF")]
    Referendum,
    #[serde(rename = "PE")]
    Presidential,
    #[serde(rename = "PP")]
    PresidentialPrimary,
    #[serde(rename = "PPR")]
    PresidentialPreference,
    #[serde(rename = "PC")]
    PresidentialCaucus,
}

impl ElectionType {
    pub const ALL: [ElectionType; 23] = [
        ElectionType::General,
        ElectionType::GeneralRunoff,
        ElectionType::GovernmentalAuthority,
        ElectionType::GovernmentLegislative,
        ElectionType::Municipal,
        ElectionType::Special,
        ElectionType::Recall,
        ElectionType::Primary,
        ElectionType::PrimaryRunoff,
        ElectionType::OpenPrimary,
        ElectionType::ClosedPrimary,
        ElectionType::NonpartisanPrimary,
        ElectionType::SchoolBoard,
        ElectionType::Judicial,
        ElectionType::Local,
        ElectionType::LocalRunoff,
        ElectionType::Congressional,
        ElectionType::Midterm,
        ElectionType::Referendum,
        ElectionType::Presidential,
        ElectionType::PresidentialPrimary,
        ElectionType::PresidentialPreference,
        ElectionType::PresidentialCaucus,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ElectionType::General => "GE",
            ElectionType::GeneralRunoff => "GR",
            ElectionType::GovernmentalAuthority => "GA",
            ElectionType::GovernmentLegislative => "GL",
            ElectionType::Municipal => "ME",
            ElectionType::Special => "SE",
            ElectionType::Recall => "RE",
            ElectionType::Primary => "PR",
            ElectionType::PrimaryRunoff => "PRR",
            ElectionType::OpenPrimary => "OP",
            ElectionType::ClosedPrimary => "CP",
            ElectionType::NonpartisanPrimary => "NP",
            ElectionType::SchoolBoard => "SB",
            ElectionType::Judicial => "JE",
            ElectionType::Local => "LE",
            ElectionType::LocalRunoff => "LR",
            ElectionType::Congressional => "CE",
            ElectionType::Midterm => "MT",
            ElectionType::Referendum => "RF",
            ElectionType::Presidential => "PE",
            ElectionType::PresidentialPrimary => "PP",
            ElectionType::PresidentialPreference => "PPR",
            ElectionType::PresidentialCaucus => "PC",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElectionType::General => "GENERAL",
            ElectionType::GeneralRunoff => "GENERAL_RUNOFF",
            ElectionType::GovernmentalAuthority => "GOVERNMENTAL_AUTHORITY",
            ElectionType::GovernmentLegislative => "GOVERNMENT_LEGISLATIVE",
            ElectionType::Municipal => "MUNICIPAL",
            ElectionType::Special => "SPECIAL",
            ElectionType::Recall => "RECALL",
            ElectionType::Primary => "PRIMARY",
            ElectionType::PrimaryRunoff => "PRIMARY_RUNOFF",
            ElectionType::OpenPrimary => "OPEN_PRIMARY",
            ElectionType::ClosedPrimary => "CLOSED_PRIMARY",
            ElectionType::NonpartisanPrimary => "NONPARTISAN_PRIMARY",
            ElectionType::SchoolBoard => "SCHOOL_BOARD",
            ElectionType::Judicial => "JUDICIAL",
            ElectionType::Local => "LOCAL",
            ElectionType::LocalRunoff => "LOCAL_RUNOFF",
            ElectionType::Congressional => "CONGRESSIONAL",
            ElectionType::Midterm => "MIDTERM",
            ElectionType::Referendum => "REFERENDUM",
            ElectionType::Presidential => "PRESIDENTIAL",
            ElectionType::PresidentialPrimary => "PRESIDENTIAL_PRIMARY",
            ElectionType::PresidentialPreference => "PRESIDENTIAL_PREFERENCE",
            ElectionType::PresidentialCaucus => "PRESIDENTIAL_CAUCUS",
        }
    }

    pub fn from_code(raw: &str) -> Result<Self, DomainError> {
        lookup("election type", &Self::ALL, Self::code, Self::name, raw)
    }

    /// Election types counted as primaries when scoring turnout.
    ///
    /// Primary runoffs are scored in their own bucket and are not part of
    /// this family.
    pub fn is_primary_family(&self) -> bool {
        matches!(
            self,
            ElectionType::Primary
                | ElectionType::OpenPrimary
                | ElectionType::ClosedPrimary
                | ElectionType::NonpartisanPrimary
                | ElectionType::PresidentialPrimary
        )
    }

    /// Fail if two members share a short code.
    ///
    /// Codes are stored as election identity components, so a shared code
    /// would silently merge two different elections.
    pub fn verify_code_table() -> Result<(), DomainError> {
        let entries: Vec<(&'static str, &'static str)> =
            Self::ALL.iter().map(|t| (t.code(), t.name())).collect();
        check_unique_codes("election type", &entries)
    }
}

// ============================================================================
// DISPLAY / FROMSTR
// ============================================================================

impl fmt::Display for VoteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for PoliticalParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for ElectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VoteMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl FromStr for PoliticalParty {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

impl FromStr for ElectionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
    }
}

// ============================================================================
// TESTS
// ============================================================================
