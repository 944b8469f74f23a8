// 📊 Turnout Scorer - Propensity ratios over a trailing window
//
// Pure function over one voter's history snapshot:
//   recent    = entries with election year > as_of.year - window_years
//   category  = |category within recent| / |recent|
//   party     = |party within primaries (or primary runoffs)| / |primaries (or runoffs)|
//
// Every ratio is rounded to 2 decimals, ties to even. A zero denominator
// yields 0.0.

use crate::codes::{ElectionType, PoliticalParty};
use crate::entities::ElectionHistoryEntry;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default trailing window, in calendar years
pub const DEFAULT_WINDOW_YEARS: u32 = 10;

/// Largest window a config may ask for
pub const MAX_WINDOW_YEARS: u32 = 1000;

// ============================================================================
// SCORING CONFIG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Elections held in the last `window_years` calendar years are "recent"
    pub window_years: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            window_years: DEFAULT_WINDOW_YEARS,
        }
    }
}

// ============================================================================
// TURNOUT SCORES
// ============================================================================

/// The eight turnout ratios. Value object, recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnoutScores {
    pub primary_score: f64,
    pub general_score: f64,
    pub special_score: f64,
    pub primary_runoff_score: f64,
    pub gop_primary_score: f64,
    pub dem_primary_score: f64,
    pub gop_primary_runoff_score: f64,
    pub dem_primary_runoff_score: f64,
}

impl TurnoutScores {
    /// All ratios as (name, value) pairs, in a fixed order
    pub fn ratios(&self) -> [(&'static str, f64); 8] {
        [
            ("primary_score", self.primary_score),
            ("general_score", self.general_score),
            ("special_score", self.special_score),
            ("primary_runoff_score", self.primary_runoff_score),
            ("gop_primary_score", self.gop_primary_score),
            ("dem_primary_score", self.dem_primary_score),
            ("gop_primary_runoff_score", self.gop_primary_runoff_score),
            ("dem_primary_runoff_score", self.dem_primary_runoff_score),
        ]
    }
}

/// Ratio rounded half to even at 2 decimals (1/8 -> 0.12); 0.0 on empty denominator
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let value = numerator as f64 / denominator as f64;
    (value * 100.0).round_ties_even() / 100.0
}

// ============================================================================
// TURNOUT SCORER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TurnoutScorer {
    config: ScoringConfig,
}

impl TurnoutScorer {
    pub fn new(config: ScoringConfig) -> Self {
        TurnoutScorer { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Earliest election year that is still inside the window is `cutoff + 1`.
    ///
    /// Windows wider than the calendar saturate instead of wrapping.
    pub fn cutoff_year(&self, as_of: NaiveDate) -> i32 {
        match i32::try_from(self.config.window_years) {
            Ok(window) => as_of.year().saturating_sub(window),
            Err(_) => i32::MIN,
        }
    }

    /// Score a history snapshot as of today's local date
    pub fn score_today(&self, history: &[ElectionHistoryEntry]) -> TurnoutScores {
        self.score(history, Local::now().date_naive())
    }

    /// Score a voter's history as of `as_of`
    pub fn score(&self, history: &[ElectionHistoryEntry], as_of: NaiveDate) -> TurnoutScores {
        let cutoff = self.cutoff_year(as_of);

        let recent: Vec<&ElectionHistoryEntry> = history
            .iter()
            .filter(|entry| entry.election.year() > cutoff)
            .collect();

        if recent.is_empty() {
            debug!(cutoff, entries = history.len(), "no recent elections to score");
            return TurnoutScores::default();
        }

        let primaries: Vec<&ElectionHistoryEntry> = recent
            .iter()
            .copied()
            .filter(|entry| entry.election.election_type().is_primary_family())
            .collect();
        let generals = Self::count_type(&recent, ElectionType::General);
        let specials = Self::count_type(&recent, ElectionType::Special);
        let primary_runoffs: Vec<&ElectionHistoryEntry> = recent
            .iter()
            .copied()
            .filter(|entry| entry.election.election_type() == ElectionType::PrimaryRunoff)
            .collect();

        let gop_primaries = Self::count_party(&primaries, PoliticalParty::Republican);
        let dem_primaries = Self::count_party(&primaries, PoliticalParty::Democratic);
        let gop_primary_runoffs = Self::count_party(&primary_runoffs, PoliticalParty::Republican);
        let dem_primary_runoffs = Self::count_party(&primary_runoffs, PoliticalParty::Democratic);

        debug!(
            cutoff,
            recent = recent.len(),
            primaries = primaries.len(),
            generals,
            specials,
            primary_runoffs = primary_runoffs.len(),
            "scoring turnout"
        );

        TurnoutScores {
            primary_score: ratio(primaries.len(), recent.len()),
            general_score: ratio(generals, recent.len()),
            special_score: ratio(specials, recent.len()),
            primary_runoff_score: ratio(primary_runoffs.len(), recent.len()),
            gop_primary_score: ratio(gop_primaries, primaries.len()),
            dem_primary_score: ratio(dem_primaries, primaries.len()),
            gop_primary_runoff_score: ratio(gop_primary_runoffs, primary_runoffs.len()),
            dem_primary_runoff_score: ratio(dem_primary_runoffs, primary_runoffs.len()),
        }
    }

    fn count_type(entries: &[&ElectionHistoryEntry], election_type: ElectionType) -> usize {
        entries
            .iter()
            .filter(|entry| entry.election.election_type() == election_type)
            .count()
    }

    fn count_party(entries: &[&ElectionHistoryEntry], party: PoliticalParty) -> usize {
        entries
            .iter()
            .filter(|entry| entry.vote_method.party() == Some(party))
            .count()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::VoteMethod;
    use crate::entities::{Election, ElectionAttrs, VoteCast};
    use proptest::prelude::*;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn create_test_entry(
        year: i32,
        election_type: ElectionType,
        method: VoteMethod,
        party: Option<PoliticalParty>,
    ) -> ElectionHistoryEntry {
        let election = Election::new(ElectionAttrs::new("TX", year, election_type).with_county("Travis")).unwrap();
        let vote_method = election.vote_method_for(method, None, party).unwrap();
        let vote_cast = VoteCast::new("V1", election.id(), vote_method.id()).unwrap();
        ElectionHistoryEntry::new(election, vote_method, vote_cast)
    }

    #[test]
    fn test_empty_history_scores_zero() {
        let scores = TurnoutScorer::default().score(&[], as_of());
        assert_eq!(scores, TurnoutScores::default());
        assert!(scores.ratios().iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_single_general() {
        let history = vec![create_test_entry(
            2024,
            ElectionType::General,
            VoteMethod::MailIn,
            Some(PoliticalParty::Democratic),
        )];

        let scores = TurnoutScorer::default().score(&history, as_of());

        assert_eq!(scores.general_score, 1.0);
        assert_eq!(scores.primary_score, 0.0);
        // No primaries: party ratios fall back to 0.0 instead of dividing by zero
        assert_eq!(scores.gop_primary_score, 0.0);
        assert_eq!(scores.dem_primary_score, 0.0);
        assert_eq!(scores.gop_primary_runoff_score, 0.0);
    }

    #[test]
    fn test_mixed_primaries_and_general() {
        let history = vec![
            create_test_entry(2022, ElectionType::Primary, VoteMethod::InPerson, Some(PoliticalParty::Republican)),
            create_test_entry(2024, ElectionType::Primary, VoteMethod::EarlyVote, Some(PoliticalParty::Democratic)),
            create_test_entry(2024, ElectionType::General, VoteMethod::InPerson, None),
        ];

        let scores = TurnoutScorer::default().score(&history, as_of());

        assert_eq!(scores.primary_score, 0.67);
        assert_eq!(scores.general_score, 0.33);
        assert_eq!(scores.gop_primary_score, 0.5);
        assert_eq!(scores.dem_primary_score, 0.5);
        assert_eq!(scores.special_score, 0.0);
        assert_eq!(scores.primary_runoff_score, 0.0);
    }

    #[test]
    fn test_window_is_by_calendar_year() {
        // as_of 2025 with a 10 year window: cutoff 2015, so 2015 is out and 2016 is in
        let history = vec![
            create_test_entry(2015, ElectionType::General, VoteMethod::InPerson, None),
            create_test_entry(2016, ElectionType::Special, VoteMethod::InPerson, None),
        ];

        let scorer = TurnoutScorer::default();
        assert_eq!(scorer.cutoff_year(as_of()), 2015);

        let scores = scorer.score(&history, as_of());
        assert_eq!(scores.special_score, 1.0);
        assert_eq!(scores.general_score, 0.0);
    }

    #[test]
    fn test_only_old_elections_short_circuit() {
        let history = vec![create_test_entry(2004, ElectionType::General, VoteMethod::InPerson, None)];
        let scores = TurnoutScorer::default().score(&history, as_of());
        assert_eq!(scores, TurnoutScores::default());
    }

    #[test]
    fn test_primary_family_variants_count_as_primaries() {
        let history = vec![
            create_test_entry(2020, ElectionType::OpenPrimary, VoteMethod::InPerson, Some(PoliticalParty::Republican)),
            create_test_entry(2020, ElectionType::ClosedPrimary, VoteMethod::InPerson, Some(PoliticalParty::Republican)),
            create_test_entry(2022, ElectionType::NonpartisanPrimary, VoteMethod::InPerson, None),
            create_test_entry(2024, ElectionType::PresidentialPrimary, VoteMethod::InPerson, Some(PoliticalParty::Libertarian)),
        ];

        let scores = TurnoutScorer::default().score(&history, as_of());

        assert_eq!(scores.primary_score, 1.0);
        assert_eq!(scores.gop_primary_score, 0.5);
        assert_eq!(scores.dem_primary_score, 0.0);
    }

    #[test]
    fn test_primary_runoffs_have_their_own_bucket() {
        let history = vec![
            create_test_entry(2022, ElectionType::Primary, VoteMethod::InPerson, Some(PoliticalParty::Democratic)),
            create_test_entry(2022, ElectionType::PrimaryRunoff, VoteMethod::InPerson, Some(PoliticalParty::Democratic)),
            create_test_entry(2024, ElectionType::PrimaryRunoff, VoteMethod::MailIn, Some(PoliticalParty::Republican)),
            create_test_entry(2024, ElectionType::PrimaryRunoff, VoteMethod::MailIn, Some(PoliticalParty::Green)),
        ];

        let scores = TurnoutScorer::default().score(&history, as_of());

        assert_eq!(scores.primary_score, 0.25);
        assert_eq!(scores.primary_runoff_score, 0.75);
        assert_eq!(scores.dem_primary_score, 1.0);
        assert_eq!(scores.gop_primary_runoff_score, 0.33);
        assert_eq!(scores.dem_primary_runoff_score, 0.33);
    }

    #[test]
    fn test_custom_window() {
        let history = vec![
            create_test_entry(2020, ElectionType::General, VoteMethod::InPerson, None),
            create_test_entry(2024, ElectionType::Special, VoteMethod::InPerson, None),
        ];

        let scorer = TurnoutScorer::new(ScoringConfig { window_years: 2 });
        let scores = scorer.score(&history, as_of());

        assert_eq!(scores.special_score, 1.0);
        assert_eq!(scores.general_score, 0.0);
    }

    #[test]
    fn test_exact_halves_round_to_even() {
        let mut history = vec![create_test_entry(
            2024,
            ElectionType::Primary,
            VoteMethod::InPerson,
            Some(PoliticalParty::Republican),
        )];
        for year in 2017..2024 {
            history.push(create_test_entry(year, ElectionType::Primary, VoteMethod::InPerson, Some(PoliticalParty::Democratic)));
        }

        let scores = TurnoutScorer::default().score(&history, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

        // 1/8 = 0.125 and 7/8 = 0.875
        assert_eq!(scores.gop_primary_score, 0.12);
        assert_eq!(scores.dem_primary_score, 0.88);
        assert_eq!(ratio(5, 8), 0.62);
        assert_eq!(ratio(3, 8), 0.38);
    }

    #[test]
    fn test_huge_window_keeps_everything() {
        let history = vec![
            create_test_entry(2024, ElectionType::General, VoteMethod::InPerson, None),
            create_test_entry(1900, ElectionType::Special, VoteMethod::InPerson, None),
        ];

        for window_years in [i32::MAX as u32, i32::MAX as u32 + 1, u32::MAX] {
            let scorer = TurnoutScorer::new(ScoringConfig { window_years });
            let scores = scorer.score(&history, as_of());
            assert_eq!(scores.general_score, 0.5, "window {}", window_years);
            assert_eq!(scores.special_score, 0.5, "window {}", window_years);
        }
        assert_eq!(TurnoutScorer::new(ScoringConfig { window_years: u32::MAX }).cutoff_year(as_of()), i32::MIN);
    }

    #[test]
    fn test_scoring_is_repeatable() {
        let history = vec![
            create_test_entry(2018, ElectionType::General, VoteMethod::InPerson, None),
            create_test_entry(2020, ElectionType::Primary, VoteMethod::InPerson, Some(PoliticalParty::Republican)),
        ];
        let scorer = TurnoutScorer::default();
        assert_eq!(scorer.score(&history, as_of()), scorer.score(&history, as_of()));
    }

    fn arb_entry() -> impl Strategy<Value = ElectionHistoryEntry> {
        (
            1990i32..2026,
            (0..ElectionType::ALL.len()).prop_map(|i| ElectionType::ALL[i]),
            proptest::option::of((0..PoliticalParty::ALL.len()).prop_map(|i| PoliticalParty::ALL[i])),
        )
            .prop_map(|(year, election_type, party)| create_test_entry(year, election_type, VoteMethod::InPerson, party))
    }

    proptest! {
        #[test]
        fn prop_scores_are_bounded(history in proptest::collection::vec(arb_entry(), 0..30)) {
            let scores = TurnoutScorer::default().score(&history, as_of());
            for (name, value) in scores.ratios() {
                prop_assert!((0.0..=1.0).contains(&value), "{} out of range: {}", name, value);
            }
        }
    }
}
