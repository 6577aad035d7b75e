//! Value-set name matching for the pattern tier.

use std::cmp::Ordering;

use rapidfuzz::distance::jaro_winkler;

/// Jaro-Winkler similarity needed for two names to count as the same value set.
pub const SIMILARITY_THRESHOLD: f64 = 0.92;

/// Fraction of the requirement's tokens a candidate must share.
const TOKEN_OVERLAP: f64 = 0.5;

const STOP_WORDS: [&str; 6] = ["and", "or", "the", "of", "with", "value"];

/// Lowercases and replaces separators with single spaces.
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\', '(', ')', ','], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(normalized: &str) -> Vec<&str> {
    normalized
        .split(' ')
        .filter(|token| token.len() > 1 && !STOP_WORDS.contains(token))
        .collect()
}

/// Why a candidate name matched, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum MatchKind {
    /// Neither name contains the other but they are spelled nearly alike.
    Similar(f64),
    /// At least half of the requirement's tokens appear in the candidate.
    TokenOverlap(f64),
    /// The candidate contains the requirement.
    Substring,
}

impl MatchKind {
    fn rank(self) -> u8 {
        match self {
            Self::Similar(_) => 0,
            Self::TokenOverlap(_) => 1,
            Self::Substring => 2,
        }
    }

    fn score(self) -> f64 {
        match self {
            Self::Similar(score) | Self::TokenOverlap(score) => score,
            Self::Substring => 1.0,
        }
    }

    fn compare(self, other: Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then(self.score().total_cmp(&other.score()))
    }
}

/// Scores `candidate` against `requirement`; `None` when they do not match.
pub fn match_names(requirement: &str, candidate: &str) -> Option<MatchKind> {
    let wanted = normalize_name(requirement);
    let offered = normalize_name(candidate);
    if wanted.is_empty() || offered.is_empty() {
        return None;
    }
    if offered.contains(&wanted) {
        return Some(MatchKind::Substring);
    }

    let wanted_tokens = tokens(&wanted);
    let offered_tokens = tokens(&offered);
    if !wanted_tokens.is_empty() {
        let shared = wanted_tokens
            .iter()
            .filter(|token| offered_tokens.contains(token))
            .count();
        let overlap = shared as f64 / wanted_tokens.len() as f64;
        if shared > 0 && overlap >= TOKEN_OVERLAP {
            return Some(MatchKind::TokenOverlap(overlap));
        }
    }

    let similarity = jaro_winkler::similarity(wanted.chars(), offered.chars());
    (similarity >= SIMILARITY_THRESHOLD).then_some(MatchKind::Similar(similarity))
}

/// The candidates that share the strongest match kind with the requirement.
///
/// All names matching at the best kind are returned, so the caller can pool
/// codes from every one of them.
pub fn best_matches<'a>(
    requirement: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Vec<&'a str> {
    let scored: Vec<(&str, MatchKind)> = candidates
        .into_iter()
        .filter_map(|name| match_names(requirement, name).map(|kind| (name, kind)))
        .collect();
    let Some(best_rank) = scored.iter().map(|(_, kind)| kind.rank()).max() else {
        return Vec::new();
    };
    let mut best: Vec<(&str, MatchKind)> = scored
        .into_iter()
        .filter(|(_, kind)| kind.rank() == best_rank)
        .collect();
    best.sort_by(|left, right| right.1.compare(left.1).then(left.0.cmp(right.0)));
    best.into_iter().map(|(name, _)| name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_containing_requirement_is_substring() {
        assert_eq!(
            match_names("PSA", "PSA Lab Test"),
            Some(MatchKind::Substring)
        );
        assert!(matches!(
            match_names("Outpatient Visit Codes", "outpatient visit"),
            Some(MatchKind::TokenOverlap(_))
        ));
    }

    #[test]
    fn token_overlap_needs_half_the_tokens() {
        assert!(matches!(
            match_names("Diabetes Screening Test", "Diabetes Test"),
            Some(MatchKind::TokenOverlap(_))
        ));
        assert_eq!(match_names("Colorectal Cancer Screening", "Breast Cancer"), None);
    }

    #[test]
    fn near_spellings_are_similar() {
        assert!(matches!(
            match_names("Colonoscopy", "Colonoscopies"),
            Some(MatchKind::Similar(_))
        ));
        assert_eq!(match_names("Hospice", "Dialysis"), None);
    }

    #[test]
    fn best_matches_keep_only_strongest_kind() {
        let names = ["PSA Lab Test", "Prostate Cancer", "PSA Tests Extended", "Lab"];
        let best = best_matches("PSA Lab Test", names);
        assert_eq!(best, ["PSA Lab Test"]);
        assert!(best_matches("Nothing Alike", names).is_empty());
    }
}
