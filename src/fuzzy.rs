//! Fuzzy key matching for unmapped import sources

use strsim::{jaro_winkler, normalized_levenshtein};

/// Minimum blended similarity for a key to be suggested
pub const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Blended similarity of two keys, case-insensitive
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 1.0;
    }

    normalized_levenshtein(&a, &b) * 0.4 + jaro_winkler(&a, &b) * 0.6
}

/// Best candidate at or above [`SUGGESTION_THRESHOLD`]
pub fn closest_key<'a>(key: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|candidate| (candidate, similarity(key, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_score_one() {
        assert_eq!(similarity("Rickets", " rickets "), 1.0);
    }

    #[test]
    fn picks_the_closest_candidate() {
        let keys = ["Bronchitis", "Bronchial asthma", "Rickets"];
        assert_eq!(closest_key("Bronchitis ", keys), Some("Bronchitis"));
        assert_eq!(closest_key("Bronchits", keys), Some("Bronchitis"));
    }

    #[test]
    fn unrelated_keys_get_no_suggestion() {
        assert_eq!(closest_key("PROCESSING", ["Rickets", "Neonatology"]), None);
    }
}
