//! Fuzzy matching utilities
//!
//! Lets toolbar labels and typed action names tolerate small typos
//! ("grammer", "profesional") when mapped to a transform.

use strsim::normalized_levenshtein;

/// Result of a fuzzy match with the matched value and score
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub value: String,
    pub score: f64,
}

/// Normalize a label for comparison: lowercase, `-`/`_` as spaces,
/// collapsed whitespace
pub fn normalize_label(text: &str) -> String {
    text.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rank `candidates` against `search_term`
///
/// Returns up to `n` matches scoring at least `cutoff`, best first. An exact
/// match (after normalization) always scores 1.0.
pub fn find_matches(
    search_term: &str,
    candidates: &[String],
    n: usize,
    cutoff: f64,
) -> Vec<FuzzyMatch> {
    let search = normalize_label(search_term);

    let mut matches: Vec<FuzzyMatch> = candidates
        .iter()
        .filter_map(|candidate| {
            let label = normalize_label(candidate);
            let score = if label == search {
                1.0
            } else {
                normalized_levenshtein(&search, &label)
            };
            (score >= cutoff).then(|| FuzzyMatch {
                value: candidate.clone(),
                score,
            })
        })
        .collect();

    // Stable sort keeps candidate order among equal scores
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(n);
    matches
}

/// Find the best match above a minimum score
pub fn find_best_match(
    search_term: &str,
    candidates: &[String],
    cutoff: f64,
) -> Option<FuzzyMatch> {
    find_matches(search_term, candidates, 1, cutoff)
        .into_iter()
        .next()
}

/// Similarity score between two labels
pub fn similarity(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&normalize_label(a), &normalize_label(b))
}
