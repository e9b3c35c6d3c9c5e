//! Trigram similarity for the typo-tolerant fallback.
//!
//! The trigram index only finds candidates that share a character triple with
//! the query; `score_text` (exposed to SQL as `fuzzy_score`) decides whether a
//! candidate is actually close enough. Similarity is the Jaccard overlap of
//! padded trigram sets, the same measure pg_trgm uses.

use std::collections::HashSet;

const CLAUSE_SEPARATOR: char = ';';
const GROUP_SEPARATOR: char = ' ';
const ALTERNATIVE_SEPARATOR: char = '|';

/// Lowercase and keep only alphanumerics
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn padded_trigrams(word: &str) -> HashSet<String> {
    let padded: Vec<char> = format!("  {} ", word).chars().collect();
    padded
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Jaccard similarity of the padded trigram sets of two normalized words
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let ta = padded_trigrams(a);
    let tb = padded_trigrams(b);
    let shared = ta.intersection(&tb).count();
    let union = ta.len() + tb.len() - shared;
    if union == 0 {
        0.0
    } else {
        shared as f64 / union as f64
    }
}

/// Unpadded character triples of `word`, used to build the candidate match
/// expression against the trigram index. Words shorter than three characters
/// have none.
pub fn index_trigrams(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut seen = HashSet::new();
    chars
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Encode term groups for `score_text`: groups are ANDed, alternatives inside
/// a group are ORed.
pub fn encode_terms(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|alts| alts.join(&ALTERNATIVE_SEPARATOR.to_string()))
        .collect::<Vec<_>>()
        .join(&GROUP_SEPARATOR.to_string())
}

/// Encode several clauses; a text scores as well as its best clause.
pub fn encode_clauses(clauses: &[Vec<Vec<String>>]) -> String {
    clauses
        .iter()
        .map(|groups| encode_terms(groups))
        .collect::<Vec<_>>()
        .join(&CLAUSE_SEPARATOR.to_string())
}

/// Score `text` against encoded terms. Each group scores the best similarity
/// of any alternative against any word of the text; a clause scores its
/// weakest group, so every group has to be present in some form. The result
/// is the best clause.
pub fn score_text(text: &str, encoded_terms: &str) -> f64 {
    let words: HashSet<String> = text
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }

    encoded_terms
        .split(CLAUSE_SEPARATOR)
        .map(|clause| score_clause(&words, clause))
        .fold(0.0_f64, f64::max)
}

fn score_clause(words: &HashSet<String>, clause: &str) -> f64 {
    let mut weakest: Option<f64> = None;
    for group in clause.split(GROUP_SEPARATOR).filter(|g| !g.is_empty()) {
        let best = group
            .split(ALTERNATIVE_SEPARATOR)
            .filter(|alt| !alt.is_empty())
            .flat_map(|alt| words.iter().map(move |w| similarity(alt, w)))
            .fold(0.0_f64, f64::max);
        weakest = Some(weakest.map_or(best, |current| current.min(best)));
    }
    weakest.unwrap_or(0.0)
}
