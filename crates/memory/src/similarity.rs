//! Lexical similarity used to rank memories.
//!
//! Text is reduced to a term-frequency vector over lowercase alphanumeric
//! terms; relevance is the cosine similarity of two such vectors.

use std::collections::HashMap;

/// Term frequencies of a piece of text.
pub type TermVector = HashMap<String, f32>;

/// Split text into lowercase alphanumeric terms, skipping one-character noise.
pub fn terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(|t| t.to_lowercase())
}

/// Build the term-frequency vector of `text`.
pub fn term_vector(text: &str) -> TermVector {
    let mut tf = TermVector::new();
    for term in terms(text) {
        *tf.entry(term).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine similarity between two sparse term vectors.
///
/// Returns a value in [0, 1] where 1 = same term distribution, 0 = no shared
/// terms. Returns 0.0 if either vector is empty.
pub fn cosine_similarity(a: &TermVector, b: &TermVector) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(term, x)| large.get(term).map(|y| f64::from(*x) * f64::from(*y)))
        .sum();

    let norm = |v: &TermVector| v.values().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let denom = norm(a) * norm(b);
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}
