//! Query similarity scoring
//!
//! Sequence-alignment ratio between normalized query texts: twice the number
//! of matching characters divided by the sum of both lengths. Symmetric,
//! 1.0 for identical normalized strings, 0.0 for disjoint ones.

use similar::TextDiff;

use crate::normalize::{normalize_query, SimilarityOptions};

/// Calculate the similarity ratio between two SQL queries, in [0, 1]
///
/// Both inputs are normalized first. If either normalized string is shorter
/// than `options.min_length`, the score is 0.0 unconditionally; this keeps
/// two trivial or comment-only queries from scoring as identical.
pub fn calculate_similarity(query_a: &str, query_b: &str, options: &SimilarityOptions) -> f64 {
    let norm_a = normalize_query(query_a, options);
    let norm_b = normalize_query(query_b, options);

    if norm_a.chars().count() < options.min_length
        || norm_b.chars().count() < options.min_length
    {
        return 0.0;
    }

    f64::from(TextDiff::from_chars(norm_a.as_str(), norm_b.as_str()).ratio())
}
