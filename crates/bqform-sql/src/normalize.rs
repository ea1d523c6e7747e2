//! Query normalization for comparison
//!
//! Strips comment and whitespace variance so that textually equivalent
//! queries compare equal. Pure and deterministic; an empty or comment-only
//! query normalizes to the empty string.

use regex::Regex;
use std::sync::LazyLock;

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[^\n]*").expect("line comment pattern"));

// Non-greedy so adjacent block comments are stripped separately.
static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern"));

/// Options for query normalization and similarity scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityOptions {
    /// Lowercase before comparing
    pub ignore_case: bool,

    /// Collapse whitespace runs to single spaces
    pub ignore_whitespace: bool,

    /// Strip `--` line comments and `/* */` block comments
    pub ignore_comments: bool,

    /// Normalized strings shorter than this score 0.0 against anything
    pub min_length: usize,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            ignore_whitespace: true,
            ignore_comments: true,
            min_length: 10,
        }
    }
}

/// Normalize a SQL query for comparison
pub fn normalize_query(query: &str, options: &SimilarityOptions) -> String {
    let mut query = query.to_string();

    if options.ignore_comments {
        query = BLOCK_COMMENT.replace_all(&query, "").into_owned();
        query = LINE_COMMENT.replace_all(&query, "").into_owned();
    }

    if options.ignore_whitespace {
        query = query.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    if options.ignore_case {
        query = query.to_lowercase();
    }

    query
}
