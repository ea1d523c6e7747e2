//! bqform-sql: query normalization, similarity scoring and deduplication
//!
//! Textual-similarity heuristics over historical query jobs. Similarity is
//! not execution equivalence; the threshold is a tunable approximation.

pub mod dedup;
pub mod normalize;
pub mod similarity;

pub use dedup::{
    CanonicalQuery, DecisionSink, DedupDecision, MemorySink, NullSink, QueryCluster,
    QueryDeduplicator, SimilarQuery, SinkError, select_final,
};
pub use normalize::{normalize_query, SimilarityOptions};
pub use similarity::calculate_similarity;
