//! Query deduplication per destination table
//!
//! Clusters a destination table's historical queries by pairwise similarity
//! against a threshold and records every suppressed duplicate for audit.
//! Clustering drives the audit log only; the query actually written out is
//! always the most recently created one for the table, chosen by
//! [`select_final`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use bqform_core::{JobDescriptor, TableRef};

use crate::normalize::SimilarityOptions;
use crate::similarity::calculate_similarity;

/// A canonical query accepted during clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalQuery {
    /// Raw query text
    pub query: String,

    /// Job that submitted it
    pub job_id: String,

    /// When the job was created
    pub created_time: DateTime<Utc>,
}

/// A query judged a duplicate of a canonical one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarQuery {
    /// Job whose query matched
    pub job_id: String,

    /// Similarity score against the canonical query
    pub similarity: f64,
}

/// One canonical query plus the duplicates that collapsed into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCluster {
    /// The accepted canonical query
    pub canonical: CanonicalQuery,

    /// Queries judged duplicates of the canonical one
    pub duplicates: Vec<SimilarQuery>,
}

/// An audit record for one suppressed duplicate job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupDecision {
    /// The suppressed job
    pub job_id: String,

    /// When the suppressed job was created
    pub created_time: DateTime<Utc>,

    /// Every canonical query it matched, with scores
    pub similar_queries: Vec<SimilarQuery>,

    /// Why the job was suppressed
    pub reason: String,
}

/// Failure to record a deduplication decision
#[derive(Debug, thiserror::Error)]
#[error("failed to record deduplication decision: {0}")]
pub struct SinkError(pub String);

/// Receives deduplication decisions as they are made
///
/// Decouples the audit side effect from the clustering algorithm, so the
/// deduplicator stays testable without filesystem access. Records are
/// append-only and keyed by destination table.
pub trait DecisionSink {
    /// Record one decision for the given destination table
    fn record(&mut self, table: &TableRef, decision: &DedupDecision) -> Result<(), SinkError>;
}

/// Sink that keeps decisions in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Recorded decisions, in order
    pub decisions: Vec<(TableRef, DedupDecision)>,
}

impl DecisionSink for MemorySink {
    fn record(&mut self, table: &TableRef, decision: &DedupDecision) -> Result<(), SinkError> {
        self.decisions.push((table.clone(), decision.clone()));
        Ok(())
    }
}

/// Sink that discards decisions
#[derive(Debug, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn record(&mut self, _table: &TableRef, _decision: &DedupDecision) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Clusters one destination table's queries by similarity
#[derive(Debug, Clone)]
pub struct QueryDeduplicator {
    threshold: f64,
    options: SimilarityOptions,
}

impl QueryDeduplicator {
    /// Create a deduplicator with the given similarity threshold
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            options: SimilarityOptions::default(),
        }
    }

    /// Override the normalization options
    pub fn with_options(mut self, options: SimilarityOptions) -> Self {
        self.options = options;
        self
    }

    /// Cluster the jobs writing to one destination table
    ///
    /// Jobs are visited in input order. A job with no query text is skipped
    /// entirely. A job scoring at or above the threshold against any
    /// already-accepted canonical query is a duplicate: it joins every
    /// matching cluster and one decision is recorded against its destination
    /// table. A job with no destination table contributes no decision.
    pub fn deduplicate(
        &self,
        jobs: &[JobDescriptor],
        sink: &mut dyn DecisionSink,
    ) -> Result<Vec<QueryCluster>, SinkError> {
        let mut clusters: Vec<QueryCluster> = Vec::new();

        for job in jobs {
            let Some(query) = job.query.as_deref().filter(|q| !q.is_empty()) else {
                continue;
            };

            let mut matched: Vec<(usize, f64)> = Vec::new();
            for (idx, cluster) in clusters.iter().enumerate() {
                let similarity =
                    calculate_similarity(query, &cluster.canonical.query, &self.options);
                if similarity >= self.threshold {
                    matched.push((idx, similarity));
                }
            }

            if matched.is_empty() {
                clusters.push(QueryCluster {
                    canonical: CanonicalQuery {
                        query: query.to_string(),
                        job_id: job.job_id.clone(),
                        created_time: job.created_time,
                    },
                    duplicates: Vec::new(),
                });
                continue;
            }

            let similar_queries: Vec<SimilarQuery> = matched
                .iter()
                .map(|&(idx, similarity)| SimilarQuery {
                    job_id: clusters[idx].canonical.job_id.clone(),
                    similarity,
                })
                .collect();

            for &(idx, similarity) in &matched {
                clusters[idx].duplicates.push(SimilarQuery {
                    job_id: job.job_id.clone(),
                    similarity,
                });
            }

            debug!(
                job_id = %job.job_id,
                matches = matched.len(),
                "query suppressed as duplicate"
            );

            if let Some(table) = &job.destination_table {
                let decision = DedupDecision {
                    job_id: job.job_id.clone(),
                    created_time: job.created_time,
                    similar_queries,
                    reason: format!(
                        "Query similar to existing queries with similarity >= {}",
                        self.threshold
                    ),
                };
                sink.record(table, &decision)?;
            }
        }

        Ok(clusters)
    }
}

/// Select the query written to output for one destination table
///
/// The most recently created job carrying query text wins, regardless of
/// cluster membership; ties resolve to the job latest in input order.
pub fn select_final(jobs: &[JobDescriptor]) -> Option<&JobDescriptor> {
    jobs.iter()
        .filter(|job| job.has_query_text())
        .max_by_key(|job| job.created_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn job(id: &str, minute: u32, query: Option<&str>) -> JobDescriptor {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap();
        let mut job = JobDescriptor::new(id, created)
            .with_destination(TableRef::new("proj", "ds", "orders"));
        if let Some(q) = query {
            job = job.with_query(q);
        }
        job
    }

    const BASE: &str = "SELECT id, total FROM proj.ds.raw_orders WHERE total > 0";
    const NEAR: &str = "SELECT id, total FROM proj.ds.raw_orders WHERE total > 1";
    const OTHER: &str = "SELECT customer, SUM(qty) FROM proj.ds.line_items GROUP BY customer";

    #[test]
    fn first_query_becomes_canonical() {
        let dedup = QueryDeduplicator::new(0.9);
        let mut sink = MemorySink::default();

        let jobs = vec![job("j1", 0, Some(BASE)), job("j2", 1, Some(NEAR))];
        let clusters = dedup.deduplicate(&jobs, &mut sink).unwrap();

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].canonical.job_id, "j1");
        assert_eq!(clusters[0].duplicates.len(), 1);
        assert_eq!(clusters[0].duplicates[0].job_id, "j2");
        assert!(clusters[0].duplicates[0].similarity >= 0.9);
    }

    #[test]
    fn dissimilar_query_starts_new_cluster() {
        let dedup = QueryDeduplicator::new(0.9);
        let mut sink = MemorySink::default();

        let jobs = vec![job("j1", 0, Some(BASE)), job("j2", 1, Some(OTHER))];
        let clusters = dedup.deduplicate(&jobs, &mut sink).unwrap();

        assert_eq!(clusters.len(), 2);
        assert!(sink.decisions.is_empty());
    }

    #[test]
    fn decision_records_matched_canonicals_and_threshold() {
        let dedup = QueryDeduplicator::new(0.9);
        let mut sink = MemorySink::default();

        let jobs = vec![job("j1", 0, Some(BASE)), job("j2", 1, Some(NEAR))];
        dedup.deduplicate(&jobs, &mut sink).unwrap();

        assert_eq!(sink.decisions.len(), 1);
        let (table, decision) = &sink.decisions[0];
        assert_eq!(table.fqn(), "proj.ds.orders");
        assert_eq!(decision.job_id, "j2");
        assert_eq!(decision.similar_queries.len(), 1);
        assert_eq!(decision.similar_queries[0].job_id, "j1");
        assert!(decision.reason.contains("0.9"));
    }

    #[test]
    fn jobs_without_query_text_are_skipped() {
        let dedup = QueryDeduplicator::new(0.9);
        let mut sink = MemorySink::default();

        let mut empty = job("j2", 1, None);
        empty.query = Some(String::new());

        let jobs = vec![job("j1", 0, None), empty, job("j3", 2, Some(BASE))];
        let clusters = dedup.deduplicate(&jobs, &mut sink).unwrap();

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].canonical.job_id, "j3");
        assert!(sink.decisions.is_empty());
    }

    #[test]
    fn duplicate_without_destination_logs_no_decision() {
        let dedup = QueryDeduplicator::new(0.9);
        let mut sink = MemorySink::default();

        let mut dup = job("j2", 1, Some(NEAR));
        dup.destination_table = None;

        let jobs = vec![job("j1", 0, Some(BASE)), dup];
        let clusters = dedup.deduplicate(&jobs, &mut sink).unwrap();

        // Still counted as a duplicate in the cluster, just not audited
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].duplicates.len(), 1);
        assert!(sink.decisions.is_empty());
    }

    #[test]
    fn select_final_prefers_recency_over_cluster() {
        // The newest query wins even though it is dissimilar to the
        // majority cluster.
        let jobs = vec![
            job("j1", 0, Some(BASE)),
            job("j2", 1, Some(NEAR)),
            job("j3", 2, Some(OTHER)),
        ];

        let winner = select_final(&jobs).unwrap();
        assert_eq!(winner.job_id, "j3");
        assert_eq!(winner.query.as_deref(), Some(OTHER));
    }

    #[test]
    fn select_final_ignores_jobs_without_query() {
        let jobs = vec![job("j1", 0, Some(BASE)), job("j2", 5, None)];
        assert_eq!(select_final(&jobs).unwrap().job_id, "j1");

        let none: Vec<JobDescriptor> = Vec::new();
        assert!(select_final(&none).is_none());
    }
}
