//! Deduplication of classified risk statements.
//!
//! Near-identical statements (repeated documentation boilerplate, repeated
//! incident reports) are collapsed into [`CanonicalRiskEntity`] clusters.
//! Two statements merge iff their normalized-text similarity reaches the
//! configured threshold AND they share at least one category assignment in
//! either taxonomy. Similar statements with incompatible category sets are
//! NOT merged (precision over recall); the near miss is logged and
//! recorded for audit.
//!
//! Clustering is transitive within a run via union-find, processed in a
//! stable order (timestamp, then source id, then origin ref) so repeated
//! runs over the same input produce identical partitions. The union-find
//! structure lives entirely inside one `merge` call: the single-writer
//! discipline over the partition is structural, and the returned entity
//! set is immutable and safe for concurrent readers.

use crate::classify::ClassifiedStatement;
use ars_core::entity::CanonicalRiskEntity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Deduplication configuration.
///
/// The similarity function and threshold are deliberately parameterized;
/// the determinism and idempotence properties hold for any threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Jaccard similarity at or above which two statements are considered
    /// the same risk (subject to the shared-category requirement).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_similarity_threshold() -> f64 {
    0.55
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// A similar-text pair rejected for category incompatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearMiss {
    /// First statement id (earlier in processing order).
    pub statement_a: Uuid,
    /// Second statement id.
    pub statement_b: Uuid,
    /// The similarity that would have merged them.
    pub similarity: f64,
}

/// Outcome of one deduplication run.
#[derive(Debug, Clone)]
pub struct DedupReport {
    /// The canonical entities, ordered by earliest member timestamp.
    pub entities: Vec<CanonicalRiskEntity>,
    /// Pairs that met the similarity threshold but were not merged.
    pub near_misses: Vec<NearMiss>,
    /// Number of merge operations performed.
    pub merges: usize,
}

/// Normalizes text for similarity comparison: case-fold, whitespace-fold,
/// stopword-strip.
pub fn normalize_tokens(text: &str) -> BTreeSet<String> {
    const STOPWORDS: &[&str] = &[
        "a", "an", "and", "are", "as", "at", "be", "by", "can", "could", "for", "from",
        "has", "have", "in", "is", "it", "its", "may", "might", "model", "of", "on",
        "or", "should", "that", "the", "this", "to", "when", "will", "with",
    ];
    text.to_lowercase()
        .split_whitespace()
        .map(|token| {
            token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|token| token.len() > 1 && !STOPWORDS.contains(&token.as_str()))
        .collect()
}

/// Jaccard similarity over two token sets, bounded in [0, 1].
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Union-find over statement indices, with path compression.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    /// Directed union: the later root joins the earlier one, keeping the
    /// earliest member as cluster anchor.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (keep, fold) = if ra < rb { (ra, rb) } else { (rb, ra) };
        self.parent[fold] = keep;
        true
    }
}

/// Collapses classified statements into canonical risk entities.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    config: DedupConfig,
}

impl Deduplicator {
    /// Creates a deduplicator.
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// Runs deduplication over a batch of classified statements.
    ///
    /// The produced cluster memberships form a partition of the input
    /// statement ids. Re-running on the same input yields the same
    /// partition regardless of input order.
    #[instrument(skip(self, input), fields(statements = input.len()))]
    pub fn merge(&self, input: &[ClassifiedStatement]) -> DedupReport {
        // Stable processing order: ingestion timestamp, source id,
        // origin ref. This fixes the tie-break key for determinism.
        let mut items: Vec<&ClassifiedStatement> = input.iter().collect();
        items.sort_by(|a, b| {
            (a.statement.timestamp, &a.statement.source_id, &a.statement.origin_ref).cmp(&(
                b.statement.timestamp,
                &b.statement.source_id,
                &b.statement.origin_ref,
            ))
        });

        let tokens: Vec<BTreeSet<String>> = items
            .iter()
            .map(|c| normalize_tokens(&c.statement.text))
            .collect();

        let mut uf = UnionFind::new(items.len());
        let mut near_misses = Vec::new();
        let mut merges = 0;

        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                let similarity = jaccard(&tokens[i], &tokens[j]);
                if similarity < self.config.similarity_threshold {
                    continue;
                }
                if items[i].risk.shares_category(&items[j].risk) {
                    if uf.union(i, j) {
                        merges += 1;
                        debug!(
                            a = %items[i].statement.id,
                            b = %items[j].statement.id,
                            similarity,
                            "Merged statements into one cluster"
                        );
                    }
                } else {
                    warn!(
                        a = %items[i].statement.id,
                        b = %items[j].statement.id,
                        similarity,
                        "Dedup near miss: similar text, incompatible categories"
                    );
                    near_misses.push(NearMiss {
                        statement_a: items[i].statement.id,
                        statement_b: items[j].statement.id,
                        similarity,
                    });
                }
            }
        }

        // Group members under their root, preserving processing order.
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..items.len() {
            let root = uf.find(i);
            clusters.entry(root).or_default().push(i);
        }

        let entities = clusters
            .values()
            .map(|members| Self::build_entity(&items, members))
            .collect();

        DedupReport {
            entities,
            near_misses,
            merges,
        }
    }

    fn build_entity(
        items: &[&ClassifiedStatement],
        members: &[usize],
    ) -> CanonicalRiskEntity {
        // Members are in processing order; the first is the earliest.
        let anchor = items[members[0]];
        let mut categories = BTreeMap::new();
        let mut source_types = BTreeSet::new();
        let mut model_types = BTreeSet::new();
        let mut member_ids = Vec::with_capacity(members.len());

        for &index in members {
            let item = items[index];
            member_ids.push(item.statement.id);
            source_types.insert(item.statement.source_type);
            if let Some(model_type) = &item.statement.model_type {
                model_types.insert(model_type.clone());
            }
            for assignment in &item.risk.assignments {
                if assignment.is_unclassified() {
                    continue;
                }
                let entry = categories.entry(assignment.key()).or_insert(0.0_f64);
                if assignment.confidence > *entry {
                    *entry = assignment.confidence;
                }
            }
        }

        CanonicalRiskEntity {
            cluster_id: Uuid::new_v4(),
            member_statement_ids: member_ids,
            representative: anchor.statement.text.clone(),
            categories,
            source_types,
            model_types,
            first_seen: anchor.statement.timestamp,
        }
    }

    /// Verifies that the report's cluster membership is a partition of the
    /// given statement ids: every id in exactly one cluster.
    pub fn verify_partition(report: &DedupReport, statement_ids: &[Uuid]) -> bool {
        let mut seen = HashSet::new();
        for entity in &report.entities {
            for id in &entity.member_statement_ids {
                if !seen.insert(*id) {
                    return false;
                }
            }
        }
        statement_ids.len() == seen.len() && statement_ids.iter().all(|id| seen.contains(id))
    }
}
