// Identity Resolver: partition raw records into publication clusters
//
// Concept: Union-find over record indices with two link passes
// Synchronization: Borrows &[RawRecord], outputs Vec<Cluster> covering every index once
//
// Algorithm:
// 1. Identifier pass: hash-map lookups on normalized DOI / PMID / PMCID; every
//    record sharing a value with an earlier record is unioned with it
// 2. Fuzzy pass: blocked candidate pairs not already joined are unioned when
//    the MatchPredicate accepts them (title similarity, shared surname, year)
// 3. Collect sets, derive each cluster's merge basis, verify the partition
//
// Clusters are the transitive closure of the match relation: A~B and B~C put
// A, B and C together even if A and C would not match directly. The result
// depends only on the set of records, never on their order.

pub mod blocking;
pub mod similarity;
pub mod union_find;

use crate::config::MatchingConfig;
use crate::normalizer::{normalize_doi, normalize_pmcid, normalize_pmid, NormalizedKey, Normalizer};
use crate::types::{Cluster, MatchBasis, RawRecord};
use blocking::BlockingConfig;
use similarity::SimilarityMetric;
use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};
use union_find::UnionFind;

/// Normalized identifier values of one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdKeys {
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
}

impl IdKeys {
    pub fn of(record: &RawRecord) -> Self {
        Self {
            doi: record.ids.doi.as_deref().and_then(normalize_doi),
            pmid: record.ids.pmid.as_deref().and_then(normalize_pmid),
            pmcid: record.ids.pmcid.as_deref().and_then(normalize_pmcid),
        }
    }

    fn entries(&self) -> impl Iterator<Item = (MatchBasis, &str)> + '_ {
        [
            (MatchBasis::Doi, self.doi.as_deref()),
            (MatchBasis::Pmid, self.pmid.as_deref()),
            (MatchBasis::Pmcid, self.pmcid.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
    }

    /// Both sides carry the same identifier kind with different values
    pub fn conflicts_with(&self, other: &IdKeys) -> bool {
        let differ = |a: &Option<String>, b: &Option<String>| matches!((a, b), (Some(x), Some(y)) if x != y);
        differ(&self.doi, &other.doi) || differ(&self.pmid, &other.pmid) || differ(&self.pmcid, &other.pmcid)
    }
}

/// Everything a match predicate may look at for one record
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub record: &'a RawRecord,
    pub key: &'a NormalizedKey,
    pub ids: &'a IdKeys,
}

/// Decides whether two records without a shared identifier are the same publication
///
/// Implementations must be symmetric and must not depend on call order,
/// otherwise the partition would depend on input order.
pub trait MatchPredicate: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> bool;
}

/// Default fuzzy predicate: similar title AND shared surname AND compatible year
#[derive(Debug, Clone)]
pub struct FuzzyTitleMatch {
    pub threshold: f64,
    pub metric: SimilarityMetric,
    pub year_tolerance: i32,
    /// Refuse pairs whose same-kind identifiers disagree
    pub conflicting_ids_block: bool,
}

impl Default for FuzzyTitleMatch {
    fn default() -> Self {
        Self::from_config(&MatchingConfig::default())
    }
}

impl FuzzyTitleMatch {
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            threshold: config.title_similarity_threshold,
            metric: config.similarity_metric,
            year_tolerance: config.year_tolerance,
            conflicting_ids_block: config.conflicting_ids_block_fuzzy,
        }
    }
}

impl MatchPredicate for FuzzyTitleMatch {
    fn name(&self) -> &'static str {
        "fuzzy_title"
    }

    fn matches(&self, a: &Candidate<'_>, b: &Candidate<'_>) -> bool {
        if !a.key.has_title() || !b.key.has_title() {
            return false;
        }
        if self.conflicting_ids_block && a.ids.conflicts_with(b.ids) {
            return false;
        }
        if let (Some(ya), Some(yb)) = (a.key.year, b.key.year) {
            if (ya - yb).abs() > self.year_tolerance {
                return false;
            }
        }
        if !a.key.surnames.iter().any(|s| b.key.surnames.contains(s)) {
            return false;
        }
        self.metric.score(&a.key.title, &b.key.title) >= self.threshold
    }
}

/// Identity resolver (clustering stage)
pub struct IdentityResolver {
    normalizer: Normalizer,
    blocking: BlockingConfig,
    year_window: i32,
    predicate: Box<dyn MatchPredicate>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(&MatchingConfig::default(), &BlockingConfig::default())
    }
}

impl IdentityResolver {
    pub fn new(matching: &MatchingConfig, blocking: &BlockingConfig) -> Self {
        Self {
            normalizer: Normalizer::new(matching.subtitle_min_prefix_words, matching.max_surnames),
            blocking: blocking.clone(),
            year_window: matching.year_tolerance,
            predicate: Box::new(FuzzyTitleMatch::from_config(matching)),
        }
    }

    /// Replace the fuzzy match predicate
    pub fn with_predicate(mut self, predicate: impl MatchPredicate + 'static) -> Self {
        self.predicate = Box::new(predicate);
        self
    }

    /// Partition `records` into clusters
    ///
    /// Every index in `0..records.len()` appears in exactly one cluster.
    /// Clusters are ordered by their smallest member index.
    pub fn resolve<R: Borrow<RawRecord>>(&self, records: &[R]) -> Vec<Cluster> {
        let keys: Vec<NormalizedKey> = records.iter().map(|r| self.normalizer.key(r.borrow())).collect();
        let ids: Vec<IdKeys> = records.iter().map(|r| IdKeys::of(r.borrow())).collect();

        let mut sets = UnionFind::new(records.len());
        let id_links = link_identifiers(&ids, &mut sets);
        let mut id_only = sets.clone();

        let mut fuzzy_links = 0usize;
        for (i, j) in blocking::candidate_pairs(&keys, &self.blocking, self.year_window) {
            if sets.same(i, j) {
                continue;
            }
            let a = Candidate { record: records[i].borrow(), key: &keys[i], ids: &ids[i] };
            let b = Candidate { record: records[j].borrow(), key: &keys[j], ids: &ids[j] };
            if self.predicate.matches(&a, &b) {
                debug!(
                    "{} match: '{}' ({}) ~ '{}' ({})",
                    self.predicate.name(),
                    keys[i].title,
                    a.record.source,
                    keys[j].title,
                    b.record.source
                );
                sets.union(i, j);
                fuzzy_links += 1;
            }
        }

        let clusters: Vec<Cluster> = sets
            .groups()
            .into_iter()
            .map(|members| {
                let basis = merge_basis(&members, &ids, &mut id_only);
                Cluster { members, basis }
            })
            .collect();

        verify_partition(&clusters, records.len());

        info!(
            "Identity resolution: {} records -> {} clusters ({} identifier links, {} fuzzy links)",
            records.len(),
            clusters.len(),
            id_links,
            fuzzy_links
        );
        clusters
    }
}

/// Union records that share any normalized identifier; returns effective unions
fn link_identifiers(ids: &[IdKeys], sets: &mut UnionFind) -> usize {
    let mut first_seen: HashMap<(MatchBasis, &str), usize> = HashMap::new();
    let mut links = 0;
    for (index, record_ids) in ids.iter().enumerate() {
        for entry in record_ids.entries() {
            match first_seen.get(&entry) {
                Some(&earlier) => {
                    if sets.union(earlier, index) {
                        links += 1;
                    }
                }
                None => {
                    first_seen.insert(entry, index);
                }
            }
        }
    }
    links
}

/// Identifier kinds shared within the cluster, plus `FuzzyTitle` when
/// identifiers alone would have split it
fn merge_basis(members: &[usize], ids: &[IdKeys], id_only: &mut UnionFind) -> BTreeSet<MatchBasis> {
    let mut basis = BTreeSet::new();
    let mut counts: HashMap<(MatchBasis, &str), usize> = HashMap::new();
    for &m in members {
        for entry in ids[m].entries() {
            *counts.entry(entry).or_default() += 1;
        }
    }
    basis.extend(counts.iter().filter(|(_, n)| **n > 1).map(|((kind, _), _)| *kind));

    let id_components: BTreeSet<usize> = members.iter().map(|&m| id_only.find(m)).collect();
    if id_components.len() > 1 {
        basis.insert(MatchBasis::FuzzyTitle);
    }
    basis
}

fn verify_partition(clusters: &[Cluster], len: usize) {
    let mut seen = vec![false; len];
    for cluster in clusters {
        assert!(!cluster.is_empty(), "identity resolution produced an empty cluster");
        for &member in &cluster.members {
            assert!(!seen[member], "record {} claimed by two clusters", member);
            seen[member] = true;
        }
    }
    assert!(seen.iter().all(|s| *s), "identity resolution lost a record");
}
