// Reconciliation Orchestrator
//
// Concept: Batch pipeline over already-fetched source batches
// Synchronization: Accepts &[SourceBatch], outputs ReconciliationOutput (never fails)
//
// Pipeline:
// 1. Flatten batches (empty batches are logged and tolerated)
// 2. IdentityResolver → clusters
// 3. MergeEngine → one MergedRecord per cluster
// 4. RctDetector + TopicClassifier → CanonicalRecord
// 5. Sort by content key, apply OutputFilter, build summary
//
// Source fetching sits outside the pipeline behind the RecordSource trait;
// `collect_batches` turns fetch failures into empty batches.

use crate::classify::{RctDetector, TopicClassifier, Vocabulary};
use crate::config::ReconConfig;
use crate::error::ReconResult;
use crate::merge::MergeEngine;
use crate::resolver::IdentityResolver;
use crate::types::{CanonicalRecord, PublicationDate, RawRecord, SourceBatch, SourceSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Connector seam: one external bibliographic source
///
/// Implementations own HTTP, pagination, authentication and rate limits.
pub trait RecordSource: Send + Sync {
    fn source_name(&self) -> &str;

    /// Fetch every record for the configured window
    fn fetch(&self) -> ReconResult<Vec<RawRecord>>;

    /// Whether the source can be queried (credentials present, etc.)
    fn is_available(&self) -> bool {
        true
    }
}

/// Fetch one batch per available source; failures become empty batches
///
/// Unavailable sources are skipped entirely. No retries.
pub fn collect_batches(sources: &[&dyn RecordSource]) -> Vec<SourceBatch> {
    let mut batches = Vec::with_capacity(sources.len());
    for source in sources {
        let name = source.source_name();
        if !source.is_available() {
            info!("Source {} unavailable, skipping", name);
            continue;
        }
        let records = match source.fetch() {
            Ok(records) => records,
            Err(e) => {
                warn!("Source {} failed, continuing without it: {}", name, e);
                Vec::new()
            }
        };
        debug!("Source {} returned {} records", name, records.len());
        batches.push(SourceBatch::new(name, records));
    }
    batches
}

/// `[output]` table: which classified records are emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFilter {
    pub rct_only: bool,
    pub include_preprints: bool,
}

impl Default for OutputFilter {
    fn default() -> Self {
        Self {
            rct_only: false,
            include_preprints: true,
        }
    }
}

impl OutputFilter {
    /// Reason the record is excluded, or `None` to keep it
    pub fn exclusion_reason(&self, record: &CanonicalRecord) -> Option<&'static str> {
        if self.rct_only && !record.rct.rct_flag {
            Some("not_rct")
        } else if !self.include_preprints && record.merged.is_preprint {
            Some("preprint")
        } else {
            None
        }
    }
}

/// Counters describing one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    /// Raw records received per batch source
    pub per_source: BTreeMap<String, usize>,
    pub total_raw: usize,
    pub clusters: usize,
    /// Raw records absorbed into another record's cluster
    pub merges: usize,
    pub with_quality_notes: usize,
    pub rct_count: usize,
    pub by_topic: BTreeMap<String, usize>,
    pub excluded: BTreeMap<String, usize>,
    pub emitted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutput {
    pub records: Vec<CanonicalRecord>,
    pub summary: ReconciliationSummary,
}

/// Record Reconciliation Engine
///
/// Holds no per-run state; `reconcile` can be called repeatedly and from
/// several threads on disjoint inputs.
pub struct Reconciler {
    resolver: IdentityResolver,
    merger: MergeEngine,
    rct: RctDetector,
    topics: TopicClassifier,
    filter: OutputFilter,
}

impl Reconciler {
    pub fn new(config: &ReconConfig, vocabulary: &Vocabulary) -> Self {
        let reconciliation = &config.reconciliation;
        info!(
            "Reconciler: metric={:?} threshold={} blocking={} vocabulary={}",
            reconciliation.matching.similarity_metric,
            reconciliation.matching.title_similarity_threshold,
            reconciliation.blocking.enabled,
            vocabulary.version
        );
        Self {
            resolver: IdentityResolver::new(&reconciliation.matching, &reconciliation.blocking),
            merger: MergeEngine::from_config(reconciliation),
            rct: RctDetector::new(&vocabulary.rct),
            topics: TopicClassifier::new(vocabulary),
            filter: config.output.clone(),
        }
    }

    /// Build from config, loading the vocabulary it names
    pub fn from_config(config: &ReconConfig) -> ReconResult<Self> {
        let vocabulary = config.vocabulary()?;
        Ok(Self::new(config, &vocabulary))
    }

    /// Compiled defaults and the built-in vocabulary
    pub fn with_defaults() -> ReconResult<Self> {
        Self::from_config(&ReconConfig::default())
    }

    /// Swap the identity resolver (e.g. one with a custom match predicate)
    pub fn with_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    /// Reconcile every source batch into canonical records
    pub fn reconcile(&self, batches: &[SourceBatch]) -> ReconciliationOutput {
        let mut per_source: BTreeMap<String, usize> = BTreeMap::new();
        for batch in batches {
            if batch.records.is_empty() {
                warn!("Source {} contributed no records", batch.source);
            }
            *per_source.entry(batch.source.clone()).or_default() += batch.records.len();
            if let Some(stray) = batch.records.iter().find(|r| r.source != batch.source) {
                debug!(
                    "Batch {} contains records labelled {}; record labels drive merging",
                    batch.source, stray.source
                );
            }
        }

        let records: Vec<&RawRecord> = batches.iter().flat_map(|b| b.records.iter()).collect();
        self.run(&records, per_source)
    }

    /// Reconcile a flat record list; per-source counts come from record labels
    pub fn reconcile_records(&self, records: &[RawRecord]) -> ReconciliationOutput {
        let mut per_source: BTreeMap<String, usize> = BTreeMap::new();
        for record in records {
            *per_source.entry(record.source.clone()).or_default() += 1;
        }
        let refs: Vec<&RawRecord> = records.iter().collect();
        self.run(&refs, per_source)
    }

    fn run(&self, records: &[&RawRecord], per_source: BTreeMap<String, usize>) -> ReconciliationOutput {
        let clusters = self.resolver.resolve(records);

        let mut canonical: Vec<CanonicalRecord> = clusters
            .iter()
            .map(|cluster| {
                let merged = self.merger.merge(cluster, records);
                let rct = self.rct.assess(&merged);
                let topic = self.topics.classify(&merged);
                CanonicalRecord { merged, rct, topic }
            })
            .collect();
        // Full merged-record comparison breaks any remaining tie
        canonical.sort_by(|a, b| {
            sort_key(a)
                .cmp(&sort_key(b))
                .then_with(|| a.merged.cmp(&b.merged))
        });

        let mut summary = ReconciliationSummary {
            per_source,
            total_raw: records.len(),
            clusters: clusters.len(),
            merges: records.len() - clusters.len(),
            ..Default::default()
        };

        let mut emitted = Vec::with_capacity(canonical.len());
        for record in canonical {
            if let Some(reason) = self.filter.exclusion_reason(&record) {
                *summary.excluded.entry(reason.to_string()).or_default() += 1;
                continue;
            }
            if record.rct.rct_flag {
                summary.rct_count += 1;
            }
            if !record.merged.data_quality_notes.is_empty() {
                summary.with_quality_notes += 1;
            }
            *summary.by_topic.entry(record.topic.topic.clone()).or_default() += 1;
            emitted.push(record);
        }
        summary.emitted = emitted.len();

        info!(
            "Reconciliation complete: {} raw -> {} clusters, {} emitted ({} RCT), {} excluded",
            summary.total_raw,
            summary.clusters,
            summary.emitted,
            summary.rct_count,
            summary.excluded.values().sum::<usize>()
        );

        ReconciliationOutput {
            records: emitted,
            summary,
        }
    }
}

type SortKey<'a> = (
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<PublicationDate>,
    &'a [String],
    &'a [String],
    Option<&'a str>,
    Option<&'a str>,
    &'a [String],
    &'a [String],
    &'a [SourceSnapshot],
);

/// Content-derived ordering so output order never follows input order
fn sort_key(record: &CanonicalRecord) -> SortKey<'_> {
    let m = &record.merged;
    (
        m.ids.doi.as_deref(),
        m.ids.pmid.as_deref(),
        m.ids.pmcid.as_deref(),
        m.title.as_deref(),
        m.publication_date,
        m.sources_found_in.as_slice(),
        m.authors.as_slice(),
        m.journal.as_deref(),
        m.abstract_text.as_deref(),
        m.mesh_terms.as_slice(),
        m.keywords.as_slice(),
        m.provenance.as_slice(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconError;

    struct Fixed(&'static str, Vec<RawRecord>);

    impl RecordSource for Fixed {
        fn source_name(&self) -> &str {
            self.0
        }

        fn fetch(&self) -> ReconResult<Vec<RawRecord>> {
            Ok(self.1.clone())
        }
    }

    struct Failing;

    impl RecordSource for Failing {
        fn source_name(&self) -> &str {
            "scopus"
        }

        fn fetch(&self) -> ReconResult<Vec<RawRecord>> {
            Err(ReconError::SourceFetch {
                name: "scopus".to_string(),
                message: "HTTP 500".to_string(),
            })
        }
    }

    struct Offline;

    impl RecordSource for Offline {
        fn source_name(&self) -> &str {
            "wos"
        }

        fn fetch(&self) -> ReconResult<Vec<RawRecord>> {
            panic!("unavailable source must not be fetched")
        }

        fn is_available(&self) -> bool {
            false
        }
    }

    fn titled(source: &str, title: &str) -> RawRecord {
        RawRecord {
            source: source.to_string(),
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_collect_batches_tolerates_failure_and_skips_unavailable() {
        let pubmed = Fixed("pubmed", vec![titled("pubmed", "A")]);
        let batches = collect_batches(&[&pubmed as &dyn RecordSource, &Failing, &Offline]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].records.len(), 1);
        assert_eq!(batches[1].source, "scopus");
        assert!(batches[1].records.is_empty());
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let reconciler = Reconciler::with_defaults().unwrap();
        let output = reconciler.reconcile(&[]);
        assert!(output.records.is_empty());
        assert_eq!(output.summary, ReconciliationSummary::default());
    }

    #[test]
    fn test_summary_counts() {
        let reconciler = Reconciler::with_defaults().unwrap();
        let batches = vec![
            SourceBatch::new("pubmed", vec![titled("pubmed", "Heart outcomes")]),
            SourceBatch::new("crossref", vec![]),
            SourceBatch::new("openalex", vec![titled("openalex", "Liver outcomes")]),
        ];
        let output = reconciler.reconcile(&batches);
        assert_eq!(output.summary.total_raw, 2);
        assert_eq!(output.summary.per_source["crossref"], 0);
        assert_eq!(output.summary.clusters, 2);
        assert_eq!(output.summary.merges, 0);
        assert_eq!(output.summary.by_topic["Cardiology"], 1);
        assert_eq!(output.summary.by_topic["Gastroenterology"], 1);
        assert_eq!(output.summary.emitted, 2);
    }

    #[test]
    fn test_rct_only_filter_counts_exclusions() {
        let config = ReconConfig {
            output: OutputFilter {
                rct_only: true,
                include_preprints: true,
            },
            ..Default::default()
        };
        let reconciler = Reconciler::from_config(&config).unwrap();
        let mut rct = titled("pubmed", "Drug A: a randomised controlled trial");
        rct.ids.pmid = Some("1".to_string());
        let other = titled("pubmed", "Prescribing patterns");

        let output = reconciler.reconcile_records(&[rct, other]);
        assert_eq!(output.records.len(), 1);
        assert!(output.records[0].rct_flag());
        assert_eq!(output.summary.excluded["not_rct"], 1);
        assert_eq!(output.summary.rct_count, 1);
    }

    #[test]
    fn test_preprint_filter() {
        let config = ReconConfig {
            output: OutputFilter {
                rct_only: false,
                include_preprints: false,
            },
            ..Default::default()
        };
        let reconciler = Reconciler::from_config(&config).unwrap();
        let mut preprint = titled("semanticscholar", "Early findings");
        preprint.is_preprint = true;

        let output = reconciler.reconcile_records(&[preprint, titled("pubmed", "Final findings")]);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.summary.excluded["preprint"], 1);
    }

    #[test]
    fn test_output_order_total_when_only_url_differs() {
        let reconciler = Reconciler::with_defaults().unwrap();
        let mut a = RawRecord::new("crossref");
        a.url = Some("https://a".to_string());
        let mut b = RawRecord::new("crossref");
        b.url = Some("https://b".to_string());

        let forward = reconciler.reconcile_records(&[a.clone(), b.clone()]);
        let backward = reconciler.reconcile_records(&[b, a]);
        assert_eq!(forward.records, backward.records);
        assert_eq!(forward.records[0].merged.url.as_deref(), Some("https://a"));
    }

    #[test]
    fn test_output_sorted_by_content() {
        let reconciler = Reconciler::with_defaults().unwrap();
        let a = titled("pubmed", "Beta");
        let b = titled("pubmed", "Alpha");
        let forward = reconciler.reconcile_records(&[a.clone(), b.clone()]);
        let backward = reconciler.reconcile_records(&[b, a]);
        assert_eq!(forward.records, backward.records);
        assert_eq!(forward.records[0].merged.title.as_deref(), Some("Alpha"));
    }
}
