// Shared Types and Data Contracts
//
// Defines the contracts between the reconciliation stages:
// RawRecord (connector output) → Cluster (identity resolution) →
// MergedRecord (merge engine) → CanonicalRecord (after both classifiers).
//
// Raw records are borrowed read-only. Everything downstream owns copies of
// the fields it needs, so a CanonicalRecord never points back into
// connector-owned data.

use chrono::{Datelike, NaiveDate};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

// ============================================================================
// Raw input (one source's view of a publication)
// ============================================================================

/// Publication date as reported by a source: a full date or a bare year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PublicationDate {
    Day(NaiveDate),
    Year(i32),
}

impl PublicationDate {
    pub fn year(&self) -> i32 {
        match self {
            Self::Day(date) => date.year(),
            Self::Year(year) => *year,
        }
    }

    pub fn is_year_only(&self) -> bool {
        matches!(self, Self::Year(_))
    }
}

impl std::fmt::Display for PublicationDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Year(year) => write!(f, "{:04}", year),
        }
    }
}

impl TryFrom<String> for PublicationDate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        crate::normalizer::parse_publication_date(&value)
            .ok_or_else(|| format!("unrecognised publication date '{}'", value))
    }
}

impl From<PublicationDate> for String {
    fn from(date: PublicationDate) -> Self {
        date.to_string()
    }
}

/// Date as it may appear in connector JSON
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    Year(i64),
    Other(IgnoredAny),
}

/// Record-level date field: an unusable value becomes `None` (with a warning)
/// instead of failing the whole batch
fn lenient_publication_date<'de, D>(deserializer: D) -> Result<Option<PublicationDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawDate> = Option::deserialize(deserializer)?;
    let parsed = match raw {
        None => None,
        Some(RawDate::Text(text)) => {
            let parsed = crate::normalizer::parse_publication_date(&text);
            if parsed.is_none() && !text.trim().is_empty() {
                warn!("Ignoring unrecognised publication date '{}'", text);
            }
            parsed
        }
        Some(RawDate::Year(year)) => match i32::try_from(year) {
            Ok(year @ 1000..=2999) => Some(PublicationDate::Year(year)),
            _ => {
                warn!("Ignoring out-of-range publication year {}", year);
                None
            }
        },
        Some(RawDate::Other(_)) => {
            warn!("Ignoring publication date that is neither text nor a year");
            None
        }
    };
    Ok(parsed)
}

/// Identifiers a source reported for a publication (at most one per kind)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmcid: Option<String>,
    /// The source's own record id (Semantic Scholar paper id, OpenAlex work id, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_native: Option<String>,
}

/// One source's bibliographic description of a publication
///
/// Immutable once fetched. Owned by the connector that produced it; the
/// reconciliation engine only ever borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: String,
    #[serde(default)]
    pub ids: Identifiers,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub journal: Option<String>,
    #[serde(default)]
    pub issn: Option<String>,
    #[serde(default, deserialize_with = "lenient_publication_date")]
    pub publication_date: Option<PublicationDate>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub mesh_terms: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub fields_of_study: Vec<String>,
    /// Source-specific publication type vocabulary (e.g. PubMed `[pt]` values)
    #[serde(default)]
    pub publication_types: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub is_preprint: bool,
}

impl RawRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// True when the title is missing or blank
    pub fn has_blank_title(&self) -> bool {
        self.title.as_deref().map_or(true, |t| t.trim().is_empty())
    }
}

/// Ordered record sequence produced by one source connector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    pub source: String,
    #[serde(default)]
    pub records: Vec<RawRecord>,
}

impl SourceBatch {
    pub fn new(source: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }
}

// ============================================================================
// Identity resolution output
// ============================================================================

/// Kind of evidence that joined records into one cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    Doi,
    Pmid,
    Pmcid,
    FuzzyTitle,
}

impl std::fmt::Display for MatchBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Doi => write!(f, "doi"),
            Self::Pmid => write!(f, "pmid"),
            Self::Pmcid => write!(f, "pmcid"),
            Self::FuzzyTitle => write!(f, "fuzzy_title"),
        }
    }
}

/// Records believed to denote the same publication
///
/// `members` are indices into the slice handed to the resolver, ascending.
/// A cluster is never empty; a record with no match is a singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub members: Vec<usize>,
    /// Match kinds that linked the members (empty for singletons)
    pub basis: BTreeSet<MatchBasis>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ============================================================================
// Merge output
// ============================================================================

/// Identifiers after merging a cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MergedIdentifiers {
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub pmcid: Option<String>,
    /// Source-native ids, keyed by source name
    pub source_ids: BTreeMap<String, String>,
}

/// Immutable copy of the raw fields one source contributed to a merge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SourceSnapshot {
    pub source: String,
    pub ids: Identifiers,
    pub title: Option<String>,
    pub journal: Option<String>,
    pub issn: Option<String>,
    pub publication_date: Option<PublicationDate>,
    pub author_count: usize,
    pub publication_types: Vec<String>,
}

impl SourceSnapshot {
    pub fn of(record: &RawRecord) -> Self {
        Self {
            source: record.source.clone(),
            ids: record.ids.clone(),
            title: record.title.clone(),
            journal: record.journal.clone(),
            issn: record.issn.clone(),
            publication_date: record.publication_date,
            author_count: record.authors.len(),
            publication_types: record.publication_types.clone(),
        }
    }
}

/// One cluster collapsed into a single record, before classification
///
/// `Ord` is field order; only used to make output ordering total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MergedRecord {
    pub source_primary: String,
    pub sources_found_in: Vec<String>,
    pub ids: MergedIdentifiers,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub journal: Option<String>,
    pub issn: Option<String>,
    pub publication_date: Option<PublicationDate>,
    pub publication_year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub mesh_terms: Vec<String>,
    pub keywords: Vec<String>,
    pub fields_of_study: Vec<String>,
    pub publication_types: Vec<String>,
    pub language: Option<String>,
    pub url: Option<String>,
    pub publisher: Option<String>,
    pub is_preprint: bool,
    pub data_quality_notes: Vec<String>,
    pub merge_basis: BTreeSet<MatchBasis>,
    /// Contributing raw fields, ordered by source authority
    pub provenance: Vec<SourceSnapshot>,
}

// ============================================================================
// Classifier outputs
// ============================================================================

/// How the RCT flag was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RctDetectionMethod {
    PublicationType,
    TextHeuristic,
    NoneDetected,
}

impl RctDetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublicationType => "publication_type",
            Self::TextHeuristic => "text_heuristic",
            Self::NoneDetected => "none_detected",
        }
    }
}

impl std::fmt::Display for RctDetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-way RCT label; `Unsure` when the evidence is contradictory or absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RctVerdict {
    Rct,
    NotRct,
    Unsure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RctAssessment {
    pub rct_flag: bool,
    pub rct_detection_method: RctDetectionMethod,
    pub rct_verdict: RctVerdict,
    /// Terms that drove the decision
    pub rct_evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicAssessment {
    pub topic: String,
    pub classification_reason: String,
    pub classification_inputs_used: Vec<String>,
    /// Distinct keyword hits per configured topic
    pub topic_scores: BTreeMap<String, usize>,
}

/// Final reconciled record: merge output plus both classifier results
///
/// The classifier stages add their own structs and never touch `merged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRecord {
    #[serde(flatten)]
    pub merged: MergedRecord,
    #[serde(flatten)]
    pub rct: RctAssessment,
    #[serde(flatten)]
    pub topic: TopicAssessment,
}

impl CanonicalRecord {
    pub fn rct_flag(&self) -> bool {
        self.rct.rct_flag
    }

    pub fn topic(&self) -> &str {
        &self.topic.topic
    }

    pub fn sources_found_in(&self) -> &[String] {
        &self.merged.sources_found_in
    }
}
