//! Reconciliation configuration
//!
//! One TOML document; every table and field is optional:
//!
//! ```toml
//! vocabulary_file = "/path/to/vocabulary.toml"
//!
//! [logging]
//! level = "info"
//!
//! [reconciliation]
//! source_authority = ["pubmed", "europepmc", "crossref"]
//!
//! [reconciliation.matching]
//! title_similarity_threshold = 0.90
//! similarity_metric = "normalized_levenshtein"
//!
//! [reconciliation.blocking]
//! enabled = true
//!
//! [reconciliation.merge]
//! date_drift_days = 30
//!
//! [output]
//! rct_only = false
//! ```
//!
//! File lookup is delegated to `rct_common::config::ConfigResolver`.

use crate::classify::vocabulary::Vocabulary;
use crate::error::{ReconError, ReconResult};
use crate::orchestrator::OutputFilter;
use crate::resolver::blocking::BlockingConfig;
use crate::resolver::similarity::SimilarityMetric;
use rct_common::config::{parse_toml, ConfigResolver};
use rct_common::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Sources ranked most to least authoritative
pub const DEFAULT_SOURCE_AUTHORITY: &[&str] = &[
    "pubmed",
    "europepmc",
    "semanticscholar",
    "openalex",
    "crossref",
    "scopus",
    "wos",
    "dimensions",
];

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub output: OutputFilter,

    /// Replaces the built-in classifier vocabulary when set
    #[serde(default)]
    pub vocabulary_file: Option<PathBuf>,
}

/// `[reconciliation]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_source_authority")]
    pub source_authority: Vec<String>,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            source_authority: default_source_authority(),
            matching: MatchingConfig::default(),
            blocking: BlockingConfig::default(),
            merge: MergeConfig::default(),
        }
    }
}

fn default_source_authority() -> Vec<String> {
    DEFAULT_SOURCE_AUTHORITY.iter().map(|s| s.to_string()).collect()
}

/// `[reconciliation.matching]`: fuzzy match aggressiveness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum title similarity in (0.0, 1.0]
    pub title_similarity_threshold: f64,
    pub similarity_metric: SimilarityMetric,
    /// Maximum year difference between fuzzy-matched records
    pub year_tolerance: i32,
    /// Words required before ':' / ' - ' for the rest to count as a subtitle
    pub subtitle_min_prefix_words: usize,
    pub max_surnames: usize,
    pub conflicting_ids_block_fuzzy: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            title_similarity_threshold: 0.90,
            similarity_metric: SimilarityMetric::NormalizedLevenshtein,
            year_tolerance: 1,
            subtitle_min_prefix_words: crate::normalizer::DEFAULT_SUBTITLE_MIN_PREFIX_WORDS,
            max_surnames: crate::normalizer::DEFAULT_MAX_SURNAMES,
            conflicting_ids_block_fuzzy: false,
        }
    }
}

/// `[reconciliation.merge]`: thresholds for data-quality notes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub date_drift_days: i64,
    pub author_count_tolerance: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            date_drift_days: 30,
            author_count_tolerance: 1,
        }
    }
}

impl ReconConfig {
    /// Resolve, load and validate the config document
    pub fn load(resolver: &ConfigResolver) -> ReconResult<Self> {
        let config: Self = resolver.load_or_default()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> ReconResult<Self> {
        let config: Self = parse_toml(content, "inline config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReconResult<()> {
        let matching = &self.reconciliation.matching;
        if !(matching.title_similarity_threshold > 0.0 && matching.title_similarity_threshold <= 1.0) {
            return Err(ReconError::InvalidConfig(format!(
                "title_similarity_threshold must be in (0, 1], got {}",
                matching.title_similarity_threshold
            )));
        }
        if matching.year_tolerance < 0 {
            return Err(ReconError::InvalidConfig(format!(
                "year_tolerance must not be negative, got {}",
                matching.year_tolerance
            )));
        }
        if matching.max_surnames == 0 {
            return Err(ReconError::InvalidConfig(
                "max_surnames must be at least 1".to_string(),
            ));
        }
        if self.reconciliation.merge.date_drift_days < 0 {
            return Err(ReconError::InvalidConfig(format!(
                "date_drift_days must not be negative, got {}",
                self.reconciliation.merge.date_drift_days
            )));
        }
        Ok(())
    }

    /// Classifier vocabulary: `vocabulary_file` if set, else the built-in one
    pub fn vocabulary(&self) -> ReconResult<Vocabulary> {
        match &self.vocabulary_file {
            Some(path) => {
                info!("Loading classifier vocabulary from {}", path.display());
                Vocabulary::load(path)
            }
            None => Vocabulary::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
        assert_eq!(config.reconciliation.source_authority[0], "pubmed");
        assert_eq!(config.reconciliation.matching.title_similarity_threshold, 0.90);
        assert_eq!(config.reconciliation.merge.date_drift_days, 30);
        assert!(config.output.include_preprints);
        assert!(!config.output.rct_only);
    }

    #[test]
    fn test_partial_tables_keep_other_defaults() {
        let config = ReconConfig::from_toml(
            r#"
            [reconciliation.matching]
            similarity_metric = "jaro_winkler"
            year_tolerance = 2

            [reconciliation.blocking]
            enabled = false
            "#,
        )
        .unwrap();
        let matching = &config.reconciliation.matching;
        assert_eq!(matching.similarity_metric, SimilarityMetric::JaroWinkler);
        assert_eq!(matching.year_tolerance, 2);
        assert_eq!(matching.max_surnames, 3);
        assert!(!config.reconciliation.blocking.enabled);
        assert_eq!(config.reconciliation.blocking.leading_stopwords, vec!["the", "a", "an"]);
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let err = ReconConfig::from_toml(
            "[reconciliation.matching]\ntitle_similarity_threshold = 1.5\n",
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_metric_is_parse_error() {
        let err = ReconConfig::from_toml("[reconciliation.matching]\nsimilarity_metric = \"soundex\"\n")
            .unwrap_err();
        assert!(matches!(err, ReconError::Common(rct_common::Error::Parse { .. })));
    }

    #[test]
    fn test_default_vocabulary_is_builtin() {
        let vocabulary = ReconConfig::default().vocabulary().unwrap();
        assert!(vocabulary.topics.contains_key("Cardiology"));
    }
}
