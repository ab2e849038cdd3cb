//! Versioned classifier vocabulary (TOML)
//!
//! The built-in document is compiled into the binary; a `vocabulary_file`
//! in the config replaces it wholesale.

use crate::error::{ReconError, ReconResult};
use rct_common::config::{load_toml_file, parse_toml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Built-in vocabulary document
pub const BUILTIN_VOCABULARY: &str = include_str!("../../vocabulary/default.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub version: String,

    pub rct: RctVocabulary,

    /// Topic name → keyword phrases
    pub topics: BTreeMap<String, Vec<String>>,

    #[serde(default = "default_fallback_topic")]
    pub fallback_topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RctVocabulary {
    /// Source name → exact publication-type terms that mean RCT
    #[serde(default)]
    pub publication_types: BTreeMap<String, Vec<String>>,

    pub positive: Vec<String>,

    #[serde(default)]
    pub negative: Vec<String>,
}

fn default_fallback_topic() -> String {
    "Other/Unclear".to_string()
}

impl Vocabulary {
    /// Parse and validate the compiled-in vocabulary
    pub fn builtin() -> ReconResult<Self> {
        Self::from_toml(BUILTIN_VOCABULARY, "built-in vocabulary")
    }

    pub fn load(path: &Path) -> ReconResult<Self> {
        let vocabulary: Self = load_toml_file(path)?;
        vocabulary.validate()?;
        debug!("Loaded vocabulary version {} from {}", vocabulary.version, path.display());
        Ok(vocabulary)
    }

    pub fn from_toml(content: &str, origin: &str) -> ReconResult<Self> {
        let vocabulary: Self = parse_toml(content, origin)?;
        vocabulary.validate()?;
        Ok(vocabulary)
    }

    pub fn validate(&self) -> ReconResult<()> {
        if self.topics.is_empty() {
            return Err(ReconError::Vocabulary("no topics defined".to_string()));
        }
        if self.rct.positive.is_empty() {
            return Err(ReconError::Vocabulary("rct.positive must not be empty".to_string()));
        }
        if self.fallback_topic.trim().is_empty() {
            return Err(ReconError::Vocabulary("fallback_topic must not be blank".to_string()));
        }
        if self.topics.contains_key(&self.fallback_topic) {
            return Err(ReconError::Vocabulary(format!(
                "fallback topic '{}' is also a keyword topic",
                self.fallback_topic
            )));
        }

        let lists = self
            .topics
            .iter()
            .map(|(name, phrases)| (format!("topics.{}", name), phrases))
            .chain(
                self.rct
                    .publication_types
                    .iter()
                    .map(|(source, terms)| (format!("rct.publication_types.{}", source), terms)),
            )
            .chain([
                ("rct.positive".to_string(), &self.rct.positive),
                ("rct.negative".to_string(), &self.rct.negative),
            ]);
        for (list, phrases) in lists {
            if phrases.iter().any(|p| p.trim().is_empty()) {
                return Err(ReconError::Vocabulary(format!("blank phrase in {}", list)));
            }
        }
        Ok(())
    }
}
