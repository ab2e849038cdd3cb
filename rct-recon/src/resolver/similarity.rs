//! Title similarity metrics (all symmetric, all in [0.0, 1.0])

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// 1 - levenshtein / max(len): strict, sensitive to word order
    #[default]
    NormalizedLevenshtein,
    /// Rewards shared prefixes; lenient on long titles
    JaroWinkler,
    /// Jaccard overlap of word sets; ignores word order
    TokenSet,
}

impl SimilarityMetric {
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::NormalizedLevenshtein => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
            Self::TokenSet => token_set_ratio(a, b),
        }
    }
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    let left: BTreeSet<&str> = a.split_whitespace().collect();
    let right: BTreeSet<&str> = b.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}
