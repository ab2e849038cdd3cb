// Candidate pair generation for fuzzy matching
//
// Concept: Only records that could plausibly match are compared.
// Block key = (first title token after leading stopwords, year).
//
// Algorithm:
// 1. Bucket every titled record by token, then by year (None = unknown year)
// 2. Within one token, pair records in the same year bucket and across year
//    buckets within `year_window` of each other
// 3. A year-unknown bucket pairs with every year bucket of the same token
//
// Each unordered pair is produced at most once, always as (low, high).

use crate::normalizer::NormalizedKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingConfig {
    /// When false every titled pair is compared (quadratic)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Tokens skipped when choosing the block token
    #[serde(default = "default_leading_stopwords")]
    pub leading_stopwords: Vec<String>,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            leading_stopwords: default_leading_stopwords(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_leading_stopwords() -> Vec<String> {
    ["the", "a", "an"].iter().map(|s| s.to_string()).collect()
}

/// Block token of a normalized title; `None` for an empty title
///
/// A title made only of stopwords falls back to its first token.
pub fn block_token<'a>(title: &'a str, stopwords: &[String]) -> Option<&'a str> {
    let mut tokens = title.split_whitespace();
    let first = tokens.next()?;
    Some(
        std::iter::once(first)
            .chain(tokens)
            .find(|t| !stopwords.iter().any(|s| s == t))
            .unwrap_or(first),
    )
}

/// Index pairs (i < j) worth handing to the match predicate
pub fn candidate_pairs(
    keys: &[NormalizedKey],
    config: &BlockingConfig,
    year_window: i32,
) -> Vec<(usize, usize)> {
    let titled: Vec<usize> = (0..keys.len()).filter(|&i| keys[i].has_title()).collect();

    if !config.enabled {
        let mut pairs = Vec::new();
        for (pos, &i) in titled.iter().enumerate() {
            for &j in &titled[pos + 1..] {
                pairs.push((i, j));
            }
        }
        return pairs;
    }

    let mut blocks: HashMap<&str, BTreeMap<Option<i32>, Vec<usize>>> = HashMap::new();
    for &i in &titled {
        if let Some(token) = block_token(&keys[i].title, &config.leading_stopwords) {
            blocks
                .entry(token)
                .or_default()
                .entry(keys[i].year)
                .or_default()
                .push(i);
        }
    }

    let mut pairs = Vec::new();
    for years in blocks.values() {
        let buckets: Vec<(Option<i32>, &Vec<usize>)> =
            years.iter().map(|(y, members)| (*y, members)).collect();
        for (a, (year_a, members_a)) in buckets.iter().enumerate() {
            for (pos, &i) in members_a.iter().enumerate() {
                for &j in &members_a[pos + 1..] {
                    pairs.push(ordered(i, j));
                }
            }
            for (year_b, members_b) in &buckets[a + 1..] {
                if !years_adjacent(*year_a, *year_b, year_window) {
                    continue;
                }
                for &i in members_a.iter() {
                    for &j in members_b.iter() {
                        pairs.push(ordered(i, j));
                    }
                }
            }
        }
    }
    pairs
}

fn years_adjacent(a: Option<i32>, b: Option<i32>, window: i32) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= window,
        _ => true,
    }
}

fn ordered(i: usize, j: usize) -> (usize, usize) {
    if i < j {
        (i, j)
    } else {
        (j, i)
    }
}
