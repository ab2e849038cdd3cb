// RCT Detector
//
// Concept: Two-tier, state-free decision over one merged record
//
// Tier 1 (publication_type): any contributing source's raw publication type
//   exactly matches that source's RCT vocabulary → rct
// Tier 2 (text_heuristic): title + abstract contain ≥ 1 positive phrase and
//   no negative phrase → rct
// Otherwise none_detected. Verdict is `unsure` when positive and negative
// phrases both fire, or when there is no text to judge.

use super::vocabulary::RctVocabulary;
use super::{compile_phrases, prepare_fields, Phrase};
use crate::types::{MergedRecord, RctAssessment, RctDetectionMethod, RctVerdict};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RctDetector {
    /// Lowercased source → lowercased exact terms
    publication_types: BTreeMap<String, Vec<String>>,
    positive: Vec<Phrase>,
    negative: Vec<Phrase>,
}

impl RctDetector {
    pub fn new(vocabulary: &RctVocabulary) -> Self {
        let publication_types = vocabulary
            .publication_types
            .iter()
            .map(|(source, terms)| {
                (
                    source.trim().to_lowercase(),
                    terms.iter().map(|t| t.trim().to_lowercase()).collect(),
                )
            })
            .collect();
        Self {
            publication_types,
            positive: compile_phrases(&vocabulary.positive),
            negative: compile_phrases(&vocabulary.negative),
        }
    }

    pub fn assess(&self, record: &MergedRecord) -> RctAssessment {
        let type_hits = self.publication_type_hits(record);
        if !type_hits.is_empty() {
            debug!("RCT by publication type: {}", type_hits.join("; "));
            return RctAssessment {
                rct_flag: true,
                rct_detection_method: RctDetectionMethod::PublicationType,
                rct_verdict: RctVerdict::Rct,
                rct_evidence: type_hits,
            };
        }

        let texts: Vec<&str> = [record.title.as_deref(), record.abstract_text.as_deref()]
            .into_iter()
            .flatten()
            .filter(|t| !t.trim().is_empty())
            .collect();
        if texts.is_empty() {
            return RctAssessment {
                rct_flag: false,
                rct_detection_method: RctDetectionMethod::NoneDetected,
                rct_verdict: RctVerdict::Unsure,
                rct_evidence: Vec::new(),
            };
        }

        let prepared = prepare_fields(texts);
        let positives = matched(&self.positive, &prepared);
        let negatives = matched(&self.negative, &prepared);

        let (rct_flag, method, verdict) = match (positives.is_empty(), negatives.is_empty()) {
            (false, true) => (true, RctDetectionMethod::TextHeuristic, RctVerdict::Rct),
            (false, false) => (false, RctDetectionMethod::NoneDetected, RctVerdict::Unsure),
            (true, _) => (false, RctDetectionMethod::NoneDetected, RctVerdict::NotRct),
        };

        let evidence: Vec<String> = positives
            .iter()
            .map(|p| format!("positive: {}", p))
            .chain(negatives.iter().map(|n| format!("negative: {}", n)))
            .collect();
        debug!(
            "RCT text heuristic: flag={}, verdict={:?}, evidence=[{}]",
            rct_flag,
            verdict,
            evidence.join(", ")
        );

        RctAssessment {
            rct_flag,
            rct_detection_method: method,
            rct_verdict: verdict,
            rct_evidence: evidence,
        }
    }

    /// "source: term" for every provenance publication type in that source's list
    fn publication_type_hits(&self, record: &MergedRecord) -> Vec<String> {
        let mut hits = Vec::new();
        for snapshot in &record.provenance {
            let Some(terms) = self.publication_types.get(&snapshot.source.trim().to_lowercase()) else {
                continue;
            };
            for raw in &snapshot.publication_types {
                let hit = format!("{}: {}", snapshot.source, raw.trim());
                if terms.contains(&raw.trim().to_lowercase()) && !hits.contains(&hit) {
                    hits.push(hit);
                }
            }
        }
        hits
    }
}

fn matched<'p>(phrases: &'p [Phrase], prepared: &str) -> Vec<&'p str> {
    phrases
        .iter()
        .filter(|p| p.found_in(prepared))
        .map(|p| p.text.as_str())
        .collect()
}
