// Topic Classifier
//
// Concept: Count distinct keyword hits per configured topic over title,
// abstract, MeSH terms and keywords. A unique maximum above zero wins;
// zero hits or a tie at the top yields the fallback topic.

use super::vocabulary::Vocabulary;
use super::{compile_phrases, prepare_fields, Phrase};
use crate::types::{MergedRecord, TopicAssessment};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TopicClassifier {
    topics: Vec<(String, Vec<Phrase>)>,
    fallback: String,
}

impl TopicClassifier {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            topics: vocabulary
                .topics
                .iter()
                .map(|(name, phrases)| (name.clone(), compile_phrases(phrases)))
                .collect(),
            fallback: vocabulary.fallback_topic.clone(),
        }
    }

    pub fn classify(&self, record: &MergedRecord) -> TopicAssessment {
        let mut inputs_used = Vec::new();
        let mut fields: Vec<&str> = Vec::new();
        for (name, text) in [("title", &record.title), ("abstract", &record.abstract_text)] {
            if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
                inputs_used.push(name.to_string());
                fields.push(text);
            }
        }
        for (name, terms) in [("mesh_terms", &record.mesh_terms), ("keywords", &record.keywords)] {
            if !terms.is_empty() {
                inputs_used.push(name.to_string());
                fields.extend(terms.iter().map(String::as_str));
            }
        }
        let prepared = prepare_fields(fields);

        let mut hits: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (topic, phrases) in &self.topics {
            let matched: Vec<&str> = phrases
                .iter()
                .filter(|p| p.found_in(&prepared))
                .map(|p| p.text.as_str())
                .collect();
            hits.insert(topic.as_str(), matched);
        }
        let topic_scores: BTreeMap<String, usize> =
            hits.iter().map(|(t, m)| (t.to_string(), m.len())).collect();

        let best = topic_scores.values().copied().max().unwrap_or(0);
        let leaders: Vec<&str> = hits
            .iter()
            .filter(|(_, m)| m.len() == best)
            .map(|(t, _)| *t)
            .collect();

        let (topic, reason) = if best == 0 {
            (self.fallback.clone(), "no matching keywords".to_string())
        } else if leaders.len() > 1 {
            let tied: Vec<String> = leaders.iter().map(|t| format!("{}={}", t, best)).collect();
            (
                self.fallback.clone(),
                format!("tied keyword counts ({})", tied.join(", ")),
            )
        } else {
            let winner = leaders[0];
            (
                winner.to_string(),
                format!("{} keywords matched: {}", winner, hits[winner].join(", ")),
            )
        };

        debug!("Topic '{}' ({})", topic, reason);
        TopicAssessment {
            topic,
            classification_reason: reason,
            classification_inputs_used: inputs_used,
            topic_scores,
        }
    }
}
