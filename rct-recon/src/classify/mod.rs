//! Rule-based classifiers over merged records
//!
//! Both classifiers read a `MergedRecord` and return their own assessment
//! struct; neither can modify merge output. Their phrase lists come from a
//! `Vocabulary` document, never from code.

pub mod rct;
pub mod topic;
pub mod vocabulary;

pub use rct::RctDetector;
pub use topic::TopicClassifier;
pub use vocabulary::Vocabulary;

use crate::normalizer::phrase_text;

/// A vocabulary phrase prepared for word-boundary matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    /// Phrase as written in the vocabulary
    pub text: String,
    needle: String,
}

impl Phrase {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            needle: phrase_text(text),
        }
    }

    /// True if the phrase occurs in text prepared with `phrase_text`
    pub fn found_in(&self, prepared: &str) -> bool {
        self.needle.len() > 1 && prepared.contains(&self.needle)
    }
}

pub(crate) fn compile_phrases(phrases: &[String]) -> Vec<Phrase> {
    phrases.iter().map(|p| Phrase::new(p)).collect()
}

/// Prepare several text fields without letting a phrase span two of them
pub(crate) fn prepare_fields<'a>(fields: impl IntoIterator<Item = &'a str>) -> String {
    fields.into_iter().map(phrase_text).collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_matches_on_word_boundaries() {
        let phrase = Phrase::new("Double-Blind");
        assert!(phrase.found_in(&phrase_text("A randomized, double blind study")));
        assert!(!phrase.found_in(&phrase_text("doubleblind")));
    }

    #[test]
    fn test_blank_phrase_never_matches() {
        assert!(!Phrase::new("  ").found_in(" anything "));
    }

    #[test]
    fn test_phrase_cannot_span_fields() {
        let prepared = prepare_fields(["Heart", "failure clinic"]);
        assert!(!Phrase::new("heart failure").found_in(&prepared));
        assert!(Phrase::new("heart").found_in(&prepared));
        assert!(Phrase::new("failure clinic").found_in(&prepared));
    }
}
