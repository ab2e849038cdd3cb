// Normalizer: canonical comparison forms for identifiers and text
//
// Concept: Every comparison the resolver and classifiers make goes through
// one of these pure functions, so two records compare equal exactly when
// their canonical forms do.
//
// Title:    lowercase → drop subtitle (≥ N-word prefix only) → strip punctuation → collapse whitespace
// Authors:  surname per author string → lowercase alphanumerics → first K distinct, order kept
// Year:     taken from the parsed publication date

use crate::types::{PublicationDate, RawRecord};
use chrono::NaiveDate;

/// Default minimum number of words before a subtitle separator
pub const DEFAULT_SUBTITLE_MIN_PREFIX_WORDS: usize = 4;

/// Default number of surnames kept in a key
pub const DEFAULT_MAX_SURNAMES: usize = 3;

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// Comparison key derived from a record; never stored on the record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    pub title: String,
    pub surnames: Vec<String>,
    pub year: Option<i32>,
}

impl NormalizedKey {
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }
}

/// Builds `NormalizedKey`s with configurable subtitle and surname limits
#[derive(Debug, Clone)]
pub struct Normalizer {
    subtitle_min_prefix_words: usize,
    max_surnames: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SUBTITLE_MIN_PREFIX_WORDS, DEFAULT_MAX_SURNAMES)
    }
}

impl Normalizer {
    pub fn new(subtitle_min_prefix_words: usize, max_surnames: usize) -> Self {
        Self {
            subtitle_min_prefix_words,
            max_surnames,
        }
    }

    /// Derive the comparison key for a record
    pub fn key(&self, record: &RawRecord) -> NormalizedKey {
        NormalizedKey {
            title: record
                .title
                .as_deref()
                .map(|t| self.normalize_title(t))
                .unwrap_or_default(),
            surnames: self.surnames(&record.authors),
            year: record.publication_date.map(|d| d.year()),
        }
    }

    /// Lowercase, drop a subtitle, strip punctuation and collapse whitespace
    pub fn normalize_title(&self, title: &str) -> String {
        let lowered = title.to_lowercase();
        strip_punctuation(self.strip_subtitle(&lowered))
    }

    /// First `max_surnames` distinct surnames, in author order
    pub fn surnames(&self, authors: &[String]) -> Vec<String> {
        let mut surnames: Vec<String> = Vec::with_capacity(self.max_surnames);
        for surname in authors.iter().filter_map(|a| extract_surname(a)) {
            if surnames.len() >= self.max_surnames {
                break;
            }
            if !surnames.contains(&surname) {
                surnames.push(surname);
            }
        }
        surnames
    }

    fn strip_subtitle<'a>(&self, title: &'a str) -> &'a str {
        subtitle_separators(title)
            .into_iter()
            .map(|idx| &title[..idx])
            .find(|prefix| word_count(prefix) >= self.subtitle_min_prefix_words)
            .unwrap_or(title)
    }
}

/// Byte offsets of candidate subtitle separators: any ':' or a dash with
/// whitespace on both sides
fn subtitle_separators(title: &str) -> Vec<usize> {
    let chars: Vec<(usize, char)> = title.char_indices().collect();
    let spaced = |pos: Option<usize>| {
        pos.and_then(|p| chars.get(p))
            .map_or(false, |(_, c)| c.is_whitespace())
    };

    chars
        .iter()
        .enumerate()
        .filter(|(pos, (_, c))| match c {
            ':' => true,
            '-' | '\u{2013}' | '\u{2014}' => spaced(pos.checked_sub(1)) && spaced(Some(pos + 1)),
            _ => false,
        })
        .map(|(_, (idx, _))| *idx)
        .collect()
}

fn word_count(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .count()
}

fn strip_punctuation(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Surname of one author string, lowercased and reduced to alphanumerics
///
/// "Smith, John" → smith; "John Smith" → smith; "Smith JA" → smith.
/// Multi-word surnames before a comma keep their last word so that
/// "van der Berg, J" and "Jan van der Berg" agree.
pub fn extract_surname(author: &str) -> Option<String> {
    let author = author.trim();
    let raw = match author.split_once(',') {
        Some((before, _)) => before.split_whitespace().last()?,
        None => {
            let tokens: Vec<&str> = author.split_whitespace().collect();
            match tokens.as_slice() {
                [] => return None,
                [first, .., last] if looks_like_initials(last) => *first,
                [.., last] => *last,
            }
        }
    };

    let surname: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    (!surname.is_empty()).then_some(surname)
}

fn looks_like_initials(token: &str) -> bool {
    let letters: Vec<char> = token.chars().filter(|c| *c != '.').collect();
    !letters.is_empty() && letters.len() <= 3 && letters.iter().all(|c| c.is_uppercase())
}

// ============================================================================
// Identifiers
// ============================================================================

/// Lowercase and strip resolver/`doi:` prefixes
pub fn normalize_doi(doi: &str) -> Option<String> {
    let mut value = doi.trim().to_lowercase();
    for prefix in DOI_PREFIXES {
        if let Some(rest) = value.strip_prefix(prefix) {
            value = rest.trim().to_string();
            break;
        }
    }
    (!value.is_empty()).then_some(value)
}

pub fn normalize_pmid(pmid: &str) -> Option<String> {
    let value = pmid.trim();
    let value = value
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("pmid:"))
        .map_or(value, |_| value[5..].trim());
    (!value.is_empty()).then(|| value.to_string())
}

/// PMCID comparison key: uppercase, `PMC` prefix removed
pub fn normalize_pmcid(pmcid: &str) -> Option<String> {
    let upper = pmcid.trim().to_uppercase();
    let value = upper.strip_prefix("PMC").unwrap_or(&upper).trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Canonical PMCID display form, `PMC<id>`
pub fn display_pmcid(pmcid: &str) -> Option<String> {
    normalize_pmcid(pmcid).map(|id| format!("PMC{}", id))
}

/// ISSN comparison key: uppercase without hyphens or whitespace
pub fn normalize_issn(issn: &str) -> Option<String> {
    let value: String = issn
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect();
    (!value.is_empty()).then_some(value)
}

// ============================================================================
// Dates
// ============================================================================

const DAY_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parse the date spellings sources use; month precision maps to the 1st
pub fn parse_publication_date(value: &str) -> Option<PublicationDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    // ISO timestamps ("2023-04-05T00:00:00Z") carry the date in the first 10 bytes
    let candidates = [Some(value), value.get(..10)];
    for candidate in candidates.into_iter().flatten() {
        for format in DAY_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return Some(PublicationDate::Day(date));
            }
        }
    }

    for separator in ['-', '/'] {
        if let Some((year, month)) = value.split_once(separator) {
            if year.len() == 4 {
                if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) {
                        return Some(PublicationDate::Day(date));
                    }
                }
            }
        }
    }

    embedded_year(value).map(PublicationDate::Year)
}

/// First run of exactly four ASCII digits that looks like a year
fn embedded_year(value: &str) -> Option<i32> {
    value
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| run.len() == 4)
        .filter_map(|run| run.parse::<i32>().ok())
        .find(|year| (1000..=2999).contains(year))
}

// ============================================================================
// Phrase matching (classifiers)
// ============================================================================

/// Word-boundary form for phrase matching: lowercase words separated and
/// surrounded by single spaces, punctuation treated as a word break
///
/// "Double-blind, placebo-controlled" → " double blind placebo controlled "
pub fn phrase_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}
