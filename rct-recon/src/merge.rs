// Merge Engine: collapse one cluster into one merged record
//
// Concept: Authority-ordered field selection with data-quality notes
// Synchronization: Accepts a Cluster + the resolver's record slice, outputs MergedRecord
//
// Algorithm:
// 1. Order members by source authority (unknown sources last, then by name,
//    then by record content) so the result never depends on input order
// 2. Scalar text fields: first non-empty value in authority order
// 3. Identifiers: first value in authority order; other distinct values → note
// 4. Sets (MeSH, keywords, fields of study, publication types): case-insensitive union
// 5. Authors: longest list; note when lengths (empty lists included) differ by more than the tolerance
// 6. Date: earliest; note when dates differ by more than the drift window
// 7. Snapshot every member's raw fields for provenance

use crate::config::{MergeConfig, ReconciliationConfig, DEFAULT_SOURCE_AUTHORITY};
use crate::normalizer::{display_pmcid, normalize_doi, normalize_issn, normalize_pmid};
use crate::types::{
    Cluster, MatchBasis, MergedIdentifiers, MergedRecord, PublicationDate, RawRecord, SourceSnapshot,
};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Ranked source names, most authoritative first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAuthority {
    order: Vec<String>,
}

impl Default for SourceAuthority {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_AUTHORITY)
    }
}

impl SourceAuthority {
    pub fn new<S: AsRef<str>>(order: impl IntoIterator<Item = S>) -> Self {
        let mut ranked: Vec<String> = Vec::new();
        for name in order {
            let name = name.as_ref().trim().to_lowercase();
            if !name.is_empty() && !ranked.contains(&name) {
                ranked.push(name);
            }
        }
        Self { order: ranked }
    }

    /// Position in the ranking; unknown sources share the lowest rank
    pub fn rank(&self, source: &str) -> usize {
        let source = source.trim().to_lowercase();
        self.order
            .iter()
            .position(|s| *s == source)
            .unwrap_or(self.order.len())
    }

    /// Rank first, source name as the tie-break
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.rank(a).cmp(&self.rank(b)).then_with(|| a.cmp(b))
    }
}

/// Merge engine (cluster → merged record)
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    authority: SourceAuthority,
    config: MergeConfig,
}

impl MergeEngine {
    pub fn new(authority: SourceAuthority, config: MergeConfig) -> Self {
        Self { authority, config }
    }

    pub fn from_config(config: &ReconciliationConfig) -> Self {
        Self::new(
            SourceAuthority::new(&config.source_authority),
            config.merge.clone(),
        )
    }

    /// Merge the records a cluster points at
    pub fn merge<R: Borrow<RawRecord>>(&self, cluster: &Cluster, records: &[R]) -> MergedRecord {
        let members: Vec<&RawRecord> = cluster.members.iter().map(|&i| records[i].borrow()).collect();
        self.merge_members(members, cluster.basis.clone())
    }

    /// Merge an explicit member list; panics on an empty list
    pub fn merge_members(&self, mut members: Vec<&RawRecord>, basis: BTreeSet<MatchBasis>) -> MergedRecord {
        assert!(!members.is_empty(), "cannot merge an empty cluster");
        members.sort_by(|a, b| self.authority.compare(&a.source, &b.source).then_with(|| a.cmp(b)));

        let mut notes = Vec::new();
        let mut sources_found_in: Vec<String> = Vec::new();
        for member in &members {
            if !sources_found_in.contains(&member.source) {
                sources_found_in.push(member.source.clone());
            }
        }

        let ids = self.merge_identifiers(&members, &mut notes);
        let authors = self.merge_authors(&members, &mut notes);
        let publication_date = self.merge_dates(&members, &mut notes);
        let issn = first_text(&members, |r| r.issn.as_deref());
        check_issn(&members, &mut notes);

        let merged = MergedRecord {
            source_primary: members[0].source.clone(),
            sources_found_in,
            ids,
            title: first_text(&members, |r| r.title.as_deref()),
            authors,
            journal: first_text(&members, |r| r.journal.as_deref()),
            issn,
            publication_year: publication_date.map(|d| d.year()),
            publication_date,
            abstract_text: first_text(&members, |r| r.abstract_text.as_deref()),
            mesh_terms: union_terms(members.iter().flat_map(|r| &r.mesh_terms)),
            keywords: union_terms(members.iter().flat_map(|r| &r.keywords)),
            fields_of_study: union_terms(members.iter().flat_map(|r| &r.fields_of_study)),
            publication_types: union_terms(members.iter().flat_map(|r| &r.publication_types)),
            language: first_text(&members, |r| r.language.as_deref()),
            url: first_text(&members, |r| r.url.as_deref()),
            publisher: first_text(&members, |r| r.publisher.as_deref()),
            is_preprint: members.iter().all(|r| r.is_preprint),
            data_quality_notes: notes,
            merge_basis: basis,
            provenance: members.iter().map(|r| SourceSnapshot::of(r)).collect(),
        };

        debug!(
            "Merged {} record(s) from [{}] -> primary={}, {} quality note(s)",
            members.len(),
            merged.sources_found_in.join(", "),
            merged.source_primary,
            merged.data_quality_notes.len()
        );
        merged
    }

    fn merge_identifiers(&self, members: &[&RawRecord], notes: &mut Vec<String>) -> MergedIdentifiers {
        let mut source_ids: BTreeMap<String, String> = BTreeMap::new();
        let mut conflicts: Vec<(&str, &str)> = Vec::new();
        for member in members {
            let Some(native) = member.ids.source_native.as_deref().map(str::trim) else {
                continue;
            };
            if native.is_empty() {
                continue;
            }
            match source_ids.get(&member.source) {
                Some(existing) if existing != native => {
                    let entry = (member.source.as_str(), native);
                    if !conflicts.contains(&entry) {
                        conflicts.push(entry);
                        notes.push(format!(
                            "source id conflict: {} reports both '{}' and '{}'",
                            member.source, existing, native
                        ));
                    }
                }
                Some(_) => {}
                None => {
                    source_ids.insert(member.source.clone(), native.to_string());
                }
            }
        }

        MergedIdentifiers {
            doi: pick_identifier("doi", members, notes, |r| r.ids.doi.as_deref().and_then(normalize_doi)),
            pmid: pick_identifier("pmid", members, notes, |r| r.ids.pmid.as_deref().and_then(normalize_pmid)),
            pmcid: pick_identifier("pmcid", members, notes, |r| r.ids.pmcid.as_deref().and_then(display_pmcid)),
            source_ids,
        }
    }

    fn merge_authors(&self, members: &[&RawRecord], notes: &mut Vec<String>) -> Vec<String> {
        let mut best = members[0];
        for &member in &members[1..] {
            if member.authors.len() > best.authors.len() {
                best = member;
            }
        }

        // A source reporting no authors counts as length 0
        let shortest = members.iter().map(|r| r.authors.len()).min().unwrap_or(0);
        if best.authors.len() - shortest > self.config.author_count_tolerance {
            let counts: Vec<String> = members
                .iter()
                .map(|r| format!("{}={}", r.source, r.authors.len()))
                .collect();
            notes.push(format!(
                "author list length disagreement: {} (kept {} from {})",
                counts.join(", "),
                best.authors.len(),
                best.source
            ));
        }
        best.authors.clone()
    }

    fn merge_dates(&self, members: &[&RawRecord], notes: &mut Vec<String>) -> Option<PublicationDate> {
        let dated: Vec<(&str, PublicationDate)> = members
            .iter()
            .filter_map(|r| r.publication_date.map(|d| (r.source.as_str(), d)))
            .collect();

        // Earliest year; within it a full date beats a bare year
        let kept = dated.iter().map(|(_, d)| *d).min_by_key(|d| match d {
            PublicationDate::Day(day) => (d.year(), false, Some(*day)),
            PublicationDate::Year(year) => (*year, true, None),
        })?;

        let disagree = dated
            .iter()
            .any(|(_, a)| dated.iter().any(|(_, b)| self.dates_disagree(*a, *b)));
        if disagree {
            let reported: Vec<String> = dated.iter().map(|(s, d)| format!("{}={}", s, d)).collect();
            notes.push(format!(
                "publication date disagreement beyond {} days: {} (kept {})",
                self.config.date_drift_days,
                reported.join(", "),
                kept
            ));
        }
        Some(kept)
    }

    fn dates_disagree(&self, a: PublicationDate, b: PublicationDate) -> bool {
        match (a, b) {
            (PublicationDate::Day(x), PublicationDate::Day(y)) => {
                (x - y).num_days().abs() > self.config.date_drift_days
            }
            _ => a.year() != b.year(),
        }
    }
}

/// First value in authority order; every other distinct value becomes a note
fn pick_identifier(
    kind: &str,
    members: &[&RawRecord],
    notes: &mut Vec<String>,
    extract: impl Fn(&RawRecord) -> Option<String>,
) -> Option<String> {
    let mut kept: Option<(String, &str)> = None;
    let mut conflicts: Vec<(String, &str)> = Vec::new();

    for &member in members {
        let Some(value) = extract(member) else {
            continue;
        };
        match kept.as_ref().map(|(k, _)| *k == value) {
            None => kept = Some((value, member.source.as_str())),
            Some(true) => {}
            Some(false) => {
                let entry = (value, member.source.as_str());
                if !conflicts.contains(&entry) {
                    conflicts.push(entry);
                }
            }
        }
    }

    let (value, kept_from) = kept?;
    for (other, source) in conflicts {
        warn!("{} conflict: {} reports '{}', keeping '{}' from {}", kind, source, other, value, kept_from);
        notes.push(format!(
            "{} conflict: '{}' from {} differs from kept '{}' ({})",
            kind, other, source, value, kept_from
        ));
    }
    Some(value)
}

fn first_text(members: &[&RawRecord], field: impl Fn(&RawRecord) -> Option<&str>) -> Option<String> {
    members
        .iter()
        .filter_map(|&r| field(r).map(str::trim))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn check_issn(members: &[&RawRecord], notes: &mut Vec<String>) {
    let reported: Vec<(&str, &str, String)> = members
        .iter()
        .filter_map(|r| {
            let raw = r.issn.as_deref()?.trim();
            normalize_issn(raw).map(|key| (r.source.as_str(), raw, key))
        })
        .collect();
    let distinct: BTreeSet<&String> = reported.iter().map(|(_, _, key)| key).collect();
    if distinct.len() > 1 {
        let listed: Vec<String> = reported.iter().map(|(s, raw, _)| format!("{}={}", s, raw)).collect();
        notes.push(format!("issn disagreement: {}", listed.join(", ")));
    }
}

/// Case-insensitive union; first-seen spelling kept, sorted by lowercase form
fn union_terms<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for value in values {
        let term = value.trim();
        if !term.is_empty() {
            seen.entry(term.to_lowercase()).or_insert_with(|| term.to_string());
        }
    }
    seen.into_values().collect()
}
