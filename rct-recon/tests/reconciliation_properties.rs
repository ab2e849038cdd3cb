//! Property tests over a seeded synthetic corpus
//!
//! Each publication appears in 1-3 sources with realistic drift (title case,
//! subtitles, author formats, preprint year). Properties checked:
//! - Clusters partition the input
//! - Cluster contents do not depend on input order
//! - Canonical output is byte-identical across permutations
//! - Records sharing a DOI, in any spelling, always end up together

mod helpers;

use helpers::RecordBuilder;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rct_recon::normalizer::normalize_doi;
use rct_recon::{RawRecord, Reconciler};
use std::collections::{BTreeMap, BTreeSet};

const SOURCES: [&str; 6] = ["pubmed", "europepmc", "semanticscholar", "openalex", "crossref", "scopus"];

const WORDS: [&str; 40] = [
    "outcomes", "adults", "therapy", "dose", "response", "children", "insulin", "vitamin", "exercise",
    "sleep", "mortality", "infection", "vaccine", "surgery", "recovery", "anxiety", "cognitive",
    "elderly", "pregnancy", "obesity", "smoking", "cessation", "screening", "biomarker", "imaging",
    "kidney", "renal", "asthma", "pain", "opioid", "depression", "nutrition", "fracture", "bone",
    "diabetes", "sepsis", "antibiotic", "fatigue", "tumour", "wound",
];

const SURNAMES: [&str; 16] = [
    "Smith", "Garcia", "Nakamura", "Okafor", "Lindqvist", "Rossi", "Novak", "Haddad", "Chen",
    "Kowalski", "Moreau", "Silva", "Andersen", "Petrov", "Osei", "Tanaka",
];

struct Publication {
    title: String,
    authors: Vec<(&'static str, &'static str)>,
    year: i32,
    doi: Option<String>,
}

fn publication(rng: &mut StdRng, index: usize) -> Publication {
    let mut words: Vec<&str> = WORDS.choose_multiple(rng, 6).copied().collect();
    words.push(WORDS[index % WORDS.len()]);
    let mut title = words.join(" ");
    if let Some(first) = title.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    let authors = (0..rng.gen_range(1..=4))
        .map(|_| {
            let surname = *SURNAMES.choose(rng).unwrap_or(&"Smith");
            let given = *["Anna", "Ben", "Chidi", "Dana", "Emil"].choose(rng).unwrap_or(&"Anna");
            (given, surname)
        })
        .collect();
    Publication {
        title,
        authors,
        year: rng.gen_range(2012..=2024),
        doi: rng.gen_bool(0.6).then(|| format!("10.{}/trial.{}", 1000 + index % 7, index)),
    }
}

fn author_variant(rng: &mut StdRng, given: &str, surname: &str) -> String {
    match rng.gen_range(0..3) {
        0 => format!("{} {}", surname, &given[..1]),
        1 => format!("{} {}", given, surname),
        _ => format!("{}, {}", surname, given),
    }
}

fn variant(rng: &mut StdRng, publication: &Publication, source: &str, id: String) -> RawRecord {
    let title = match rng.gen_range(0..4) {
        0 => publication.title.clone(),
        1 => publication.title.to_uppercase(),
        2 => format!("{}: a randomised controlled trial", publication.title),
        _ => format!("{}.", publication.title),
    };
    let authors: Vec<String> = publication
        .authors
        .iter()
        .map(|(given, surname)| author_variant(rng, given, surname))
        .collect();
    let author_refs: Vec<&str> = authors.iter().map(String::as_str).collect();

    let preprint = source == "semanticscholar" && rng.gen_bool(0.5);
    let year = if preprint { publication.year - 1 } else { publication.year };

    let mut builder = RecordBuilder::new(source)
        .native_id(&id)
        .title(&title)
        .authors(&author_refs)
        .date(&year.to_string())
        .abstract_text(&format!("Abstract {} for {}", id, publication.title));
    if let Some(doi) = &publication.doi {
        builder = match rng.gen_range(0..3) {
            0 => builder.doi(doi),
            1 => builder.doi(&format!("https://doi.org/{}", doi.to_uppercase())),
            _ => builder,
        };
    }
    if preprint {
        builder = builder.preprint();
    }
    builder.build()
}

fn corpus(seed: u64) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut records = Vec::new();
    for index in 0..60 {
        let publication = publication(&mut rng, index);
        let copies = rng.gen_range(1..=3);
        for (copy, source) in SOURCES.choose_multiple(&mut rng, copies).enumerate() {
            let id = format!("{}-{}", index, copy);
            records.push(variant(&mut rng, &publication, source, id));
        }
    }
    for noise in 0..8 {
        let source = *SOURCES.choose(&mut rng).unwrap_or(&"scopus");
        let mut builder = RecordBuilder::new(source).native_id(&format!("noise-{}", noise));
        if rng.gen_bool(0.5) {
            builder = builder.title("  ");
        }
        records.push(builder.build());
    }
    records
}

fn record_id(record: &RawRecord) -> String {
    record.ids.source_native.clone().unwrap_or_default()
}

/// Clusters as sets of record ids, independent of input positions
fn cluster_ids(reconciler: &Reconciler, records: &[RawRecord]) -> BTreeSet<BTreeSet<String>> {
    reconciler
        .resolver()
        .resolve(records)
        .iter()
        .map(|cluster| cluster.members.iter().map(|&i| record_id(&records[i])).collect())
        .collect()
}

fn reconciler() -> Reconciler {
    Reconciler::with_defaults().expect("built-in configuration is valid")
}

#[test]
fn test_clusters_partition_input() {
    let reconciler = reconciler();
    for seed in [1, 7, 42] {
        let records = corpus(seed);
        let clusters = reconciler.resolver().resolve(&records);

        let mut seen = vec![0usize; records.len()];
        for cluster in &clusters {
            assert!(!cluster.members.is_empty());
            for &member in &cluster.members {
                seen[member] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1), "seed {}: every record in exactly one cluster", seed);
    }
}

#[test]
fn test_clusters_independent_of_input_order() {
    let reconciler = reconciler();
    let records = corpus(11);
    let baseline = cluster_ids(&reconciler, &records);

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..5 {
        let mut shuffled = records.clone();
        shuffled.shuffle(&mut rng);
        assert_eq!(cluster_ids(&reconciler, &shuffled), baseline);
    }
}

#[test]
fn test_canonical_output_identical_across_permutations() {
    let reconciler = reconciler();
    let records = corpus(23);
    let baseline = reconciler.reconcile_records(&records);
    let baseline_json = serde_json::to_string(&baseline).unwrap();

    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..5 {
        let mut shuffled = records.clone();
        shuffled.shuffle(&mut rng);
        let output = reconciler.reconcile_records(&shuffled);
        assert_eq!(output, baseline);
        assert_eq!(serde_json::to_string(&output).unwrap(), baseline_json);
    }
}

#[test]
fn test_shared_doi_always_clusters_together() {
    let reconciler = reconciler();
    let records = corpus(3);
    let clusters = reconciler.resolver().resolve(&records);

    let mut cluster_of = vec![0usize; records.len()];
    for (c, cluster) in clusters.iter().enumerate() {
        for &member in &cluster.members {
            cluster_of[member] = c;
        }
    }

    let mut by_doi: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
    for (i, record) in records.iter().enumerate() {
        if let Some(doi) = record.ids.doi.as_deref().and_then(normalize_doi) {
            by_doi.entry(doi).or_default().insert(cluster_of[i]);
        }
    }
    assert!(!by_doi.is_empty());
    for (doi, owners) in by_doi {
        assert_eq!(owners.len(), 1, "DOI {} split across clusters", doi);
    }
}

#[test]
fn test_doi_only_records_join_existing_output() {
    let reconciler = reconciler();
    let mut records = corpus(31);
    let first = reconciler.reconcile_records(&records);

    let dois: Vec<String> = first
        .records
        .iter()
        .filter_map(|r| r.merged.ids.doi.clone())
        .collect();
    assert!(!dois.is_empty());
    for (i, doi) in dois.iter().enumerate() {
        records.push(
            RecordBuilder::new("dimensions")
                .native_id(&format!("dim-{}", i))
                .doi(&format!("https://doi.org/{}", doi.to_uppercase()))
                .build(),
        );
    }

    let second = reconciler.reconcile_records(&records);
    assert_eq!(second.records.len(), first.records.len());
    for record in second.records.iter().filter(|r| r.merged.ids.doi.is_some()) {
        assert!(record.sources_found_in().iter().any(|s| s == "dimensions"));
    }
}
