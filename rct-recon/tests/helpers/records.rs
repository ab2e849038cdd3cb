//! Builders for raw test records

use rct_recon::normalizer::parse_publication_date;
use rct_recon::RawRecord;

pub struct RecordBuilder(RawRecord);

impl RecordBuilder {
    pub fn new(source: &str) -> Self {
        Self(RawRecord::new(source))
    }

    pub fn title(mut self, title: &str) -> Self {
        self.0.title = Some(title.to_string());
        self
    }

    pub fn authors(mut self, authors: &[&str]) -> Self {
        self.0.authors = authors.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn date(mut self, date: &str) -> Self {
        self.0.publication_date = parse_publication_date(date);
        self
    }

    pub fn doi(mut self, doi: &str) -> Self {
        self.0.ids.doi = Some(doi.to_string());
        self
    }

    pub fn pmid(mut self, pmid: &str) -> Self {
        self.0.ids.pmid = Some(pmid.to_string());
        self
    }

    pub fn pmcid(mut self, pmcid: &str) -> Self {
        self.0.ids.pmcid = Some(pmcid.to_string());
        self
    }

    pub fn native_id(mut self, id: &str) -> Self {
        self.0.ids.source_native = Some(id.to_string());
        self
    }

    pub fn journal(mut self, journal: &str) -> Self {
        self.0.journal = Some(journal.to_string());
        self
    }

    pub fn abstract_text(mut self, text: &str) -> Self {
        self.0.abstract_text = Some(text.to_string());
        self
    }

    pub fn publication_types(mut self, types: &[&str]) -> Self {
        self.0.publication_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn mesh(mut self, terms: &[&str]) -> Self {
        self.0.mesh_terms = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn preprint(mut self) -> Self {
        self.0.is_preprint = true;
        self
    }

    pub fn build(self) -> RawRecord {
        self.0
    }
}
