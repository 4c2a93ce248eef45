use std::collections::HashSet;

use crate::collaborators::Retriever;
use crate::state::Document;
use crate::step::StepError;

/// Documents returned per query unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 4;

/// Keyword-overlap retriever over an in-memory corpus.
///
/// A document scores one point per distinct question term it contains.
/// Documents scoring zero are never returned; ties keep corpus order.
pub struct MemoryRetriever {
    documents: Vec<Document>,
    terms: Vec<HashSet<String>>,
    top_k: usize,
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

impl MemoryRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        let terms = documents.iter().map(|d| terms(&d.content)).collect();
        Self {
            documents,
            terms,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

impl Retriever for MemoryRetriever {
    fn retrieve(&self, question: &str) -> Result<Vec<Document>, StepError> {
        let query = terms(question);
        let mut scored: Vec<(usize, usize)> = self
            .terms
            .iter()
            .enumerate()
            .map(|(i, doc_terms)| (i, query.intersection(doc_terms).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(self.top_k)
            .map(|(i, _)| self.documents[i].clone())
            .collect())
    }
}
