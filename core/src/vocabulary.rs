use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Fixed term dictionary with per-term document frequency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    dictionary: HashMap<String, TermId>,
    terms: Vec<String>,
    df: Vec<u32>,
}

impl Vocabulary {
    /// Rebuild from terms listed in index order, e.g. when loading a snapshot.
    pub fn from_terms(terms: Vec<String>, df: Vec<u32>) -> Self {
        let dictionary = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as TermId))
            .collect();
        Self { dictionary, terms, df }
    }

    pub fn get(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    pub fn term(&self, id: TermId) -> Option<&str> { self.terms.get(id as usize).map(String::as_str) }

    pub fn df(&self, id: TermId) -> u32 { self.df.get(id as usize).copied().unwrap_or(0) }

    pub fn terms(&self) -> &[String] { &self.terms }

    pub fn dfs(&self) -> &[u32] { &self.df }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// Single pass over the corpus. Ids are handed out in first-seen order so the
/// same ordered corpus always yields the same vocabulary.
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    vocab: Vocabulary,
    num_docs: usize,
}

impl VocabularyBuilder {
    pub fn new() -> Self { Self::default() }

    /// Register one document's terms and return their ids in the same order.
    pub fn add_document(&mut self, terms: &[String]) -> Vec<TermId> {
        self.num_docs += 1;
        let mut seen_in_doc: HashSet<TermId> = HashSet::new();
        let mut ids = Vec::with_capacity(terms.len());
        for term in terms {
            let tid = match self.vocab.dictionary.get(term) {
                Some(&tid) => tid,
                None => {
                    let tid = self.vocab.terms.len() as TermId;
                    self.vocab.dictionary.insert(term.clone(), tid);
                    self.vocab.terms.push(term.clone());
                    self.vocab.df.push(0);
                    tid
                }
            };
            if seen_in_doc.insert(tid) {
                self.vocab.df[tid as usize] += 1;
            }
            ids.push(tid);
        }
        ids
    }

    pub fn num_docs(&self) -> usize { self.num_docs }

    pub fn finish(self) -> Vocabulary { self.vocab }
}
