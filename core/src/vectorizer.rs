use crate::vocabulary::Vocabulary;
use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unit-length sparse TF-IDF vector of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentVector {
    /// (term id, normalized weight), sorted by term id
    pub entries: Vec<(TermId, f32)>,
    /// L2 norm of the raw weights before normalization; 0 for an empty title
    pub norm: f32,
}

impl DocumentVector {
    pub fn is_zero(&self) -> bool { self.entries.is_empty() }

    /// Merge-join dot product over the sorted entries.
    pub fn dot(&self, other: &DocumentVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f32;
        while i < self.entries.len() && j < other.entries.len() {
            let (ta, wa) = self.entries[i];
            let (tb, wb) = other.entries[j];
            if ta == tb {
                acc += wa * wb;
                i += 1;
                j += 1;
            } else if ta < tb {
                i += 1;
            } else {
                j += 1;
            }
        }
        acc
    }
}

/// Smoothed IDF weights for a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vectorizer {
    idf: Vec<f32>,
    num_docs: usize,
}

impl Vectorizer {
    /// idf(t) = ln(N / df(t)) + 1
    pub fn fit(vocab: &Vocabulary, num_docs: usize) -> Self {
        let n = num_docs.max(1) as f32;
        let idf = vocab
            .dfs()
            .iter()
            .map(|&df| (n / df.max(1) as f32).ln() + 1.0)
            .collect();
        Self { idf, num_docs }
    }

    pub fn from_idf(idf: Vec<f32>, num_docs: usize) -> Self { Self { idf, num_docs } }

    pub fn idf(&self) -> &[f32] { &self.idf }

    pub fn num_docs(&self) -> usize { self.num_docs }

    /// Turn a document's term ids (with repeats) into its normalized vector.
    /// Ids outside the vocabulary are ignored.
    pub fn vectorize(&self, term_ids: &[TermId]) -> DocumentVector {
        let mut tf: BTreeMap<TermId, u32> = BTreeMap::new();
        for &tid in term_ids {
            if (tid as usize) < self.idf.len() {
                *tf.entry(tid).or_insert(0) += 1;
            }
        }
        let mut entries: Vec<(TermId, f32)> = tf
            .into_iter()
            .map(|(tid, count)| (tid, count as f32 * self.idf[tid as usize]))
            .collect();
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm == 0.0 {
            return DocumentVector::default();
        }
        for (_, w) in entries.iter_mut() {
            *w /= norm;
        }
        DocumentVector { entries, norm }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyBuilder;

    fn s(v: &[&str]) -> Vec<String> { v.iter().map(|t| t.to_string()).collect() }

    #[test]
    fn idf_is_smoothed_and_positive() {
        let mut b = VocabularyBuilder::new();
        b.add_document(&s(&["war"]));
        b.add_document(&s(&["war", "love"]));
        let vocab = b.finish();
        let v = Vectorizer::fit(&vocab, 2);
        assert!((v.idf()[0] - 1.0).abs() < 1e-6);
        assert!((v.idf()[1] - (2f32.ln() + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn vectors_are_unit_length() {
        let v = Vectorizer::from_idf(vec![1.0, 2.0, 3.0], 3);
        let doc = v.vectorize(&[0, 1, 1, 2]);
        let len: f32 = doc.entries.iter().map(|(_, w)| w * w).sum();
        assert!((len - 1.0).abs() < 1e-6);
        assert!((doc.dot(&doc) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_document_is_zero_vector() {
        let v = Vectorizer::from_idf(vec![1.0], 1);
        let doc = v.vectorize(&[]);
        assert!(doc.is_zero());
        assert_eq!(doc.norm, 0.0);
        assert_eq!(doc.dot(&v.vectorize(&[0])), 0.0);
    }
}
