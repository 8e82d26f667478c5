use crate::similarity::SimilarityIndex;
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use crate::vectorizer::{DocumentVector, Vectorizer};
use crate::vocabulary::{Vocabulary, VocabularyBuilder};

/// Vocabulary, IDF weights and the similarity index built from one corpus of
/// titles.
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    pub tokenizer: TokenizerConfig,
    pub vocabulary: Vocabulary,
    pub vectorizer: Vectorizer,
    pub index: SimilarityIndex,
}

impl TfIdfModel {
    /// Tokenize -> vocabulary -> vectors, in corpus order.
    pub fn build<'a, I>(titles: I, config: TokenizerConfig) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let tokenizer = Tokenizer::new(config.clone());
        let mut builder = VocabularyBuilder::new();
        let mut doc_terms: Vec<Vec<u32>> = Vec::new();
        let mut dedup_keys: Vec<String> = Vec::new();
        for title in titles {
            let terms = tokenizer.terms(title);
            doc_terms.push(builder.add_document(&terms));
            dedup_keys.push(title.unwrap_or_default().to_string());
        }
        let num_docs = builder.num_docs();
        let vocabulary = builder.finish();
        let vectorizer = Vectorizer::fit(&vocabulary, num_docs);
        let vectors: Vec<DocumentVector> = doc_terms.iter().map(|ids| vectorizer.vectorize(ids)).collect();
        tracing::info!(num_docs, num_terms = vocabulary.len(), "tf-idf model built");
        let index = SimilarityIndex::new(vectors, dedup_keys, vocabulary.len());
        Self { tokenizer: config, vocabulary, vectorizer, index }
    }

    /// Reassemble a model from persisted parts.
    pub fn from_parts(
        tokenizer: TokenizerConfig,
        vocabulary: Vocabulary,
        vectorizer: Vectorizer,
        vectors: Vec<DocumentVector>,
        titles: Vec<String>,
    ) -> Self {
        let index = SimilarityIndex::new(vectors, titles, vocabulary.len());
        Self { tokenizer, vocabulary, vectorizer, index }
    }

    pub fn num_docs(&self) -> usize { self.index.len() }
}
