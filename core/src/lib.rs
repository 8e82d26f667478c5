//! Movie catalog with TF-IDF title similarity.
//!
//! Build a [`query::Snapshot`] once from loader records, wrap it in a
//! [`query::QueryService`] and query it from any number of threads.

pub mod catalog;
pub mod error;
pub mod loader;
pub mod model;
pub mod persist;
pub mod query;
pub mod similarity;
pub mod tokenizer;
pub mod vectorizer;
pub mod vocabulary;

pub type TermId = u32;
pub type DocId = u32;

pub use catalog::{Catalog, CrewMember, MatchPolicy, MovieRecord};
pub use error::{LoadError, QueryError};
pub use model::TfIdfModel;
pub use query::{QueryConfig, QueryService, Snapshot, TitleResolution};
pub use similarity::{CancelToken, Neighbor, SimilarityIndex};
pub use tokenizer::TokenizerConfig;
