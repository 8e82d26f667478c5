use crate::catalog::{Catalog, MovieRecord};
use crate::error::LoadError;
use crate::model::TfIdfModel;
use crate::query::Snapshot;
use crate::tokenizer::TokenizerConfig;
use crate::vectorizer::{DocumentVector, Vectorizer};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

type Result<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub catalog_checksum: String,
}

/// Persisted TF-IDF model. Terms are listed in index order, so position is the
/// term id.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelFile {
    pub version: u32,
    pub tokenizer: TokenizerConfig,
    pub terms: Vec<String>,
    pub df: Vec<u32>,
    pub idf: Vec<f32>,
    pub num_docs: u64,
    pub documents: Vec<DocumentVector>,
    pub catalog_checksum: String,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn catalog(&self) -> PathBuf { self.root.join("catalog.bin") }
    fn model(&self) -> PathBuf { self.root.join("model.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn write_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(value)?;
    f.write_all(&bytes)?;
    Ok(())
}

fn read_bin<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_catalog(paths: &IndexPaths, catalog: &Catalog) -> Result<()> {
    create_dir_all(&paths.root)?;
    let rows: Vec<&MovieRecord> = catalog.records().collect();
    write_bin(&paths.catalog(), &rows)
}

pub fn load_catalog(paths: &IndexPaths) -> Result<Catalog> {
    let rows: Vec<MovieRecord> = read_bin(&paths.catalog())?;
    Ok(Catalog::build(rows))
}

pub fn model_file(model: &TfIdfModel, catalog_checksum: &str) -> ModelFile {
    ModelFile {
        version: FORMAT_VERSION,
        tokenizer: model.tokenizer.clone(),
        terms: model.vocabulary.terms().to_vec(),
        df: model.vocabulary.dfs().to_vec(),
        idf: model.vectorizer.idf().to_vec(),
        num_docs: model.vectorizer.num_docs() as u64,
        documents: model.index.vectors().to_vec(),
        catalog_checksum: catalog_checksum.to_string(),
    }
}

pub fn save_model(paths: &IndexPaths, model: &TfIdfModel, catalog_checksum: &str) -> Result<()> {
    create_dir_all(&paths.root)?;
    write_bin(&paths.model(), &model_file(model, catalog_checksum))
}

/// Load the model and bind it to `catalog`. The model must have been built
/// from a catalog with the same title column in the same order.
pub fn load_model(paths: &IndexPaths, catalog: &Catalog) -> Result<TfIdfModel> {
    let file: ModelFile = read_bin(&paths.model())?;
    if file.version != FORMAT_VERSION {
        return Err(LoadError::Version { found: file.version, expected: FORMAT_VERSION });
    }
    if file.catalog_checksum != catalog.checksum() {
        return Err(LoadError::ChecksumMismatch {
            expected: file.catalog_checksum,
            actual: catalog.checksum().to_string(),
        });
    }
    if file.documents.len() != catalog.len() {
        return Err(LoadError::Shape { vectors: file.documents.len(), records: catalog.len() });
    }
    let vocabulary = Vocabulary::from_terms(file.terms, file.df);
    let vectorizer = Vectorizer::from_idf(file.idf, file.num_docs as usize);
    let titles = catalog.movies().iter().map(|m| m.title().to_string()).collect();
    Ok(TfIdfModel::from_parts(file.tokenizer, vocabulary, vectorizer, file.documents, titles))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write catalog, model and meta for a freshly built snapshot.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<()> {
    let checksum = snapshot.catalog.checksum();
    save_catalog(paths, &snapshot.catalog)?;
    save_model(paths, &snapshot.model, checksum)?;
    let meta = MetaFile {
        num_docs: snapshot.catalog.len() as u32,
        num_terms: snapshot.model.vocabulary.len() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        catalog_checksum: checksum.to_string(),
    };
    save_meta(paths, &meta)
}

/// Load a complete snapshot off to the side; nothing is published here.
pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let catalog = load_catalog(paths)?;
    let model = load_model(paths, &catalog)?;
    tracing::info!(root = %paths.root.display(), records = catalog.len(), "snapshot loaded");
    Snapshot::from_parts(catalog, model)
}
