use thiserror::Error;

/// Errors returned by queries against a snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("invalid {param}: {value}")]
    InvalidParameter { param: &'static str, value: String },

    #[error("{0}")]
    PolicyNotMet(String),

    #[error("document index {index} out of range (corpus size {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("query cancelled")]
    Cancelled,

    #[error("load failure: {0}")]
    LoadFailure(String),
}

impl QueryError {
    /// Short stable name used by transports.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::NotFound { .. } => "not_found",
            QueryError::InvalidParameter { .. } => "invalid_parameter",
            QueryError::PolicyNotMet(_) => "policy_not_met",
            QueryError::IndexOutOfRange { .. } => "index_out_of_range",
            QueryError::Cancelled => "cancelled",
            QueryError::LoadFailure(_) => "load_failure",
        }
    }
}

/// Errors raised while building or loading a snapshot.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("catalog checksum mismatch: model built for {expected}, catalog is {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("model has {vectors} document vectors but catalog has {records} records")]
    Shape { vectors: usize, records: usize },

    #[error("no input: {0}")]
    NoInput(String),
}

impl From<LoadError> for QueryError {
    fn from(e: LoadError) -> Self {
        QueryError::LoadFailure(e.to_string())
    }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;
