use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("invalid split strategy: {0} (expected fixed_size, sentence or paragraph)")]
    InvalidStrategy(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("invalid setting {name}: {details}")]
    InvalidSetting { name: &'static str, details: String },

    #[error("query is empty")]
    EmptyQuery,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported file type: {0}. Only PDF and DOCX are supported")]
    UnsupportedFormat(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error reading PDF file: {0}")]
    PdfParse(String),

    #[error("error reading DOCX file: {0}")]
    DocxParse(String),

    #[error("document has no readable text: {0}")]
    EmptyDocument(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding provider returned {status}: {details}")]
    Provider { status: u16, details: String },

    #[error("embedding provider returned an empty vector")]
    EmptyVector,

    #[error("embedding dimension {actual} does not match configured {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("malformed row {id}: {details}")]
    MalformedRow { id: i64, details: String },

    #[error("store not available: {0}")]
    Unavailable(String),
}

/// Any failure surfaced by the indexing or search pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("error creating embedding: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
