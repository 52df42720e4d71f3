pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod indexing;
pub mod models;
pub mod search;
pub mod similarity;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod testing;

pub use chunking::{
    fixed_size_chunks, paragraph_based_chunks, sentence_based_chunks, ChunkingOptions,
    ChunkingPlan,
};
pub use config::{EmbeddingProvider, EmbeddingSettings, IndexingOptions, Settings, StoreSettings};
pub use embeddings::{
    build_embedder, CharacterNgramEmbedder, Embedder, GeminiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{
    ConfigurationError, EmbeddingError, ExtractionError, PipelineError, StoreError,
};
pub use extractor::{DocumentExtractor, DocumentFormat, FileExtractor};
pub use indexing::{IndexingEvent, IndexingPipeline};
pub use models::{
    Chunk, ChunkSummary, EmbeddingIntent, IndexingReport, NewChunk, SearchResult, SplitStrategy,
};
pub use search::{SearchPipeline, DEFAULT_TOP_K};
pub use similarity::{cosine_similarity, rank};
pub use stores::{InMemoryChunkStore, PostgresChunkStore};
pub use traits::ChunkStore;
