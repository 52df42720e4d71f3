use crate::chunking::ChunkingPlan;
use crate::config::IndexingOptions;
use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, ExtractionError, PipelineError};
use crate::extractor::DocumentExtractor;
use crate::models::{EmbeddingIntent, IndexingReport, NewChunk};
use crate::traits::ChunkStore;
use std::path::Path;
use tracing::{debug, info};

/// Progress reported while a document is being indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingEvent {
    Extracted { characters: usize },
    Chunked { count: usize },
    Embedded { done: usize, total: usize },
    Stored { count: usize },
}

/// Extract, chunk, embed every chunk, then swap the stored chunk set.
///
/// Extraction and chunking finish before the first embedding call, and the
/// store is untouched until every chunk has its embedding. A failure at any
/// step leaves the previously stored chunks in place.
pub struct IndexingPipeline<E, S, X> {
    embedder: E,
    store: S,
    extractor: X,
    options: IndexingOptions,
}

impl<E, S, X> IndexingPipeline<E, S, X>
where
    E: Embedder,
    S: ChunkStore,
    X: DocumentExtractor,
{
    pub fn new(embedder: E, store: S, extractor: X, options: IndexingOptions) -> Self {
        Self {
            embedder,
            store,
            extractor,
            options,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub async fn index_file(
        &self,
        path: &Path,
        plan: &ChunkingPlan,
    ) -> Result<IndexingReport, PipelineError> {
        self.index_file_with_progress(path, plan, |_| {}).await
    }

    pub async fn index_file_with_progress<F>(
        &self,
        path: &Path,
        plan: &ChunkingPlan,
        mut on_event: F,
    ) -> Result<IndexingReport, PipelineError>
    where
        F: FnMut(IndexingEvent) + Send,
    {
        let source_name = source_name(path)?;
        let strategy = plan.strategy();

        let text = self.extractor.extract(path)?;
        let characters = text.chars().count();
        on_event(IndexingEvent::Extracted { characters });
        info!(source = %source_name, characters, "extracted document text");

        let pieces = plan.split(&text)?;
        let total = pieces.len();
        on_event(IndexingEvent::Chunked { count: total });
        info!(source = %source_name, %strategy, chunk_count = total, "split document");

        let mut chunks = Vec::with_capacity(total);
        for (index, piece) in pieces.into_iter().enumerate() {
            if index > 0 && !self.options.embed_delay.is_zero() {
                tokio::time::sleep(self.options.embed_delay).await;
            }

            let embedding = self.embedder.embed(&piece, EmbeddingIntent::Document).await?;
            if embedding.len() != self.embedder.dimensions() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.embedder.dimensions(),
                    actual: embedding.len(),
                }
                .into());
            }
            debug!(chunk = index + 1, total, dimensions = embedding.len(), "embedded chunk");
            on_event(IndexingEvent::Embedded {
                done: index + 1,
                total,
            });

            chunks.push(NewChunk {
                text: piece,
                embedding,
                source_name: source_name.clone(),
                strategy,
            });
        }

        self.store.ensure_schema().await?;
        self.store.replace_all(&chunks).await?;
        on_event(IndexingEvent::Stored {
            count: chunks.len(),
        });
        info!(source = %source_name, chunk_count = chunks.len(), "replaced stored chunks");

        Ok(IndexingReport {
            source_name,
            strategy,
            characters,
            chunk_count: chunks.len(),
        })
    }
}

fn source_name(path: &Path) -> Result<String, ExtractionError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| ExtractionError::MissingFileName(path.display().to_string()))
}
