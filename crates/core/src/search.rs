use crate::embeddings::Embedder;
use crate::error::{ConfigurationError, PipelineError};
use crate::models::{EmbeddingIntent, SearchResult};
use crate::similarity::rank;
use crate::traits::ChunkStore;
use tracing::info;

pub const DEFAULT_TOP_K: usize = 5;

/// Embeds the query, scans every stored chunk and returns the best matches.
pub struct SearchPipeline<E, S> {
    embedder: E,
    store: S,
}

impl<E, S> SearchPipeline<E, S>
where
    E: Embedder,
    S: ChunkStore,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, PipelineError> {
        if query.trim().is_empty() {
            return Err(ConfigurationError::EmptyQuery.into());
        }

        let query_vector = self.embedder.embed(query, EmbeddingIntent::Query).await?;

        self.store.ensure_schema().await?;
        let candidates = self.store.scan_all().await?;
        let scanned = candidates.len();

        let results = rank(&query_vector, candidates, top_k);
        info!(scanned, returned = results.len(), top_k, "ranked stored chunks");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::ChunkingPlan;
    use crate::config::IndexingOptions;
    use crate::indexing::IndexingPipeline;
    use crate::models::{NewChunk, SplitStrategy};
    use crate::stores::InMemoryChunkStore;
    use crate::testing::{FixedTextExtractor, ScriptedEmbedder};
    use std::path::Path;
    use std::time::Duration;

    fn no_delay() -> IndexingOptions {
        IndexingOptions {
            embed_delay: Duration::ZERO,
        }
    }

    fn row(text: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            text: text.to_string(),
            embedding,
            source_name: "manual.pdf".to_string(),
            strategy: SplitStrategy::FixedSize,
        }
    }

    /// 2700 characters with a distinct letter per 100-character block.
    fn synthetic_document() -> String {
        (0..27)
            .map(|block| {
                let letter = char::from(b'a' + (block % 26) as u8);
                letter.to_string().repeat(100)
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_store_returns_no_results() {
        let pipeline = SearchPipeline::new(ScriptedEmbedder::new(4), InMemoryChunkStore::new());

        let results = pipeline.search("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_embedding() {
        let embedder = ScriptedEmbedder::new(4);
        let pipeline = SearchPipeline::new(embedder.clone(), InMemoryChunkStore::new());

        let error = pipeline.search("   ", 5).await.unwrap_err();
        assert!(matches!(
            error,
            PipelineError::Configuration(ConfigurationError::EmptyQuery)
        ));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn query_is_embedded_with_query_intent() {
        let embedder = ScriptedEmbedder::new(4);
        let pipeline = SearchPipeline::new(embedder.clone(), InMemoryChunkStore::new());

        pipeline.search("pump pressure", 3).await.unwrap();
        assert_eq!(embedder.intents(), vec![EmbeddingIntent::Query]);
    }

    #[tokio::test]
    async fn results_are_limited_and_ordered_by_score() {
        let store = InMemoryChunkStore::new();
        store
            .bulk_insert(&[
                row("far", vec![0.0, 1.0]),
                row("close", vec![1.0, 0.2]),
                row("exact", vec![2.0, 0.0]),
                row("broken", Vec::new()),
                row("opposite", vec![-1.0, 0.0]),
            ])
            .await
            .unwrap();
        let embedder = ScriptedEmbedder::new(2).with_vector("q", vec![1.0, 0.0]);
        let pipeline = SearchPipeline::new(embedder, store);

        let results = pipeline.search("q", 3).await.unwrap();

        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "close", "far"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn indexed_rows_read_back_unchanged() {
        let store = InMemoryChunkStore::new();
        let indexer = IndexingPipeline::new(
            ScriptedEmbedder::new(8),
            store,
            FixedTextExtractor::new("Alpha one. Alpha two. Beta three. Beta four. Gamma five."),
            no_delay(),
        );
        let plan = ChunkingPlan::Sentence {
            sentences_per_chunk: 2,
        };
        indexer.index_file(Path::new("/srv/docs/report.pdf"), &plan).await.unwrap();

        let rows = indexer.store().scan_all().await.unwrap();
        let expected = ["Alpha one. Alpha two.", "Beta three. Beta four.", "Gamma five."];
        assert_eq!(rows.len(), expected.len());
        for (stored, text) in rows.iter().zip(expected) {
            assert_eq!(stored.text, text);
            assert_eq!(stored.source_name, "report.pdf");
            assert_eq!(stored.strategy, SplitStrategy::Sentence);
        }
    }

    #[tokio::test]
    async fn chunk_with_identical_embedding_ranks_first() {
        let plan = ChunkingPlan::FixedSize {
            chunk_size: 1_000,
            overlap: 200,
        };
        let indexer = IndexingPipeline::new(
            ScriptedEmbedder::new(64),
            InMemoryChunkStore::new(),
            FixedTextExtractor::new(synthetic_document()),
            no_delay(),
        );

        let report = indexer.index_file(Path::new("synthetic.pdf"), &plan).await.unwrap();
        assert_eq!(report.characters, 2_700);
        assert_eq!(report.chunk_count, 4);

        let store = indexer.into_store();
        let rows = store.scan_all().await.unwrap();
        assert!(rows.iter().all(|row| row.text.chars().count() <= 1_000));
        assert_eq!(rows[3].text.chars().count(), 300);

        let target = rows[2].clone();
        let embedder = ScriptedEmbedder::new(64).with_vector("where is block q", target.embedding);
        let searcher = SearchPipeline::new(embedder, store);

        let results = searcher.search("where is block q", 5).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].chunk.id, target.id);
        assert_eq!(results[0].chunk.text, target.text);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!(results.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }
}
