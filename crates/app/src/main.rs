use anyhow::{bail, Context};
use chrono::Utc;
use chunk_retrieval_core::chunking::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SENTENCES_PER_CHUNK,
};
use chunk_retrieval_core::config::{
    DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_DIMENSIONS, DEFAULT_GEMINI_MODEL, DEFAULT_TABLE,
};
use chunk_retrieval_core::{
    build_embedder, ChunkingOptions, ChunkingPlan, EmbeddingProvider, EmbeddingSettings,
    FileExtractor, IndexingEvent, IndexingOptions, IndexingPipeline, PostgresChunkStore,
    SearchPipeline, SearchResult, Settings, StoreSettings, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_TOP_K,
};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PREVIEW_CHARS: usize = 500;

#[derive(Parser)]
#[command(name = "chunk-retrieval", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Postgres connection string
    #[arg(long, env = "POSTGRES_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Table that holds the chunks
    #[arg(long, env = "CHUNKS_TABLE", default_value = DEFAULT_TABLE)]
    table: String,

    /// Embedding provider: gemini or local
    #[arg(long, env = "EMBEDDING_PROVIDER", default_value = "gemini")]
    embedding_provider: EmbeddingProvider,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Embedding model name
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    embedding_model: String,

    /// Base URL of the Gemini API
    #[arg(long, env = "EMBEDDING_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    embedding_base_url: String,

    /// Embedding dimensionality (defaults to the provider's native size)
    #[arg(long, env = "EMBEDDING_DIMENSIONS")]
    embedding_dimensions: Option<usize>,

    /// Pause between consecutive embedding calls, in milliseconds
    #[arg(long, env = "EMBED_DELAY_MS", default_value_t = 1_000)]
    embed_delay_ms: u64,

    /// Embedding request timeout, in seconds
    #[arg(long, env = "EMBEDDING_TIMEOUT_SECS", default_value_t = 30)]
    embedding_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and embed a PDF or DOCX file, replacing all stored chunks.
    Index {
        /// Path to PDF or DOCX file
        file_path: PathBuf,
        /// Chunking strategy: fixed_size, sentence or paragraph
        #[arg(long, default_value = "fixed_size")]
        strategy: String,
        /// Chunk size in characters for fixed_size
        #[arg(long = "chunk_size", alias = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Overlap in characters between fixed_size chunks
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        overlap: usize,
        /// Number of sentences per chunk for sentence
        #[arg(
            long = "sentences_per_chunk",
            alias = "sentences-per-chunk",
            default_value_t = DEFAULT_SENTENCES_PER_CHUNK
        )]
        sentences_per_chunk: usize,
    },
    /// Rank stored chunks by cosine similarity to a query.
    Search {
        /// Text query
        query: String,
        /// Number of results to return
        #[arg(long = "top_k", alias = "top-k", default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let dimensions = self
            .embedding_dimensions
            .unwrap_or(match self.embedding_provider {
                EmbeddingProvider::Gemini => DEFAULT_GEMINI_DIMENSIONS,
                EmbeddingProvider::Local => DEFAULT_EMBEDDING_DIMENSIONS,
            });

        let settings = Settings {
            embedding: EmbeddingSettings {
                provider: self.embedding_provider,
                api_key: self.gemini_api_key.clone(),
                model: self.embedding_model.clone(),
                base_url: self.embedding_base_url.clone(),
                dimensions,
                timeout: Duration::from_secs(self.embedding_timeout_secs),
            },
            store: StoreSettings {
                database_url: self.database_url.clone(),
                table: self.table.clone(),
            },
            indexing: IndexingOptions {
                embed_delay: Duration::from_millis(self.embed_delay_ms),
            },
        };

        Ok(settings.validate()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = %settings.embedding.provider,
        table = %settings.store.table,
        started_at = %Utc::now().to_rfc3339(),
        "chunk-retrieval boot"
    );

    match cli.command {
        Command::Index {
            file_path,
            strategy,
            chunk_size,
            overlap,
            sentences_per_chunk,
        } => {
            let options = ChunkingOptions {
                chunk_size,
                overlap,
                sentences_per_chunk,
            };
            index(&settings, file_path, &strategy, options).await
        }
        Command::Search { query, top_k, json } => search(&settings, &query, top_k, json).await,
    }
}

async fn index(
    settings: &Settings,
    file_path: PathBuf,
    strategy: &str,
    options: ChunkingOptions,
) -> anyhow::Result<()> {
    let plan = ChunkingPlan::from_name(strategy, options)?;

    if !tokio::fs::try_exists(&file_path).await.unwrap_or(false) {
        bail!("File not found: {}", file_path.display());
    }

    println!("Processing file: {}", file_path.display());

    let embedder = build_embedder(&settings.embedding)?;
    let store = PostgresChunkStore::connect(settings.database_url()?, &settings.store.table)
        .await
        .context("failed to connect to Postgres")?;
    let pipeline = IndexingPipeline::new(embedder, store, FileExtractor, settings.indexing);

    println!("Extracting text from file...");
    let report = pipeline
        .index_file_with_progress(&file_path, &plan, |event| render_progress(event, &plan))
        .await?;

    println!("Document indexed successfully!");
    println!("  File: {}", report.source_name);
    println!("  Number of chunks: {}", report.chunk_count);
    println!("  Chunking strategy: {}", report.strategy);
    Ok(())
}

fn render_progress(event: IndexingEvent, plan: &ChunkingPlan) {
    match event {
        IndexingEvent::Extracted { characters } => {
            println!("Extracted text with {characters} characters");
            println!("Splitting into chunks by strategy: {}...", plan.strategy());
        }
        IndexingEvent::Chunked { count } => {
            println!("Created {count} chunks");
            println!("Creating embeddings...");
        }
        IndexingEvent::Embedded { done, total } => {
            print!("\rProcessing chunk {done}/{total}...");
            io::stdout().flush().ok();
        }
        IndexingEvent::Stored { count } => {
            println!("\nInserted {count} chunks into database");
        }
    }
}

async fn search(settings: &Settings, query: &str, top_k: usize, json: bool) -> anyhow::Result<()> {
    let embedder = build_embedder(&settings.embedding)?;
    let store = PostgresChunkStore::connect(settings.database_url()?, &settings.store.table)
        .await
        .context("failed to connect to Postgres")?;
    let pipeline = SearchPipeline::new(embedder, store);

    if !json {
        println!("Searching: '{query}'");
        println!("{}", "-".repeat(60));
    }

    let results = pipeline.search(query, top_k).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    print_results(&results);
    Ok(())
}

fn print_results(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found in database.");
        return;
    }

    println!("\nFound {} similar chunks:\n", results.len());
    for (position, result) in results.iter().enumerate() {
        println!("{}", "=".repeat(60));
        println!("Result #{} (similarity: {:.4})", position + 1, result.score);
        println!("File: {}", result.chunk.source_name);
        println!("Split strategy: {}", result.chunk.strategy);
        println!("ID: {}", result.chunk.id);
        println!("\nChunk:");
        println!("{}", preview(&result.chunk.text, PREVIEW_CHARS));
        println!();
    }
}

fn preview(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        format!("{}...", text.chars().take(limit).collect::<String>())
    } else {
        text.to_string()
    }
}
