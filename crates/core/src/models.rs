use crate::error::ConfigurationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chunking algorithm used for an indexing run. Persisted as its snake_case name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    FixedSize,
    Sentence,
    Paragraph,
}

impl SplitStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitStrategy::FixedSize => "fixed_size",
            SplitStrategy::Sentence => "sentence",
            SplitStrategy::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitStrategy {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fixed_size" => Ok(SplitStrategy::FixedSize),
            "sentence" => Ok(SplitStrategy::Sentence),
            "paragraph" => Ok(SplitStrategy::Paragraph),
            other => Err(ConfigurationError::InvalidStrategy(other.to_string())),
        }
    }
}

/// Which side of a retrieval the text is embedded for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EmbeddingIntent {
    Document,
    Query,
}

/// A persisted chunk row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub source_name: String,
    pub strategy: SplitStrategy,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn into_summary(self) -> ChunkSummary {
        ChunkSummary {
            id: self.id,
            text: self.text,
            source_name: self.source_name,
            strategy: self.strategy,
            created_at: self.created_at,
        }
    }
}

/// A chunk ready to be written; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewChunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub source_name: String,
    pub strategy: SplitStrategy,
}

/// Chunk metadata returned with search hits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSummary {
    pub id: i64,
    pub text: String,
    pub source_name: String,
    pub strategy: SplitStrategy,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub chunk: ChunkSummary,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexingReport {
    pub source_name: String,
    pub strategy: SplitStrategy,
    pub characters: usize,
    pub chunk_count: usize,
}
