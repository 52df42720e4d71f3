use crate::error::ConfigurationError;
use crate::models::SplitStrategy;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SENTENCES_PER_CHUNK: usize = 5;

/// Raw chunking parameters as they arrive from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub sentences_per_chunk: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            sentences_per_chunk: DEFAULT_SENTENCES_PER_CHUNK,
        }
    }
}

/// A validated strategy together with the parameters it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingPlan {
    FixedSize { chunk_size: usize, overlap: usize },
    Sentence { sentences_per_chunk: usize },
    Paragraph,
}

impl ChunkingPlan {
    pub fn new(
        strategy: SplitStrategy,
        options: ChunkingOptions,
    ) -> Result<Self, ConfigurationError> {
        match strategy {
            SplitStrategy::FixedSize => {
                validate_fixed_size(options.chunk_size, options.overlap)?;
                Ok(ChunkingPlan::FixedSize {
                    chunk_size: options.chunk_size,
                    overlap: options.overlap,
                })
            }
            SplitStrategy::Sentence => {
                validate_sentences_per_chunk(options.sentences_per_chunk)?;
                Ok(ChunkingPlan::Sentence {
                    sentences_per_chunk: options.sentences_per_chunk,
                })
            }
            SplitStrategy::Paragraph => Ok(ChunkingPlan::Paragraph),
        }
    }

    /// Parses the strategy name first so an unknown name never falls back to a default.
    pub fn from_name(name: &str, options: ChunkingOptions) -> Result<Self, ConfigurationError> {
        Self::new(name.parse()?, options)
    }

    pub fn strategy(&self) -> SplitStrategy {
        match self {
            ChunkingPlan::FixedSize { .. } => SplitStrategy::FixedSize,
            ChunkingPlan::Sentence { .. } => SplitStrategy::Sentence,
            ChunkingPlan::Paragraph => SplitStrategy::Paragraph,
        }
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>, ConfigurationError> {
        match *self {
            ChunkingPlan::FixedSize { chunk_size, overlap } => {
                fixed_size_chunks(text, chunk_size, overlap)
            }
            ChunkingPlan::Sentence { sentences_per_chunk } => {
                sentence_based_chunks(text, sentences_per_chunk)
            }
            ChunkingPlan::Paragraph => Ok(paragraph_based_chunks(text)),
        }
    }
}

fn validate_fixed_size(chunk_size: usize, overlap: usize) -> Result<(), ConfigurationError> {
    if chunk_size == 0 {
        return Err(ConfigurationError::InvalidChunkConfig(
            "chunk_size must be at least 1".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(ConfigurationError::InvalidChunkConfig(format!(
            "overlap {overlap} must be smaller than chunk_size {chunk_size}"
        )));
    }
    Ok(())
}

fn validate_sentences_per_chunk(sentences_per_chunk: usize) -> Result<(), ConfigurationError> {
    if sentences_per_chunk == 0 {
        return Err(ConfigurationError::InvalidChunkConfig(
            "sentences_per_chunk must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Character windows of `chunk_size`, each starting `chunk_size - overlap`
/// characters after the previous one. The window that reaches the end of the
/// text is the last one.
pub fn fixed_size_chunks(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ConfigurationError> {
    validate_fixed_size(chunk_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = start.saturating_add(chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start = start.saturating_add(step);
    }

    Ok(chunks)
}

pub fn sentence_based_chunks(
    text: &str,
    sentences_per_chunk: usize,
) -> Result<Vec<String>, ConfigurationError> {
    validate_sentences_per_chunk(sentences_per_chunk)?;

    let normalized = text.replace(['!', '?'], ".");
    let sentences = normalized
        .split('.')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect::<Vec<_>>();

    Ok(sentences
        .chunks(sentences_per_chunk)
        .map(|batch| format!("{}.", batch.join(". ")))
        .collect())
}

pub fn paragraph_based_chunks(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}
