//! Fakes shared by the pipeline tests.

use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::error::{EmbeddingError, ExtractionError};
use crate::extractor::DocumentExtractor;
use crate::models::EmbeddingIntent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Calls {
    intents: Vec<EmbeddingIntent>,
}

/// Embeds with character n-grams unless a vector was pinned for the exact
/// text. Clones share the call log.
#[derive(Clone)]
pub struct ScriptedEmbedder {
    fallback: CharacterNgramEmbedder,
    pinned: HashMap<String, Vec<f32>>,
    fail_after: Option<usize>,
    calls: Arc<Mutex<Calls>>,
}

impl ScriptedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            fallback: CharacterNgramEmbedder { dimensions },
            pinned: HashMap::new(),
            fail_after: None,
            calls: Arc::default(),
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.pinned.insert(text.to_string(), vector);
        self
    }

    pub fn failing_after(mut self, successful_calls: usize) -> Self {
        self.fail_after = Some(successful_calls);
        self
    }

    pub fn intents(&self) -> Vec<EmbeddingIntent> {
        self.calls
            .lock()
            .map(|calls| calls.intents.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.intents().len()
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn dimensions(&self) -> usize {
        self.fallback.dimensions
    }

    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, EmbeddingError> {
        let made = {
            let mut calls = self.calls.lock().expect("call log lock");
            calls.intents.push(intent);
            calls.intents.len()
        };

        if self.fail_after.is_some_and(|limit| made > limit) {
            return Err(EmbeddingError::Provider {
                status: 503,
                details: "quota exhausted".to_string(),
            });
        }

        Ok(self
            .pinned
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.vector(text)))
    }
}

pub struct FixedTextExtractor {
    text: String,
}

impl FixedTextExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl DocumentExtractor for FixedTextExtractor {
    fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
        Ok(self.text.clone())
    }
}

pub struct FailingExtractor;

impl DocumentExtractor for FailingExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        Err(ExtractionError::PdfParse(format!(
            "no xref table in {}",
            path.display()
        )))
    }
}
