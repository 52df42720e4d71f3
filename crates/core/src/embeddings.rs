use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::{ConfigurationError, EmbeddingError};
use crate::models::EmbeddingIntent;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

/// Maps text to a fixed-length vector. Every vector a given embedder returns
/// has `dimensions()` entries, whatever the intent.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text, intent).await
    }
}

/// Deterministic trigram-hashing embedder. Ignores the intent.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(
        &self,
        text: &str,
        _intent: EmbeddingIntent,
    ) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.vector(text))
    }
}

/// Builds the embedder selected by `settings.provider`.
pub fn build_embedder(
    settings: &EmbeddingSettings,
) -> Result<Box<dyn Embedder>, ConfigurationError> {
    match settings.provider {
        EmbeddingProvider::Gemini => Ok(Box::new(GeminiEmbedder::new(settings)?)),
        EmbeddingProvider::Local => Ok(Box::new(CharacterNgramEmbedder {
            dimensions: settings.dimensions,
        })),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

fn task_type(intent: EmbeddingIntent) -> &'static str {
    match intent {
        EmbeddingIntent::Document => "RETRIEVAL_DOCUMENT",
        EmbeddingIntent::Query => "RETRIEVAL_QUERY",
    }
}

/// Client for the Gemini `embedContent` endpoint.
pub struct GeminiEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ConfigurationError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigurationError::MissingSetting("GEMINI_API_KEY"))?
            .to_string();

        let model = normalize_model_name(&settings.model);
        let endpoint = embed_endpoint(&settings.base_url, &model)?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| ConfigurationError::InvalidSetting {
                name: "EMBEDDING_TIMEOUT",
                details: error.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
            dimensions: settings.dimensions,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

fn normalize_model_name(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

fn embed_endpoint(base_url: &str, model: &str) -> Result<Url, ConfigurationError> {
    let invalid = |details: String| ConfigurationError::InvalidSetting {
        name: "EMBEDDING_BASE_URL",
        details,
    };

    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    Url::parse(&base)
        .and_then(|base| base.join(&format!("{model}:embedContent")))
        .map_err(|error| invalid(format!("{base_url}: {error}")))
}

fn vector_from_response(
    payload: EmbedContentResponse,
    expected: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let values = payload
        .embedding
        .map(|embedding| embedding.values)
        .unwrap_or_default();

    if values.is_empty() {
        return Err(EmbeddingError::EmptyVector);
    }
    if values.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str, intent: EmbeddingIntent) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type: task_type(intent),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                details,
            });
        }

        let payload: EmbedContentResponse = response.json().await?;
        vector_from_response(payload, self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ngram_embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder
            .embed("Hydraulic pressure and flow", EmbeddingIntent::Document)
            .await
            .unwrap();
        let second = embedder
            .embed("Hydraulic pressure and flow", EmbeddingIntent::Query)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn ngram_embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        assert_eq!(embedder.vector("abc").len(), 32);
        assert_eq!(embedder.vector("").len(), 32);
    }

    #[tokio::test]
    async fn boxed_embedders_delegate() {
        let boxed: Box<dyn Embedder> = Box::new(CharacterNgramEmbedder { dimensions: 16 });
        assert_eq!(boxed.dimensions(), 16);
        let vector = boxed.embed("pump", EmbeddingIntent::Query).await.unwrap();
        assert_eq!(vector.len(), 16);
    }

    #[test]
    fn request_carries_task_type_for_each_intent() {
        let request = EmbedContentRequest {
            model: "models/text-embedding-004",
            content: Content {
                parts: [Part { text: "hello" }],
            },
            task_type: task_type(EmbeddingIntent::Query),
        };

        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(encoded["content"]["parts"][0]["text"], "hello");
        assert_eq!(encoded["model"], "models/text-embedding-004");
        assert_eq!(task_type(EmbeddingIntent::Document), "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn response_values_become_the_vector() {
        let payload: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding":{"values":[0.5,-0.25,1.0]}}"#).unwrap();
        assert_eq!(vector_from_response(payload, 3).unwrap(), vec![0.5, -0.25, 1.0]);
    }

    #[test]
    fn empty_or_misshapen_responses_are_errors() {
        let empty: EmbedContentResponse = serde_json::from_str(r#"{"embedding":{}}"#).unwrap();
        assert!(matches!(
            vector_from_response(empty, 3),
            Err(EmbeddingError::EmptyVector)
        ));

        let missing: EmbedContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            vector_from_response(missing, 3),
            Err(EmbeddingError::EmptyVector)
        ));

        let short: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding":{"values":[1.0,2.0]}}"#).unwrap();
        assert!(matches!(
            vector_from_response(short, 3),
            Err(EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn endpoint_is_built_from_base_url_and_model() {
        let settings = EmbeddingSettings {
            api_key: Some("secret".to_string()),
            model: "text-embedding-004".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ..EmbeddingSettings::default()
        };

        let embedder = GeminiEmbedder::new(&settings).unwrap();
        assert_eq!(
            embedder.endpoint().as_str(),
            concat!(
                "https://generativelanguage.googleapis.com/v1beta/",
                "models/text-embedding-004:embedContent"
            )
        );
    }

    #[test]
    fn gemini_embedder_requires_api_key() {
        let settings = EmbeddingSettings::default();
        assert!(matches!(
            GeminiEmbedder::new(&settings),
            Err(ConfigurationError::MissingSetting("GEMINI_API_KEY"))
        ));
    }

    #[test]
    fn local_provider_builds_without_api_key() {
        let settings = EmbeddingSettings {
            provider: EmbeddingProvider::Local,
            dimensions: 48,
            ..EmbeddingSettings::default()
        };
        let embedder = build_embedder(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 48);
    }

    #[test]
    fn malformed_base_url_is_a_configuration_error() {
        let settings = EmbeddingSettings {
            api_key: Some("secret".to_string()),
            base_url: "not a url".to_string(),
            ..EmbeddingSettings::default()
        };
        assert!(matches!(
            GeminiEmbedder::new(&settings),
            Err(ConfigurationError::InvalidSetting { .. })
        ));
    }
}
