use crate::error::ConfigurationError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
pub const DEFAULT_GEMINI_MODEL: &str = "models/text-embedding-004";
pub const DEFAULT_GEMINI_DIMENSIONS: usize = 768;
pub const DEFAULT_TABLE: &str = "document_chunks";
pub const DEFAULT_EMBED_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    Gemini,
    /// Offline character n-gram hashing; needs no API key.
    Local,
}

impl fmt::Display for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingProvider::Gemini => f.write_str("gemini"),
            EmbeddingProvider::Local => f.write_str("local"),
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(EmbeddingProvider::Gemini),
            "local" => Ok(EmbeddingProvider::Local),
            other => Err(ConfigurationError::InvalidSetting {
                name: "EMBEDDING_PROVIDER",
                details: format!("unknown provider {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub dimensions: usize,
    pub timeout: Duration,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Gemini,
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            dimensions: DEFAULT_GEMINI_DIMENSIONS,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub database_url: Option<String>,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexingOptions {
    /// Minimum pause between two consecutive embedding calls.
    pub embed_delay: Duration,
}

impl Default for IndexingOptions {
    fn default() -> Self {
        Self {
            embed_delay: DEFAULT_EMBED_DELAY,
        }
    }
}

/// Process-wide settings, checked once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub indexing: IndexingOptions,
}

impl Settings {
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if self.embedding.provider == EmbeddingProvider::Gemini
            && non_blank(self.embedding.api_key.as_deref()).is_none()
        {
            return Err(ConfigurationError::MissingSetting("GEMINI_API_KEY"));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigurationError::InvalidSetting {
                name: "EMBEDDING_DIMENSIONS",
                details: "must be at least 1".to_string(),
            });
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigurationError::MissingSetting("EMBEDDING_MODEL"));
        }
        if non_blank(self.store.database_url.as_deref()).is_none() {
            return Err(ConfigurationError::MissingSetting("POSTGRES_URL"));
        }
        validate_table_name(&self.store.table)?;
        Ok(self)
    }

    pub fn database_url(&self) -> Result<&str, ConfigurationError> {
        non_blank(self.store.database_url.as_deref())
            .ok_or(ConfigurationError::MissingSetting("POSTGRES_URL"))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn validate_table_name(table: &str) -> Result<(), ConfigurationError> {
    static IDENTIFIER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    let identifier = IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$"))
        .as_ref()
        .map_err(|error| ConfigurationError::InvalidSetting {
            name: "CHUNKS_TABLE",
            details: error.to_string(),
        })?;

    if identifier.is_match(table) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidSetting {
            name: "CHUNKS_TABLE",
            details: format!("{table:?} is not a plain SQL identifier"),
        })
    }
}
