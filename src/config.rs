use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Placeholder value shipped in sample `.env` files; treated as "no key configured".
const PLACEHOLDER_API_KEY: &str = "your_google_ai_api_key_here";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Lega server.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the hosted generative-AI service.
    pub google_api_key: Option<String>,
    /// Base URL of the generative-AI REST API.
    pub gemini_api_url: String,
    /// Model used for summaries, risk analysis, and Q&A.
    pub chat_model: String,
    /// Sampling temperature passed to the chat model.
    pub temperature: f32,
    /// Upper bound on generated tokens per request.
    pub max_tokens: u32,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Name of the Qdrant collection holding document chunks.
    pub qdrant_collection_name: String,
    /// Address the HTTP server binds to.
    pub server_address: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Maximum accepted upload size in megabytes.
    pub max_file_size_mb: u64,
    /// Accepted file extensions (lowercase, without dot).
    pub supported_file_types: Vec<String>,
    /// Directory receiving raw uploaded files.
    pub upload_dir: PathBuf,
    /// Root directory of the local document store.
    pub data_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Path of the application log file.
    pub log_file: PathBuf,
    /// Number of analyses allowed to run at the same time.
    pub max_concurrent_uploads: usize,
    /// Upper bound, in seconds, for a single document analysis.
    pub document_processing_timeout_secs: u64,
    /// Maximum number of risk factors kept per analysis.
    pub max_risk_factors: usize,
    /// Route toggles.
    pub features: FeatureFlags,
    /// Region reported to clients.
    pub default_region: String,
    /// Currency reported to clients.
    pub default_currency: String,
}

/// Optional HTTP surfaces that can be switched off.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeatureFlags {
    /// Library listing, stats, and deletion routes.
    pub document_library: bool,
    /// Question answering routes.
    pub qa_assistant: bool,
    /// Report export route.
    pub export_features: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            document_library: true,
            qa_assistant: true,
            export_features: true,
        }
    }
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Hosted Gemini embeddings API.
    Gemini,
    /// Deterministic local hashing, useful offline and in tests.
    Hash,
}

/// Non-secret view of the configuration returned by `GET /settings`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    /// Whether a usable AI API key is present.
    pub api_configured: bool,
    /// Chat model in use.
    pub chat_model: String,
    /// Embedding provider in use.
    pub embedding_provider: EmbeddingProvider,
    /// Enabled route groups.
    pub features_enabled: FeatureFlags,
    /// Accepted upload extensions.
    pub supported_file_types: Vec<String>,
    /// Upload size limit in megabytes.
    pub max_file_size_mb: u64,
    /// Maximum risk factors kept per analysis.
    pub max_risk_factors: usize,
    /// Region label.
    pub region: String,
    /// Currency label.
    pub currency: String,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            google_api_key: load_env_optional("GOOGLE_API_KEY"),
            gemini_api_url: load_env_or("GEMINI_API_URL", "https://generativelanguage.googleapis.com"),
            chat_model: load_env_or("CHAT_MODEL", "gemini-1.5-flash"),
            temperature: parse_env("TEMPERATURE", 0.2)?,
            max_tokens: parse_env("MAX_TOKENS", 2048)?,
            embedding_provider: match load_env_optional("EMBEDDING_PROVIDER") {
                Some(value) => value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))?,
                None => EmbeddingProvider::Gemini,
            },
            embedding_model: load_env_or("EMBEDDING_MODEL", "models/embedding-001"),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", 768)?,
            qdrant_url: load_env_or("QDRANT_URL", "http://127.0.0.1:6333"),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            qdrant_collection_name: load_env_or("QDRANT_COLLECTION_NAME", "lega_documents"),
            server_address: load_env_or("SERVER_ADDRESS", "127.0.0.1"),
            server_port: parse_env("SERVER_PORT", 8501)?,
            max_file_size_mb: parse_env("MAX_FILE_SIZE_MB", 10)?,
            supported_file_types: parse_file_types(&load_env_or(
                "SUPPORTED_FILE_TYPES",
                "pdf,docx,txt",
            )),
            upload_dir: PathBuf::from(load_env_or("UPLOAD_DIR", "./uploads")),
            data_dir: PathBuf::from(load_env_or("DATA_DIR", "./data")),
            log_level: load_env_or("LOG_LEVEL", "info"),
            log_file: PathBuf::from(load_env_or("LOG_FILE", "./data/app.log")),
            max_concurrent_uploads: parse_env::<usize>("MAX_CONCURRENT_UPLOADS", 5)?.max(1),
            document_processing_timeout_secs: parse_env("DOCUMENT_PROCESSING_TIMEOUT", 300)?,
            max_risk_factors: parse_env("MAX_RISK_FACTORS", 10)?,
            features: FeatureFlags {
                document_library: parse_flag("ENABLE_DOCUMENT_LIBRARY", true),
                qa_assistant: parse_flag("ENABLE_QA_ASSISTANT", true),
                export_features: parse_flag("ENABLE_EXPORT_FEATURES", true),
            },
            default_region: load_env_or("DEFAULT_REGION", "India"),
            default_currency: load_env_or("DEFAULT_CURRENCY", "INR"),
        })
    }

    /// Return the API key when one is set and is not the sample placeholder.
    pub fn api_key(&self) -> Option<&str> {
        self.google_api_key
            .as_deref()
            .filter(|key| *key != PLACEHOLDER_API_KEY)
    }

    /// Record the effective settings; call once the subscriber is installed.
    pub fn log_loaded(&self) {
        tracing::debug!(
            qdrant_url = %self.qdrant_url,
            collection = %self.qdrant_collection_name,
            chat_model = %self.chat_model,
            embedding_provider = ?self.embedding_provider,
            api_configured = self.api_key().is_some(),
            "Loaded configuration"
        );
    }

    /// Upload size limit in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Directory holding one JSON file per stored document.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    /// Build the non-secret settings summary.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            api_configured: self.api_key().is_some(),
            chat_model: self.chat_model.clone(),
            embedding_provider: self.embedding_provider,
            features_enabled: self.features,
            supported_file_types: self.supported_file_types.clone(),
            max_file_size_mb: self.max_file_size_mb,
            max_risk_factors: self.max_risk_factors,
            region: self.default_region.clone(),
            currency: self.default_currency.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_api_key: None,
            gemini_api_url: "https://generativelanguage.googleapis.com".into(),
            chat_model: "gemini-1.5-flash".into(),
            temperature: 0.2,
            max_tokens: 2048,
            embedding_provider: EmbeddingProvider::Gemini,
            embedding_model: "models/embedding-001".into(),
            embedding_dimension: 768,
            qdrant_url: "http://127.0.0.1:6333".into(),
            qdrant_api_key: None,
            qdrant_collection_name: "lega_documents".into(),
            server_address: "127.0.0.1".into(),
            server_port: 8501,
            max_file_size_mb: 10,
            supported_file_types: parse_file_types("pdf,docx,txt"),
            upload_dir: PathBuf::from("./uploads"),
            data_dir: PathBuf::from("./data"),
            log_level: "info".into(),
            log_file: PathBuf::from("./data/app.log"),
            max_concurrent_uploads: 5,
            document_processing_timeout_secs: 300,
            max_risk_factors: 10,
            features: FeatureFlags::default(),
            default_region: "India".into(),
            default_currency: "INR".into(),
        }
    }
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, default: bool) -> bool {
    load_env_optional(key)
        .map(|value| value.eq_ignore_ascii_case("true") || value == "1")
        .unwrap_or(default)
}

pub(crate) fn parse_file_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|value| value.trim().trim_start_matches('.').to_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment and install it in the process-wide cache.
///
/// Later calls return the first configuration loaded.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_key_is_not_configured() {
        let config = Config {
            google_api_key: Some(PLACEHOLDER_API_KEY.into()),
            ..Config::default()
        };
        assert!(config.api_key().is_none());
        assert!(!config.summary().api_configured);

        let config = Config {
            google_api_key: Some("real-key".into()),
            ..Config::default()
        };
        assert_eq!(config.api_key(), Some("real-key"));
    }

    #[test]
    fn file_types_are_normalized() {
        assert_eq!(
            parse_file_types(" PDF, .docx ,,txt"),
            vec!["pdf".to_string(), "docx".into(), "txt".into()]
        );
    }

    #[test]
    fn embedding_provider_parses_aliases() {
        assert_eq!("Gemini".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Gemini));
        assert_eq!("google".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Gemini));
        assert_eq!("hash".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Hash));
        assert_eq!("ollama".parse::<EmbeddingProvider>(), Err(()));
    }

    #[test]
    fn init_config_returns_the_cached_instance() {
        let first = init_config().expect("config");
        let second = init_config().expect("config");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn size_limit_is_expressed_in_bytes() {
        let config = Config {
            max_file_size_mb: 2,
            ..Config::default()
        };
        assert_eq!(config.max_file_size_bytes(), 2 * 1024 * 1024);
    }
}
