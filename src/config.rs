use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "data/docsift.db";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_OLLAMA_SUMMARY_MODEL: &str = "llama3.2";
const DEFAULT_GEMINI_SUMMARY_MODEL: &str = "gemini-2.5-flash";
const LOCAL_CHUNK_CHARS: usize = 1000;
const REMOTE_CHUNK_CHARS: usize = 2500;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the docsift service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SQLite database file holding document rows.
    pub database_path: PathBuf,
    /// Directory where uploaded files are written.
    pub upload_dir: PathBuf,
    /// Largest accepted upload body in bytes.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Abstractive summarization backend; `none` keeps the pipeline extractive.
    pub summarization_provider: SummarizationProvider,
    /// Optional model override for the summarization provider.
    pub summarization_model: Option<String>,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: Option<String>,
    /// API key for the hosted Gemini endpoint.
    pub gemini_api_key: Option<String>,
    /// Optional base URL override for the Gemini endpoint.
    pub gemini_api_url: Option<String>,
    /// Optional override for the per-chunk character budget.
    pub summary_chunk_chars: Option<usize>,
    /// Retries per chunk after the first failed provider call.
    pub summary_max_retries: u32,
    /// Sentences kept by the extractive summarizer.
    pub summary_sentences: usize,
    /// Keywords stored per document.
    pub keywords_top_n: usize,
    /// Embedding provider used for clustering and similarity.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Cluster count used when callers omit one.
    pub cluster_default_count: usize,
    /// Label terms kept per cluster.
    pub cluster_top_terms: usize,
    /// Whether scanned PDFs are rasterized and run through Tesseract.
    pub ocr_enabled: bool,
    /// Tesseract language code.
    pub ocr_language: String,
    /// Bearer token guarding administrative operations such as re-clustering.
    pub admin_token: Option<String>,
}

/// Supported abstractive summarization backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizationProvider {
    /// No abstractive provider; TF-IDF extractive summaries only.
    #[default]
    None,
    /// Local Ollama runtime.
    Ollama,
    /// Hosted Gemini generative API.
    Gemini,
}

/// Supported embedding backends for clustering and similarity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic in-process hashing embedder.
    #[default]
    Hash,
    /// Local Ollama runtime.
    Ollama,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            server_port: None,
            summarization_provider: SummarizationProvider::None,
            summarization_model: None,
            ollama_url: None,
            gemini_api_key: None,
            gemini_api_url: None,
            summary_chunk_chars: None,
            summary_max_retries: 2,
            summary_sentences: 5,
            keywords_top_n: 6,
            embedding_provider: EmbeddingProvider::Hash,
            embedding_model: "all-minilm".into(),
            embedding_dimension: 384,
            cluster_default_count: 6,
            cluster_top_terms: 6,
            ocr_enabled: false,
            ocr_language: "eng".into(),
            admin_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let summarization_provider = match load_env_optional("SUMMARIZATION_PROVIDER") {
            Some(value) => value.parse().map_err(|()| {
                ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
            })?,
            None => defaults.summarization_provider,
        };
        let gemini_api_key =
            load_env_optional("GEMINI_API_KEY").or_else(|| load_env_optional("GOOGLE_API_KEY"));
        if summarization_provider == SummarizationProvider::Gemini && gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".to_string()));
        }
        let embedding_provider = match load_env_optional("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            None => defaults.embedding_provider,
        };
        let embedding_dimension =
            parse_optional("EMBEDDING_DIMENSION")?.unwrap_or(defaults.embedding_dimension);
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()));
        }

        Ok(Self {
            database_path: load_env_optional("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            upload_dir: load_env_optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(defaults.max_upload_bytes),
            server_port: parse_optional("SERVER_PORT")?,
            summarization_provider,
            summarization_model: load_env_optional("SUMMARIZATION_MODEL"),
            ollama_url: load_env_optional("OLLAMA_URL"),
            gemini_api_key,
            gemini_api_url: load_env_optional("GEMINI_API_URL"),
            summary_chunk_chars: parse_optional::<usize>("SUMMARY_CHUNK_CHARS")?
                .map(|value| value.max(1)),
            summary_max_retries: parse_optional("SUMMARY_MAX_RETRIES")?
                .unwrap_or(defaults.summary_max_retries),
            summary_sentences: parse_optional("SUMMARY_SENTENCES")?
                .unwrap_or(defaults.summary_sentences),
            keywords_top_n: parse_optional("KEYWORDS_TOP_N")?.unwrap_or(defaults.keywords_top_n),
            embedding_provider,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension,
            cluster_default_count: parse_optional("CLUSTER_DEFAULT_COUNT")?
                .unwrap_or(defaults.cluster_default_count),
            cluster_top_terms: parse_optional("CLUSTER_TOP_TERMS")?
                .unwrap_or(defaults.cluster_top_terms),
            ocr_enabled: parse_bool("OCR_ENABLED")?.unwrap_or(defaults.ocr_enabled),
            ocr_language: load_env_optional("OCR_LANGUAGE").unwrap_or(defaults.ocr_language),
            admin_token: load_env_optional("ADMIN_TOKEN"),
        })
    }

    /// Model passed to the summarization provider, falling back to a per-provider default.
    pub fn resolved_summarization_model(&self) -> Option<String> {
        match self.summarization_provider {
            SummarizationProvider::None => None,
            SummarizationProvider::Ollama => Some(
                self.summarization_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_SUMMARY_MODEL.to_string()),
            ),
            SummarizationProvider::Gemini => Some(
                self.summarization_model
                    .clone()
                    .unwrap_or_else(|| DEFAULT_GEMINI_SUMMARY_MODEL.to_string()),
            ),
        }
    }

    /// Character budget per summarization chunk.
    ///
    /// Remote providers get larger windows since each call carries request overhead.
    pub fn chunk_chars(&self) -> usize {
        self.summary_chunk_chars
            .unwrap_or(match self.summarization_provider {
                SummarizationProvider::Gemini => REMOTE_CHUNK_CHARS,
                _ => LOCAL_CHUNK_CHARS,
            })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}

impl FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "extractive" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            "gemini" | "google" => Ok(Self::Gemini),
            _ => Err(()),
        }
    }
}

impl SummarizationProvider {
    /// Stable lowercase label used in logs and API payloads.
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl EmbeddingProvider {
    /// Stable lowercase label used in logs and API payloads.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Ollama => "ollama",
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        database = %config.database_path.display(),
        upload_dir = %config.upload_dir.display(),
        server_port = ?config.server_port,
        summarization_provider = ?config.summarization_provider,
        embedding_provider = ?config.embedding_provider,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_parse_case_insensitively() {
        assert_eq!(
            "Gemini".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::Gemini)
        );
        assert_eq!(
            "none".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::None)
        );
        assert_eq!("OLLAMA".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Ollama));
        assert!("openai".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn chunk_budget_depends_on_provider() {
        let mut config = Config::default();
        assert_eq!(config.chunk_chars(), 1000);

        config.summarization_provider = SummarizationProvider::Gemini;
        assert_eq!(config.chunk_chars(), 2500);

        config.summary_chunk_chars = Some(640);
        assert_eq!(config.chunk_chars(), 640);
    }

    #[test]
    fn summarization_model_defaults_per_provider() {
        let mut config = Config::default();
        assert_eq!(config.resolved_summarization_model(), None);

        config.summarization_provider = SummarizationProvider::Gemini;
        assert_eq!(
            config.resolved_summarization_model().as_deref(),
            Some("gemini-2.5-flash")
        );

        config.summarization_model = Some("custom".into());
        assert_eq!(config.resolved_summarization_model().as_deref(), Some("custom"));
    }
}
