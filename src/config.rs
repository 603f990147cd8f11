//! Runtime configuration read from the environment (and an optional `.env`).

use crate::doc_processor::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embedding::{
    EmbeddingConfig, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL,
};
use crate::index::DEFAULT_TOP_K;
use crate::llm::{claude::ClaudeConfig, gemini, openai::OpenAiConfig, Provider};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingKey(&'static str),
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    Claude,
    Ollama,
}

impl ProviderKind {
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Claude => "claude-sonnet-4-20250514",
            ProviderKind::Ollama => "llama3",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "ollama" => Ok(ProviderKind::Ollama),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub llm: LlmSettings,
    pub embedding: EmbeddingConfig,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("CURABOT_LLM_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>().map_err(|_| ConfigError::Invalid {
                var: "CURABOT_LLM_PROVIDER",
                value: raw,
            })?,
            None => ProviderKind::Gemini,
        };

        let (api_key, base_url) = match provider {
            ProviderKind::Gemini => (
                get("GOOGLE_API_KEY").ok_or(ConfigError::MissingKey("GOOGLE_API_KEY"))?,
                get("GEMINI_BASE_URL").unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string()),
            ),
            ProviderKind::OpenAi => (
                get("OPENAI_API_KEY").ok_or(ConfigError::MissingKey("OPENAI_API_KEY"))?,
                get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            ),
            ProviderKind::Claude => (
                get("ANTHROPIC_API_KEY").ok_or(ConfigError::MissingKey("ANTHROPIC_API_KEY"))?,
                get("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|| "https://api.anthropic.com".to_string()),
            ),
            ProviderKind::Ollama => (
                String::new(),
                get("OLLAMA_HOST").unwrap_or_else(|| "http://localhost:11434".to_string()),
            ),
        };

        let llm = LlmSettings {
            provider,
            model: get("CURABOT_LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            temperature: parse_or(&get, "CURABOT_TEMPERATURE", 0.3)?,
            api_key,
            base_url,
        };

        let embedding = EmbeddingConfig {
            base_url: get("CURABOT_EMBEDDING_URL").unwrap_or_else(|| DEFAULT_EMBEDDING_URL.to_string()),
            api_key: get("CURABOT_EMBEDDING_API_KEY").unwrap_or_default(),
            model: get("CURABOT_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            dimensions: parse_or(&get, "CURABOT_EMBEDDING_DIMENSIONS", DEFAULT_EMBEDDING_DIMENSIONS)?,
        };

        Ok(Self {
            database_path: get("CURABOT_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("healthmate.db")),
            upload_dir: get("CURABOT_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            llm,
            embedding,
            chunk_size: parse_or(&get, "CURABOT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_or(&get, "CURABOT_CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            top_k: parse_or(&get, "CURABOT_TOP_K", DEFAULT_TOP_K)?,
        })
    }

    pub fn provider(&self) -> Provider {
        let api_key = self.llm.api_key.clone();
        let base_url = self.llm.base_url.clone();
        match self.llm.provider {
            ProviderKind::Gemini => Provider::Gemini(gemini::GeminiConfig { api_key, base_url }),
            ProviderKind::OpenAi => Provider::OpenAi(OpenAiConfig { api_key, base_url }),
            ProviderKind::Claude => Provider::Claude(ClaudeConfig { api_key, base_url }),
            ProviderKind::Ollama => Provider::ollama(base_url),
        }
    }

    /// Settings for display, with secrets masked.
    pub fn masked(&self) -> BTreeMap<&'static str, String> {
        let mut map = BTreeMap::new();
        map.insert("database", self.database_path.display().to_string());
        map.insert("upload_dir", self.upload_dir.display().to_string());
        map.insert("llm_provider", format!("{:?}", self.llm.provider).to_lowercase());
        map.insert("llm_model", self.llm.model.clone());
        map.insert("llm_base_url", self.llm.base_url.clone());
        map.insert("llm_api_key", mask_secret(&self.llm.api_key));
        map.insert("embedding_url", self.embedding.base_url.clone());
        map.insert("embedding_model", self.embedding.model.clone());
        map.insert("embedding_api_key", mask_secret(&self.embedding.api_key));
        map.insert(
            "chunking",
            format!("{}/{}", self.chunk_size, self.chunk_overlap),
        );
        map.insert("top_k", self.top_k.to_string());
        map
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(default),
    }
}

/// Keep the first and last four characters of long secrets.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else if value.is_empty() {
        String::new()
    } else {
        "****".to_string()
    }
}
