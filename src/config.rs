//! Configuration parsing and validation.
//!
//! Support Harness is configured via a TOML file (default: `config/desk.toml`).
//! Every section except `[db]` is optional and falls back to defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [db]
//! path = "./data/desk.sqlite"
//!
//! [chunking]
//! chunk_size = 500
//! chunk_overlap = 100
//!
//! [retrieval]
//! top_k = 4
//!
//! [embedding]
//! provider = "hash"          # "disabled", "hash", "openai", "ollama", or "local"
//! dims = 384
//!
//! [completion]
//! provider = "openai"        # any OpenAI-compatible endpoint; "disabled" to turn off
//! url = "https://api.groq.com/openai/v1/chat/completions"
//! model = "llama3-8b-8192"
//! api_key_env = "GROQ_API_KEY"
//!
//! [assistant]
//! business_name = "HotelsByDay"
//!
//! [website]
//! url = "https://www.hotelsbyday.com/en/hotels/united-states"
//!
//! [notify]
//! provider = "webhook"       # "log", "webhook", or "disabled"
//! url = "https://formspree.io/f/your-form"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```
//!
//! Secrets are never read from the file: API keys come from the environment
//! variables named in config.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use support_harness_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use support_harness_core::escalation::EscalationPolicy;
use support_harness_core::index::DEFAULT_BATCH_SIZE;
use support_harness_core::retrieve::DEFAULT_TOP_K;

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub escalation: EscalationPolicy,
    #[serde(default)]
    pub website: WebsiteConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub uploads: UploadsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

/// OpenAI-compatible chat-completion endpoint (Groq by default).
#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_provider")]
    pub provider: String,
    #[serde(default = "default_completion_url")]
    pub url: String,
    #[serde(default = "default_completion_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            url: default_completion_url(),
            model: default_completion_model(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_completion_provider() -> String {
    "openai".to_string()
}
fn default_completion_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}
fn default_completion_model() -> String {
    "llama3-8b-8192".to_string()
}
fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_completion_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_business_name")]
    pub business_name: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            business_name: default_business_name(),
        }
    }
}

fn default_business_name() -> String {
    "HotelsByDay".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebsiteConfig {
    #[serde(default = "default_website_url")]
    pub url: String,
    #[serde(default = "default_max_paragraphs")]
    pub max_paragraphs: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_website_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebsiteConfig {
    fn default() -> Self {
        Self {
            url: default_website_url(),
            max_paragraphs: default_max_paragraphs(),
            max_chars: default_max_chars(),
            timeout_secs: default_website_timeout_secs(),
        }
    }
}

fn default_website_url() -> String {
    "https://www.hotelsbyday.com/en/hotels/united-states".to_string()
}
fn default_max_paragraphs() -> usize {
    15
}
fn default_max_chars() -> usize {
    5000
}
fn default_website_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_provider")]
    pub provider: String,
    /// Form endpoint for the webhook provider.
    #[serde(default)]
    pub url: Option<String>,
    /// Value of the `email` form field identifying the sender.
    #[serde(default = "default_sender")]
    pub sender: String,
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            provider: default_notify_provider(),
            url: None,
            sender: default_sender(),
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

fn default_notify_provider() -> String {
    "log".to_string()
}
fn default_sender() -> String {
    "chatbot@demo.com".to_string()
}
fn default_notify_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UploadsConfig {
    /// Directory where uploaded PDFs are kept. Uploads are not retained when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Parse a TOML string and validate it.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Read, parse, and validate the config file at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    // Validate chunking
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "hash" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, hash, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0");
    }
    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    // Validate completion
    match config.completion.provider.as_str() {
        "openai" | "disabled" => {}
        other => bail!(
            "Unknown completion provider: '{}'. Must be openai or disabled.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.completion.temperature) {
        bail!("completion.temperature must be in [0.0, 2.0]");
    }

    // Validate notify
    match config.notify.provider.as_str() {
        "log" | "disabled" => {}
        "webhook" => {
            if config.notify.url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                bail!("notify.url must be set when provider is 'webhook'");
            }
        }
        other => bail!(
            "Unknown notify provider: '{}'. Must be log, webhook, or disabled.",
            other
        ),
    }

    if config.website.max_chars == 0 {
        bail!("website.max_chars must be > 0");
    }

    Ok(())
}
