use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_target_chars")]
    pub target_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            target_chars: default_target_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_target_chars() -> usize {
    800
}
fn default_overlap_chars() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Max content chunks returned per search tool call.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Maximum cosine distance at which a catalog match is still accepted.
    #[serde(default = "default_catalog_distance_max")]
    pub catalog_distance_max: f32,
    /// Maximum tool-calling rounds per query.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            catalog_distance_max: default_catalog_distance_max(),
            max_tool_rounds: default_max_tool_rounds(),
        }
    }
}

fn default_max_results() -> usize {
    5
}
fn default_catalog_distance_max() -> f32 {
    0.6
}
fn default_max_tool_rounds() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_disabled")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_disabled(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_disabled() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_model")]
    pub model: String,
    #[serde(default = "default_generator_url")]
    pub url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_generator_model(),
            url: default_generator_url(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            max_retries: default_max_retries(),
            timeout_secs: default_generator_timeout_secs(),
        }
    }
}

fn default_generator_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_generator_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_max_tokens() -> u32 {
    800
}
fn default_generator_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Number of past exchanges kept per session.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

fn default_max_history() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Default document directory for `lectern ingest` without a path argument.
    pub root: Option<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            root: None,
            include_globs: default_include_globs(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.target_chars == 0 {
        anyhow::bail!("chunking.target_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.target_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.target_chars");
    }

    if config.retrieval.max_results == 0 {
        anyhow::bail!("retrieval.max_results must be >= 1");
    }
    if config.retrieval.max_tool_rounds == 0 {
        anyhow::bail!("retrieval.max_tool_rounds must be >= 1");
    }
    if !(0.0..=2.0).contains(&config.retrieval.catalog_distance_max) {
        anyhow::bail!("retrieval.catalog_distance_max must be in [0.0, 2.0]");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    Ok(config)
}
