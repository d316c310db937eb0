use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `[llm] api_key` from the config file.
pub const API_KEY_ENV: &str = "MEMO_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub llm: LlmConfig,
}

/// Where to find source files and which suffixes are eligible.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            extensions: default_extensions(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    vec![
        ".md".to_string(),
        ".txt".to_string(),
        ".go".to_string(),
        ".rs".to_string(),
    ]
}

/// On-disk locations of the state catalogue, the note collection, and the
/// generated documentation tree.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    #[serde(default = "default_notes_file")]
    pub notes_file: PathBuf,
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            notes_file: default_notes_file(),
            docs_dir: default_docs_dir(),
        }
    }
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".memory/state.json")
}

fn default_notes_file() -> PathBuf {
    PathBuf::from(".memory/notes.json")
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs/memory")
}

/// Connection settings for the OpenAI-compatible model server.
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token. Local model servers usually ignore it, but the header
    /// is always sent; `MEMO_API_KEY` in the environment takes precedence.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    pub chat_model: String,
    pub embed_model: String,
    #[serde(default = "default_chat_timeout_secs")]
    pub chat_timeout_secs: u64,
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_api_key() -> String {
    "not-used-in-local-llm-mode".to_string()
}

fn default_chat_timeout_secs() -> u64 {
    60
}

fn default_embed_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            config.llm.api_key = key;
        }
    }

    // Validate source
    if config.source.root.as_os_str().is_empty() {
        anyhow::bail!("source.root must not be empty");
    }
    if config.source.extensions.is_empty() {
        anyhow::bail!("source.extensions must list at least one suffix");
    }

    // Validate storage
    if config.storage.state_file.as_os_str().is_empty() {
        anyhow::bail!("storage.state_file must not be empty");
    }
    if config.storage.notes_file.as_os_str().is_empty() {
        anyhow::bail!("storage.notes_file must not be empty");
    }
    if config.storage.docs_dir.as_os_str().is_empty() {
        anyhow::bail!("storage.docs_dir must not be empty");
    }

    // Validate llm
    if config.llm.base_url.is_empty() {
        anyhow::bail!("llm.base_url must not be empty");
    }
    if config.llm.chat_model.is_empty() {
        anyhow::bail!("llm.chat_model must not be empty");
    }
    if config.llm.embed_model.is_empty() {
        anyhow::bail!("llm.embed_model must not be empty");
    }
    if config.llm.chat_timeout_secs == 0 || config.llm.embed_timeout_secs == 0 {
        anyhow::bail!("llm timeouts must be > 0 seconds");
    }

    Ok(config)
}
