use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Upload size bound enforced before content reaches the pipeline.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; dyslexify/0.1; +readable-text)".to_string()
}
fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_bytes: u64,
    /// WHATWG encoding labels tried in order after UTF-8 fails.
    #[serde(default = "default_fallback_encodings")]
    pub fallback_encodings: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_upload_bytes(),
            fallback_encodings: default_fallback_encodings(),
        }
    }
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_fallback_encodings() -> Vec<String> {
    // "latin1" and "iso-8859-1" are WHATWG aliases of windows-1252.
    vec!["windows-1252".to_string(), "iso-8859-15".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummaryConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Override for the OpenAI-compatible endpoint root (`.../v1`).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            max_input_chars: default_max_input_chars(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            system_prompt: None,
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_input_chars() -> usize {
    10_000
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.3
}

impl SummaryConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Name of the environment variable the API key is read from.
    pub fn api_key_var(&self) -> String {
        match &self.api_key_env {
            Some(var) => var.clone(),
            None if self.provider == "openai" => "OPENAI_API_KEY".to_string(),
            None => "GROQ_API_KEY".to_string(),
        }
    }

    pub fn endpoint_base(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.provider == "openai" => "https://api.openai.com/v1".to_string(),
            None => "https://api.groq.com/openai/v1".to_string(),
        }
    }
}

impl Config {
    /// Defaults used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/dyslexify.sqlite"),
            },
            fetch: FetchConfig::default(),
            upload: UploadConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    for label in &config.upload.fallback_encodings {
        if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
            anyhow::bail!("upload.fallback_encodings: unknown encoding '{}'", label);
        }
    }

    match config.summary.provider.as_str() {
        "disabled" | "groq" | "openai" => {}
        other => anyhow::bail!(
            "Unknown summary provider: '{}'. Must be disabled, groq, or openai.",
            other
        ),
    }

    if config.summary.is_enabled() {
        if config.summary.timeout_secs == 0 {
            anyhow::bail!("summary.timeout_secs must be > 0");
        }
        if config.summary.max_input_chars == 0 {
            anyhow::bail!("summary.max_input_chars must be > 0");
        }
    }

    Ok(())
}
