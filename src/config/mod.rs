mod env_manager;

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{DocForgeError, Result};
use std::fs;

pub use env_manager::{get_env_value, ApiKeys};

/// Default OpenAI-compatible endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com";
/// Default completion model
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Main configuration struct for the application
///
/// Loaded from `<config dir>/docforge/config.toml` when present, then
/// overridden from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory generated documents are written to
    pub output_dir: PathBuf,
    /// Completion backend settings
    pub llm: LlmSettings,
    /// Where projects come from and which files are considered source
    pub sources: SourceSettings,
    /// API keys for the completion backend and GitHub
    pub api_keys: ApiKeys,
}

/// Settings for the completion backend and the token budget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Model identifier sent with every request
    pub model: String,
    /// Total context window of the model
    pub max_tokens_per_request: usize,
    /// Tokens reserved for the model's answer
    pub max_tokens_for_completion: usize,
    /// Sampling temperature; omitted from the request when unset
    pub temperature: Option<f32>,
    /// Base URL of the chat completions API
    pub api_base_url: String,
    /// HTTP timeout for a single completion call
    pub timeout_seconds: u64,
}

/// Settings for uploads, clones and source file selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Root directory for extracted uploads and cloned repositories
    pub upload_dir: PathBuf,
    /// Extensions (with leading dot) analyzed when no file is selected
    pub supported_extensions: Vec<String>,
    /// File or directory names never listed
    pub ignored_names: Vec<String>,
}

impl LlmSettings {
    /// Tokens left for source code once the completion reserve is taken out
    pub fn context_budget(&self) -> usize {
        self.max_tokens_per_request
            .saturating_sub(self.max_tokens_for_completion)
    }
}

impl Config {
    /// Creates a new configuration with the specified output directory
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            llm: LlmSettings::default(),
            sources: SourceSettings::default(),
            api_keys: ApiKeys::default(),
        }
    }

    /// Loads configuration from the default config file location
    ///
    /// A missing file yields the defaults. Environment overrides are applied in both cases.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| DocForgeError::Config("Could not find config directory".into()))?;
        let config_path = config_dir.join("docforge").join("config.toml");

        let mut config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Parses a TOML configuration file without applying environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DocForgeError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies `OPENAI_*`, `GITHUB_TOKEN` and `DOCFORGE_*` environment overrides
    pub fn apply_env(&mut self) {
        self.api_keys.merge_env();
        if let Some(model) = get_env_value("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(base) = get_env_value("OPENAI_BASE_URL") {
            self.llm.api_base_url = base;
        }
        if let Some(dir) = get_env_value("DOCFORGE_UPLOAD_DIR") {
            self.sources.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get_env_value("DOCFORGE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }

    /// Checks the token budget and model, then creates the working directories
    pub async fn validate(&self) -> Result<()> {
        self.check_limits()?;
        self.ensure_directories_exist().await
    }

    /// Rejects budgets that leave no room for source code
    pub fn check_limits(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(DocForgeError::Config("model must not be empty".into()));
        }
        if self.llm.max_tokens_for_completion == 0 {
            return Err(DocForgeError::Config("max_tokens_for_completion must be positive".into()));
        }
        if self.llm.context_budget() == 0 {
            return Err(DocForgeError::Config(format!(
                "max_tokens_for_completion ({}) must be lower than max_tokens_per_request ({})",
                self.llm.max_tokens_for_completion, self.llm.max_tokens_per_request
            )));
        }
        Ok(())
    }

    /// Ensures the output and upload directories exist
    pub async fn ensure_directories_exist(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.sources.upload_dir] {
            if !tokio::fs::try_exists(dir).await? {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        Ok(())
    }

    /// Retrieves the OpenAI key or fails with a configuration error
    pub fn openai_api_key(&self) -> Result<&str> {
        self.api_keys.openai_api_key.as_deref()
            .ok_or_else(|| DocForgeError::Config("OpenAI API key not configured (set OPENAI_API_KEY)".into()))
    }

    /// Retrieves the GitHub token or fails with a configuration error
    pub fn github_token(&self) -> Result<&str> {
        self.api_keys.github_token.as_deref()
            .ok_or_else(|| DocForgeError::Config("GitHub token not configured (set GITHUB_TOKEN)".into()))
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens_per_request: 4096,
            max_tokens_for_completion: 1024,
            temperature: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_seconds: 120,
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            supported_extensions: [
                ".js", ".ts", ".jsx", ".tsx", ".py", ".java", ".php", ".cs",
                ".rb", ".go", ".c", ".cpp", ".h", ".swift", ".kt", ".rs",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            ignored_names: [".git", "node_modules", "target", "__pycache__", ".DS_Store"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(PathBuf::from("output"))
    }
}
