//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Error;
use crate::Result;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Gateway used by the router for structured classification
    #[serde(default = "default_router")]
    pub router: ProviderConfig,

    /// Gateway used by the specialized agents for reply generation
    #[serde(default = "default_responder")]
    pub responder: ProviderConfig,

    /// JSON snapshot of conversations, orders and audit rows
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

/// One LLM provider section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "gemini", "deepseek" or "openai"
    pub provider: String,

    pub model: String,

    #[serde(default)]
    pub api_key: String,

    /// Override the provider's API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-request timeout of the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Environment variables holding this provider's key and model.
    fn env_keys(&self) -> Option<(&'static str, &'static str)> {
        match self.provider.as_str() {
            "gemini" => Some(("GOOGLE_GENERATIVE_AI_API_KEY", "GOOGLE_GENERATIVE_AI_MODEL")),
            "deepseek" => Some(("DEEPSEEK_API_KEY", "DEEPSEEK_MODEL")),
            "openai" => Some(("OPENAI_API_KEY", "OPENAI_MODEL")),
            _ => None,
        }
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        let Some((key_var, model_var)) = self.env_keys() else {
            return;
        };
        if let Some(key) = non_empty(lookup(key_var)) {
            self.api_key = key;
        }
        if let Some(model) = non_empty(lookup(model_var)) {
            self.model = model;
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        default_router()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_router() -> ProviderConfig {
    ProviderConfig::new("gemini", "gemini-2.0-flash")
}

fn default_responder() -> ProviderConfig {
    ProviderConfig::new("deepseek", "deepseek-chat")
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_store_path() -> PathBuf {
    config_dir().join("store.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            router: default_router(),
            responder: default_responder(),
            store_path: default_store_path(),
        }
    }
}

impl Config {
    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.router.apply_overrides(&lookup);
        self.responder.apply_overrides(&lookup);
        if let Some(path) = non_empty(lookup("SWITCHBOARD_STORE")) {
            self.store_path = PathBuf::from(path);
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".switchboard")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration from the default path, then apply environment overrides.
///
/// A missing file is not an error: defaults plus environment are enough to run.
pub fn load() -> Result<Config> {
    let mut config = load_from(&config_path())?;
    config.apply_overrides(|name| std::env::var(name).ok());
    Ok(config)
}

/// Load configuration from `path` without environment overrides
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config at {:?}: {}", path, e)))?;
    Ok(config)
}

/// Save configuration to file
pub fn save(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    // Create parent directory
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

fn prompt_error(e: inquire::InquireError) -> Error {
    Error::Config(format!("Prompt failed: {}", e))
}

/// Ask for one provider section, starting from `current`
fn prompt_provider(role: &str, current: &ProviderConfig) -> Result<ProviderConfig> {
    use crate::agent::ProviderRegistry;
    use inquire::{Select, Text};

    let providers = ProviderRegistry::available().to_vec();
    let start = providers
        .iter()
        .position(|p| *p == current.provider)
        .unwrap_or(0);
    let provider = Select::new(&format!("Provider for the {}:", role), providers)
        .with_starting_cursor(start)
        .prompt()
        .map_err(prompt_error)?;

    let mut section = if provider == current.provider {
        current.clone()
    } else {
        match provider {
            "gemini" => default_router(),
            "openai" => ProviderConfig::new("openai", "gpt-4o-mini"),
            _ => default_responder(),
        }
    };

    let model = Text::new("Model:")
        .with_default(&section.model)
        .prompt()
        .map_err(prompt_error)?;
    section.model = model;

    let key = Text::new(&format!("API key for {} (leave empty to use the environment):", provider))
        .prompt()
        .map_err(prompt_error)?;
    if !key.trim().is_empty() {
        section.api_key = key.trim().to_string();
    }

    Ok(section)
}

/// Interactive setup wizard. Writes the config and returns it.
pub fn onboard() -> Result<Config> {
    use crate::ui;

    ui::print_header("Setup Wizard");
    println!("  Welcome! Let's configure the router and responder models.\n");

    let mut config = load_from(&config_path())?;

    ui::print_step("The router classifies every message (structured output).");
    config.router = prompt_provider("router", &config.router)?;

    ui::print_step("The responder writes the replies of the support, order and billing agents.");
    config.responder = prompt_provider("responder", &config.responder)?;

    ui::print_thinking("Saving configuration");
    save(&config)?;

    println!();
    ui::print_success(&format!("Configuration written to {:?}", config_path()));
    Ok(config)
}
