//! Application configuration for CourseBuilder.
//!
//! User config lives at `~/.coursebuilder/coursebuilder.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CourseBuilderError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursebuilder.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursebuilder";

// ---------------------------------------------------------------------------
// Config structs (matching coursebuilder.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults for a generation run.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Number of chapters to generate.
    #[serde(default = "default_chapters")]
    pub chapters: u32,

    /// Number of interactive simulations to generate.
    #[serde(default = "default_simulations")]
    pub simulations: u32,

    /// Number of concepts requested for the learning graph.
    #[serde(default = "default_concepts")]
    pub concepts: u32,

    /// Deployment target: "none" or "github-pages".
    #[serde(default = "default_deploy")]
    pub deploy: String,

    /// Maximum in-flight generation requests during a fan-out.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            chapters: default_chapters(),
            simulations: default_simulations(),
            concepts: default_concepts(),
            deploy: default_deploy(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_chapters() -> u32 {
    12
}
fn default_simulations() -> u32 {
    5
}
fn default_concepts() -> u32 {
    200
}
fn default_deploy() -> String {
    "none".into()
}
fn default_concurrency() -> usize {
    8
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// API base URL (overridable for proxies and tests).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default model to generate with.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default `max_tokens` per request.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".into()
}
fn default_model() -> String {
    "claude-sonnet-4-5".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_timeout_secs() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursebuilder/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CourseBuilderError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursebuilder/coursebuilder.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CourseBuilderError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CourseBuilderError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CourseBuilderError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CourseBuilderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CourseBuilderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Anthropic API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.anthropic.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(CourseBuilderError::config(format!(
            "Anthropic API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://console.anthropic.com/settings/keys"
        ))),
    }
}

/// Check that the Anthropic API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("chapters"));
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.chapters, 12);
        assert_eq!(parsed.defaults.simulations, 5);
        assert_eq!(parsed.defaults.concepts, 200);
        assert_eq!(parsed.anthropic.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
chapters = 6
deploy = "github-pages"

[anthropic]
default_model = "claude-opus-4-1"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.chapters, 6);
        assert_eq!(config.defaults.concepts, 200);
        assert_eq!(config.defaults.concurrency, 8);
        assert_eq!(config.defaults.deploy, "github-pages");
        assert_eq!(config.anthropic.default_model, "claude-opus-4-1");
        assert_eq!(config.anthropic.base_url, "https://api.anthropic.com");
    }

    #[test]
    fn load_config_from_reports_parse_errors() {
        let dir = std::env::temp_dir().join(format!("cb-config-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[defaults\nchapters = ").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "CB_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
