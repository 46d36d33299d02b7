//! Application configuration for bibresolve.
//!
//! User config lives at `~/.bibresolve/bibresolve.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BibError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "bibresolve.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".bibresolve";

// ---------------------------------------------------------------------------
// Config structs (matching bibresolve.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Outbound HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Provider base URLs.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Generative completion settings (annotation only).
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("bibresolve/", env!("CARGO_PKG_VERSION")).into()
}

/// `[endpoints]` section. Base URLs without trailing slash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_open_library")]
    pub open_library: String,
    #[serde(default = "default_google_books")]
    pub google_books: String,
    #[serde(default = "default_crossref")]
    pub crossref: String,
    #[serde(default = "default_oclc_classify")]
    pub oclc_classify: String,
    #[serde(default = "default_bnb_sparql")]
    pub bnb_sparql: String,
    #[serde(default = "default_openbd")]
    pub openbd: String,
    #[serde(default = "default_library_of_congress")]
    pub library_of_congress: String,
    #[serde(default = "default_youtube_oembed")]
    pub youtube_oembed: String,
    #[serde(default = "default_vimeo_oembed")]
    pub vimeo_oembed: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            open_library: default_open_library(),
            google_books: default_google_books(),
            crossref: default_crossref(),
            oclc_classify: default_oclc_classify(),
            bnb_sparql: default_bnb_sparql(),
            openbd: default_openbd(),
            library_of_congress: default_library_of_congress(),
            youtube_oembed: default_youtube_oembed(),
            vimeo_oembed: default_vimeo_oembed(),
        }
    }
}

fn default_open_library() -> String {
    "https://openlibrary.org".into()
}
fn default_google_books() -> String {
    "https://www.googleapis.com/books/v1".into()
}
fn default_crossref() -> String {
    "https://api.crossref.org".into()
}
fn default_oclc_classify() -> String {
    "http://classify.oclc.org/classify2/Classify".into()
}
fn default_bnb_sparql() -> String {
    "https://bnb.data.bl.uk/sparql".into()
}
fn default_openbd() -> String {
    "https://api.openbd.jp/v1".into()
}
fn default_library_of_congress() -> String {
    "https://www.loc.gov".into()
}
fn default_youtube_oembed() -> String {
    "https://www.youtube.com/oembed".into()
}
fn default_vimeo_oembed() -> String {
    "https://vimeo.com/api/oembed.json".into()
}

/// `[completion]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_completion_endpoint")]
    pub endpoint: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            endpoint: default_completion_endpoint(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_completion_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".into()
}

/// `[resolver]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Overall deadline for one resolution call, across all providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.bibresolve/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| BibError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.bibresolve/bibresolve.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| BibError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| BibError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| BibError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| BibError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| BibError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the completion API key from the configured env var.
pub fn completion_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.completion.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(BibError::config(format!(
            "completion API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("timeout_secs"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("openlibrary.org"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.http.timeout_secs, 10);
        assert_eq!(parsed.completion.api_key_env, "OPENROUTER_API_KEY");
        assert!(parsed.resolver.deadline_secs.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[http]
timeout_secs = 3

[endpoints]
crossref = "http://localhost:9000"

[resolver]
deadline_secs = 30
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.http.timeout_secs, 3);
        assert!(config.http.user_agent.starts_with("bibresolve/"));
        assert_eq!(config.endpoints.crossref, "http://localhost:9000");
        assert_eq!(config.endpoints.open_library, "https://openlibrary.org");
        assert_eq!(config.resolver.deadline_secs, Some(30));
    }

    #[test]
    fn api_key_lookup() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.completion.api_key_env = "BIBRESOLVE_TEST_NONEXISTENT_KEY_12345".into();
        let result = completion_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
