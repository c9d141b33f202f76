use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_NAME: &str = "keyql";
const CONFIG_FILE: &str = "config.json";

/// A search site the pipeline can compile for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,

    /// Page metadata API (`api.php`) used to resolve page ids
    #[serde(default)]
    pub api_endpoint: Option<String>,

    /// SPARQL endpoint serving the category graph
    #[serde(default)]
    pub sparql_endpoint: Option<String>,

    /// URI prefix of category nodes in the graph, e.g. `https://en.wikipedia.org/wiki/`
    #[serde(default)]
    pub category_uri_prefix: Option<String>,
}

impl SiteConfig {
    /// Site with no external endpoints
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            api_endpoint: None,
            sparql_endpoint: None,
            category_uri_prefix: None,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new("local")
    }
}

/// Regex keyword settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegexConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backend has the native trigram-accelerated regex query
    #[serde(default = "default_true")]
    pub native_plugin: bool,

    /// Backend can run the slow script fallback
    #[serde(default)]
    pub script_fallback: bool,

    #[serde(default = "default_max_determinized_states")]
    pub max_determinized_states: u32,

    #[serde(default)]
    pub max_ngrams_extracted: Option<u32>,

    #[serde(default)]
    pub max_ngram_clauses: Option<u32>,

    /// Locale used for case-insensitive matching
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_true")]
    pub highlighter_supports_regex: bool,
}

impl Default for RegexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            native_plugin: true,
            script_fallback: false,
            max_determinized_states: default_max_determinized_states(),
            max_ngrams_extracted: None,
            max_ngram_clauses: None,
            language: default_language(),
            highlighter_supports_regex: true,
        }
    }
}

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site the queries are compiled for
    #[serde(default)]
    pub host: SiteConfig,

    /// Sites a federated query also runs against
    #[serde(default)]
    pub sister_sites: Vec<SiteConfig>,

    /// Timeout applied to each external service call
    #[serde(default = "default_service_timeout_ms")]
    pub service_timeout_ms: u64,

    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    #[serde(default = "default_max_incategory_options")]
    pub max_incategory_options: usize,

    #[serde(default = "default_max_template_conditions")]
    pub max_template_conditions: usize,

    #[serde(default = "default_deepcat_max_depth")]
    pub deepcat_max_depth: u32,

    /// Maximum number of categories a deepcat closure may contain
    #[serde(default = "default_deepcat_limit")]
    pub deepcat_limit: usize,

    #[serde(default)]
    pub regex: RegexConfig,

    /// Lowercase namespace name to namespace id
    #[serde(default = "default_namespaces")]
    pub namespaces: BTreeMap<String, i64>,

    /// Valid `articletopic:` values
    #[serde(default = "default_article_topics")]
    pub article_topics: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_max_determinized_states() -> u32 {
    20_000
}

fn default_language() -> String {
    "en".to_string()
}

fn default_service_timeout_ms() -> u64 {
    3_000
}

fn default_max_query_length() -> usize {
    2_048
}

fn default_max_incategory_options() -> usize {
    100
}

fn default_max_template_conditions() -> usize {
    256
}

fn default_deepcat_max_depth() -> u32 {
    5
}

fn default_deepcat_limit() -> usize {
    256
}

fn default_namespaces() -> BTreeMap<String, i64> {
    [
        ("talk", 1),
        ("user", 2),
        ("user talk", 3),
        ("project", 4),
        ("project talk", 5),
        ("file", 6),
        ("file talk", 7),
        ("mediawiki", 8),
        ("mediawiki talk", 9),
        ("template", 10),
        ("template talk", 11),
        ("help", 12),
        ("help talk", 13),
        ("category", 14),
        ("category talk", 15),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id))
    .collect()
}

fn default_article_topics() -> Vec<String> {
    [
        "biography",
        "business-and-economics",
        "culture",
        "education",
        "geography",
        "history",
        "literature",
        "mathematics",
        "medicine-and-health",
        "music",
        "politics",
        "sports",
        "stem",
        "technology",
        "visual-arts",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: SiteConfig::default(),
            sister_sites: Vec::new(),
            service_timeout_ms: default_service_timeout_ms(),
            max_query_length: default_max_query_length(),
            max_incategory_options: default_max_incategory_options(),
            max_template_conditions: default_max_template_conditions(),
            deepcat_max_depth: default_deepcat_max_depth(),
            deepcat_limit: default_deepcat_limit(),
            regex: RegexConfig::default(),
            namespaces: default_namespaces(),
            article_topics: default_article_topics(),
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load config from an explicit path, or return default if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Save config to the app data directory
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_millis(self.service_timeout_ms)
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}
