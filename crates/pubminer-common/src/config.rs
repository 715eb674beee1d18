//! Configuration loading for PubMiner.
//! Reads pubminer.toml from the current directory or the path in PUBMINER_CONFIG.
//! A missing file means "all defaults"; `EUTILS_API_KEY` (also read from `.env`)
//! overrides the key from the file.

use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use tracing::debug;
use url::Url;

use crate::error::{PubMinerError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub eutils: EutilsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Everything the query chain needs to know about the upstream service.
#[derive(Debug, Deserialize)]
pub struct EutilsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    #[serde(default = "default_search_db")]
    pub search_db: String,
    /// Joined with the user's term as `(<filter>) AND (<term>)`.
    #[serde(default = "default_search_filter")]
    pub search_filter: String,
    /// Target database of the link step; the summary step reads from it too.
    #[serde(default = "default_link_db")]
    pub link_db: String,
    #[serde(default = "default_link_name")]
    pub link_name: String,
    #[serde(default = "default_page_size")]
    pub summary_page_size: u32,
    #[serde(default = "default_linked_id_type")]
    pub linked_id_type: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    #[serde(default)]
    pub extra_allowed_domains: Vec<String>,
}

fn default_base_url()           -> String { "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string() }
fn default_search_db()          -> String { "pubmed".to_string() }
fn default_search_filter()      -> String { "Therapy/Broad[filter]".to_string() }
fn default_link_db()            -> String { "pmc".to_string() }
fn default_link_name()          -> String { "pubmed_pmc".to_string() }
fn default_page_size()          -> u32    { 100 }
fn default_linked_id_type()     -> String { "pmid".to_string() }
fn default_timeout_secs()       -> u64    { 30 }
// NCBI allows 3 requests/second without an API key.
fn default_detail_concurrency() -> usize  { 3 }

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .filter(|k| !k.trim().is_empty())
        .map(SecretString::from))
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            search_db: default_search_db(),
            search_filter: default_search_filter(),
            link_db: default_link_db(),
            link_name: default_link_name(),
            summary_page_size: default_page_size(),
            linked_id_type: default_linked_id_type(),
            request_timeout_secs: default_timeout_secs(),
            detail_concurrency: default_detail_concurrency(),
            extra_allowed_domains: Vec::new(),
        }
    }
}

impl EutilsConfig {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.summary_page_size = size;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .map_err(|e| PubMinerError::Config(format!("eutils.base_url '{}': {}", self.base_url, e)))?;
        if self.summary_page_size == 0 {
            return Err(PubMinerError::Config("eutils.summary_page_size must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(PubMinerError::Config("eutils.request_timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 3001 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Config {
    /// Load configuration from pubminer.toml.
    /// Checks PUBMINER_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("PUBMINER_CONFIG")
            .unwrap_or_else(|_| "pubminer.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| PubMinerError::Config(format!("reading {}: {}", path, e)))?;
            Self::from_toml_str(&content)?
        } else {
            debug!(path = %path, "Config file not found, using defaults");
            Self::default()
        };

        if let Ok(key) = std::env::var("EUTILS_API_KEY") {
            if !key.trim().is_empty() {
                config.eutils.api_key = Some(SecretString::from(key));
            }
        }

        config.eutils.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| PubMinerError::Config(e.to_string()))?;
        config.eutils.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_upstream_contract() {
        let cfg = EutilsConfig::default();
        assert_eq!(cfg.search_db, "pubmed");
        assert_eq!(cfg.link_db, "pmc");
        assert_eq!(cfg.link_name, "pubmed_pmc");
        assert_eq!(cfg.summary_page_size, 100);
        assert_eq!(cfg.search_filter, "Therapy/Broad[filter]");
        assert!(cfg.api_key().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [eutils]
            summary_page_size = 20
            api_key = "abc123"

            [server]
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(cfg.eutils.summary_page_size, 20);
        assert_eq!(cfg.eutils.api_key(), Some("abc123"));
        assert_eq!(cfg.eutils.link_name, "pubmed_pmc");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "127.0.0.1");
    }

    #[test]
    fn test_blank_api_key_is_treated_as_absent() {
        let cfg = Config::from_toml_str("[eutils]\napi_key = \"  \"\n").unwrap();
        assert!(cfg.eutils.api_key().is_none());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let err = Config::from_toml_str("[eutils]\nsummary_page_size = 0\n").unwrap_err();
        assert!(matches!(err, PubMinerError::Config(_)));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let err = Config::from_toml_str("[eutils]\nbase_url = \"nowhere\"\n").unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_api_key_is_redacted_in_debug() {
        let cfg = EutilsConfig::default().with_api_key("super-secret");
        assert!(!format!("{:?}", cfg).contains("super-secret"));
    }
}
