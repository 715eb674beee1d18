use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use tracing::warn;
use url::Url;

use crate::error::PubMinerError;

/// Hosts every PubMiner client may talk to without extra configuration.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "eutils.ncbi.nlm.nih.gov", // E-utilities
    "localhost",               // Local mirrors and test servers
    "127.0.0.1",               // Localhost alt
];

/// An HTTP client that only issues requests to approved domains.
///
/// Every request shares one bounded timeout.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    pub fn new(timeout: Duration) -> Result<Self, PubMinerError> {
        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("pubminer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PubMinerError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Whether `url` targets an allowed host or one of its subdomains.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, PubMinerError> {
        if !self.is_allowed(url) {
            // Query strings may carry the API key; report the host only.
            let host = Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "<unparseable>".to_string());
            warn!(host = %host, "Refusing request outside the allowlist");
            return Err(PubMinerError::Security(format!(
                "domain not in allowlist: {}",
                host
            )));
        }

        Ok(self.client.get(url))
    }
}
