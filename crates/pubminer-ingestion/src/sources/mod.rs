//! E-utilities transport.
//!
//! The query chain only ever talks to the upstream through [`EutilsTransport`],
//! so the HTTP client can be swapped for a recorded fixture in tests.
//!
//! Endpoints used:
//!   esearch:  https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi
//!   elink:    cross-database links stored on the history server
//!   esummary: document summaries for a stored result set
//!   efetch:   full PMC XML for one article

pub mod http;

use async_trait::async_trait;
use pubminer_common::{PubMinerError, Result, Stage};
use reqwest::Url;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    ESearch,
    ELink,
    ESummary,
    EFetch,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ESearch  => "esearch.fcgi",
            Endpoint::ELink    => "elink.fcgi",
            Endpoint::ESummary => "esummary.fcgi",
            Endpoint::EFetch   => "efetch.fcgi",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Endpoint::ESearch  => Stage::Search,
            Endpoint::ELink    => Stage::Link,
            Endpoint::ESummary => Stage::Summary,
            Endpoint::EFetch   => Stage::Fetch,
        }
    }
}

/// One GET against an E-utilities endpoint. Parameters keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EutilsRequest {
    pub endpoint: Endpoint,
    pub params: Vec<(&'static str, String)>,
}

impl EutilsRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, params: Vec::new() }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Appends `api_key` when one is configured.
    pub fn api_key(self, key: Option<&str>) -> Self {
        match key {
            Some(k) => self.param("api_key", k),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn stage(&self) -> Stage {
        self.endpoint.stage()
    }

    /// Short description of what was asked for, safe to log (never includes the API key).
    pub fn context(&self) -> String {
        ["id", "query_key", "term"]
            .iter()
            .find_map(|key| self.get(key).map(|v| format!("{key}={v}")))
            .unwrap_or_else(|| self.endpoint.path().to_string())
    }

    pub fn url(&self, base_url: &str) -> Result<Url> {
        let endpoint = format!("{}/{}", base_url.trim_end_matches('/'), self.endpoint.path());
        Url::parse_with_params(&endpoint, self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .map_err(|e| PubMinerError::Config(format!("invalid E-utilities URL {}: {}", endpoint, e)))
    }
}

/// Issues E-utilities requests. JSON endpoints return the parsed body, XML
/// endpoints the raw bytes; failures are already classified.
#[async_trait]
pub trait EutilsTransport: Send + Sync {
    async fn get_json(&self, request: &EutilsRequest) -> Result<Value>;

    async fn get_xml(&self, request: &EutilsRequest) -> Result<Vec<u8>>;
}

/// Maps a reqwest failure (connect, timeout, interrupted body) onto the
/// transport kind. Body content is judged separately by [`decode_json`].
pub fn classify(request: &EutilsRequest, err: reqwest::Error) -> PubMinerError {
    // The request URL carries the API key.
    PubMinerError::Transport { stage: request.stage(), source: err.without_url() }
}

/// Parses a fully received JSON body.
pub fn decode_json(request: &EutilsRequest, body: &[u8]) -> Result<Value> {
    serde_json::from_slice(body).map_err(|e| {
        PubMinerError::invalid_document(request.stage(), request.context(), format!("body is not JSON: {e}"))
    })
}
