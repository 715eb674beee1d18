//! reqwest-backed transport, capped by the sandbox allowlist.

use async_trait::async_trait;
use pubminer_common::sandbox::SandboxClient as Client;
use pubminer_common::{EutilsConfig, PubMinerError, Result};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{classify, decode_json, EutilsRequest, EutilsTransport};

pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &EutilsConfig) -> Result<Self> {
        let mut client = Client::new(config.request_timeout())?;
        for domain in &config.extra_allowed_domains {
            client.allow_domain(domain);
        }
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn send(&self, request: &EutilsRequest) -> Result<reqwest::Response> {
        let url = request.url(&self.base_url)?;
        let resp = self
            .client
            .get(url.as_str())?
            .send()
            .await
            .map_err(|e| classify(request, e))?;

        let status = resp.status();
        debug!(endpoint = request.endpoint.path(), status = status.as_u16(), "E-utilities response");
        if !status.is_success() {
            return Err(PubMinerError::UpstreamStatus {
                stage: request.stage(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl EutilsTransport for HttpTransport {
    #[instrument(skip(self, request), fields(endpoint = request.endpoint.path(), context = %request.context()))]
    async fn get_json(&self, request: &EutilsRequest) -> Result<Value> {
        let body = self
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(|e| classify(request, e))?;
        decode_json(request, &body)
    }

    #[instrument(skip(self, request), fields(endpoint = request.endpoint.path(), context = %request.context()))]
    async fn get_xml(&self, request: &EutilsRequest) -> Result<Vec<u8>> {
        let body = self
            .send(request)
            .await?
            .bytes()
            .await
            .map_err(|e| classify(request, e))?;
        Ok(body.to_vec())
    }
}
