//! E-utilities query chain.
//!
//! A search runs three dependent requests:
//!   1. esearch:  stores the matching PubMed ids on the history server
//!   2. elink:    maps the stored set to PMC (`cmd=neighbor_history`)
//!   3. esummary: summaries of the linked set, one page
//!
//! Each step reads the session tokens produced by the one before, so the steps
//! are strictly sequential; the tokens travel as values and are dropped with the
//! chain. Detail fetches are independent of each other and may fan out.

use std::sync::Arc;

use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use pubminer_common::{EutilsConfig, Result};
use tracing::{debug, info, instrument, warn};

use crate::models::{AbstractSections, SearchContext, SearchResultSet, SessionTokens, SummaryItem};
use crate::normalise::{
    extract_abstract, extract_link_environment_for, extract_search_result, extract_summary_items,
};
use crate::sources::http::HttpTransport;
use crate::sources::{Endpoint, EutilsRequest, EutilsTransport};

/// Detail documents always come from PMC.
const FETCH_DB: &str = "pmc";

/// Outcome of one detail fetch inside a batch.
#[derive(Debug)]
pub struct DetailResult {
    pub id: String,
    pub outcome: Result<AbstractSections>,
}

#[derive(Clone)]
pub struct QueryChain {
    transport: Arc<dyn EutilsTransport>,
    config: Arc<EutilsConfig>,
}

impl QueryChain {
    pub fn new(transport: Arc<dyn EutilsTransport>, config: Arc<EutilsConfig>) -> Self {
        Self { transport, config }
    }

    /// A chain talking to the configured upstream over HTTP.
    pub fn from_config(config: EutilsConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), Arc::new(config)))
    }

    pub fn config(&self) -> &EutilsConfig {
        &self.config
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    pub fn search_request(&self, term: &str) -> EutilsRequest {
        EutilsRequest::new(Endpoint::ESearch)
            .param("db", self.config.search_db.as_str())
            .param("term", filtered_term(&self.config.search_filter, term))
            .param("retmode", "json")
            .param("usehistory", "y")
            .api_key(self.config.api_key())
    }

    pub fn link_request(&self, tokens: &SessionTokens) -> EutilsRequest {
        EutilsRequest::new(Endpoint::ELink)
            .param("db", self.config.link_db.as_str())
            .param("dbfrom", self.config.search_db.as_str())
            .param("linkname", self.config.link_name.as_str())
            .param("query_key", tokens.query_key.as_str())
            .param("WebEnv", tokens.web_env.as_str())
            .param("cmd", "neighbor_history")
            .param("retmode", "json")
            .api_key(self.config.api_key())
    }

    pub fn summary_request(&self, tokens: &SessionTokens) -> EutilsRequest {
        EutilsRequest::new(Endpoint::ESummary)
            .param("db", self.config.link_db.as_str())
            .param("query_key", tokens.query_key.as_str())
            .param("WebEnv", tokens.web_env.as_str())
            .param("retmode", "json")
            .param("retmax", self.config.summary_page_size.to_string())
            .api_key(self.config.api_key())
    }

    pub fn fetch_request(&self, id: &str) -> EutilsRequest {
        EutilsRequest::new(Endpoint::EFetch)
            .param("db", FETCH_DB)
            .param("id", id)
            .param("retmode", "xml")
            .api_key(self.config.api_key())
    }

    // ── Chain ─────────────────────────────────────────────────────────────────

    /// Run search → link → summary for `term`.
    ///
    /// A blank term returns an empty result set without touching the upstream.
    /// Any other term is sent and echoed back exactly as given.
    /// The first failing step aborts the chain; no partial results are returned.
    #[instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<SearchResultSet> {
        if term.trim().is_empty() {
            debug!("Empty search term, skipping upstream");
            return Ok(SearchResultSet::empty());
        }

        let searched = self.run_search(term).await?;
        let linked = self.run_link(searched).await?;
        let items = self.run_summary(&linked).await?;

        info!(
            term,
            found = linked.items_found,
            returned = linked.items_returned,
            summaries = items.len(),
            "Search chain complete"
        );

        Ok(SearchResultSet {
            search_term: linked.search_term,
            items_found: linked.items_found,
            items_returned: linked.items_returned,
            items,
        })
    }

    async fn run_search(&self, term: &str) -> Result<SearchContext> {
        let doc = self.transport.get_json(&self.search_request(term)).await?;
        let ctx = extract_search_result(&doc, term)?;
        debug!(found = ctx.items_found, query_key = %ctx.query_key, "esearch stored result set");
        Ok(ctx)
    }

    async fn run_link(&self, ctx: SearchContext) -> Result<SearchContext> {
        let doc = self.transport.get_json(&self.link_request(&ctx.tokens())).await?;
        let tokens = extract_link_environment_for(&doc, &ctx.query_key, Some(&self.config.link_name))?;
        debug!(query_key = %tokens.query_key, "elink result set");
        Ok(ctx.with_tokens(tokens))
    }

    async fn run_summary(&self, ctx: &SearchContext) -> Result<Vec<SummaryItem>> {
        let doc = self.transport.get_json(&self.summary_request(&ctx.tokens())).await?;
        extract_summary_items(&doc, &self.config.linked_id_type)
    }

    // ── Detail fetch ──────────────────────────────────────────────────────────

    /// Fetch one PMC article and extract its abstract.
    #[instrument(skip(self))]
    pub async fn fetch_detail(&self, id: &str) -> Result<AbstractSections> {
        let xml = self.transport.get_xml(&self.fetch_request(id)).await?;
        extract_abstract(&xml, id)
    }

    /// Fetch many articles with at most `concurrency` requests in flight.
    ///
    /// Results come back in the order of `ids`; a failure only affects its own entry.
    pub async fn fetch_details(&self, ids: &[String], concurrency: usize) -> Vec<DetailResult> {
        let futures: Vec<_> = ids
            .iter()
            .map(|id| {
                async move {
                    let outcome = self.fetch_detail(id).await;
                    if let Err(e) = &outcome {
                        warn!(id = %id, error = %e, "Detail fetch failed");
                    }
                    DetailResult { id: id.clone(), outcome }
                }
                .boxed()
            })
            .collect();
        stream::iter(futures)
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

fn filtered_term(filter: &str, term: &str) -> String {
    if filter.trim().is_empty() {
        term.to_string()
    } else {
        format!("({filter}) AND ({term})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use pubminer_common::PubMinerError;
    use serde_json::Value;

    struct Unreachable;

    #[async_trait]
    impl EutilsTransport for Unreachable {
        async fn get_json(&self, _request: &EutilsRequest) -> Result<Value> {
            Err(PubMinerError::Security("unreachable".into()))
        }
        async fn get_xml(&self, _request: &EutilsRequest) -> Result<Vec<u8>> {
            Err(PubMinerError::Security("unreachable".into()))
        }
    }

    fn chain(config: EutilsConfig) -> QueryChain {
        QueryChain::new(Arc::new(Unreachable), Arc::new(config))
    }

    fn tokens() -> SessionTokens {
        SessionTokens { web_env: "MCID_1".into(), query_key: "1".into() }
    }

    fn pairs(req: &EutilsRequest) -> Vec<(&str, &str)> {
        req.params.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    #[test]
    fn test_search_request_params() {
        let req = chain(EutilsConfig::default()).search_request("asthma");
        assert_eq!(req.endpoint, Endpoint::ESearch);
        assert_eq!(
            pairs(&req),
            vec![
                ("db", "pubmed"),
                ("term", "(Therapy/Broad[filter]) AND (asthma)"),
                ("retmode", "json"),
                ("usehistory", "y"),
            ]
        );
    }

    #[test]
    fn test_link_request_params() {
        let req = chain(EutilsConfig::default()).link_request(&tokens());
        assert_eq!(
            pairs(&req),
            vec![
                ("db", "pmc"),
                ("dbfrom", "pubmed"),
                ("linkname", "pubmed_pmc"),
                ("query_key", "1"),
                ("WebEnv", "MCID_1"),
                ("cmd", "neighbor_history"),
                ("retmode", "json"),
            ]
        );
    }

    #[test]
    fn test_summary_request_uses_page_size() {
        let req = chain(EutilsConfig::default().with_page_size(25)).summary_request(&tokens());
        assert_eq!(
            pairs(&req),
            vec![
                ("db", "pmc"),
                ("query_key", "1"),
                ("WebEnv", "MCID_1"),
                ("retmode", "json"),
                ("retmax", "25"),
            ]
        );
    }

    #[test]
    fn test_fetch_request_params() {
        let req = chain(EutilsConfig::default()).fetch_request("5858162");
        assert_eq!(pairs(&req), vec![("db", "pmc"), ("id", "5858162"), ("retmode", "xml")]);
    }

    #[test]
    fn test_api_key_is_appended_last_everywhere() {
        let c = chain(EutilsConfig::default().with_api_key("k"));
        for req in [
            c.search_request("x"),
            c.link_request(&tokens()),
            c.summary_request(&tokens()),
            c.fetch_request("1"),
        ] {
            assert_eq!(req.params.last(), Some(&("api_key", "k".to_string())));
        }
    }

    #[test]
    fn test_blank_filter_sends_bare_term() {
        assert_eq!(filtered_term("", "asthma"), "asthma");
        assert_eq!(filtered_term("Review[pt]", "asthma"), "(Review[pt]) AND (asthma)");
    }

    #[tokio::test]
    async fn test_blank_term_never_reaches_transport() {
        let result = chain(EutilsConfig::default()).search("   ").await.unwrap();
        assert_eq!(result, SearchResultSet::empty());
    }
}
