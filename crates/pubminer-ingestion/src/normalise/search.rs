//! esearch and elink documents → session state.

use pubminer_common::{PubMinerError, Result, Stage};
use serde_json::Value;
use tracing::debug;

use super::{scalar_string, scalar_u64};
use crate::models::{SearchContext, SessionTokens};

/// Project an esearch JSON document (`usehistory=y`) onto a [`SearchContext`].
pub fn extract_search_result(doc: &Value, term: &str) -> Result<SearchContext> {
    let invalid = |reason: String| {
        PubMinerError::invalid_document(Stage::Search, format!("term={term}"), reason)
    };

    let result = doc
        .get("esearchresult")
        .filter(|r| r.is_object())
        .ok_or_else(|| invalid("esearchresult missing".to_string()))?;

    if let Some(msg) = result.get("ERROR").and_then(scalar_string) {
        return Err(invalid(format!("upstream error: {msg}")));
    }

    let count = |field: &str| {
        result
            .get(field)
            .and_then(scalar_u64)
            .ok_or_else(|| invalid(format!("esearchresult.{field} missing or not an integer")))
    };
    let token = |field: &str| {
        result
            .get(field)
            .and_then(scalar_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid(format!("esearchresult.{field} missing")))
    };

    Ok(SearchContext {
        search_term: term.to_string(),
        items_found: count("count")?,
        items_returned: count("retmax")?,
        web_env: token("webenv")?,
        query_key: token("querykey")?,
    })
}

/// Session tokens the summary step must use after an elink with
/// `cmd=neighbor_history`.
///
/// The link step only stores a new result set when the response carries
/// `linksetdbhistories`. Without it the linked set is the searched set, so the
/// previous query key stays valid under the returned `webenv`.
pub fn extract_link_environment(doc: &Value, previous_query_key: &str) -> Result<SessionTokens> {
    extract_link_environment_for(doc, previous_query_key, None)
}

/// Like [`extract_link_environment`], preferring the history entry stored for
/// `link_name` when several links were requested.
pub fn extract_link_environment_for(
    doc: &Value,
    previous_query_key: &str,
    link_name: Option<&str>,
) -> Result<SessionTokens> {
    let invalid = |reason: String| {
        PubMinerError::invalid_document(Stage::Link, format!("query_key={previous_query_key}"), reason)
    };

    let linkset = doc
        .get("linksets")
        .and_then(Value::as_array)
        .and_then(|sets| sets.first())
        .ok_or_else(|| match doc.get("ERROR").and_then(scalar_string) {
            Some(msg) => invalid(format!("upstream error: {msg}")),
            None => invalid("linksets[0] missing".to_string()),
        })?;

    let web_env = linkset
        .get("webenv")
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("linksets[0].webenv missing".to_string()))?;

    let histories = match linkset.get("linksetdbhistories") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(h)) => h.as_slice(),
        Some(_) => return Err(invalid("linksetdbhistories is not an array".to_string())),
    };

    if histories.is_empty() {
        debug!(query_key = previous_query_key, "elink stored no new history, reusing query key");
        return Ok(SessionTokens {
            web_env,
            query_key: previous_query_key.to_string(),
        });
    }

    let history = link_name
        .and_then(|name| {
            histories
                .iter()
                .find(|h| h.get("linkname").and_then(Value::as_str) == Some(name))
        })
        .unwrap_or(&histories[0]);

    let query_key = history
        .get("querykey")
        .and_then(scalar_string)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid("linksetdbhistories entry has no querykey".to_string()))?;

    Ok(SessionTokens { web_env, query_key })
}
