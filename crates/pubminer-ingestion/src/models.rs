//! Data models for the E-utilities query chain.

use std::collections::BTreeMap;

use serde::ser::{Error as _, SerializeMap};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// `uid` → linked identifier of one requested type. Uids without a match are absent.
pub type LinkedIdMap = BTreeMap<String, String>;

/// The `(WebEnv, query_key)` pair naming one stored result set upstream.
///
/// Only valid for the session that issued it and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub web_env: String,
    pub query_key: String,
}

/// Outcome of the search step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchContext {
    pub search_term: String,
    pub web_env: String,
    pub query_key: String,
    pub items_found: u64,
    pub items_returned: u64,
}

impl SearchContext {
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens {
            web_env: self.web_env.clone(),
            query_key: self.query_key.clone(),
        }
    }

    /// A new context pointing at the result set named by `tokens`.
    pub fn with_tokens(self, tokens: SessionTokens) -> Self {
        Self {
            web_env: tokens.web_env,
            query_key: tokens.query_key,
            ..self
        }
    }
}

/// One summary record, in upstream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryItem {
    pub uid: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pubdate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linked_id: Option<String>,
}

/// Caller-facing result of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultSet {
    pub search_term: String,
    pub items_found: u64,
    pub items_returned: u64,
    pub items: Vec<SummaryItem>,
}

impl SearchResultSet {
    /// The result of searching for nothing.
    pub fn empty() -> Self {
        Self {
            search_term: String::new(),
            items_found: 0,
            items_returned: 0,
            items: Vec::new(),
        }
    }
}

/// Canonical abstract of one detail document.
///
/// Serialises as a flat map: `{"background": .., "results": ..}` or `{"abstract": ..}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractSections {
    /// Lower-cased section label → section text.
    Sections(BTreeMap<String, String>),
    /// A document without labeled sections.
    Abstract(String),
}

impl AbstractSections {
    pub const ABSTRACT_KEY: &'static str = "abstract";

    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            AbstractSections::Sections(map) => map.get(key).map(String::as_str),
            AbstractSections::Abstract(text) if key == Self::ABSTRACT_KEY => Some(text),
            AbstractSections::Abstract(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AbstractSections::Sections(map) => map.len(),
            AbstractSections::Abstract(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Serialize for AbstractSections {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AbstractSections::Sections(map) => map.serialize(serializer),
            AbstractSections::Abstract(text) => {
                let mut m = serializer.serialize_map(Some(1))?;
                m.serialize_entry(Self::ABSTRACT_KEY, text)?;
                m.end()
            }
        }
    }
}

/// A summary item with side-dataset fields (e.g. demographic annotations) merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub item: SummaryItem,
    pub side: Map<String, Value>,
}

impl MergedRecord {
    /// Flattened JSON object; a side field overwrites a same-named item field.
    pub fn to_json(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut out = match serde_json::to_value(&self.item)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        out.extend(self.side.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(out)
    }
}

impl Serialize for MergedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().map_err(S::Error::custom)?.serialize(serializer)
    }
}
