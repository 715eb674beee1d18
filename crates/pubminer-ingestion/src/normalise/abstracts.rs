//! Detail documents → [`AbstractSections`].
//!
//! Two layouts are recognised after XML conversion:
//!   PMC efetch:    `<pmc-articleset><article><front><article-meta><abstract>`
//!   PubMed efetch: `<PubmedArticleSet><PubmedArticle>…<Abstract><AbstractText>`
//!
//! The abstract node is first decoded into an [`AbstractShape`] by looking at
//! its shape alone; only then is it turned into the canonical mapping.

use std::collections::BTreeMap;

use pubminer_common::{PubMinerError, Result, Stage};
use serde_json::Value;
use tracing::debug;

use super::{scalar_string, shape_name};
use crate::models::AbstractSections;
use crate::xml::{parse_xml, ATTRIBUTES_KEY, TEXT_KEY};

/// The closed set of abstract shapes found in detail documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbstractShape {
    /// Labeled sections, in document order.
    MultiSection(Vec<(String, String)>),
    /// One labeled or structured segment.
    SingleSection(String),
    PlainText(String),
    /// Anything else; the string names what was found.
    Malformed(String),
}

impl AbstractShape {
    /// Convert to the canonical mapping. Duplicate labels: the last one wins.
    pub fn into_sections(self, id: &str) -> Result<AbstractSections> {
        match self {
            AbstractShape::MultiSection(sections) => Ok(AbstractSections::Sections(
                sections
                    .into_iter()
                    .map(|(label, text)| (label.to_lowercase(), text))
                    .collect::<BTreeMap<_, _>>(),
            )),
            AbstractShape::SingleSection(text) | AbstractShape::PlainText(text) => {
                Ok(AbstractSections::Abstract(text))
            }
            AbstractShape::Malformed(found) => Err(PubMinerError::invalid_document(
                Stage::Fetch,
                format!("id={id}"),
                format!("unexpected abstract format: {found}"),
            )),
        }
    }
}

/// Parse one efetch XML document and extract its abstract.
pub fn extract_abstract(xml: &[u8], id: &str) -> Result<AbstractSections> {
    let doc = parse_xml(xml).map_err(|e| {
        PubMinerError::invalid_document(Stage::Fetch, format!("id={id}"), e.to_string())
    })?;
    extract_abstract_from_value(&doc, id)
}

/// Extract the abstract from an already converted detail document.
pub fn extract_abstract_from_value(doc: &Value, id: &str) -> Result<AbstractSections> {
    // efetch reports unknown or withdrawn ids inside a 200 response
    if let Some(msg) = doc.get("error").and_then(text_of) {
        return Err(PubMinerError::invalid_document(
            Stage::Fetch,
            format!("id={id}"),
            format!("upstream error: {msg}"),
        ));
    }

    let shape = decode_abstract(doc);
    debug!(id, shape = shape_label(&shape), "Decoded abstract");
    shape.into_sections(id)
}

/// Locate the abstract node of a converted detail document and classify it.
pub fn decode_abstract(doc: &Value) -> AbstractShape {
    if let Some(article) = pmc_article(doc) {
        let node = article
            .get("front")
            .and_then(|f| f.get("article-meta"))
            .and_then(|m| m.get("abstract"))
            .map(primary_abstract);
        return decode_pmc(node);
    }

    if let Some(citation) = pubmed_citation(doc) {
        let node = citation.pointer("/Article/Abstract/AbstractText");
        return decode_pubmed(node);
    }

    AbstractShape::Malformed("no article element".to_string())
}

fn first(v: &Value) -> Option<&Value> {
    match v {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}

fn pmc_article(doc: &Value) -> Option<&Value> {
    match doc.get("article") {
        Some(article) => first(article),
        None if doc.get("front").is_some() => Some(doc),
        None => None,
    }
}

fn pubmed_citation(doc: &Value) -> Option<&Value> {
    let article = match doc.get("PubmedArticle") {
        Some(article) => first(article)?,
        None => doc,
    };
    article.get("MedlineCitation")
}

// An article may carry extra typed abstracts (graphical, author summary); the
// untyped one is the abstract proper.
fn primary_abstract(node: &Value) -> &Value {
    match node {
        Value::Array(abstracts) => abstracts
            .iter()
            .find(|a| a.get(ATTRIBUTES_KEY).and_then(|attrs| attrs.get("abstract-type")).is_none())
            .or_else(|| abstracts.first())
            .unwrap_or(node),
        other => other,
    }
}

/// Text payload of a converted element: the string itself, or its `"#"` entry.
fn text_of(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get(TEXT_KEY).and_then(scalar_string),
        _ => None,
    }
}

/// Paragraph text; several paragraphs are joined with a blank line.
fn paragraphs_of(v: &Value) -> Option<String> {
    match v {
        Value::Array(paras) => {
            let parts: Vec<String> = paras
                .iter()
                .filter_map(text_of)
                .filter(|p| !p.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n\n"))
        }
        other => text_of(other),
    }
}

fn decode_pubmed(node: Option<&Value>) -> AbstractShape {
    match node {
        None | Some(Value::Null) => AbstractShape::Malformed("missing abstract".to_string()),
        Some(Value::Array(segments)) if segments.is_empty() => {
            AbstractShape::Malformed("empty section list".to_string())
        }
        Some(Value::Array(segments)) => {
            let mut sections = Vec::with_capacity(segments.len());
            for (i, segment) in segments.iter().enumerate() {
                let label = segment
                    .get(ATTRIBUTES_KEY)
                    .and_then(|attrs| attrs.get("Label"))
                    .and_then(scalar_string);
                let Some(label) = label else {
                    return AbstractShape::Malformed(format!("unlabeled segment at index {i}"));
                };
                sections.push((label, text_of(segment).unwrap_or_default()));
            }
            AbstractShape::MultiSection(sections)
        }
        Some(Value::Object(o)) => match o.get(TEXT_KEY).and_then(scalar_string) {
            Some(text) => AbstractShape::SingleSection(text),
            None => AbstractShape::Malformed("object without text".to_string()),
        },
        Some(Value::String(text)) => AbstractShape::PlainText(text.clone()),
        Some(other) => AbstractShape::Malformed(shape_name(other).to_string()),
    }
}

fn decode_pmc(node: Option<&Value>) -> AbstractShape {
    let abstract_node = match node {
        None | Some(Value::Null) => return AbstractShape::Malformed("missing abstract".to_string()),
        Some(Value::String(text)) => return AbstractShape::PlainText(text.clone()),
        Some(Value::Object(o)) => o,
        Some(other) => return AbstractShape::Malformed(shape_name(other).to_string()),
    };

    if let Some(sec) = abstract_node.get("sec") {
        return match sec {
            Value::Array(secs) if secs.is_empty() => {
                AbstractShape::Malformed("empty section list".to_string())
            }
            Value::Array(secs) => {
                let mut sections = Vec::with_capacity(secs.len());
                for (i, s) in secs.iter().enumerate() {
                    let Some(title) = s.get("title").and_then(text_of).filter(|t| !t.is_empty()) else {
                        return AbstractShape::Malformed(format!("section without title at index {i}"));
                    };
                    let Some(text) = s.get("p").and_then(paragraphs_of) else {
                        return AbstractShape::Malformed(format!("section '{title}' without paragraphs"));
                    };
                    sections.push((title, text));
                }
                AbstractShape::MultiSection(sections)
            }
            single => match single.get("p").and_then(paragraphs_of) {
                Some(text) => AbstractShape::SingleSection(text),
                None => AbstractShape::Malformed("section without paragraphs".to_string()),
            },
        };
    }

    match abstract_node.get("p") {
        Some(Value::String(text)) => AbstractShape::PlainText(text.clone()),
        Some(p @ Value::Object(_)) => match text_of(p) {
            Some(text) => AbstractShape::SingleSection(text),
            None => AbstractShape::Malformed("paragraph without text".to_string()),
        },
        Some(p @ Value::Array(_)) => match paragraphs_of(p) {
            Some(text) => AbstractShape::PlainText(text),
            None => AbstractShape::Malformed("paragraphs without text".to_string()),
        },
        Some(other) => AbstractShape::Malformed(format!("paragraph is a {}", shape_name(other))),
        None => AbstractShape::Malformed("object without sec or p".to_string()),
    }
}

fn shape_label(shape: &AbstractShape) -> &'static str {
    match shape {
        AbstractShape::MultiSection(_)  => "sections",
        AbstractShape::SingleSection(_) => "single_section",
        AbstractShape::PlainText(_)     => "plain_text",
        AbstractShape::Malformed(_)     => "malformed",
    }
}
