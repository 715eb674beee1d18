//! Document normalisation.
//!
//! E-utilities does not guarantee the shape of its documents: counts arrive as
//! strings or numbers, optional sections come and go per record, and an abstract
//! can be a string, an object or an array. Everything here projects those
//! documents onto the types in [`crate::models`], or fails with
//! `InvalidDocumentFormat` naming what was missing.

pub mod abstracts;
pub mod search;
pub mod summary;

pub use abstracts::{decode_abstract, extract_abstract, extract_abstract_from_value, AbstractShape};
pub use search::{extract_link_environment, extract_link_environment_for, extract_search_result};
pub use summary::{extract_linked_ids, extract_summary_items, merge_side_dataset, MergeKey};

use serde_json::Value;

/// A string or number field as a string.
fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A count that may be serialised as `"12"` or `12`.
fn scalar_u64(v: &Value) -> Option<u64> {
    match v {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// A short name for the JSON type of `v`, for error messages.
fn shape_name(v: &Value) -> &'static str {
    match v {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}
