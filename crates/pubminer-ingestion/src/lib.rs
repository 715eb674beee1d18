//! pubminer-ingestion — E-utilities query chain and document normalisation.
//! Covers:
//! - esearch → elink → esummary chaining with history-server session tokens
//! - Per-article PMC detail fetch, with bounded fan-out
//! - XML → structured value conversion
//! - Normalisation of search, link, summary and abstract documents

pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod sources;
pub mod xml;

pub use models::{AbstractSections, MergedRecord, SearchResultSet, SummaryItem};
pub use pipeline::{DetailResult, QueryChain};
