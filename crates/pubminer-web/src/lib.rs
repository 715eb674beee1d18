//! pubminer-web — HTTP surface for PubMiner
//! Exposes:
//!   - Literature search (esearch → elink → esummary)
//!   - Per-article abstract retrieval, single and batched

pub mod handlers;
pub mod router;
pub mod state;
