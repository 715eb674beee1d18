//! pubminer-common — Shared errors, configuration and the sandboxed HTTP client.

pub mod config;
pub mod error;
pub mod sandbox;

pub use config::{Config, EutilsConfig, ServerConfig};
pub use error::{ErrorKind, PubMinerError, Result, Severity, Stage};
