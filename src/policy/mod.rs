//! Policy document subsystem.
//!
//! # Design Decisions
//! - The XML is rendered once from the configured domain list
//! - Workers share the rendered bytes through an `Arc`, no locking
//! - Domains are written verbatim unless escaping is enabled

pub mod document;

pub use document::PolicyDocument;

use crate::config::DocumentConfig;

impl From<&DocumentConfig> for PolicyDocument {
    fn from(config: &DocumentConfig) -> Self {
        PolicyDocument::with_escaping(config.domains.iter().cloned(), config.escape_domains)
    }
}
