//! # Connector Layer
//!
//! External integrations implementing the application interfaces:
//! - Store access (DuckDB for customers, invoices and the catalog)
//! - Language understanding (rule-based, or an LLM over the Anthropic API)
//! - Reply rendering
//!
//! plus the `api` composition root and the HTTP surface.

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
