mod anthropic_client;
mod chat_client;
mod duckdb_catalog_repository;
mod duckdb_customer_lookup;
mod duckdb_refund_executor;
mod duckdb_store;
mod llm_field_extractor;
mod llm_intent_classifier;
mod llm_json;
mod mock_chat_client;
mod rule_based_field_extractor;
mod rule_based_intent_classifier;
mod template_renderer;

pub use anthropic_client::*;
pub use chat_client::*;
pub use duckdb_catalog_repository::*;
pub use duckdb_customer_lookup::*;
pub use duckdb_refund_executor::*;
pub use duckdb_store::*;
pub use llm_field_extractor::*;
pub use llm_intent_classifier::*;
pub use mock_chat_client::*;
pub use rule_based_field_extractor::*;
pub use rule_based_intent_classifier::*;
pub use template_renderer::*;
