mod catalog_repository;
mod customer_lookup;
mod field_extractor;
mod intent_classifier;
mod refund_executor;
mod response_renderer;

pub use catalog_repository::*;
pub use customer_lookup::*;
pub use field_extractor::*;
pub use intent_classifier::*;
pub use refund_executor::*;
pub use response_renderer::*;
