use async_trait::async_trait;

use crate::domain::{CatalogQuery, DomainError, RefundFields};

/// Pulls structured fields out of free text.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Any subset of the refund fields, possibly none.
    async fn extract_refund_fields(&self, utterance: &str) -> Result<RefundFields, DomainError>;

    /// Catalog criteria mentioned in the utterance. An utterance naming no
    /// criteria yields a query carrying only its free text.
    async fn extract_catalog_criteria(&self, utterance: &str) -> Result<CatalogQuery, DomainError>;
}
