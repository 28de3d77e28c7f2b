use async_trait::async_trait;

use crate::domain::{CatalogEntry, CatalogQuery, DomainError};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// At most `query.limit()` entries, ordered by artist, album then track.
    /// No match is an empty list.
    async fn search(&self, query: &CatalogQuery) -> Result<Vec<CatalogEntry>, DomainError>;
}
