use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::application::CatalogRepository;
use crate::domain::{CatalogEntry, CatalogQuery, DomainError};

pub struct SearchCatalogUseCase {
    repository: Arc<dyn CatalogRepository>,
    max_results: usize,
}

impl SearchCatalogUseCase {
    pub const DEFAULT_MAX_RESULTS: usize = 25;

    pub fn new(repository: Arc<dyn CatalogRepository>) -> Self {
        Self {
            repository,
            max_results: Self::DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub async fn execute(&self, query: CatalogQuery) -> Result<Vec<CatalogEntry>, DomainError> {
        let query = if query.limit() > self.max_results {
            query.with_limit(self.max_results)
        } else {
            query
        };

        info!("Searching catalog for {}", query.describe());
        let start_time = Instant::now();

        let entries = self.repository.search(&query).await?;

        info!(
            "Catalog search returned {} entries in {:?}",
            entries.len(),
            start_time.elapsed()
        );
        Ok(entries)
    }
}
