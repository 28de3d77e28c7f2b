use std::sync::Arc;

use tracing::info;

use crate::application::CustomerLookup;
use crate::domain::{CustomerIdentity, DomainError, Resolution};

/// Read-only view of what a customer bought.
pub struct ListPurchasesUseCase {
    lookup: Arc<dyn CustomerLookup>,
}

impl ListPurchasesUseCase {
    pub fn new(lookup: Arc<dyn CustomerLookup>) -> Self {
        Self { lookup }
    }

    pub async fn execute(&self, identity: CustomerIdentity) -> Result<Resolution, DomainError> {
        info!("Listing purchases for {:?}", identity);
        self.lookup.resolve(&identity).await
    }
}
