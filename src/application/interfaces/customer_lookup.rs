use async_trait::async_trait;

use crate::domain::{CustomerIdentity, DomainError, Resolution};

/// Read-only resolution of a customer identity to their purchases.
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    /// Same-name customers are told apart by phone number only; when that
    /// does not leave exactly one, the answer is `Ambiguous` or `NotFound`.
    async fn resolve(&self, identity: &CustomerIdentity) -> Result<Resolution, DomainError>;
}
