use async_trait::async_trait;

use crate::domain::{DomainError, RefundOutcome};

/// Marks invoice lines refunded.
///
/// All requested lines are marked or none are. Lines refunded earlier are
/// skipped and reported; a request made only of such lines is
/// `RefundOutcome::AlreadyRefunded`. A mutation that cannot complete returns
/// `DomainError::PartialFailure` with the store left untouched.
#[async_trait]
pub trait RefundExecutor: Send + Sync {
    async fn refund(&self, line_ids: &[i64]) -> Result<RefundOutcome, DomainError>;
}
