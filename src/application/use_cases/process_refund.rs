use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::{CustomerLookup, RefundExecutor};
use crate::domain::{
    CustomerIdentity, CustomerRef, DomainError, IdentityKind, MissingField, PurchaseLine,
    RefundFields, RefundOutcome, RefundPolicy, Resolution,
};

/// Where a refund request stands after one attempt to move it forward.
#[derive(Debug, Clone, PartialEq)]
pub enum RefundStep {
    NeedDetails(Vec<MissingField>),
    NotFound(IdentityKind),
    Ambiguous { name: String },
    NoMatchingPurchases { filtered: bool },
    AlreadyRefunded(Vec<i64>),
    OutsideWindow { window_days: i64 },
    PartialInvoiceRefused(Vec<i64>),
    AwaitingConfirmation {
        customer: CustomerRef,
        lines: Vec<PurchaseLine>,
    },
    Completed {
        lines: Vec<PurchaseLine>,
        amount: f64,
        previously_refunded: Vec<i64>,
        outside_window: Vec<i64>,
    },
    Failed(String),
}

/// Resolves the customer, narrows their purchases to what was asked for,
/// applies the refund policy and executes the refund once it is authorized.
pub struct ProcessRefundUseCase {
    lookup: Arc<dyn CustomerLookup>,
    executor: Arc<dyn RefundExecutor>,
    policy: RefundPolicy,
}

impl ProcessRefundUseCase {
    pub fn new(lookup: Arc<dyn CustomerLookup>, executor: Arc<dyn RefundExecutor>) -> Self {
        Self {
            lookup,
            executor,
            policy: RefundPolicy::new(),
        }
    }

    pub fn with_policy(mut self, policy: RefundPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RefundPolicy {
        &self.policy
    }

    /// `confirmed` is true once the customer agreed to the lines proposed to
    /// them. Without it, a name and phone identity that did not name
    /// specific lines only gets as far as `AwaitingConfirmation`.
    pub async fn execute(&self, fields: &RefundFields, confirmed: bool) -> Result<RefundStep, DomainError> {
        if let (None, Some(reference)) = (fields.invoice_id, &fields.invoice_reference) {
            debug!("Invoice number {} cannot be an invoice id", reference);
            return Ok(RefundStep::NotFound(IdentityKind::InvoiceReference(reference.clone())));
        }

        let Some(identity) = fields.identity() else {
            return Ok(RefundStep::NeedDetails(fields.missing_fields()));
        };

        info!("Resolving refund identity: {}", describe(&identity));

        let refundable = match self.lookup.resolve(&identity).await? {
            Resolution::Refundable(refundable) => refundable,
            Resolution::NotFound => {
                return Ok(RefundStep::NotFound(match identity {
                    CustomerIdentity::Invoice(id) => IdentityKind::Invoice(id),
                    CustomerIdentity::NamePhone { name, .. } => IdentityKind::Customer { name },
                }));
            }
            Resolution::Ambiguous { candidates } => {
                debug!("{} customers share the supplied name", candidates);
                let name = fields.customer_name.clone().unwrap_or_default();
                return Ok(RefundStep::Ambiguous { name });
            }
        };

        let selected: Vec<PurchaseLine> = refundable
            .lines
            .iter()
            .filter(|line| fields.selects(line))
            .cloned()
            .collect();
        let previously_refunded: Vec<i64> = refundable
            .already_refunded
            .iter()
            .filter(|line| fields.selects(line))
            .map(|line| line.invoice_line_id)
            .collect();

        let foreign: Vec<i64> = fields
            .invoice_line_ids
            .iter()
            .filter(|id| {
                !refundable
                    .lines
                    .iter()
                    .chain(refundable.already_refunded.iter())
                    .any(|line| line.invoice_line_id == **id)
            })
            .copied()
            .collect();
        if !foreign.is_empty() {
            warn!(
                "Ignoring invoice lines {:?}: they do not belong to customer {}",
                foreign, refundable.customer.customer_id
            );
        }

        if selected.is_empty() {
            if !previously_refunded.is_empty() {
                return Ok(RefundStep::AlreadyRefunded(previously_refunded));
            }
            let filtered = fields.has_purchase_filters() || !fields.invoice_line_ids.is_empty();
            return Ok(RefundStep::NoMatchingPurchases { filtered });
        }

        let (eligible, outside): (Vec<PurchaseLine>, Vec<PurchaseLine>) = selected
            .into_iter()
            .partition(|line| self.policy.is_within_window(line));
        let outside_window: Vec<i64> = outside.iter().map(|line| line.invoice_line_id).collect();

        if eligible.is_empty() {
            return Ok(RefundStep::OutsideWindow {
                window_days: self.policy.window_days.unwrap_or_default(),
            });
        }

        if !self.policy.allow_partial_invoice {
            let partial = self.partially_covered_invoices(&eligible, &refundable.lines);
            if !partial.is_empty() {
                return Ok(RefundStep::PartialInvoiceRefused(partial));
            }
        }

        let direct = identity.is_invoice() || !fields.invoice_line_ids.is_empty();
        if !direct && !confirmed {
            return Ok(RefundStep::AwaitingConfirmation {
                customer: refundable.customer,
                lines: eligible,
            });
        }

        let line_ids: Vec<i64> = eligible.iter().map(|line| line.invoice_line_id).collect();
        match self.executor.refund(&line_ids).await {
            Ok(RefundOutcome::Refunded {
                line_ids,
                amount,
                already_refunded,
            }) => {
                info!(
                    "Refunded {} line(s) for customer {}: {:.2}",
                    line_ids.len(),
                    refundable.customer.customer_id,
                    amount
                );
                let lines = eligible
                    .into_iter()
                    .filter(|line| line_ids.contains(&line.invoice_line_id))
                    .collect();
                let mut previously_refunded = previously_refunded;
                previously_refunded.extend(already_refunded);
                Ok(RefundStep::Completed {
                    lines,
                    amount,
                    previously_refunded,
                    outside_window,
                })
            }
            Ok(RefundOutcome::AlreadyRefunded { line_ids }) => Ok(RefundStep::AlreadyRefunded(line_ids)),
            Err(e) if e.is_partial_failure() => {
                warn!("Refund of {:?} did not complete: {}", line_ids, e);
                Ok(RefundStep::Failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    /// Invoices with refundable lines in the window that `eligible` leaves out.
    fn partially_covered_invoices(&self, eligible: &[PurchaseLine], open: &[PurchaseLine]) -> Vec<i64> {
        let chosen: BTreeSet<i64> = eligible.iter().map(|line| line.invoice_line_id).collect();
        let invoices: BTreeSet<i64> = eligible.iter().map(|line| line.invoice_id).collect();
        invoices
            .into_iter()
            .filter(|invoice_id| {
                open.iter().any(|line| {
                    line.invoice_id == *invoice_id
                        && !chosen.contains(&line.invoice_line_id)
                        && self.policy.is_within_window(line)
                })
            })
            .collect()
    }
}

fn describe(identity: &CustomerIdentity) -> String {
    match identity {
        CustomerIdentity::Invoice(id) => format!("invoice {}", id),
        CustomerIdentity::NamePhone { name, .. } => format!("customer '{}'", name),
    }
}
