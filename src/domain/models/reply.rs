use serde::{Deserialize, Serialize};

use super::{CatalogEntry, MissingField, PurchaseLine};

/// The identity that failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Invoice(i64),
    /// An invoice number that cannot exist, kept as the customer typed it.
    InvoiceReference(String),
    Customer { name: String },
}

/// One piece of structured handler output. A turn produces one or more of
/// these, which a renderer turns into the reply text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyPart {
    Menu,
    NeedRefundDetails {
        missing: Vec<MissingField>,
    },
    ConfirmRefund {
        customer_name: String,
        lines: Vec<PurchaseLine>,
    },
    Refunded {
        lines: Vec<PurchaseLine>,
        amount: f64,
        /// Requested lines skipped because they were refunded before.
        previously_refunded: Vec<i64>,
        /// Requested lines skipped because they fall outside the refund window.
        outside_window: Vec<i64>,
    },
    AlreadyRefunded {
        line_ids: Vec<i64>,
    },
    RefundCancelled,
    IdentityNotFound {
        identity: IdentityKind,
    },
    AmbiguousCustomer {
        name: String,
    },
    NoMatchingPurchases {
        filtered: bool,
    },
    OutsideRefundWindow {
        window_days: i64,
    },
    PartialInvoiceRefused {
        invoice_ids: Vec<i64>,
    },
    RefundFailed,
    CatalogResults {
        summary: String,
        entries: Vec<CatalogEntry>,
    },
    /// A music request with nothing to search by.
    NeedMusicPreference,
    Rephrase,
    ServiceUnavailable,
    Internal,
}

impl ReplyPart {
    /// Parts that leave a refund waiting on more input from the customer.
    pub fn expects_answer(&self) -> bool {
        matches!(
            self,
            ReplyPart::NeedRefundDetails { .. }
                | ReplyPart::ConfirmRefund { .. }
                | ReplyPart::IdentityNotFound { .. }
                | ReplyPart::AmbiguousCustomer { .. }
                | ReplyPart::PartialInvoiceRefused { .. }
                | ReplyPart::RefundFailed
        )
    }
}
