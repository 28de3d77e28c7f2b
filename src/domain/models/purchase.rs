use serde::{Deserialize, Serialize};

/// One purchased track on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub invoice_line_id: i64,
    pub invoice_id: i64,
    pub track_name: String,
    pub album_title: String,
    pub artist_name: String,
    pub purchase_date: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub refunded: bool,
}

impl PurchaseLine {
    pub fn amount(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }

    /// The `YYYY-MM-DD` part of the invoice timestamp.
    pub fn purchase_day(&self) -> &str {
        self.purchase_date.get(..10).unwrap_or(&self.purchase_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub customer_id: i64,
    pub name: String,
}

/// The purchases of exactly one resolved customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundableLines {
    pub customer: CustomerRef,
    /// Lines that can still be refunded.
    pub lines: Vec<PurchaseLine>,
    /// Lines that were refunded earlier.
    pub already_refunded: Vec<PurchaseLine>,
}

impl RefundableLines {
    pub fn new(customer: CustomerRef, purchases: Vec<PurchaseLine>) -> Self {
        let (already_refunded, lines) = purchases.into_iter().partition(|line| line.refunded);
        Self {
            customer,
            lines,
            already_refunded,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.already_refunded.is_empty()
    }

    /// Refundable line ids on `invoice_id`.
    pub fn open_lines_of(&self, invoice_id: i64) -> Vec<i64> {
        self.lines
            .iter()
            .filter(|line| line.invoice_id == invoice_id)
            .map(|line| line.invoice_line_id)
            .collect()
    }
}

/// Result of resolving a customer identity.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Refundable(RefundableLines),
    NotFound,
    /// More than one customer matches and the phone number does not settle it.
    Ambiguous { candidates: usize },
}

/// Result of a refund mutation that went through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RefundOutcome {
    Refunded {
        line_ids: Vec<i64>,
        amount: f64,
        /// Requested lines that had been refunded before this call.
        already_refunded: Vec<i64>,
    },
    AlreadyRefunded { line_ids: Vec<i64> },
}
