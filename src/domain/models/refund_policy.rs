use chrono::{Duration, NaiveDate, Utc};
use tracing::warn;

use super::PurchaseLine;

/// Store rules deciding which purchases may be refunded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundPolicy {
    /// Purchases older than this many days are not refundable. `None` means
    /// no limit.
    pub window_days: Option<i64>,
    /// When `false`, a line-level request has to cover every still-refundable
    /// line of its invoice.
    pub allow_partial_invoice: bool,
    /// Fixed "today" for the window; the current UTC date when unset.
    pub reference_date: Option<NaiveDate>,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RefundPolicy {
    pub fn new() -> Self {
        Self {
            window_days: None,
            allow_partial_invoice: true,
            reference_date: None,
        }
    }

    pub fn with_window_days(mut self, days: Option<i64>) -> Self {
        self.window_days = days.map(|d| d.max(0));
        self
    }

    pub fn with_partial_invoices(mut self, allow: bool) -> Self {
        self.allow_partial_invoice = allow;
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn is_within_window(&self, line: &PurchaseLine) -> bool {
        let Some(days) = self.window_days else {
            return true;
        };
        let purchased = match NaiveDate::parse_from_str(line.purchase_day(), "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                warn!(
                    "Unparseable purchase date '{}' on line {}: {}",
                    line.purchase_date, line.invoice_line_id, e
                );
                return true;
            }
        };
        let today = self.reference_date.unwrap_or_else(|| Utc::now().date_naive());
        today - purchased <= Duration::days(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bought_on(date: &str) -> PurchaseLine {
        PurchaseLine {
            invoice_line_id: 1,
            invoice_id: 1,
            track_name: "So What".to_string(),
            album_title: "Kind Of Blue".to_string(),
            artist_name: "Miles Davis".to_string(),
            purchase_date: date.to_string(),
            quantity: 1,
            unit_price: 0.99,
            refunded: false,
        }
    }

    #[test]
    fn no_window_accepts_everything() {
        assert!(RefundPolicy::new().is_within_window(&bought_on("1999-01-01 00:00:00")));
    }

    #[test]
    fn window_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 10, 1).expect("valid date");
        let policy = RefundPolicy::new()
            .with_window_days(Some(30))
            .with_reference_date(today);

        assert!(policy.is_within_window(&bought_on("2024-09-01 00:00:00")));
        assert!(!policy.is_within_window(&bought_on("2024-08-31 00:00:00")));
    }

    #[test]
    fn garbage_dates_are_not_held_against_the_customer() {
        let policy = RefundPolicy::new().with_window_days(Some(1));
        assert!(policy.is_within_window(&bought_on("sometime")));
    }
}
