use serde::{Deserialize, Serialize};

use super::PurchaseLine;

/// Identity fields the customer has to supply before a refund can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    InvoiceId,
    CustomerName,
    Phone,
}

impl MissingField {
    pub fn label(&self) -> &'static str {
        match self {
            MissingField::InvoiceId => "invoice ID",
            MissingField::CustomerName => "full name",
            MissingField::Phone => "phone number",
        }
    }
}

/// A resolvable customer identity. An invoice id is the more specific of the
/// two and wins when both are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerIdentity {
    Invoice(i64),
    NamePhone { name: String, phone: String },
}

impl CustomerIdentity {
    pub fn is_invoice(&self) -> bool {
        matches!(self, CustomerIdentity::Invoice(_))
    }
}

/// Refund information gathered from the customer across turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundFields {
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub invoice_id: Option<i64>,
    /// An invoice number given by the customer that no invoice can carry,
    /// e.g. one too large for an id. Reported back as not found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_reference: Option<String>,
    #[serde(default)]
    pub invoice_line_ids: Vec<i64>,
    pub track_name: Option<String>,
    pub album_title: Option<String>,
    pub artist_name: Option<String>,
    /// ISO-8601 date (`YYYY-MM-DD`).
    pub purchase_date: Option<String>,
    /// Lines listed back to the customer and awaiting a yes/no.
    #[serde(default)]
    pub proposed_line_ids: Vec<i64>,
}

impl RefundFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = clean(Some(name.into()));
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = clean(Some(phone.into()));
        self
    }

    pub fn with_invoice_id(mut self, invoice_id: i64) -> Self {
        self.invoice_id = Some(invoice_id);
        self
    }

    pub fn with_invoice_reference(mut self, reference: impl Into<String>) -> Self {
        self.invoice_reference = clean(Some(reference.into()));
        self
    }

    pub fn with_invoice_line_ids(mut self, ids: Vec<i64>) -> Self {
        self.invoice_line_ids = ids;
        self
    }

    pub fn with_track_name(mut self, track: impl Into<String>) -> Self {
        self.track_name = clean(Some(track.into()));
        self
    }

    pub fn with_album_title(mut self, album: impl Into<String>) -> Self {
        self.album_title = clean(Some(album.into()));
        self
    }

    pub fn with_artist_name(mut self, artist: impl Into<String>) -> Self {
        self.artist_name = clean(Some(artist.into()));
        self
    }

    pub fn with_purchase_date(mut self, date: impl Into<String>) -> Self {
        self.purchase_date = clean(Some(date.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.phone.is_none()
            && self.invoice_id.is_none()
            && self.invoice_reference.is_none()
            && self.invoice_line_ids.is_empty()
            && !self.has_purchase_filters()
            && self.proposed_line_ids.is_empty()
    }

    pub fn has_purchase_filters(&self) -> bool {
        self.track_name.is_some()
            || self.album_title.is_some()
            || self.artist_name.is_some()
            || self.purchase_date.is_some()
    }

    /// Folds a fresh extraction into what was already collected. Only
    /// non-empty values are taken, so a blank extraction never erases an
    /// earlier answer.
    pub fn merge(&mut self, update: RefundFields) {
        merge_text(&mut self.customer_name, update.customer_name);
        merge_text(&mut self.phone, update.phone);
        if update.invoice_id.is_some() {
            self.invoice_id = update.invoice_id;
            self.invoice_reference = None;
        } else if let Some(reference) = clean(update.invoice_reference) {
            self.invoice_reference = Some(reference);
            self.invoice_id = None;
        }
        if !update.invoice_line_ids.is_empty() {
            self.invoice_line_ids = dedup(update.invoice_line_ids);
        }
        merge_text(&mut self.track_name, update.track_name);
        merge_text(&mut self.album_title, update.album_title);
        merge_text(&mut self.artist_name, update.artist_name);
        merge_text(&mut self.purchase_date, update.purchase_date);
    }

    pub fn identity(&self) -> Option<CustomerIdentity> {
        if let Some(invoice_id) = self.invoice_id {
            return Some(CustomerIdentity::Invoice(invoice_id));
        }
        match (&self.customer_name, &self.phone) {
            (Some(name), Some(phone)) => Some(CustomerIdentity::NamePhone {
                name: name.clone(),
                phone: phone.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.identity().is_some()
    }

    /// The fields still needed, naming only what is actually absent. An
    /// invoice id is always offered as the alternative.
    pub fn missing_fields(&self) -> Vec<MissingField> {
        if self.is_ready() {
            return Vec::new();
        }
        let mut missing = Vec::new();
        if self.customer_name.is_none() {
            missing.push(MissingField::CustomerName);
        }
        if self.phone.is_none() {
            missing.push(MissingField::Phone);
        }
        missing.push(MissingField::InvoiceId);
        missing
    }

    /// Whether a purchase satisfies every filter the customer named.
    pub fn selects(&self, line: &PurchaseLine) -> bool {
        if !self.invoice_line_ids.is_empty() && !self.invoice_line_ids.contains(&line.invoice_line_id) {
            return false;
        }
        if !self.proposed_line_ids.is_empty() && !self.proposed_line_ids.contains(&line.invoice_line_id) {
            return false;
        }
        contains_ci(&line.track_name, self.track_name.as_deref())
            && contains_ci(&line.album_title, self.album_title.as_deref())
            && contains_ci(&line.artist_name, self.artist_name.as_deref())
            && self
                .purchase_date
                .as_deref()
                .map_or(true, |date| line.purchase_date.starts_with(date))
    }

    pub fn forget_invoice(&mut self) {
        self.invoice_id = None;
        self.invoice_reference = None;
    }

    pub fn forget_customer(&mut self) {
        self.customer_name = None;
        self.phone = None;
    }

    pub fn forget_phone(&mut self) {
        self.phone = None;
    }

    pub fn forget_selection(&mut self) {
        self.invoice_line_ids.clear();
        self.track_name = None;
        self.album_title = None;
        self.artist_name = None;
        self.purchase_date = None;
        self.proposed_line_ids.clear();
    }

    pub fn propose(&mut self, line_ids: Vec<i64>) {
        self.proposed_line_ids = line_ids;
    }

    pub fn clear_proposal(&mut self) {
        self.proposed_line_ids.clear();
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn merge_text(slot: &mut Option<String>, update: Option<String>) {
    if let Some(value) = clean(update) {
        *slot = Some(value);
    }
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    needle.map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
}
