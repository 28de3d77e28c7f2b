use std::sync::Arc;

use async_trait::async_trait;
use duckdb::{params, Connection};
use tokio::sync::Mutex;
use tracing::debug;

use crate::application::CustomerLookup;
use crate::domain::{
    CustomerIdentity, CustomerRef, DomainError, PurchaseLine, RefundableLines, Resolution,
};

const PURCHASES_SQL: &str = r#"
    SELECT il.InvoiceLineId, il.InvoiceId, t.Name, COALESCE(al.Title, ''), COALESCE(ar.Name, ''),
           i.InvoiceDate, il.Quantity, il.UnitPrice, il.Refunded
    FROM InvoiceLine il
    JOIN Invoice i ON i.InvoiceId = il.InvoiceId
    JOIN Track t ON t.TrackId = il.TrackId
    LEFT JOIN Album al ON al.AlbumId = t.AlbumId
    LEFT JOIN Artist ar ON ar.ArtistId = al.ArtistId
"#;

/// Minimum number of digits two phone numbers must share at the end to be
/// considered the same number, so a missing country code still matches.
const MIN_PHONE_DIGITS: usize = 7;

pub struct DuckdbCustomerLookup {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbCustomerLookup {
    /// The connection must already carry the store schema (see
    /// [`super::DuckdbStore`]).
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn customer_of_invoice(conn: &Connection, invoice_id: i64) -> Result<Option<CustomerRef>, DomainError> {
        let mut stmt = conn
            .prepare(
                "SELECT c.CustomerId, c.FirstName || ' ' || c.LastName \
                 FROM Invoice i JOIN Customer c ON c.CustomerId = i.CustomerId \
                 WHERE i.InvoiceId = ?",
            )
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        match stmt.query_row(params![invoice_id], |row| {
            Ok(CustomerRef {
                customer_id: row.get(0)?,
                name: row.get(1)?,
            })
        }) {
            Ok(customer) => Ok(Some(customer)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DomainError::storage(format!("Failed to query invoice: {}", e))),
        }
    }

    fn customers_named(conn: &Connection, name: &str) -> Result<Vec<(CustomerRef, String)>, DomainError> {
        let mut stmt = conn
            .prepare(
                "SELECT CustomerId, FirstName || ' ' || LastName, COALESCE(Phone, '') \
                 FROM Customer \
                 WHERE lower(trim(FirstName) || ' ' || trim(LastName)) = lower(?) \
                 ORDER BY CustomerId",
            )
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        let rows = stmt
            .query_map(params![normalize_name(name)], |row| {
                Ok((
                    CustomerRef {
                        customer_id: row.get(0)?,
                        name: row.get(1)?,
                    },
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| DomainError::storage(format!("Failed to query customers: {}", e)))?;

        let mut customers = Vec::new();
        for row in rows {
            customers.push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
        }
        Ok(customers)
    }

    fn purchases(conn: &Connection, customer_id: i64, invoice_id: Option<i64>) -> Result<Vec<PurchaseLine>, DomainError> {
        let sql = match invoice_id {
            Some(_) => format!(
                "{} WHERE i.CustomerId = ? AND i.InvoiceId = ? ORDER BY i.InvoiceDate, il.InvoiceLineId",
                PURCHASES_SQL
            ),
            None => format!(
                "{} WHERE i.CustomerId = ? ORDER BY i.InvoiceDate, il.InvoiceLineId",
                PURCHASES_SQL
            ),
        };
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;

        let rows = match invoice_id {
            Some(invoice_id) => stmt.query_map(params![customer_id, invoice_id], purchase_from_row),
            None => stmt.query_map(params![customer_id], purchase_from_row),
        }
        .map_err(|e| DomainError::storage(format!("Failed to query purchases: {}", e)))?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
        }
        Ok(lines)
    }
}

#[async_trait]
impl CustomerLookup for DuckdbCustomerLookup {
    async fn resolve(&self, identity: &CustomerIdentity) -> Result<Resolution, DomainError> {
        let conn = self.conn.lock().await;

        match identity {
            CustomerIdentity::Invoice(invoice_id) => {
                let Some(customer) = Self::customer_of_invoice(&conn, *invoice_id)? else {
                    debug!("Invoice {} does not exist", invoice_id);
                    return Ok(Resolution::NotFound);
                };
                let lines = Self::purchases(&conn, customer.customer_id, Some(*invoice_id))?;
                Ok(Resolution::Refundable(RefundableLines::new(customer, lines)))
            }
            CustomerIdentity::NamePhone { name, phone } => {
                let candidates = Self::customers_named(&conn, name)?;
                let matching: Vec<&CustomerRef> = candidates
                    .iter()
                    .filter(|(_, stored)| phones_match(stored, phone))
                    .map(|(customer, _)| customer)
                    .collect();
                debug!(
                    "{} customer(s) named '{}', {} with a matching phone",
                    candidates.len(),
                    name,
                    matching.len()
                );

                match matching.as_slice() {
                    [customer] => {
                        let customer = (*customer).clone();
                        let lines = Self::purchases(&conn, customer.customer_id, None)?;
                        Ok(Resolution::Refundable(RefundableLines::new(customer, lines)))
                    }
                    [] if candidates.len() > 1 => Ok(Resolution::Ambiguous {
                        candidates: candidates.len(),
                    }),
                    [] => Ok(Resolution::NotFound),
                    several => Ok(Resolution::Ambiguous {
                        candidates: several.len(),
                    }),
                }
            }
        }
    }
}

fn purchase_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<PurchaseLine> {
    Ok(PurchaseLine {
        invoice_line_id: row.get(0)?,
        invoice_id: row.get(1)?,
        track_name: row.get(2)?,
        album_title: row.get(3)?,
        artist_name: row.get(4)?,
        purchase_date: row.get(5)?,
        quantity: row.get(6)?,
        unit_price: row.get(7)?,
        refunded: row.get(8)?,
    })
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn digits(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

/// Digit-only comparison. A shorter number matches when it is the tail of
/// the longer one and long enough to be meaningful.
fn phones_match(stored: &str, given: &str) -> bool {
    let (stored, given) = (digits(stored), digits(given));
    if stored.is_empty() || given.is_empty() {
        return false;
    }
    if stored == given {
        return true;
    }
    let (short, long) = if stored.len() < given.len() {
        (&stored, &given)
    } else {
        (&given, &stored)
    };
    short.len() >= MIN_PHONE_DIGITS && long.ends_with(short.as_str())
}
