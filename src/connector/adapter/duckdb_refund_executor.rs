use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::application::RefundExecutor;
use crate::domain::{DomainError, RefundOutcome};

pub struct DuckdbRefundExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbRefundExecutor {
    pub fn with_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[async_trait]
impl RefundExecutor for DuckdbRefundExecutor {
    async fn refund(&self, line_ids: &[i64]) -> Result<RefundOutcome, DomainError> {
        let requested: BTreeSet<i64> = line_ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(DomainError::invalid_input("No invoice lines to refund"));
        }
        let ids: Vec<Value> = requested.iter().map(|id| Value::BigInt(*id)).collect();

        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;

        let mut current: Vec<(i64, bool, f64)> = Vec::new();
        {
            let mut stmt = tx
                .prepare(&format!(
                    "SELECT InvoiceLineId, Refunded, UnitPrice * Quantity \
                     FROM InvoiceLine WHERE InvoiceLineId IN ({}) ORDER BY InvoiceLineId",
                    placeholders(ids.len())
                ))
                .map_err(|e| DomainError::storage(format!("Failed to prepare statement: {}", e)))?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?, row.get::<_, f64>(2)?))
                })
                .map_err(|e| DomainError::storage(format!("Failed to query invoice lines: {}", e)))?;
            for row in rows {
                current.push(row.map_err(|e| DomainError::storage(format!("Failed to read row: {}", e)))?);
            }
        }

        if current.len() != requested.len() {
            let known: BTreeSet<i64> = current.iter().map(|(id, _, _)| *id).collect();
            let unknown: Vec<i64> = requested.difference(&known).copied().collect();
            return Err(DomainError::partial_failure(format!(
                "unknown invoice lines {:?}",
                unknown
            )));
        }

        let already_refunded: Vec<i64> = current
            .iter()
            .filter(|(_, refunded, _)| *refunded)
            .map(|(id, _, _)| *id)
            .collect();
        let pending: Vec<(i64, f64)> = current
            .iter()
            .filter(|(_, refunded, _)| !*refunded)
            .map(|(id, _, amount)| (*id, *amount))
            .collect();

        if pending.is_empty() {
            debug!("Invoice lines {:?} were already refunded", already_refunded);
            return Ok(RefundOutcome::AlreadyRefunded {
                line_ids: already_refunded,
            });
        }

        let refunded_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut args: Vec<Value> = vec![Value::Text(refunded_at)];
        args.extend(pending.iter().map(|(id, _)| Value::BigInt(*id)));

        let updated = tx
            .execute(
                &format!(
                    "UPDATE InvoiceLine SET Refunded = TRUE, RefundedAt = ? \
                     WHERE InvoiceLineId IN ({}) AND NOT Refunded",
                    placeholders(pending.len())
                ),
                params_from_iter(args.iter()),
            )
            .map_err(|e| DomainError::partial_failure(format!("Failed to mark lines refunded: {}", e)))?;

        if updated != pending.len() {
            // Dropping the transaction rolls the update back.
            return Err(DomainError::partial_failure(format!(
                "expected to refund {} lines but updated {}",
                pending.len(),
                updated
            )));
        }

        tx.commit()
            .map_err(|e| DomainError::partial_failure(format!("Failed to commit refund: {}", e)))?;

        let line_ids: Vec<i64> = pending.iter().map(|(id, _)| *id).collect();
        let amount = pending.iter().map(|(_, amount)| amount).sum::<f64>();
        let amount = (amount * 100.0).round() / 100.0;
        info!("Marked invoice lines {:?} refunded ({:.2})", line_ids, amount);

        Ok(RefundOutcome::Refunded {
            line_ids,
            amount,
            already_refunded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::adapter::DuckdbStore;

    async fn seeded() -> (DuckdbStore, DuckdbRefundExecutor) {
        let store = DuckdbStore::in_memory().unwrap();
        store.seed_sample_data().await.unwrap();
        let executor = DuckdbRefundExecutor::with_connection(store.shared_connection());
        (store, executor)
    }

    async fn refunded_lines(store: &DuckdbStore) -> Vec<i64> {
        let conn = store.shared_connection();
        let conn = conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT InvoiceLineId FROM InvoiceLine WHERE Refunded ORDER BY InvoiceLineId")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0)).unwrap();
        rows.map(|r| r.unwrap()).collect()
    }

    #[tokio::test]
    async fn refund_marks_lines_and_reports_amount() {
        let (store, executor) = seeded().await;

        let outcome = executor.refund(&[1385, 1386, 1387, 1388]).await.unwrap();
        match outcome {
            RefundOutcome::Refunded { line_ids, amount, already_refunded } => {
                assert_eq!(line_ids, vec![1385, 1386, 1387, 1388]);
                assert!((amount - 3.96).abs() < 1e-9);
                assert!(already_refunded.is_empty());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(refunded_lines(&store).await, vec![1385, 1386, 1387, 1388]);
    }

    #[tokio::test]
    async fn second_refund_is_a_no_op() {
        let (store, executor) = seeded().await;

        executor.refund(&[270, 271]).await.unwrap();
        let outcome = executor.refund(&[271, 270]).await.unwrap();

        assert_eq!(
            outcome,
            RefundOutcome::AlreadyRefunded {
                line_ids: vec![270, 271]
            }
        );
        assert_eq!(refunded_lines(&store).await, vec![270, 271]);
    }

    #[tokio::test]
    async fn mixed_request_skips_refunded_lines() {
        let (_store, executor) = seeded().await;

        executor.refund(&[270]).await.unwrap();
        let outcome = executor.refund(&[270, 271]).await.unwrap();

        match outcome {
            RefundOutcome::Refunded { line_ids, already_refunded, .. } => {
                assert_eq!(line_ids, vec![271]);
                assert_eq!(already_refunded, vec![270]);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_line_rolls_back_everything() {
        let (store, executor) = seeded().await;

        let err = executor.refund(&[270, 424242]).await.unwrap_err();

        assert!(err.is_partial_failure());
        assert!(refunded_lines(&store).await.is_empty());
    }

    #[tokio::test]
    async fn empty_request_is_rejected() {
        let (_store, executor) = seeded().await;
        assert!(matches!(
            executor.refund(&[]).await,
            Err(DomainError::InvalidInput(_))
        ));
    }
}
