//! Tests for the DuckDB-backed store through the public adapters.

use std::sync::Arc;

use tempfile::TempDir;
use tunedesk::{
    CatalogEntry, CatalogQuery, Container, ContainerConfig, CustomerIdentity, CustomerLookup,
    DuckdbCustomerLookup, DuckdbRefundExecutor, DuckdbStore, Era, RefundExecutor, RefundOutcome,
    Resolution,
};

async fn seeded_store() -> DuckdbStore {
    let store = DuckdbStore::in_memory().expect("Failed to create store");
    store.seed_sample_data().await.expect("Failed to seed");
    store
}

fn open_lines(resolution: Resolution) -> Vec<i64> {
    match resolution {
        Resolution::Refundable(found) => found.lines.iter().map(|l| l.invoice_line_id).collect(),
        other => panic!("expected purchases, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refund_is_idempotent() {
    let store = seeded_store().await;
    let executor = DuckdbRefundExecutor::with_connection(store.shared_connection());

    let first = executor.refund(&[1385, 1386]).await.unwrap();
    match first {
        RefundOutcome::Refunded {
            line_ids,
            amount,
            already_refunded,
        } => {
            assert_eq!(line_ids, vec![1385, 1386]);
            assert!((amount - 1.98).abs() < 1e-9);
            assert!(already_refunded.is_empty());
        }
        other => panic!("expected a refund, got {:?}", other),
    }

    let second = executor.refund(&[1385, 1386]).await.unwrap();
    assert_eq!(
        second,
        RefundOutcome::AlreadyRefunded {
            line_ids: vec![1385, 1386]
        }
    );
}

#[tokio::test]
async fn test_refund_of_unknown_line_changes_nothing() {
    let store = seeded_store().await;
    let conn = store.shared_connection();
    let executor = DuckdbRefundExecutor::with_connection(Arc::clone(&conn));
    let lookup = DuckdbCustomerLookup::with_connection(conn);

    let result = executor.refund(&[1385, 999_999]).await;
    assert!(result.is_err());

    let lines = open_lines(lookup.resolve(&CustomerIdentity::Invoice(256)).await.unwrap());
    assert_eq!(lines, vec![1385, 1386, 1387, 1388]);
}

#[tokio::test]
async fn test_seeding_twice_inserts_once() {
    let store = DuckdbStore::in_memory().unwrap();

    assert!(store.seed_sample_data().await.unwrap());
    let customers = store.customer_count().await.unwrap();
    assert!(!store.seed_sample_data().await.unwrap());
    assert_eq!(store.customer_count().await.unwrap(), customers);
}

#[tokio::test]
async fn test_name_lookup_needs_the_matching_phone() {
    let store = seeded_store().await;
    let lookup = DuckdbCustomerLookup::with_connection(store.shared_connection());

    let wrong_phone = lookup
        .resolve(&CustomerIdentity::NamePhone {
            name: "Aaron Mitchell".to_string(),
            phone: "555 0000 000".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(wrong_phone, Resolution::NotFound);

    let reformatted = lookup
        .resolve(&CustomerIdentity::NamePhone {
            name: "aaron mitchell".to_string(),
            phone: "12044526452".to_string(),
        })
        .await
        .unwrap();
    let mut lines = open_lines(reformatted);
    lines.sort_unstable();
    assert_eq!(lines, vec![270, 271, 272, 330, 331]);
}

#[tokio::test]
async fn test_refunds_survive_reopening_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store").join("tunedesk.duckdb");

    {
        let container = Container::new(ContainerConfig {
            database: path.clone(),
            seed: true,
            ..ContainerConfig::default()
        })
        .await
        .expect("Failed to build container");
        assert_eq!(container.database(), Some(path.as_path()));

        let sessions = container.session_manager();
        let outcome = sessions.handle("s1", "refund invoice 256").await;
        assert!(outcome.reply.contains("$3.96"), "reply was: {}", outcome.reply);
    }

    let reopened = Container::new(ContainerConfig {
        database: path.clone(),
        ..ContainerConfig::default()
    })
    .await
    .expect("Failed to reopen container");
    let resolution = reopened
        .list_purchases_use_case()
        .execute(CustomerIdentity::Invoice(256))
        .await
        .unwrap();
    match resolution {
        Resolution::Refundable(found) => {
            assert!(found.lines.is_empty());
            assert_eq!(found.already_refunded.len(), 4);
        }
        other => panic!("expected purchases, got {:?}", other),
    }
}

#[tokio::test]
async fn test_catalog_search_by_decade_and_genre() {
    let container = Container::new(ContainerConfig::in_memory()).await.unwrap();
    let search = container.search_use_case();

    let entries = search
        .execute(CatalogQuery::new().with_genre("Rock").with_era(Era::decade(1970)))
        .await
        .unwrap();

    assert!(!entries.is_empty());
    for entry in &entries {
        match entry {
            CatalogEntry::Track(track) => {
                assert_eq!(track.genre.as_deref(), Some("Rock"));
                let year = track.release_year.expect("album year");
                assert!((1970..1980).contains(&year), "{} is outside the 70s", year);
            }
            CatalogEntry::Album(album) => panic!("unexpected album {:?}", album),
        }
    }
}

#[tokio::test]
async fn test_similar_artists_exclude_the_reference() {
    let container = Container::new(ContainerConfig::in_memory()).await.unwrap();

    let entries = container
        .search_use_case()
        .execute(CatalogQuery::new().similar_to("Queen"))
        .await
        .unwrap();

    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e.artist_name() != "Queen"));
    assert!(entries.iter().any(|e| e.artist_name() == "Led Zeppelin"));
}
