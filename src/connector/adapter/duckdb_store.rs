use std::path::Path;
use std::sync::Arc;

use duckdb::Connection;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::DomainError;

const SAMPLE_CATALOG: &str = include_str!("sql/sample_catalog.sql");

/// Owns the DuckDB connection holding the store tables.
///
/// The lookup, refund and catalog adapters all work on the same connection,
/// handed out by [`DuckdbStore::shared_connection`].
pub struct DuckdbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckdbStore {
    pub fn new(db_path: &Path) -> Result<Self, DomainError> {
        let conn = Connection::open(db_path)
            .map_err(|e| DomainError::storage(format!("Failed to open DuckDB database: {}", e)))?;
        Self::initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, DomainError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            DomainError::storage(format!("Failed to open DuckDB in-memory DB: {}", e))
        })?;
        Self::initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Returns a clone of the shared connection Arc.
    pub fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DomainError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS Artist (
                ArtistId BIGINT PRIMARY KEY,
                Name VARCHAR
            );

            CREATE TABLE IF NOT EXISTS Genre (
                GenreId BIGINT PRIMARY KEY,
                Name VARCHAR
            );

            CREATE TABLE IF NOT EXISTS Album (
                AlbumId BIGINT PRIMARY KEY,
                Title VARCHAR NOT NULL,
                ArtistId BIGINT NOT NULL,
                ReleaseYear INTEGER
            );

            CREATE TABLE IF NOT EXISTS Track (
                TrackId BIGINT PRIMARY KEY,
                Name VARCHAR NOT NULL,
                AlbumId BIGINT,
                GenreId BIGINT,
                Composer VARCHAR,
                Milliseconds BIGINT NOT NULL,
                UnitPrice DOUBLE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS Customer (
                CustomerId BIGINT PRIMARY KEY,
                FirstName VARCHAR NOT NULL,
                LastName VARCHAR NOT NULL,
                Phone VARCHAR,
                Email VARCHAR
            );

            CREATE TABLE IF NOT EXISTS Invoice (
                InvoiceId BIGINT PRIMARY KEY,
                CustomerId BIGINT NOT NULL,
                InvoiceDate VARCHAR NOT NULL,
                Total DOUBLE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS InvoiceLine (
                InvoiceLineId BIGINT PRIMARY KEY,
                InvoiceId BIGINT NOT NULL,
                TrackId BIGINT NOT NULL,
                UnitPrice DOUBLE NOT NULL,
                Quantity BIGINT NOT NULL,
                Refunded BOOLEAN NOT NULL DEFAULT FALSE,
                RefundedAt VARCHAR
            );

            CREATE INDEX IF NOT EXISTS idx_invoice_customer ON Invoice(CustomerId);
            CREATE INDEX IF NOT EXISTS idx_invoice_line_invoice ON InvoiceLine(InvoiceId);
            "#,
        )
        .map_err(|e| DomainError::storage(format!("Failed to initialize schema: {}", e)))?;

        debug!("DuckDB store schema initialized");
        Ok(())
    }

    pub async fn customer_count(&self) -> Result<i64, DomainError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT COUNT(*) FROM Customer", [], |row| row.get(0))
            .map_err(|e| DomainError::storage(format!("Failed to count customers: {}", e)))
    }

    /// Loads the bundled sample dataset unless the store already has
    /// customers. Returns whether anything was inserted.
    pub async fn seed_sample_data(&self) -> Result<bool, DomainError> {
        if self.customer_count().await? > 0 {
            debug!("Store already populated; skipping sample data");
            return Ok(false);
        }

        let mut conn = self.conn.lock().await;
        let tx = conn
            .transaction()
            .map_err(|e| DomainError::storage(format!("Failed to begin transaction: {}", e)))?;
        tx.execute_batch(SAMPLE_CATALOG)
            .map_err(|e| DomainError::storage(format!("Failed to load sample data: {}", e)))?;
        tx.commit()
            .map_err(|e| DomainError::storage(format!("Failed to commit: {}", e)))?;

        info!("Loaded sample music store data");
        Ok(true)
    }
}
