//! Persistence for connections, credentials and processed records.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgSyncStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
use crate::models::{Connection, Credential, ProcessedRecord, Subscription};

#[async_trait]
pub trait SyncStore: Send + Sync {
    async fn get_connection(&self, company_id: &str) -> Result<Option<Connection>, SyncError>;

    /// Insert the connection, or touch it if it already exists. Subscription and watermark
    /// of an existing row are left as they are.
    async fn upsert_connection(&self, company_id: &str) -> Result<Connection, SyncError>;

    async fn list_connections(&self) -> Result<Vec<Connection>, SyncError>;

    async fn find_connection_by_registration(
        &self,
        registration: &str,
    ) -> Result<Option<Connection>, SyncError>;

    /// Replace (or clear, with `None`) the connection's registration.
    async fn set_subscription(
        &self,
        company_id: &str,
        subscription: Option<&Subscription>,
    ) -> Result<(), SyncError>;

    async fn set_poll_watermark(
        &self,
        company_id: &str,
        watermark: DateTime<Utc>,
    ) -> Result<(), SyncError>;

    async fn get_credential(&self, company_id: &str) -> Result<Option<Credential>, SyncError>;

    async fn put_credential(&self, credential: &Credential) -> Result<(), SyncError>;

    async fn delete_credential(&self, company_id: &str) -> Result<(), SyncError>;

    async fn get_processed_record(
        &self,
        resource_id: &str,
    ) -> Result<Option<ProcessedRecord>, SyncError>;

    /// Atomically insert the record unless one exists for the same resource.
    /// Returns `false` when a record was already present.
    async fn insert_processed_record(&self, record: &ProcessedRecord) -> Result<bool, SyncError>;

    async fn health_check(&self) -> Result<(), SyncError>;
}
