use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::SyncStore;
use crate::error::SyncError;
use crate::models::{Connection, Credential, ProcessedRecord, Subscription};

/// Process-local store with the same semantics as the Postgres one. Used in tests.
#[derive(Default)]
pub struct MemoryStore {
    connections: Mutex<HashMap<String, Connection>>,
    credentials: Mutex<HashMap<String, Credential>>,
    processed: Mutex<HashMap<String, ProcessedRecord>>,
    fail_processed_writes: std::sync::atomic::AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `insert_processed_record` fail, to exercise the
    /// reconciliation path.
    pub fn fail_processed_writes(&self, fail: bool) {
        self.fail_processed_writes
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub async fn processed_count(&self) -> usize {
        self.processed.lock().await.len()
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn get_connection(&self, company_id: &str) -> Result<Option<Connection>, SyncError> {
        Ok(self.connections.lock().await.get(company_id).cloned())
    }

    async fn upsert_connection(&self, company_id: &str) -> Result<Connection, SyncError> {
        let mut connections = self.connections.lock().await;
        let connection = connections
            .entry(company_id.to_string())
            .and_modify(|c| c.updated_at = Utc::now())
            .or_insert_with(|| Connection::new(company_id));
        Ok(connection.clone())
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, SyncError> {
        let mut connections: Vec<Connection> =
            self.connections.lock().await.values().cloned().collect();
        connections.sort_by(|a, b| a.company_id.cmp(&b.company_id));
        Ok(connections)
    }

    async fn find_connection_by_registration(
        &self,
        registration: &str,
    ) -> Result<Option<Connection>, SyncError> {
        Ok(self
            .connections
            .lock()
            .await
            .values()
            .find(|c| c.registration_name() == Some(registration))
            .cloned())
    }

    async fn set_subscription(
        &self,
        company_id: &str,
        subscription: Option<&Subscription>,
    ) -> Result<(), SyncError> {
        let mut connections = self.connections.lock().await;
        let connection = connections
            .get_mut(company_id)
            .ok_or_else(|| SyncError::NotFound(format!("connection {}", company_id)))?;
        connection.subscription = subscription.cloned();
        connection.updated_at = Utc::now();
        Ok(())
    }

    async fn set_poll_watermark(
        &self,
        company_id: &str,
        watermark: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let mut connections = self.connections.lock().await;
        let connection = connections
            .get_mut(company_id)
            .ok_or_else(|| SyncError::NotFound(format!("connection {}", company_id)))?;
        connection.last_poll_at = Some(match connection.last_poll_at {
            Some(current) if current > watermark => current,
            _ => watermark,
        });
        connection.updated_at = Utc::now();
        Ok(())
    }

    async fn get_credential(&self, company_id: &str) -> Result<Option<Credential>, SyncError> {
        Ok(self.credentials.lock().await.get(company_id).cloned())
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), SyncError> {
        self.credentials
            .lock()
            .await
            .insert(credential.company_id.clone(), credential.clone());
        Ok(())
    }

    async fn delete_credential(&self, company_id: &str) -> Result<(), SyncError> {
        self.credentials.lock().await.remove(company_id);
        Ok(())
    }

    async fn get_processed_record(
        &self,
        resource_id: &str,
    ) -> Result<Option<ProcessedRecord>, SyncError> {
        Ok(self.processed.lock().await.get(resource_id).cloned())
    }

    async fn insert_processed_record(&self, record: &ProcessedRecord) -> Result<bool, SyncError> {
        if self
            .fail_processed_writes
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(SyncError::Storage("processed_records unavailable".to_string()));
        }

        let mut processed = self.processed.lock().await;
        if processed.contains_key(&record.resource_id) {
            return Ok(false);
        }
        processed.insert(record.resource_id.clone(), record.clone());
        Ok(true)
    }

    async fn health_check(&self) -> Result<(), SyncError> {
        Ok(())
    }
}
