use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::SyncStore;
use crate::error::SyncError;
use crate::models::{Connection, Credential, ProcessedRecord, Subscription};

const CONNECTION_COLUMNS: &str = "company_id, registration_name, registration_event_types, \
     registration_topic, registration_renewed_at, last_poll_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_connection(row: sqlx::postgres::PgRow) -> Connection {
        let registration_name: Option<String> = row.get("registration_name");
        let subscription = registration_name.map(|name| Subscription {
            name,
            event_types: row.get("registration_event_types"),
            topic: row
                .get::<Option<String>, _>("registration_topic")
                .unwrap_or_default(),
            renewed_at: row
                .get::<Option<DateTime<Utc>>, _>("registration_renewed_at")
                .unwrap_or_else(Utc::now),
        });

        Connection {
            company_id: row.get("company_id"),
            subscription,
            last_poll_at: row.get("last_poll_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn get_connection(&self, company_id: &str) -> Result<Option<Connection>, SyncError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM connections WHERE company_id = $1",
            CONNECTION_COLUMNS
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_connection))
    }

    async fn upsert_connection(&self, company_id: &str) -> Result<Connection, SyncError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO connections (company_id)
            VALUES ($1)
            ON CONFLICT (company_id) DO UPDATE SET updated_at = NOW()
            RETURNING {}
            "#,
            CONNECTION_COLUMNS
        ))
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Self::map_connection(row))
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, SyncError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM connections ORDER BY company_id",
            CONNECTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Self::map_connection).collect())
    }

    async fn find_connection_by_registration(
        &self,
        registration: &str,
    ) -> Result<Option<Connection>, SyncError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM connections WHERE registration_name = $1",
            CONNECTION_COLUMNS
        ))
        .bind(registration)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Self::map_connection))
    }

    async fn set_subscription(
        &self,
        company_id: &str,
        subscription: Option<&Subscription>,
    ) -> Result<(), SyncError> {
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET registration_name = $2,
                registration_event_types = $3,
                registration_topic = $4,
                registration_renewed_at = $5,
                updated_at = NOW()
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .bind(subscription.map(|s| s.name.clone()))
        .bind(
            subscription
                .map(|s| s.event_types.clone())
                .unwrap_or_default(),
        )
        .bind(subscription.map(|s| s.topic.clone()))
        .bind(subscription.map(|s| s.renewed_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::NotFound(format!("connection {}", company_id)));
        }
        Ok(())
    }

    async fn set_poll_watermark(
        &self,
        company_id: &str,
        watermark: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        // GREATEST keeps the watermark from moving backwards if two cycles overlap
        let result = sqlx::query(
            r#"
            UPDATE connections
            SET last_poll_at = GREATEST(COALESCE(last_poll_at, $2), $2),
                updated_at = NOW()
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .bind(watermark)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::NotFound(format!("connection {}", company_id)));
        }
        Ok(())
    }

    async fn get_credential(&self, company_id: &str) -> Result<Option<Credential>, SyncError> {
        let row: Option<(String, String, String, i64)> = sqlx::query_as(
            r#"
            SELECT company_id, access_token, refresh_token, expires_at
            FROM credentials
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(company_id, access_token, refresh_token, expires_at)| Credential {
                company_id,
                access_token,
                refresh_token,
                expires_at,
            },
        ))
    }

    async fn put_credential(&self, credential: &Credential) -> Result<(), SyncError> {
        sqlx::query(
            r#"
            INSERT INTO credentials (company_id, access_token, refresh_token, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (company_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
            "#,
        )
        .bind(&credential.company_id)
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(credential.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_credential(&self, company_id: &str) -> Result<(), SyncError> {
        sqlx::query("DELETE FROM credentials WHERE company_id = $1")
            .bind(company_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_processed_record(
        &self,
        resource_id: &str,
    ) -> Result<Option<ProcessedRecord>, SyncError> {
        let record = sqlx::query_as::<_, ProcessedRecord>(
            r#"
            SELECT resource_id, system_id, candidate_name, candidate_email, created_at
            FROM processed_records
            WHERE resource_id = $1
            "#,
        )
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_processed_record(&self, record: &ProcessedRecord) -> Result<bool, SyncError> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_records
                (resource_id, system_id, candidate_name, candidate_email, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (resource_id) DO NOTHING
            "#,
        )
        .bind(&record.resource_id)
        .bind(record.system_id)
        .bind(&record.candidate_name)
        .bind(&record.candidate_email)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> Result<(), SyncError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
