//! Pull-based fallback for missed push notifications.
//!
//! Once at startup and then every UTC midnight, each connection's applications updated since
//! its watermark are listed and pushed through the same [`EventProcessor`] as webhooks. The
//! watermark moves to the cycle start as soon as the listing succeeds, before any event is
//! processed: a crash mid-batch skips the rest of that window rather than replaying it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::event_processor::{EventProcessor, SyncOutcome};
use super::hire_client::HireClient;
use super::token_manager::TokenManager;
use crate::error::SyncError;
use crate::models::{ChangeEvent, EventOrigin, EventType};
use crate::store::SyncStore;
use crate::utils::datetime::{duration_until_next_utc_midnight, filter_timestamp, poll_window_start};

/// Events found for one connection in one cycle.
#[derive(Debug, Clone)]
pub struct PollBatch {
    pub window_start: DateTime<Utc>,
    pub watermark: DateTime<Utc>,
    pub events: Vec<ChangeEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub company_id: String,
    pub window_start: DateTime<Utc>,
    pub watermark: DateTime<Utc>,
    pub fetched: usize,
    pub synchronized: usize,
    pub duplicates: usize,
    pub filtered_out: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ChangePoller {
    store: Arc<dyn SyncStore>,
    tokens: TokenManager,
    hire: HireClient,
    tenant: String,
    safety_window: chrono::Duration,
}

impl ChangePoller {
    pub fn new(
        store: Arc<dyn SyncStore>,
        tokens: TokenManager,
        hire: HireClient,
        tenant: String,
        safety_window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            tokens,
            hire,
            tenant,
            safety_window,
        }
    }

    pub async fn pull(&self, company_id: &str) -> Result<PollBatch, SyncError> {
        self.pull_at(company_id, Utc::now()).await
    }

    /// List every application updated since the watermark and advance the watermark to
    /// `cycle_start`. A failed listing leaves the watermark where it was.
    pub async fn pull_at(
        &self,
        company_id: &str,
        cycle_start: DateTime<Utc>,
    ) -> Result<PollBatch, SyncError> {
        let connection = self
            .store
            .get_connection(company_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(format!("connection {}", company_id)))?;

        let window_start =
            poll_window_start(connection.last_poll_at, cycle_start, self.safety_window);
        // Stage is left to the processor, which compares it case-insensitively.
        let filter = format!("updateTime>\"{}\"", filter_timestamp(window_start));

        log::info!(
            "Polling applications for {} updated since {}",
            company_id,
            window_start
        );

        let mut applications = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let token = self.tokens.ensure_valid_token(company_id).await?;
            let page = self
                .hire
                .list_applications(&token, &self.tenant, &filter, page_token.as_deref())
                .await?;

            applications.extend(page.applications);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        self.store.set_poll_watermark(company_id, cycle_start).await?;

        let events = applications
            .into_iter()
            .map(|application| ChangeEvent {
                origin: EventOrigin::Poll {
                    company_id: company_id.to_string(),
                    watermark: cycle_start,
                },
                event_type: EventType::ApplicationUpdate,
                resource: application.name.clone(),
                application: Some(application),
            })
            .collect();

        Ok(PollBatch {
            window_start,
            watermark: cycle_start,
            events,
        })
    }

    /// Pull and process one connection. Per-event failures are counted, never propagated.
    pub async fn run_cycle(
        &self,
        processor: &EventProcessor,
        company_id: &str,
    ) -> Result<PollSummary, SyncError> {
        let batch = self.pull(company_id).await?;

        let mut summary = PollSummary {
            company_id: company_id.to_string(),
            window_start: batch.window_start,
            watermark: batch.watermark,
            fetched: batch.events.len(),
            synchronized: 0,
            duplicates: 0,
            filtered_out: 0,
            failed: 0,
        };

        for event in batch.events {
            match processor.handle(event).await {
                Ok(SyncOutcome::Synchronized { .. }) => summary.synchronized += 1,
                Ok(SyncOutcome::Duplicate { .. }) => summary.duplicates += 1,
                Ok(SyncOutcome::FilteredOut { .. }) => summary.filtered_out += 1,
                Err(_) => summary.failed += 1,
            }
        }

        log::info!(
            "Poll cycle for {}: fetched={}, synchronized={}, duplicates={}, filtered={}, failed={}",
            company_id,
            summary.fetched,
            summary.synchronized,
            summary.duplicates,
            summary.filtered_out,
            summary.failed
        );

        Ok(summary)
    }

    /// Poll every stored connection concurrently.
    pub async fn run_all(&self, processor: &EventProcessor) -> Result<usize, SyncError> {
        let connections = self.store.list_connections().await?;
        let cycles = connections
            .iter()
            .map(|connection| self.run_cycle(processor, &connection.company_id));

        let results = futures::future::join_all(cycles).await;

        for (connection, result) in connections.iter().zip(&results) {
            if let Err(e) = result {
                log::warn!("Poll cycle for {} failed: {}", connection.company_id, e);
            }
        }

        Ok(results.iter().filter(|r| r.is_ok()).count())
    }
}

/// Run a poll cycle at startup and then at every UTC midnight.
pub async fn run_change_poll_service(poller: ChangePoller, processor: Arc<EventProcessor>) {
    log::info!("Starting change poll service (startup + UTC midnight schedule)");

    match poller.run_all(&processor).await {
        Ok(polled) => log::info!("Startup poll: {} connection(s) polled", polled),
        Err(e) => log::error!("Startup poll failed: {}", e),
    }

    loop {
        let now = Utc::now();
        let sleep_for = duration_until_next_utc_midnight(now);
        let wake_at = now + chrono::Duration::from_std(sleep_for).unwrap_or_default();

        log::info!(
            "Next change poll scheduled at {} UTC",
            wake_at.format("%Y-%m-%d %H:%M:%S")
        );

        tokio::time::sleep(sleep_for).await;

        match poller.run_all(&processor).await {
            Ok(polled) => log::info!("Midnight poll: {} connection(s) polled", polled),
            Err(e) => log::error!("Midnight poll failed: {}", e),
        }
    }
}
