use moka::future::Cache;
use std::{sync::Arc, time::Duration};

use crate::{
    services::{
        ChangePoller, EventProcessor, HireClient, HrClient, MailRelayNotifier, Notifier,
        RecordCreator, SubscriptionManager, TokenManager, WorkerPool,
    },
    store::{PgSyncStore, SyncStore},
    utils::{env::EnvVars, telegram::TelegramClient},
};

/// How long an OAuth `state` stays redeemable.
const AUTHORIZATION_STATE_TTL_SECS: u64 = 600;

pub struct AppState {
    pub http_client: reqwest::Client,
    pub env_vars: EnvVars,
    pub store: Arc<dyn SyncStore>,
    pub tokens: TokenManager,
    pub subscriptions: SubscriptionManager,
    pub processor: Arc<EventProcessor>,
    pub poller: ChangePoller,
    pub workers: WorkerPool,
    pub pending_authorizations: Cache<String, String>, // OAuth state -> company id
}

impl AppState {
    /// Initialize the application state with database connection and migrations
    pub async fn new() -> Result<AppState, Box<dyn std::error::Error>> {
        let env_vars = EnvVars::default();

        // Database connection
        log::info!("Connecting to database...");
        let db_pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&env_vars.database_url)
            .await?;

        log::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&db_pool).await?;

        log::info!("Database connection established successfully");

        let http_client = build_http_client(&env_vars)?;
        let notifier = Arc::new(MailRelayNotifier::new(
            http_client.clone(),
            env_vars.mail_relay_url.clone(),
            env_vars.mail_relay_api_key.clone(),
            env_vars.notification_recipient.clone(),
        ));

        if env_vars.mail_relay_url.is_none() {
            log::info!("No mail relay configured, outcome notifications will only be logged");
        }

        Ok(Self::assemble(
            env_vars,
            http_client,
            Arc::new(PgSyncStore::new(db_pool)),
            notifier,
        ))
    }

    /// Build the state over an existing store. Spawns the worker pool, so it must be called
    /// inside a Tokio runtime.
    pub fn with_store(
        env_vars: EnvVars,
        store: Arc<dyn SyncStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<AppState, Box<dyn std::error::Error>> {
        let http_client = build_http_client(&env_vars)?;
        Ok(Self::assemble(env_vars, http_client, store, notifier))
    }

    fn assemble(
        env_vars: EnvVars,
        http_client: reqwest::Client,
        store: Arc<dyn SyncStore>,
        notifier: Arc<dyn Notifier>,
    ) -> AppState {
        let hire = HireClient::new(
            http_client.clone(),
            env_vars.hire_api_base_url.clone(),
            env_vars.hire_token_url.clone(),
            env_vars.hire_client_id.clone(),
            env_vars.hire_client_secret.clone(),
            env_vars.hire_redirect_url.clone(),
        );
        let hr = HrClient::new(
            http_client.clone(),
            env_vars.hr_api_base_url.clone(),
            env_vars.hr_api_key.clone(),
        );
        let alerts = TelegramClient::new(
            http_client.clone(),
            env_vars.telegram_api_base_url.clone(),
            env_vars.telegram_bot_token.clone(),
            env_vars.telegram_chat_id.clone(),
        );

        let tokens = TokenManager::new(store.clone(), hire.clone());
        let subscriptions = SubscriptionManager::new(
            store.clone(),
            tokens.clone(),
            hire.clone(),
            env_vars.hire_tenant.clone(),
            env_vars.hire_pubsub_topic.clone(),
            env_vars.hire_event_types.clone(),
        );
        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            tokens.clone(),
            hire.clone(),
            RecordCreator::new(hr, store.clone()),
            env_vars.target_stage.clone(),
            notifier,
            alerts,
        ));
        let poller = ChangePoller::new(
            store.clone(),
            tokens.clone(),
            hire,
            env_vars.hire_tenant.clone(),
            chrono::Duration::minutes(env_vars.poll_safety_window_minutes),
        );
        let workers = WorkerPool::start(
            processor.clone(),
            env_vars.worker_count,
            env_vars.worker_queue_capacity,
        );

        let pending_authorizations = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(AUTHORIZATION_STATE_TTL_SECS))
            .build();

        AppState {
            http_client,
            env_vars,
            store,
            tokens,
            subscriptions,
            processor,
            poller,
            workers,
            pending_authorizations,
        }
    }
}

/// Every outbound call shares this client, so the timeout bounds all of them.
fn build_http_client(env_vars: &EnvVars) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(env_vars.http_timeout_seconds))
        .build()
}
