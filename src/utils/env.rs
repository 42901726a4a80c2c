#[derive(Clone, Debug)]
pub struct EnvVars {
    pub database_url: String,
    pub port: u16,
    // Hiring platform API and OAuth client
    pub hire_api_base_url: String,
    pub hire_token_url: String,
    pub hire_authorize_url: String,
    pub hire_client_id: String,
    pub hire_client_secret: String,
    pub hire_redirect_url: String,
    pub hire_oauth_scopes: String,
    pub hire_tenant: String,
    // Push registration
    pub hire_pubsub_topic: String,
    pub hire_event_types: Vec<String>,
    // Only applications in this stage are pushed to the HR system
    pub target_stage: String,
    // Change poller
    pub disable_polling: bool,
    pub poll_safety_window_minutes: i64,
    pub subscription_renewal_interval_seconds: u64,
    // HR system of record
    pub hr_api_base_url: String,
    pub hr_api_key: Option<String>,
    // Outbound HTTP
    pub http_timeout_seconds: u64,
    // Webhook worker pool
    pub worker_count: usize,
    pub worker_queue_capacity: usize,
    // Outcome notifications (mail relay)
    pub mail_relay_url: Option<String>,
    pub mail_relay_api_key: Option<String>,
    pub notification_recipient: Option<String>,
    // Operator alerts
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base_url: String,
    // CORS configuration
    pub cors_allowed_origins: Vec<String>,
}

fn comma_separated(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

impl Default for EnvVars {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL is not set"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3002),
            hire_api_base_url: std::env::var("HIRE_API_BASE_URL")
                .unwrap_or_else(|_| "https://hire.googleapis.com".to_string()),
            hire_token_url: std::env::var("HIRE_TOKEN_URL")
                .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string()),
            hire_authorize_url: std::env::var("HIRE_AUTHORIZE_URL")
                .unwrap_or_else(|_| "https://accounts.google.com/o/oauth2/v2/auth".to_string()),
            hire_client_id: std::env::var("HIRE_CLIENT_ID").expect("HIRE_CLIENT_ID is not set"),
            hire_client_secret: std::env::var("HIRE_CLIENT_SECRET")
                .expect("HIRE_CLIENT_SECRET is not set"),
            hire_redirect_url: std::env::var("HIRE_REDIRECT_URL")
                .unwrap_or_else(|_| "http://localhost:3002/api/oauth/callback".to_string()),
            hire_oauth_scopes: std::env::var("HIRE_OAUTH_SCOPES").unwrap_or_else(|_| {
                "https://www.googleapis.com/auth/hire.candidate.readonly \
                 https://www.googleapis.com/auth/hire.application.readonly"
                    .to_string()
            }),
            hire_tenant: std::env::var("HIRE_TENANT")
                .unwrap_or_else(|_| "tenants/my_tenant".to_string()),
            hire_pubsub_topic: std::env::var("HIRE_PUBSUB_TOPIC")
                .expect("HIRE_PUBSUB_TOPIC is not set"),
            hire_event_types: comma_separated(
                &std::env::var("HIRE_EVENT_TYPES")
                    .unwrap_or_else(|_| "APPLICATION_STATUS_CHANGE".to_string()),
            ),
            target_stage: std::env::var("TARGET_STAGE")
                .unwrap_or_else(|_| "BACKGROUND IN PROGRESS".to_string()),
            disable_polling: std::env::var("DISABLE_POLLING")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            poll_safety_window_minutes: std::env::var("POLL_SAFETY_WINDOW_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            subscription_renewal_interval_seconds: std::env::var(
                "SUBSCRIPTION_RENEWAL_INTERVAL_SECONDS",
            )
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400), // Default: daily
            hr_api_base_url: std::env::var("HR_API_BASE_URL")
                .expect("HR_API_BASE_URL is not set"),
            hr_api_key: optional("HR_API_KEY"),
            http_timeout_seconds: std::env::var("HTTP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            worker_count: std::env::var("WORKER_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(4),
            worker_queue_capacity: std::env::var("WORKER_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(256),
            mail_relay_url: optional("MAIL_RELAY_URL"),
            mail_relay_api_key: optional("MAIL_RELAY_API_KEY"),
            notification_recipient: optional("NOTIFICATION_RECIPIENT"),
            telegram_bot_token: optional("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional("TELEGRAM_CHAT_ID"),
            telegram_api_base_url: std::env::var("TELEGRAM_API_BASE_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            cors_allowed_origins: comma_separated(
                &std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
        }
    }
}
