//! Services module for external integrations and the sync pipeline

pub mod change_poller;
pub mod event_processor;
pub mod hire_client;
pub mod hr_client;
pub mod notifier;
pub mod record_creator;
pub mod subscription_manager;
pub mod token_manager;
pub mod webhook_decoder;
pub mod worker_pool;

pub use change_poller::{ChangePoller, PollSummary, run_change_poll_service};
pub use event_processor::{EventProcessor, SyncOutcome};
pub use hire_client::HireClient;
pub use hr_client::HrClient;
pub use notifier::{MailRelayNotifier, Notifier, RecordingNotifier, SyncNotification};
pub use record_creator::RecordCreator;
pub use subscription_manager::{SubscriptionManager, run_subscription_renewal_service};
pub use token_manager::TokenManager;
pub use webhook_decoder::{WebhookNotification, decode_webhook};
pub use worker_pool::WorkerPool;
