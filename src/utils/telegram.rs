//! Operator alerts via the Telegram Bot API.
//!
//! Sync failures that need a human (rejected credentials, records that were created in the
//! HR system but could not be recorded locally) are posted to a Telegram chat. If the bot is
//! not configured (missing token or chat ID), alerts are logged as warnings instead.
//!
//! # Environment Variables
//! - `TELEGRAM_BOT_TOKEN`: The Telegram bot token for authentication
//! - `TELEGRAM_CHAT_ID`: The chat ID where alerts will be sent

use reqwest::Client;

use crate::error::SyncError;

#[derive(Clone, Debug)]
pub struct TelegramClient {
    http_client: Client,
    api_base_url: String,
    bot: Option<(String, String)>,
}

impl TelegramClient {
    /// If either `bot_token` or `chat_id` is None the client is unconfigured and alerts
    /// only reach the log.
    pub fn new(
        http_client: Client,
        api_base_url: String,
        bot_token: Option<String>,
        chat_id: Option<String>,
    ) -> Self {
        Self {
            http_client,
            api_base_url,
            bot: bot_token.zip(chat_id),
        }
    }

    pub fn unconfigured() -> Self {
        Self::new(Client::new(), String::new(), None, None)
    }

    /// Sends a message to the configured chat.
    ///
    /// # Errors
    /// Returns an error if the request fails or Telegram answers with a non-success status.
    pub async fn send_message(&self, message: &str) -> Result<(), Box<dyn std::error::Error>> {
        let Some((bot_token, chat_id)) = &self.bot else {
            log::warn!(
                "Telegram client not configured. Please set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID in the environment variables. Message ignored: {}",
                message
            );
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base_url, bot_token);
        let response = self
            .http_client
            .post(url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": message,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Telegram API returned {}: {}", status, body).into());
        }
        Ok(())
    }

    /// Raise a sync failure to the operator chat. Delivery problems are logged and swallowed.
    pub async fn alert(&self, company_id: &str, resource: &str, error: &SyncError) {
        let message = format!(
            "[talent-sync] {} for company {}\nresource: {}\n{}",
            error.kind(),
            company_id,
            resource,
            error
        );

        if let Err(e) = self.send_message(&message).await {
            log::error!("Failed to deliver operator alert: {}", e);
        }
    }
}
