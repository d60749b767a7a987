//! Telegram Bot API client -- long-poll updates and send Markdown messages.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::error::IntegrationError;
use crate::models::User;
use crate::notify::Notifier;

const SERVICE: &str = "telegram";

/// Response wrapper shared by every Bot API method.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl From<&TgUser> for User {
    fn from(u: &TgUser) -> Self {
        User::new(u.id, u.first_name.clone())
            .with_last_name(u.last_name.clone().unwrap_or_default())
            .with_username(u.username.clone().unwrap_or_default())
    }
}

pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
}

impl TelegramClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, IntegrationError> {
        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|source| IntegrationError::Http {
                service: SERVICE,
                source,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|source| IntegrationError::Http {
            service: SERVICE,
            source,
        })?;
        // Bot API errors carry a JSON envelope with a description even on 4xx.
        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(IntegrationError::Status {
                    service: SERVICE,
                    status: status.as_u16(),
                    body: text,
                })
            }
            Err(e) => {
                return Err(IntegrationError::Decode {
                    service: SERVICE,
                    message: e.to_string(),
                })
            }
        };

        if !envelope.ok {
            return Err(IntegrationError::Api {
                service: SERVICE,
                message: envelope
                    .description
                    .unwrap_or_else(|| format!("HTTP {status}")),
            });
        }
        envelope.result.ok_or_else(|| IntegrationError::Decode {
            service: SERVICE,
            message: format!("{method} returned no result"),
        })
    }

    /// Send `text` with Markdown parse mode.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), IntegrationError> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        let _: serde_json::Value = self
            .call("sendMessage", body, Duration::from_secs(30))
            .await?;
        Ok(())
    }

    /// Long-poll for updates with id >= `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, IntegrationError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call(
            "getUpdates",
            body,
            Duration::from_secs(timeout_secs + 10),
        )
        .await
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, destination: i64, text: &str) -> Result<(), IntegrationError> {
        self.send_message(destination, text).await
    }
}
