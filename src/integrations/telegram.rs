//! Telegram Bot API 广播（sendMessage）
//!
//! 需要 TELEGRAM_BOT_TOKEN 与 TELEGRAM_CHAT_ID 同时存在。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::social::{SocialError, SocialProvider};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramProvider {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramProvider {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: TELEGRAM_API.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// 任一变量缺失时返回 None（Provider 休眠）
    pub fn from_env(timeout_secs: u64) -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty());
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty());
        match (token, chat_id) {
            (Some(t), Some(c)) => Some(Self::new(t, c, timeout_secs)),
            _ => {
                tracing::info!("Telegram: TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID not set, provider dormant");
                None
            }
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

#[async_trait]
impl SocialProvider for TelegramProvider {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn broadcast(&self, message: &str) -> Result<(), SocialError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
        });
        let resp: TelegramResponse = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if resp.ok {
            Ok(())
        } else {
            Err(SocialError::Rejected(
                resp.description.unwrap_or_else(|| "unknown error".into()),
            ))
        }
    }
}
