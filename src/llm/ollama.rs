//! Ollama 客户端（/api/chat，非流式）
//!
//! 本地默认 http://localhost:11434；远程节点（如经 Tor 的 .onion 主机）通过 proxy 访问。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// 本地 Ollama 默认地址
pub const LOCAL_OLLAMA_HOST: &str = "http://localhost:11434";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// Ollama 客户端：持有 host、model 与带超时（可选代理）的 reqwest Client
///
/// 配置了代理却无法建立时 client 为 None，请求一律失败而不是绕过代理直连。
pub struct OllamaClient {
    client: Option<Client>,
    host: String,
    model: String,
    timeout_secs: u64,
}

fn build_http(timeout_secs: u64, proxy: Option<&str>) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().timeout(Duration::from_secs(timeout_secs));
    if let Some(url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(url)?);
    }
    builder.build()
}

impl OllamaClient {
    pub fn new(host: &str, model: &str, timeout_secs: u64, proxy: Option<&str>) -> Self {
        let host = host.trim_end_matches('/').to_string();
        let client = match build_http(timeout_secs, proxy) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::error!("Ollama client for {} disabled, proxy {:?} unusable: {}", host, proxy, e);
                None
            }
        };
        Self {
            client,
            host,
            model: model.to_string(),
            timeout_secs,
        }
    }

    /// 代理配置失败时为 false
    pub fn is_usable(&self) -> bool {
        self.client.is_some()
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

fn role_name(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: role_name(&m.role),
                    content: &m.content,
                })
                .collect(),
            stream: false,
        };

        let client = self
            .client
            .as_ref()
            .ok_or_else(|| LlmError::Http("client disabled: proxy could not be configured".into()))?;
        let resp = client
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| match LlmError::from(e) {
                LlmError::Timeout(_) => LlmError::Timeout(self.timeout_secs),
                other => other,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(LlmError::from)?;
        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(content)
    }

    fn describe(&self) -> String {
        format!("ollama@{} ({})", self.host, self.model)
    }
}
