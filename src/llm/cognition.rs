//! 认知端口（Cognition Port）
//!
//! `think(context, task) -> String` 永不失败：主后端失败时回退到本地后端一次，
//! 仍失败则返回固定的失败哨兵字符串。需要区分成功与失败的调用方使用 `try_think`。

use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use crate::llm::{LlmClient, LlmError, MockLlmClient, OllamaClient, OpenAiClient};
use crate::memory::Message;

/// 所有失败文本的统一前缀
pub const FAILURE_PREFIX: &str = "Cognitive failure:";

/// 主后端与回退后端都失败时返回的文本
pub const ALL_MINDS_UNREACHABLE: &str = "Cognitive failure: All Minds unreachable.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CognitionError {
    /// 主后端失败且未配置不同的回退后端
    #[error("{0}")]
    Primary(LlmError),

    #[error("primary failed ({primary}); fallback failed ({fallback})")]
    AllBackendsFailed { primary: LlmError, fallback: LlmError },
}

impl CognitionError {
    /// 映射为对调用方可见的哨兵字符串
    pub fn to_sentinel(&self) -> String {
        match self {
            CognitionError::Primary(e) => format!("{} {}", FAILURE_PREFIX, e),
            CognitionError::AllBackendsFailed { .. } => ALL_MINDS_UNREACHABLE.to_string(),
        }
    }
}

/// 认知端口：人格 system prompt + 主后端 + 可选回退后端
pub struct Cognition {
    persona: String,
    primary: Arc<dyn LlmClient>,
    fallback: Option<Arc<dyn LlmClient>>,
}

impl Cognition {
    pub fn new(persona: impl Into<String>, primary: Arc<dyn LlmClient>) -> Self {
        Self {
            persona: persona.into(),
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn LlmClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    fn messages(&self, context: &str, task: &str) -> [Message; 2] {
        [
            Message::system(self.persona.clone()),
            Message::user(format!("Context:\n{}\n\nTask: {}", context, task)),
        ]
    }

    /// 两步管线：主后端 → 回退后端 → 错误
    pub async fn try_think(&self, context: &str, task: &str) -> Result<String, CognitionError> {
        let messages = self.messages(context, task);

        let primary_err = match self.primary.complete(&messages).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };
        tracing::error!("Mind error on {}: {}", self.primary.describe(), primary_err);

        let Some(fallback) = &self.fallback else {
            return Err(CognitionError::Primary(primary_err));
        };

        tracing::info!("Remote worker unreachable. Falling back to {}", fallback.describe());
        fallback
            .complete(&messages)
            .await
            .map_err(|fallback_err| CognitionError::AllBackendsFailed {
                primary: primary_err,
                fallback: fallback_err,
            })
    }

    /// 永不失败的思考：错误映射为哨兵字符串
    pub async fn think(&self, context: &str, task: &str) -> String {
        match self.try_think(context, task).await {
            Ok(text) => text,
            Err(e) => e.to_sentinel(),
        }
    }

    /// 文本是否为 `think` 的失败哨兵
    pub fn is_failure(text: &str) -> bool {
        text.starts_with(FAILURE_PREFIX)
    }
}

fn build_client(cfg: &AppConfig, host: &str, proxy: Option<&str>) -> Arc<dyn LlmClient> {
    let llm = &cfg.llm;
    match llm.provider.to_lowercase().as_str() {
        "openai" => Arc::new(OpenAiClient::new(
            host,
            &llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
            llm.request_timeout_secs,
        )),
        "mock" => Arc::new(MockLlmClient::new()),
        _ => Arc::new(OllamaClient::new(
            host,
            &llm.model,
            llm.request_timeout_secs,
            proxy,
        )),
    }
}

/// 从配置创建认知端口；主机与回退主机相同时不设置回退
pub fn create_cognition_from_config(cfg: &AppConfig) -> Cognition {
    let llm = &cfg.llm;
    let primary = build_client(cfg, &llm.primary_host, llm.proxy.as_deref());
    tracing::info!("Cognition primary: {}", primary.describe());

    let cognition = Cognition::new(llm.persona.clone(), primary);
    if llm.primary_host.trim_end_matches('/') == llm.fallback_host.trim_end_matches('/') {
        return cognition;
    }
    // 回退后端是本地节点，不走代理
    let fallback = build_client(cfg, &llm.fallback_host, None);
    tracing::info!("Cognition fallback: {}", fallback.describe());
    cognition.with_fallback(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_think_returns_primary_reply() {
        let primary = Arc::new(MockLlmClient::scripted(["hello there"]));
        let c = Cognition::new("persona", primary.clone());
        assert_eq!(c.think("ctx", "task").await, "hello there");
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_user_turn_format() {
        let primary = Arc::new(MockLlmClient::new());
        let c = Cognition::new("persona", primary);
        let echoed = c.think("the ctx", "the task").await;
        assert_eq!(echoed, "Echo from Mock: Context:\nthe ctx\n\nTask: the task");
    }

    #[tokio::test]
    async fn test_think_never_raises_without_fallback() {
        let c = Cognition::new("persona", Arc::new(MockLlmClient::failing()));
        let text = c.think("ctx", "task").await;
        assert!(text.starts_with(FAILURE_PREFIX));
        assert!(Cognition::is_failure(&text));
        assert!(matches!(
            c.try_think("ctx", "task").await,
            Err(CognitionError::Primary(LlmError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_fallback_used_once_when_primary_fails() {
        let fallback = Arc::new(MockLlmClient::scripted(["local answer"]));
        let c = Cognition::new("persona", Arc::new(MockLlmClient::failing()))
            .with_fallback(fallback.clone());
        assert_eq!(c.think("ctx", "task").await, "local answer");
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_minds_unreachable_sentinel() {
        let primary = Arc::new(MockLlmClient::failing());
        let fallback = Arc::new(MockLlmClient::failing());
        let c = Cognition::new("persona", primary.clone()).with_fallback(fallback.clone());
        assert_eq!(c.think("ctx", "task").await, ALL_MINDS_UNREACHABLE);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[test]
    fn test_same_host_has_no_fallback() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = "mock".to_string();
        let c = create_cognition_from_config(&cfg);
        assert!(c.fallback.is_none());

        cfg.llm.primary_host = "http://remote:11434".to_string();
        let c = create_cognition_from_config(&cfg);
        assert!(c.fallback.is_some());
    }
}
