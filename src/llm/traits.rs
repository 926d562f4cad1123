//! LLM 客户端抽象
//!
//! 所有后端（Ollama / OpenAI 兼容 / Mock）实现 LlmClient：complete 接收 system + user 消息列表，返回回复文本。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::Message;

/// 单个后端调用失败的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("backend returned an empty response")]
    EmptyResponse,

    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(0)
        } else if e.is_connect() {
            LlmError::Unreachable(e.to_string())
        } else {
            LlmError::Http(e.to_string())
        }
    }
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 后端标识（日志用），如 `ollama@http://localhost:11434`
    fn describe(&self) -> String {
        "llm".to_string()
    }
}
