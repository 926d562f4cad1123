//! Mock LLM 客户端（用于测试，无需后端）
//!
//! 按 FIFO 顺序返回预置回复；队列为空时回显最后一条 User 消息。
//! `failing()` 模式下每次调用都返回超时错误，用于验证回退与哨兵字符串。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：脚本化回复 + 调用计数
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    always_fail: bool,
    calls: AtomicUsize,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次返回给定回复
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// 每次调用都模拟超时
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// 追加一条预置回复
    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply.into());
        }
    }

    /// 累计调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.always_fail {
            return Err(LlmError::Timeout(1));
        }

        if let Some(reply) = self.replies.lock().ok().and_then(|mut q| q.pop_front()) {
            return Ok(reply);
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {}", last_user))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_in_order_then_echo() {
        let mock = MockLlmClient::scripted(["first", "second"]);
        let msgs = [Message::user("hello")];
        assert_eq!(mock.complete(&msgs).await.unwrap(), "first");
        assert_eq!(mock.complete(&msgs).await.unwrap(), "second");
        assert_eq!(mock.complete(&msgs).await.unwrap(), "Echo from Mock: hello");
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_failing_mock_times_out() {
        let mock = MockLlmClient::failing();
        let err = mock.complete(&[Message::user("x")]).await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }
}
