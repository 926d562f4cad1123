//! 消息类型与 chat 会话的短期记忆
//!
//! Message / Role 与 LLM API 的角色一一对应；ConversationMemory 保留最近 N 轮对话，
//! 供 `aion chat` 把上下文拼进 Cognition 的 context 参数。

use serde::{Deserialize, Serialize};

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 最近 N 轮对话（每轮 user + assistant）
#[derive(Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_turns,
        }
    }

    /// 记录一轮问答并剪枝
    pub fn record_turn(&mut self, user: &str, assistant: &str) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
        let keep = self.max_turns * 2;
        if self.messages.len() > keep {
            self.messages.drain(..self.messages.len() - keep);
        }
    }

    /// 渲染为纯文本对话记录，空记忆返回空字符串
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| {
                let who = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Aion",
                    Role::System => "System",
                };
                format!("{}: {}", who, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prunes_oldest_turns() {
        let mut mem = ConversationMemory::new(2);
        mem.record_turn("q1", "a1");
        mem.record_turn("q2", "a2");
        mem.record_turn("q3", "a3");
        assert_eq!(mem.len(), 4);
        let t = mem.transcript();
        assert!(!t.contains("q1"));
        assert!(t.starts_with("User: q2\nAion: a2"));
    }
}
