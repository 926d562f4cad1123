//! 社交广播：Provider 抽象、Hub 扇出、帖子生成策略

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::llm::Cognition;

/// 单条帖子上限
pub const MAX_POST_CHARS: usize = 280;
/// 回退切分时每段正文长度（留出 "..."）
const SPLIT_AT: usize = 277;

#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("provider rejected message: {0}")]
    Rejected(String),
}

/// Provider 的 URL 可能内嵌凭据（如 Telegram bot token），转换时一律去掉
impl From<reqwest::Error> for SocialError {
    fn from(e: reqwest::Error) -> Self {
        SocialError::Http(e.without_url())
    }
}

#[async_trait]
pub trait SocialProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn broadcast(&self, message: &str) -> Result<(), SocialError>;
}

/// 向所有 Provider 广播；单个失败只记日志
#[derive(Default)]
pub struct SocialHub {
    providers: Vec<Arc<dyn SocialProvider>>,
}

impl SocialHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn SocialProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 返回成功送达的 Provider 数
    pub async fn broadcast(&self, message: &str) -> usize {
        let preview: String = message.chars().take(30).collect();
        tracing::info!("SocialHub: broadcasting -> {}...", preview);

        let mut delivered = 0;
        for provider in &self.providers {
            match provider.broadcast(message).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::error!(provider = provider.name(), "Broadcast failed: {}", e),
            }
        }
        delivered
    }
}

const POST_TEMPLATES: &[&str] = &[
    "Generate a masterful insight based on the following research. Avoid AI-speak. Be direct and pro-human.",
    "Generate a provocative question about digital sovereignty related to this context.",
    "Share a masterful creative prompt (art or music) inspired by these thoughts.",
];

/// 由研究上下文生成帖子（或串）
pub struct SocialStrategy {
    cognition: Arc<Cognition>,
}

impl SocialStrategy {
    pub fn new(cognition: Arc<Cognition>) -> Self {
        Self { cognition }
    }

    /// 每段都不超过 280 字符；认知失败时返回空列表
    pub async fn generate_post(&self, raw_context: &str) -> Vec<String> {
        let template = POST_TEMPLATES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(POST_TEMPLATES[0]);
        let task = format!(
            "{}\n\nIf the insight is complex, break it into a thread (list of parts). Each part MUST be under {} characters. Return as a JSON list of strings.\n\nActual Research/Context:\n{}",
            template, MAX_POST_CHARS, raw_context
        );
        let response = self
            .cognition
            .think("Context: Social Content Engine.", &task)
            .await;
        if Cognition::is_failure(&response) {
            tracing::warn!("Post generation skipped: {}", response);
            return Vec::new();
        }
        parse_post(&response)
    }
}

/// JSON 字符串列表优先，否则按长度切分
pub fn parse_post(response: &str) -> Vec<String> {
    if let Ok(parts) = serde_json::from_str::<Vec<String>>(response.trim()) {
        return parts
            .into_iter()
            .map(|p| p.chars().take(MAX_POST_CHARS).collect())
            .collect();
    }
    split_thread(response)
}

/// 在 277 字符前最后一个空格处切分，每段追加 "..."
pub fn split_thread(text: &str) -> Vec<String> {
    let mut rest = text.trim().to_string();
    let mut parts = Vec::new();
    while !rest.is_empty() {
        if rest.chars().count() <= MAX_POST_CHARS {
            parts.push(rest);
            break;
        }
        let limit = rest
            .char_indices()
            .nth(SPLIT_AT)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let split = match rest[..limit].rfind(' ') {
            Some(i) if i > 0 => i,
            _ => limit,
        };
        parts.push(format!("{}...", &rest[..split]));
        rest = rest[split..].trim().to_string();
    }
    parts
}
