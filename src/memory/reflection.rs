//! 反思：周期性回顾近期想法与日记，提炼"智慧"写入 AION_WISDOM.md
//!
//! RecentMemory 则把智慧文件的末尾作为规划时的近期记忆快照。

use std::sync::Arc;

use crate::llm::Cognition;
use crate::memory::{Journal, JOURNAL_FILE, THOUGHTS_FILE, WISDOM_FILE};

/// 每个来源文件读取的末尾字符数
const REFLECTION_WINDOW_CHARS: usize = 5000;

pub struct Reflection {
    cognition: Arc<Cognition>,
    journal: Arc<Journal>,
}

impl Reflection {
    pub fn new(cognition: Arc<Cognition>, journal: Arc<Journal>) -> Self {
        Self { cognition, journal }
    }

    /// 执行一次反思；没有可回顾的内容时返回 Ok(false)
    pub async fn reflect(&self) -> std::io::Result<bool> {
        tracing::info!("Entering a state of reflection...");

        let mut data = String::new();
        let thoughts = self.journal.tail(THOUGHTS_FILE, REFLECTION_WINDOW_CHARS).await;
        if !thoughts.is_empty() {
            data.push_str(&format!("\n--- RECENT THOUGHTS ---\n{}", thoughts));
        }
        let journal = self.journal.tail(JOURNAL_FILE, REFLECTION_WINDOW_CHARS).await;
        if !journal.is_empty() {
            data.push_str(&format!("\n--- RECENT JOURNAL ---\n{}", journal));
        }

        if data.trim().is_empty() {
            tracing::debug!("Nothing to reflect on yet");
            return Ok(false);
        }

        let context = format!("System Context: Reflecting on recent experiences.\n{}", data);
        let insight = self
            .cognition
            .think(
                &context,
                "Extract 3-5 'Gems of Wisdom' or strategic shifts based on these logs. Be profound and concise.",
            )
            .await;

        if Cognition::is_failure(&insight) {
            tracing::warn!("Reflection skipped: {}", insight);
            return Ok(false);
        }

        let preview: String = insight.chars().take(50).collect();
        self.journal
            .append_section(WISDOM_FILE, &format!("Insight: {}...", preview), &insight)
            .await?;
        tracing::info!("Reflection complete. Wisdom distilled.");
        Ok(true)
    }
}

/// 近期记忆快照：智慧文件末尾
pub struct RecentMemory {
    journal: Arc<Journal>,
    max_chars: usize,
}

impl RecentMemory {
    pub fn new(journal: Arc<Journal>, max_chars: usize) -> Self {
        Self { journal, max_chars }
    }

    /// 无记忆时返回 None
    pub async fn snapshot(&self) -> Option<String> {
        let tail = self.journal.tail(WISDOM_FILE, self.max_chars).await;
        let tail = tail.trim();
        (!tail.is_empty()).then(|| tail.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use tempfile::TempDir;

    fn setup(replies: &[&str]) -> (TempDir, Arc<Journal>, Arc<MockLlmClient>, Reflection) {
        let dir = TempDir::new().unwrap();
        let journal = Arc::new(Journal::new(dir.path()));
        let mock = Arc::new(MockLlmClient::scripted(replies.iter().copied()));
        let cognition = Arc::new(Cognition::new("p", mock.clone()));
        let r = Reflection::new(cognition, journal.clone());
        (dir, journal, mock, r)
    }

    #[tokio::test]
    async fn test_reflect_without_logs_does_nothing() {
        let (dir, _journal, mock, r) = setup(&[]);
        assert!(!r.reflect().await.unwrap());
        assert_eq!(mock.calls(), 0);
        assert!(!dir.path().join(WISDOM_FILE).exists());
    }

    #[tokio::test]
    async fn test_reflect_appends_wisdom() {
        let (dir, journal, mock, r) = setup(&["Gem one. Gem two."]);
        journal
            .append_section(THOUGHTS_FILE, "Proactive Research: x", "found y")
            .await
            .unwrap();
        assert!(r.reflect().await.unwrap());
        assert_eq!(mock.calls(), 1);
        let wisdom = std::fs::read_to_string(dir.path().join(WISDOM_FILE)).unwrap();
        assert!(wisdom.contains("## Insight: Gem one. Gem two...."));

        let recent = RecentMemory::new(journal, 200);
        assert!(recent.snapshot().await.unwrap().contains("Gem two"));
    }
}
