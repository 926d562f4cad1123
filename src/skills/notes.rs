//! 笔记类技能：在用户的 Markdown / 文本文件里回应内嵌请求
//!
//! - `SeekerSkill`（*.md / *.txt）：文件含 `?AION`、`?RALPH` 或 `TODO: RALPH` 时，
//!   针对整篇内容思考并追加一段 `> **AION:**` 引用块。
//! - `TodoNotesSkill`（TODO.md）：最后一个 `HEY AION:` 之后的文字即请求，回复追加为 `--- AION SAYS: ---` 块。
//!
//! 两者的回复都会再次修改文件，因此都以"最后一个回复块之外的触发标记之后是否已有回复标记"作为防循环条件。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::Cognition;
use crate::memory::Journal;
use crate::skills::{SkillError, SkillHandler};

/// Seeker 识别的触发标记
pub const SEEKER_TRIGGERS: &[&str] = &["?AION", "?RALPH", "TODO: RALPH"];
/// Seeker 回复标记
pub const SEEKER_REPLY_MARKER: &str = "**AION:**";

/// TODO.md 请求标记
pub const TODO_TRIGGER: &str = "HEY AION:";
/// TODO.md 回复标记
pub const TODO_REPLY_MARKER: &str = "AION SAYS:";
/// TODO.md 回复块结束分隔线
pub const TODO_REPLY_END: &str = "----------------------";

/// 找到最近一次出现、且之后尚无回复的触发标记
///
/// 回复块（标记行及其后连续的 `>` 行）内的文字不算触发，回复复述触发词不会引发新一轮回答。
pub fn pending_trigger<'a>(content: &str, triggers: &[&'a str], reply_marker: &str) -> Option<&'a str> {
    let mut in_reply = false;
    let mut last_reply: Option<usize> = None;
    let mut latest: Option<((usize, usize), &'a str)> = None;

    for (idx, line) in content.lines().enumerate() {
        if line.contains(reply_marker) {
            in_reply = true;
            last_reply = Some(idx);
            continue;
        }
        if in_reply && line.trim_start().starts_with('>') {
            continue;
        }
        in_reply = false;
        for &trigger in triggers {
            if let Some(col) = line.rfind(trigger) {
                if latest.map_or(true, |(pos, _)| (idx, col) > pos) {
                    latest = Some(((idx, col), trigger));
                }
            }
        }
    }

    let ((line, _), trigger) = latest?;
    match last_reply {
        Some(reply) if reply > line => None,
        _ => Some(trigger),
    }
}

/// 把多行文本渲染为 Markdown 引用块
fn quote_block(text: &str) -> String {
    text.lines()
        .map(|l| format!("> {}", l))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct SeekerSkill {
    cognition: Arc<Cognition>,
    journal: Arc<Journal>,
    excluded_names: Vec<String>,
}

impl SeekerSkill {
    pub fn new(cognition: Arc<Cognition>, journal: Arc<Journal>) -> Self {
        Self {
            cognition,
            journal,
            excluded_names: Vec::new(),
        }
    }

    /// 重叠模式策略：这些文件名交给专用技能处理
    pub fn with_excluded_names(mut self, names: Vec<String>) -> Self {
        self.excluded_names = names;
        self
    }
}

#[async_trait]
impl SkillHandler for SeekerSkill {
    async fn handle(&self, path: &Path) -> Result<(), SkillError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.excluded_names.iter().any(|n| *n == name) {
            tracing::debug!("Seeker skips {} (handled by a dedicated skill)", name);
            return Ok(());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let Some(trigger) = pending_trigger(&content, SEEKER_TRIGGERS, SEEKER_REPLY_MARKER) else {
            return Ok(());
        };

        tracing::info!("Seeker triggered by {} in {}", trigger, name);
        let response = self
            .cognition
            .think(
                &content,
                &format!(
                    "The user asked: {}. Provide a helpful, slightly sarcastic, and insightful response.",
                    trigger
                ),
            )
            .await;
        if Cognition::is_failure(&response) {
            return Err(SkillError::Cognition(response));
        }

        self.journal
            .append_raw(
                path,
                &format!("\n\n> {}\n{}\n", SEEKER_REPLY_MARKER, quote_block(&response)),
            )
            .await?;
        Ok(())
    }
}

pub struct TodoNotesSkill {
    cognition: Arc<Cognition>,
    journal: Arc<Journal>,
}

impl TodoNotesSkill {
    pub fn new(cognition: Arc<Cognition>, journal: Arc<Journal>) -> Self {
        Self { cognition, journal }
    }
}

/// 取最后一个请求标记之后、尚未回复的请求文本
///
/// `--- AION SAYS: ---` 与结束分隔线之间的回复正文不参与查找。
pub fn pending_request(content: &str) -> Option<&str> {
    let mut in_reply = false;
    let mut offset = 0;
    let mut last_trigger: Option<usize> = None;

    for line in content.split_inclusive('\n') {
        if line.contains(TODO_REPLY_MARKER) {
            in_reply = true;
        } else if in_reply {
            in_reply = line.trim() != TODO_REPLY_END;
        } else if let Some(col) = line.rfind(TODO_TRIGGER) {
            last_trigger = Some(offset + col);
        }
        offset += line.len();
    }

    let tail = &content[last_trigger? + TODO_TRIGGER.len()..];
    if tail.contains(TODO_REPLY_MARKER) {
        return None;
    }
    let prompt = tail.trim();
    (!prompt.is_empty()).then_some(prompt)
}

#[async_trait]
impl SkillHandler for TodoNotesSkill {
    async fn handle(&self, path: &Path) -> Result<(), SkillError> {
        let content = tokio::fs::read_to_string(path).await?;
        let Some(prompt) = pending_request(&content) else {
            return Ok(());
        };

        let preview: String = prompt.chars().take(50).collect();
        tracing::info!("Detected a request in {}: {}...", path.display(), preview);

        let response = self
            .cognition
            .think(
                "You are Aion, an intelligent, sarcastic, and proactive assistant. The user is asking for help in their notes file.",
                &format!("Answer this request found in the user's notes: {}", prompt),
            )
            .await;
        if Cognition::is_failure(&response) {
            return Err(SkillError::Cognition(response));
        }

        self.journal
            .append_raw(
                path,
                &format!(
                    "\n\n--- {} ---\n{}\n{}\n",
                    TODO_REPLY_MARKER, response, TODO_REPLY_END
                ),
            )
            .await?;
        tracing::info!("Responded in {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use tempfile::TempDir;

    fn cognition(replies: &[&str]) -> (Arc<MockLlmClient>, Arc<Cognition>) {
        let mock = Arc::new(MockLlmClient::scripted(replies.iter().copied()));
        (mock.clone(), Arc::new(Cognition::new("p", mock)))
    }

    #[test]
    fn test_pending_trigger() {
        assert_eq!(pending_trigger("what is rust ?AION", SEEKER_TRIGGERS, SEEKER_REPLY_MARKER), Some("?AION"));
        assert_eq!(pending_trigger("TODO: RALPH fix", SEEKER_TRIGGERS, SEEKER_REPLY_MARKER), Some("TODO: RALPH"));
        assert_eq!(pending_trigger("plain notes", SEEKER_TRIGGERS, SEEKER_REPLY_MARKER), None);
        assert_eq!(
            pending_trigger("q ?AION\n\n> **AION:**\n> answer", SEEKER_TRIGGERS, SEEKER_REPLY_MARKER),
            None
        );
        assert_eq!(
            pending_trigger("q ?AION\n> **AION:**\n> a\nnew q ?AION", SEEKER_TRIGGERS, SEEKER_REPLY_MARKER),
            Some("?AION")
        );
    }

    #[test]
    fn test_pending_trigger_picks_latest_marker() {
        let content = "q ?AION\n\n> **AION:**\n> done\n\nfollow up ?RALPH\n";
        assert_eq!(pending_trigger(content, SEEKER_TRIGGERS, SEEKER_REPLY_MARKER), Some("?RALPH"));
    }

    #[test]
    fn test_pending_trigger_ignores_triggers_inside_replies() {
        let content = "what is rust ?AION\n\n> **AION:**\n> A language. Append ?AION again if you need more.\n";
        assert_eq!(pending_trigger(content, SEEKER_TRIGGERS, SEEKER_REPLY_MARKER), None);
    }

    #[test]
    fn test_pending_request() {
        assert_eq!(pending_request("- buy milk\nHEY AION: plan my week"), Some("plan my week"));
        assert_eq!(pending_request("HEY AION: x\n--- AION SAYS: ---\ny"), None);
        assert_eq!(pending_request("HEY AION:   "), None);
        assert_eq!(pending_request("no marker"), None);
        assert_eq!(
            pending_request("HEY AION: x\n\n--- AION SAYS: ---\nSay HEY AION: again\n----------------------\n"),
            None
        );
        assert_eq!(
            pending_request("HEY AION: x\n--- AION SAYS: ---\ny\n----------------------\nHEY AION: more"),
            Some("more")
        );
    }

    #[tokio::test]
    async fn test_seeker_appends_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "How do lobsters molt? ?AION\n").unwrap();
        let (mock, cog) = cognition(&["They shed.\nCarefully."]);
        let skill = SeekerSkill::new(cog, Arc::new(Journal::new(dir.path())));

        skill.handle(&path).await.unwrap();
        skill.handle(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("> **AION:**\n> They shed.\n> Carefully.\n"));
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_seeker_reply_repeating_trigger_does_not_loop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "what is rust ?AION\n").unwrap();
        let (mock, cog) = cognition(&["A language. Append ?AION again if you need more.", "second answer"]);
        let skill = SeekerSkill::new(cog, Arc::new(Journal::new(dir.path())));

        for _ in 0..3 {
            skill.handle(&path).await.unwrap();
        }

        assert_eq!(mock.calls(), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(SEEKER_REPLY_MARKER).count(), 1);
        assert!(!content.contains("second answer"));
    }

    #[tokio::test]
    async fn test_seeker_respects_exclusions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TODO.md");
        std::fs::write(&path, "?AION").unwrap();
        let (mock, cog) = cognition(&["x"]);
        let skill = SeekerSkill::new(cog, Arc::new(Journal::new(dir.path())))
            .with_excluded_names(vec!["TODO.md".into()]);
        skill.handle(&path).await.unwrap();
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_seeker_does_not_write_failure_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("q.txt");
        std::fs::write(&path, "?AION").unwrap();
        let cog = Arc::new(Cognition::new("p", Arc::new(MockLlmClient::failing())));
        let skill = SeekerSkill::new(cog, Arc::new(Journal::new(dir.path())));
        assert!(matches!(skill.handle(&path).await, Err(SkillError::Cognition(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "?AION");
    }

    #[tokio::test]
    async fn test_todo_notes_answers_request() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("TODO.md");
        std::fs::write(&path, "HEY AION: summarize my todos").unwrap();
        let (_mock, cog) = cognition(&["You have none."]);
        let skill = TodoNotesSkill::new(cog, Arc::new(Journal::new(dir.path())));
        skill.handle(&path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("--- AION SAYS: ---\nYou have none.\n"));
        assert_eq!(pending_request(&content), None);
    }
}
