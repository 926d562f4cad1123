//! 规划：目标生成（项目符号列表）与目标分解（JSON 动作数组）
//!
//! 分解永不失败：解析不出动作时退化为 `RESEARCH <goal>`。

use std::sync::Arc;

use crate::llm::Cognition;

const DECOMPOSE_TASK: &str = "Break this goal down into 1-3 specific actions. \
Available actions: RESEARCH <topic>, MARKET <ticker>, AUDIT <filename>, ALERT <message>, REFLECT. \
Return as a JSON list of strings, e.g. [\"RESEARCH quantum computing\", \"ALERT Research started\"].";

/// 取以 `-`、`*` 或 `1.` 式编号开头的行，去掉行首的项目符号
pub fn parse_goals(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| strip_bullet(line.trim()))
        .map(|goal| goal.trim_end_matches('*').trim().to_string())
        .filter(|goal| !goal.is_empty())
        .collect()
}

fn strip_bullet(line: &str) -> Option<&str> {
    if line.starts_with('-') || line.starts_with('*') {
        return Some(line.trim_start_matches(|c| matches!(c, '-' | '*' | ' ')));
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 && line[digits..].starts_with('.') {
        return Some(line[digits + 1..].trim_start());
    }
    None
}

/// 截取第一个 `[` 到最后一个 `]` 并按字符串数组解析
pub fn extract_actions(response: &str) -> Option<Vec<String>> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Vec<String>>(&response[start..=end]).ok()
}

pub struct Planner {
    cognition: Arc<Cognition>,
    goal_count: usize,
}

impl Planner {
    pub fn new(cognition: Arc<Cognition>, goal_count: usize) -> Self {
        Self {
            cognition,
            goal_count: goal_count.max(1),
        }
    }

    /// 询问高层目标；认知失败时返回空
    pub async fn goals(&self, context: &str) -> Vec<String> {
        let task = format!(
            "Generate {} strategic goals for this session. Return as a bulleted list.",
            self.goal_count
        );
        let response = self.cognition.think(context, &task).await;
        if Cognition::is_failure(&response) {
            tracing::warn!("Goal planning skipped: {}", response);
            return Vec::new();
        }
        parse_goals(&response)
    }

    pub async fn decompose(&self, goal: &str) -> Vec<String> {
        let response = self
            .cognition
            .think(&format!("Goal: {}", goal), DECOMPOSE_TASK)
            .await;
        match extract_actions(&response) {
            Some(actions) if !actions.is_empty() => actions,
            _ => {
                tracing::debug!("Decomposition fell back for goal: {}", goal);
                vec![format!("RESEARCH {}", goal)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn planner(replies: &[&str]) -> Planner {
        let mock = Arc::new(MockLlmClient::scripted(replies.iter().copied()));
        Planner::new(Arc::new(Cognition::new("p", mock)), 2)
    }

    #[test]
    fn test_parse_goals_bullets() {
        let text = "Here are goals:\n- Map the codebase\n* **Watch the market**\n1. Reflect deeply\nplain line\n12. Ship v2.0\n-";
        assert_eq!(
            parse_goals(text),
            vec!["Map the codebase", "Watch the market", "Reflect deeply", "Ship v2.0"]
        );
    }

    #[test]
    fn test_extract_actions_embedded() {
        let text = "Sure! Here you go: [\"MARKET NVDA\", \"ALERT hi\"] hope that helps";
        assert_eq!(
            extract_actions(text),
            Some(vec!["MARKET NVDA".to_string(), "ALERT hi".to_string()])
        );
        assert_eq!(extract_actions("no brackets"), None);
        assert_eq!(extract_actions("] backwards ["), None);
    }

    #[tokio::test]
    async fn test_decompose_invalid_json_falls_back() {
        let p = planner(&["I cannot produce JSON today"]);
        assert_eq!(p.decompose("learn rust").await, vec!["RESEARCH learn rust".to_string()]);
    }

    #[tokio::test]
    async fn test_decompose_extracts_in_order() {
        let p = planner(&["Plan: [\"MARKET NVDA\", \"ALERT hi\"]. Done."]);
        assert_eq!(
            p.decompose("watch chips").await,
            vec!["MARKET NVDA".to_string(), "ALERT hi".to_string()]
        );
    }

    #[tokio::test]
    async fn test_decompose_on_cognition_failure_falls_back() {
        let mock = Arc::new(MockLlmClient::failing());
        let p = Planner::new(Arc::new(Cognition::new("p", mock)), 2);
        assert_eq!(p.decompose("x").await, vec!["RESEARCH x".to_string()]);
        assert!(p.goals("ctx").await.is_empty());
    }
}
