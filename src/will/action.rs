//! 原子动作：`TYPE subject` 文本解析为封闭枚举

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Research { topic: String },
    Market { ticker: String },
    Audit { filename: String },
    Alert { message: String },
    Reflect,
    /// 无法识别的动作，原文保留
    Unknown(String),
}

impl Action {
    /// 首个空白分隔的词（转大写）为类型，其余为 subject（可能为空）
    pub fn parse(decision: &str) -> Self {
        let trimmed = decision.trim();
        let (kind, subject) = match trimmed.split_once(char::is_whitespace) {
            Some((k, s)) => (k, s.trim()),
            None => (trimmed, ""),
        };
        let subject = subject.to_string();
        match kind.to_uppercase().as_str() {
            "RESEARCH" => Action::Research { topic: subject },
            "MARKET" => Action::Market { ticker: subject },
            "AUDIT" => Action::Audit { filename: subject },
            "ALERT" => Action::Alert { message: subject },
            "REFLECT" => Action::Reflect,
            _ => Action::Unknown(decision.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Research { .. } => "RESEARCH",
            Action::Market { .. } => "MARKET",
            Action::Audit { .. } => "AUDIT",
            Action::Alert { .. } => "ALERT",
            Action::Reflect => "REFLECT",
            Action::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Research { topic: s }
            | Action::Market { ticker: s }
            | Action::Audit { filename: s }
            | Action::Alert { message: s } => {
                if s.is_empty() {
                    write!(f, "{}", self.kind())
                } else {
                    write!(f, "{} {}", self.kind(), s)
                }
            }
            Action::Reflect => write!(f, "REFLECT"),
            Action::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}
