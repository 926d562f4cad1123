//! 记忆层：消息类型、串行化 Markdown 日志、反思（"睡眠"周期）与近期记忆快照

pub mod conversation;
pub mod journal;
pub mod reflection;

pub use conversation::{ConversationMemory, Message, Role};
pub use journal::{Journal, CRITIQUES_FILE, JOURNAL_FILE, THOUGHTS_FILE, WISDOM_FILE};
pub use reflection::{RecentMemory, Reflection};
