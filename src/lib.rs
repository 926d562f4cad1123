//! Aion - 自主工作区守护进程
//!
//! 模块划分：
//! - **cli**: 命令行前端（chat 对话、daemon 启动、迁移工具代理）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、关闭信号、启动安全检查、组合根
//! - **integrations**: 社交广播（SocialHub / Telegram / 内容策略）
//! - **llm**: 认知端口（Cognition）与后端实现（Ollama / OpenAI 兼容 / Mock）
//! - **memory**: 消息类型、串行化 Markdown 日志、反思与近期记忆
//! - **observability**: 日志初始化
//! - **skills**: 文件模式触发的技能注册表与内置技能
//! - **tools**: 外部协作者（搜索、行情、语音、定位）
//! - **watcher**: 轮询式工作区文件监听
//! - **will**: 自主意志：动作解析、目标规划、动作执行、调度循环

pub mod cli;
pub mod config;
pub mod core;
pub mod integrations;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod skills;
pub mod tools;
pub mod watcher;
pub mod will;

pub use core::{build_daemon, Daemon};
pub use llm::Cognition;
pub use skills::SkillsRegistry;
pub use will::Will;
