//! 守护进程级错误类型
//!
//! 运行期错误（认知、解析、技能、单次迭代）都在本地降级并记录日志；
//! 只有启动期错误（配置、安全前置条件、外部工具缺失）会让进程以非零码退出。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 启动前置条件不满足（如要求 VPN 但检查失败）
    #[error("Startup precondition failed: {0}")]
    Startup(String),

    #[error("Path escape attempt: {0}")]
    PathEscape(String),

    /// 必需的外部命令不在 PATH 上
    #[error("Required tool not found: {0}")]
    ToolMissing(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),
}
