//! 核心层：错误类型、关闭信号、启动安全闸门、组合根

pub mod daemon;
pub mod error;
pub mod security;
pub mod shutdown;

pub use daemon::{build_daemon, Daemon, ONLINE_MESSAGE};
pub use error::AgentError;
pub use security::{ensure_secure_connection, PathGuard};
pub use shutdown::{ShutdownManager, ShutdownReason};
