//! 关闭信号：守护进程的 running 标志
//!
//! 监听任务与 Will 循环都持有同一个 CancellationToken。清除 running 不会打断正在执行的动作，
//! 只在下一次循环顶部（或下一次轮询前）被观察到。

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// 关闭原因
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM
    Signal,
    /// 启动失败或其他致命错误
    FatalError(String),
}

/// 关闭信号管理器
#[derive(Clone)]
pub struct ShutdownManager {
    token: CancellationToken,
    reason_tx: broadcast::Sender<ShutdownReason>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (reason_tx, _) = broadcast::channel(1);
        Self {
            token: CancellationToken::new(),
            reason_tx,
        }
    }

    /// 子任务用来观察 running 标志的 token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 清除 running 标志
    pub fn shutdown(&self, reason: ShutdownReason) {
        tracing::info!("Shutdown requested: {:?}", reason);
        let _ = self.reason_tx.send(reason);
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.reason_tx.subscribe()
    }

    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("Received Ctrl+C, going dormant...");
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    tracing::info!("Received SIGTERM, going dormant...");
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manager_is_running() {
        assert!(ShutdownManager::new().is_running());
    }

    #[test]
    fn test_shutdown_clears_running_and_cancels_token() {
        let manager = ShutdownManager::new();
        let token = manager.token();
        manager.shutdown(ShutdownReason::UserInitiated);
        assert!(!manager.is_running());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscribers_receive_reason() {
        let manager = ShutdownManager::new();
        let mut rx = manager.subscribe();
        manager.shutdown(ShutdownReason::FatalError("boom".into()));
        assert_eq!(rx.recv().await.unwrap(), ShutdownReason::FatalError("boom".into()));
        manager.wait_for_shutdown().await;
    }
}
