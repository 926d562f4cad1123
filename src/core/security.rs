//! 启动安全检查与路径守卫
//!
//! 启动时失败即关闭（要求 VPN 时，warp-cli 缺失直接报错；未连接则按固定间隔无限重试），
//! 运行期失败即放行（由各层自行降级）。PathGuard 绑定工作区根目录，拒绝 ../ 逃逸。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::config::SecuritySection;
use crate::core::AgentError;

const WARP_CLI: &str = "warp-cli";

/// 在 PATH 中查找可执行文件
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// `warp-cli status` 输出是否表示已连接
pub fn is_connected_status(output: &str) -> bool {
    let out = output.to_lowercase();
    out.contains("connected") && !out.contains("disconnected")
}

/// 查询 Cloudflare WARP 状态；warp-cli 不存在时返回 ToolMissing
pub async fn check_warp_status() -> Result<bool, AgentError> {
    if find_in_path(WARP_CLI).is_none() {
        return Err(AgentError::ToolMissing(WARP_CLI.to_string()));
    }
    let output = tokio::time::timeout(
        Duration::from_secs(5),
        Command::new(WARP_CLI).arg("status").output(),
    )
    .await
    .map_err(|_| AgentError::ToolFailed(format!("{} status timed out", WARP_CLI)))??;
    Ok(is_connected_status(&String::from_utf8_lossy(&output.stdout)))
}

/// 反复探测直到安全；探测报错（如工具缺失）立即返回错误，关闭信号到来时返回 Startup 错误
pub async fn wait_until_secure<F, Fut>(
    mut probe: F,
    retry: Duration,
    cancel: &CancellationToken,
) -> Result<(), AgentError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, AgentError>>,
{
    loop {
        if probe().await? {
            tracing::info!("Security protocol verified: WARP tunnel active.");
            return Ok(());
        }
        tracing::error!("FATAL: Cloudflare WARP is NOT connected. The daemon is vulnerable.");
        tracing::info!("   -> Please run 'warp-cli connect'. Retrying in {}s...", retry.as_secs());
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(AgentError::Startup("shutdown before secure connection".into()));
            }
            _ = tokio::time::sleep(retry) => {}
        }
    }
}

/// 启动闸门：未要求 VPN 时直接通过
pub async fn ensure_secure_connection(
    cfg: &SecuritySection,
    cancel: &CancellationToken,
) -> Result<(), AgentError> {
    if !cfg.require_vpn {
        tracing::debug!("VPN check disabled");
        return Ok(());
    }
    tracing::info!("Initiating security protocol: WARP check...");
    wait_until_secure(
        check_warp_status,
        Duration::from_secs(cfg.vpn_retry_secs.max(1)),
        cancel,
    )
    .await
}

/// 路径守卫：所有路径必须落在 root 内
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 相对 root 解析并校验；目标不存在时报 Io 错误
    pub fn validate(&self, target: impl AsRef<Path>) -> Result<PathBuf, AgentError> {
        let target = target.as_ref();
        let canonical = self.root.join(target).canonicalize()?;
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(AgentError::PathEscape(format!(
                "'{}' tries to escape the sandbox ({})",
                canonical.display(),
                self.root.display()
            )))
        }
    }
}
