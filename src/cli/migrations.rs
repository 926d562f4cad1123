//! 迁移工具代理：status / history / up 转发给 alembic

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::MigrationsSection;
use crate::core::security::find_in_path;
use crate::core::AgentError;

pub const ALEMBIC_INI: &str = "alembic.ini";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    Status,
    History,
    Up,
}

impl Migration {
    pub fn args(&self) -> &'static [&'static str] {
        match self {
            Migration::Status => &["current"],
            Migration::History => &["history"],
            Migration::Up => &["upgrade", "head"],
        }
    }
}

/// 从 start 向上查找 alembic.ini
pub fn find_alembic_ini(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(ALEMBIC_INI))
        .find(|candidate| candidate.is_file())
}

fn resolve_tool(bin: &str) -> Result<PathBuf, AgentError> {
    let as_path = Path::new(bin);
    if as_path.components().count() > 1 {
        return if as_path.is_file() {
            Ok(as_path.to_path_buf())
        } else {
            Err(AgentError::ToolMissing(bin.to_string()))
        };
    }
    find_in_path(bin).ok_or_else(|| AgentError::ToolMissing(bin.to_string()))
}

/// 运行 `<alembic_bin> -c alembic.ini <args>`，返回 stdout
pub async fn run_migration(
    migration: Migration,
    cfg: &MigrationsSection,
    cwd: &Path,
) -> Result<String, AgentError> {
    let ini = find_alembic_ini(cwd).ok_or_else(|| {
        AgentError::Startup(format!("{} not found from {}", ALEMBIC_INI, cwd.display()))
    })?;
    let tool = resolve_tool(&cfg.alembic_bin)?;
    let workdir = ini.parent().unwrap_or(cwd);

    tracing::debug!("Running {} {:?} in {}", tool.display(), migration.args(), workdir.display());
    let output = Command::new(&tool)
        .arg("-c")
        .arg(&ini)
        .args(migration.args())
        .current_dir(workdir)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AgentError::ToolFailed(format!(
            "{} exited with {}: {}",
            cfg.alembic_bin,
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_alembic_ini_walks_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(ALEMBIC_INI), "[alembic]").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_alembic_ini(&nested), Some(dir.path().join(ALEMBIC_INI)));
    }

    #[test]
    fn test_migration_args() {
        assert_eq!(Migration::Status.args(), ["current"]);
        assert_eq!(Migration::Up.args(), ["upgrade", "head"]);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(ALEMBIC_INI), "[alembic]").unwrap();
        let cfg = MigrationsSection {
            alembic_bin: "definitely-not-alembic".into(),
        };
        let res = run_migration(Migration::Status, &cfg, dir.path()).await;
        assert!(matches!(res, Err(AgentError::ToolMissing(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tool_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(ALEMBIC_INI), "[alembic]").unwrap();
        let cfg = MigrationsSection {
            alembic_bin: "false".into(),
        };
        let res = run_migration(Migration::History, &cfg, dir.path()).await;
        assert!(matches!(res, Err(AgentError::ToolFailed(_))));
    }
}
