//! 命令行前端
//!
//! ```text
//! aion chat              交互式对话
//! aion daemon [PATH]     启动监听 + Will
//! aion status|history|up 代理 alembic
//! ```

pub mod chat;
pub mod migrations;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::core::{build_daemon, ensure_secure_connection, AgentError, ShutdownManager};
use crate::llm::create_cognition_from_config;
use crate::observability::{self, DEBUG_LOG_FILE};
use crate::tools::{create_researcher, voice_from_command, FmpMarket};

pub use chat::{run_chat, ChatSession};
pub use migrations::{find_alembic_ini, run_migration, Migration};

const VOICE_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(
    name = "aion",
    about = "AION: the autonomous architect",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Cli {
    /// Path to a TOML config file (overrides config/default.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start a communication link with Aion
    Chat,
    /// Ignite the background watcher and Will engine
    Daemon {
        /// Workspace root (default: config or current directory)
        path: Option<PathBuf>,
    },
    /// Show the current migration revision
    Status,
    /// Show the migration history
    History,
    /// Apply all pending migrations
    Up,
}

/// 解析守护进程根目录：命令行 > 配置 > 当前目录
pub fn resolve_root(arg: Option<PathBuf>, cfg: &AppConfig) -> Result<PathBuf, AgentError> {
    let root = match arg.or_else(|| cfg.app.workspace_root.clone()) {
        Some(p) => p,
        None => std::env::current_dir()?,
    };
    Ok(root.canonicalize()?)
}

/// 执行一个子命令；返回的错误由 main 转成非零退出码
pub async fn run(cli: Cli, cfg: AppConfig) -> Result<(), AgentError> {
    match cli.command {
        Commands::Chat => {
            observability::init(None);
            let timeout = cfg.integrations.http_timeout_secs;
            let cognition = Arc::new(create_cognition_from_config(&cfg));
            let session = ChatSession::new(
                cognition.clone(),
                create_researcher(cognition, timeout),
                Arc::new(FmpMarket::from_env(timeout)),
                voice_from_command(&cfg.integrations.voice_command, VOICE_TIMEOUT_SECS),
            );
            run_chat(session).await
        }
        Commands::Daemon { path } => {
            let root = resolve_root(path, &cfg)?;
            observability::init(Some(&root.join(&cfg.app.data_dir).join(DEBUG_LOG_FILE)));
            run_daemon(&cfg, &root).await
        }
        Commands::Status => migrate(Migration::Status, &cfg).await,
        Commands::History => migrate(Migration::History, &cfg).await,
        Commands::Up => migrate(Migration::Up, &cfg).await,
    }
}

async fn run_daemon(cfg: &AppConfig, root: &Path) -> Result<(), AgentError> {
    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    ensure_secure_connection(&cfg.security, &shutdown.token()).await?;

    let daemon = build_daemon(cfg, root)?;
    daemon.run(shutdown).await
}

async fn migrate(migration: Migration, cfg: &AppConfig) -> Result<(), AgentError> {
    observability::init(None);
    let cwd = std::env::current_dir()?;
    let output = run_migration(migration, &cfg.migrations, &cwd).await?;
    match migration {
        Migration::Status if output.is_empty() => {
            println!("Result: None (database not stamped)")
        }
        Migration::Status => println!("Result: {}", output),
        Migration::History => println!("{}", output),
        Migration::Up => {
            if !output.is_empty() {
                println!("{}", output);
            }
            println!("Migration process complete.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["aion", "daemon", "/tmp/ws"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Daemon {
                path: Some(PathBuf::from("/tmp/ws"))
            }
        );
        let cli = Cli::try_parse_from(["aion", "--config", "x.toml", "up"]).unwrap();
        assert_eq!(cli.command, Commands::Up);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(Cli::try_parse_from(["aion"]).is_err());
    }

    #[test]
    fn test_resolve_root_prefers_argument() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = AppConfig::default();
        let root = resolve_root(Some(dir.path().to_path_buf()), &cfg).unwrap();
        assert_eq!(root, dir.path().canonicalize().unwrap());
        assert!(resolve_root(Some(dir.path().join("missing")), &cfg).is_err());
    }
}
