//! 组合根：一次性构建全部组件并注入，随后启动监听、分发与 Will 三个任务
//!
//! 不存在全局单例；测试可以用 [`Daemon::from_parts`] 注入假协作者。

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::core::{AgentError, PathGuard, ShutdownManager};
use crate::integrations::hub_from_env;
use crate::llm::{create_cognition_from_config, Cognition};
use crate::memory::Journal;
use crate::skills::{builtin_registry, SkillsRegistry};
use crate::tools::{create_researcher, voice_from_command, FmpMarket};
use crate::watcher::{run_dispatcher, FileWatcher};
use crate::will::{Collaborators, Executor, Will};

/// 监听 → 分发 通道容量
const EVENT_CHANNEL_CAPACITY: usize = 256;
/// 关闭时等待子任务收尾的上限
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);
const VOICE_TIMEOUT_SECS: u64 = 30;

pub const ONLINE_MESSAGE: &str =
    "Aion is ONLINE. I am watching, learning, and optimizing. Masterful work awaits.";

pub struct Daemon {
    root: PathBuf,
    registry: Arc<SkillsRegistry>,
    watcher: FileWatcher,
    will: Will,
    deps: Collaborators,
}

/// 按配置与环境变量装配真实协作者
pub fn build_daemon(cfg: &AppConfig, root: &Path) -> Result<Daemon, AgentError> {
    let cognition = Arc::new(create_cognition_from_config(cfg));
    let timeout = cfg.integrations.http_timeout_secs;

    let deps = Collaborators {
        researcher: create_researcher(cognition.clone(), timeout),
        market: Arc::new(FmpMarket::from_env(timeout)),
        voice: voice_from_command(&cfg.integrations.voice_command, VOICE_TIMEOUT_SECS),
        social: Arc::new(hub_from_env(timeout)),
        journal: Arc::new(Journal::new(root)),
        cognition,
    };
    Daemon::from_parts(cfg, root, deps)
}

impl Daemon {
    pub fn from_parts(cfg: &AppConfig, root: &Path, deps: Collaborators) -> Result<Self, AgentError> {
        if !root.is_dir() {
            return Err(AgentError::Startup(format!(
                "workspace root is not a directory: {}",
                root.display()
            )));
        }
        let root = root.canonicalize()?;

        let registry = Arc::new(builtin_registry(
            deps.cognition.clone(),
            deps.journal.clone(),
            &cfg.skills,
        ));
        let executor = Executor::new(
            deps.clone(),
            PathGuard::new(&root),
            cfg.will.audit_extensions.clone(),
            cfg.watcher.ignore.clone(),
        );
        let will = Will::new(&root, &cfg.will, executor)
            .with_http_timeout(cfg.integrations.http_timeout_secs);
        let watcher = FileWatcher::new(
            &root,
            cfg.watcher.ignore.clone(),
            Duration::from_millis(cfg.watcher.poll_interval_ms),
        );

        Ok(Self {
            root,
            registry,
            watcher,
            will,
            deps,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Arc<SkillsRegistry> {
        &self.registry
    }

    pub fn cognition(&self) -> &Arc<Cognition> {
        &self.deps.cognition
    }

    /// 运行直到 shutdown；各任务在取消后自行收尾
    pub async fn run(self, shutdown: Arc<ShutdownManager>) -> Result<(), AgentError> {
        let Daemon {
            root,
            registry,
            watcher,
            mut will,
            deps,
        } = self;

        tracing::info!(
            "Aion awakening at '{}' with {} skill registration(s)",
            root.display(),
            registry.len()
        );
        deps.social.broadcast(ONLINE_MESSAGE).await;
        will.refresh_location().await;

        let token = shutdown.token();
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let watcher_task = tokio::spawn(watcher.run(tx, token.clone()));
        let dispatcher_task = tokio::spawn(run_dispatcher(registry, rx));
        let will_task = tokio::spawn(will.run(token));

        shutdown.wait_for_shutdown().await;
        tracing::info!("Aion going dormant, waiting for tasks to finish");

        let drain = async {
            for (name, task) in [
                ("watcher", watcher_task),
                ("dispatcher", dispatcher_task),
                ("will", will_task),
            ] {
                if let Err(e) = task.await {
                    tracing::error!("{} task ended abnormally: {}", name, e);
                }
            }
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            tracing::warn!("Tasks did not finish within {:?}", DRAIN_TIMEOUT);
        }
        Ok(())
    }
}
