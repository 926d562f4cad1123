//! 动作执行器：把 [`Action`] 映射到外部协作者上的副作用
//!
//! 副作用非事务：写文件成功而广播失败是可接受的，各自记录日志。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::seq::SliceRandom;
use walkdir::WalkDir;

use crate::core::{AgentError, PathGuard};
use crate::integrations::SocialHub;
use crate::llm::Cognition;
use crate::memory::{Journal, CRITIQUES_FILE, JOURNAL_FILE, THOUGHTS_FILE};
use crate::tools::{is_valid_ticker, MarketData, Researcher, Voice};
use crate::will::Action;

const DEFAULT_TICKER: &str = "SPY";
const DEFAULT_ALERT: &str = "System update initiated.";
/// 审计时送入认知端口的代码上限
const AUDIT_MAX_CHARS: usize = 20_000;

/// 执行器依赖的全部协作者，由组合根一次性构建后注入
#[derive(Clone)]
pub struct Collaborators {
    pub cognition: Arc<Cognition>,
    pub journal: Arc<Journal>,
    pub researcher: Arc<dyn Researcher>,
    pub market: Arc<dyn MarketData>,
    pub voice: Arc<dyn Voice>,
    pub social: Arc<SocialHub>,
}

pub struct Executor {
    deps: Collaborators,
    guard: PathGuard,
    audit_extensions: Vec<String>,
    ignore: Vec<String>,
}

impl Executor {
    pub fn new(
        deps: Collaborators,
        guard: PathGuard,
        audit_extensions: Vec<String>,
        ignore: Vec<String>,
    ) -> Self {
        Self {
            deps,
            guard,
            audit_extensions,
            ignore,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.deps
    }

    pub async fn execute(&self, action: &Action) -> Result<(), AgentError> {
        match action {
            Action::Research { topic } => self.research(topic).await,
            Action::Market { ticker } => self.market(ticker).await,
            Action::Audit { filename } => self.audit(filename).await,
            Action::Alert { message } => {
                self.alert(message).await;
                Ok(())
            }
            Action::Reflect => self.journal_entry().await,
            Action::Unknown(raw) => {
                tracing::debug!("Ignoring unknown action: {}", raw);
                Ok(())
            }
        }
    }

    async fn research(&self, topic: &str) -> Result<(), AgentError> {
        let result = self.deps.researcher.search(topic).await;
        if Cognition::is_failure(&result) {
            tracing::warn!("Research on {} skipped: {}", topic, result);
            return Ok(());
        }
        self.deps
            .journal
            .append_section(THOUGHTS_FILE, &format!("Proactive Research: {}", topic), &result)
            .await?;
        Ok(())
    }

    async fn market(&self, ticker: &str) -> Result<(), AgentError> {
        let requested = ticker.to_uppercase();
        let ticker = if is_valid_ticker(&requested) {
            requested
        } else {
            if !requested.is_empty() {
                tracing::debug!("Rejected ticker {:?}, using {}", requested, DEFAULT_TICKER);
            }
            DEFAULT_TICKER.to_string()
        };
        let snapshot = self.deps.market.snapshot(&[ticker.clone()]).await;
        let news = self.deps.market.news(&ticker).await;
        self.deps
            .journal
            .append_section(
                THOUGHTS_FILE,
                &format!("Market Pulse: {}", ticker),
                &format!("{}\n\nLatest News:\n{}", snapshot, news),
            )
            .await?;
        self.deps
            .voice
            .speak(&format!("Aion here. I've updated the market pulse for {}.", ticker))
            .await;
        Ok(())
    }

    async fn audit(&self, filename: &str) -> Result<(), AgentError> {
        let Some(target) = self.audit_target(filename) else {
            tracing::info!("Audit skipped: no source files with {:?}", self.audit_extensions);
            return Ok(());
        };
        let code = tokio::fs::read_to_string(&target).await?;
        let code: String = code.chars().take(AUDIT_MAX_CHARS).collect();
        let critique = self
            .deps
            .cognition
            .think(
                &format!("Code:\n{}", code),
                "Critique this code ruthlessly but constructively.",
            )
            .await;
        if Cognition::is_failure(&critique) {
            tracing::warn!("Audit of {} skipped: {}", target.display(), critique);
            return Ok(());
        }
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| target.display().to_string());
        self.deps
            .journal
            .append_section(CRITIQUES_FILE, &format!("Critique of {}", name), &critique)
            .await?;
        Ok(())
    }

    /// 指定文件在 root 内则用之，否则随机挑一个源文件
    fn audit_target(&self, filename: &str) -> Option<PathBuf> {
        if !filename.is_empty() {
            match self.guard.validate(filename) {
                Ok(path) if path.is_file() => return Some(path),
                Ok(_) => tracing::debug!("Audit target is not a file: {}", filename),
                Err(e) => tracing::warn!("Audit target rejected: {}", e),
            }
        }
        let candidates = source_files(self.guard.root(), &self.audit_extensions, &self.ignore);
        candidates.choose(&mut rand::thread_rng()).cloned()
    }

    async fn alert(&self, message: &str) {
        let message = if message.is_empty() { DEFAULT_ALERT } else { message };
        self.deps.voice.speak(message).await;
        self.deps.social.broadcast(message).await;
    }

    async fn journal_entry(&self) -> Result<(), AgentError> {
        let entry = self
            .deps
            .cognition
            .think("Context: I am an autonomous AI.", "Write a philosophical journal entry.")
            .await;
        if Cognition::is_failure(&entry) {
            tracing::warn!("Journal entry skipped: {}", entry);
            return Ok(());
        }
        self.deps
            .journal
            .append_section(JOURNAL_FILE, "Autonomous Entry", &entry)
            .await?;
        Ok(())
    }
}

/// root 下扩展名在列表中的文件，跳过 ignore 目录
fn source_files(root: &Path, extensions: &[String], ignore: &[String]) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && ignore.iter().any(|i| e.file_name().to_string_lossy() == i.as_str()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| extensions.iter().any(|x| ext.to_string_lossy() == x.as_str()))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect()
}
