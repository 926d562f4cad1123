//! 技能注册表与分发器
//!
//! 每条注册为 (glob 模式, 处理器, 名称)，按注册顺序存储。`dispatch(path)` 只拿文件名（basename）
//! 做大小写敏感的 glob 匹配，命中的处理器按注册顺序**串行**执行，避免同一目标文件的追加竞争。
//! 单个处理器的错误或 panic 只记录日志，不影响后续处理器。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use glob::Pattern;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SkillError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cognition failed: {0}")]
    Cognition(String),

    #[error("rejected: {0}")]
    Rejected(String),
}

/// 技能处理器：对变更的文件做一次副作用
#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn handle(&self, path: &Path) -> Result<(), SkillError>;
}

/// 闭包处理器适配
pub struct FnSkill<F>(F);

#[async_trait]
impl<F, Fut> SkillHandler for FnSkill<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SkillError>> + Send + 'static,
{
    async fn handle(&self, path: &Path) -> Result<(), SkillError> {
        (self.0)(path.to_path_buf()).await
    }
}

/// 单条注册（注册后不可变）
#[derive(Clone)]
pub struct SkillRegistration {
    pub name: String,
    pub pattern: String,
    matcher: Pattern,
    handler: Arc<dyn SkillHandler>,
}

impl SkillRegistration {
    /// 只匹配文件名，不含目录
    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.matches(file_name)
    }
}

/// 技能注册表：有序列表，插入顺序即分发顺序
#[derive(Default, Clone)]
pub struct SkillsRegistry {
    registry: Vec<SkillRegistration>,
}

impl SkillsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器。重复注册不去重：同一处理器会对每次匹配触发多次。
    /// 非法的 glob 模式按字面文件名匹配。
    pub fn register(
        &mut self,
        pattern: &str,
        handler: Arc<dyn SkillHandler>,
        name: &str,
    ) -> &mut Self {
        let matcher = match Pattern::new(pattern) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Invalid skill pattern '{}' ({}), matching literally", pattern, e);
                match Pattern::new(&Pattern::escape(pattern)) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::error!("Skill '{}' not registered: {}", name, e);
                        return self;
                    }
                }
            }
        };
        self.registry.push(SkillRegistration {
            name: name.to_string(),
            pattern: pattern.to_string(),
            matcher,
            handler,
        });
        tracing::info!("Skill registered: {} ({})", name, pattern);
        self
    }

    /// 以闭包注册
    pub fn register_fn<F, Fut>(&mut self, pattern: &str, name: &str, f: F) -> &mut Self
    where
        F: Fn(PathBuf) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SkillError>> + Send + 'static,
    {
        self.register(pattern, Arc::new(FnSkill(f)), name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn registrations(&self) -> &[SkillRegistration] {
        &self.registry
    }

    /// 分发一次变更事件；返回是否至少有一个处理器匹配（无论其是否成功）
    pub async fn dispatch(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return false;
        };

        let mut matched = false;
        for skill in self.registry.iter().filter(|s| s.matches(&file_name)) {
            matched = true;
            tracing::info!(skill = %skill.name, path = %path.display(), "Skill triggered");

            let handler = Arc::clone(&skill.handler);
            let owned = path.to_path_buf();
            // 独立任务执行以隔离 panic；立即 await 保持串行
            let outcome = tokio::spawn(async move { handler.handle(&owned).await }).await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(skill = %skill.name, path = %path.display(), "Skill error: {}", e);
                }
                Err(join_err) => {
                    tracing::error!(skill = %skill.name, path = %path.display(), "Skill panicked: {}", join_err);
                }
            }
        }

        matched
    }
}
