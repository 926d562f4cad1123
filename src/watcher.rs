//! 轮询式工作区监听
//!
//! 周期性遍历根目录，记录每个文件的 (mtime, size)。与上一次快照相比发生变化的**已有**文件
//! 产生 `Modified` 事件；新建与删除只记 debug 日志，不分发。目录本身从不产生事件。
//! 选择轮询而非系统通知，以便在网络挂载等文件系统上同样可靠。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::skills::SkillsRegistry;

/// 单个文件的快照指纹
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

/// 监听事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

/// 遍历 root，跳过名字在 ignore 中的目录
fn scan(root: &Path, ignore: &[String]) -> HashMap<PathBuf, Fingerprint> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !(e.file_type().is_dir()
                    && ignore.iter().any(|i| e.file_name().to_string_lossy() == i.as_str()))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            Some((
                e.into_path(),
                Fingerprint {
                    modified: meta.modified().ok(),
                    len: meta.len(),
                },
            ))
        })
        .collect()
}

/// 轮询监听器
pub struct FileWatcher {
    root: PathBuf,
    ignore: Vec<String>,
    poll_interval: Duration,
    snapshot: HashMap<PathBuf, Fingerprint>,
}

impl FileWatcher {
    /// 创建时即记录初始快照（启动时已有内容不触发）
    pub fn new(root: impl AsRef<Path>, ignore: Vec<String>, poll_interval: Duration) -> Self {
        let root = root.as_ref().to_path_buf();
        let snapshot = scan(&root, &ignore);
        Self {
            root,
            ignore,
            poll_interval,
            snapshot,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tracked_files(&self) -> usize {
        self.snapshot.len()
    }

    fn diff(&mut self, next: HashMap<PathBuf, Fingerprint>) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        for (path, fp) in &next {
            match self.snapshot.get(path) {
                Some(prev) if prev != fp => events.push(WatchEvent::Modified(path.clone())),
                Some(_) => {}
                None => events.push(WatchEvent::Created(path.clone())),
            }
        }
        for path in self.snapshot.keys() {
            if !next.contains_key(path) {
                events.push(WatchEvent::Removed(path.clone()));
            }
        }
        self.snapshot = next;
        events.sort_by(|a, b| event_path(a).cmp(event_path(b)));
        events
    }

    /// 同步轮询一次（阻塞 I/O）
    pub fn poll_once(&mut self) -> Vec<WatchEvent> {
        let next = scan(&self.root, &self.ignore);
        self.diff(next)
    }

    /// 轮询循环：只把 Modified 路径发往 tx；通道关闭或取消时退出
    pub async fn run(mut self, tx: mpsc::Sender<PathBuf>, cancel: CancellationToken) {
        info!(
            "Watcher online: '{}' ({} files, every {}ms)",
            self.root.display(),
            self.snapshot.len(),
            self.poll_interval.as_millis()
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let root = self.root.clone();
            let ignore = self.ignore.clone();
            let next = match tokio::task::spawn_blocking(move || scan(&root, &ignore)).await {
                Ok(n) => n,
                Err(e) => {
                    warn!("Watcher scan failed: {}", e);
                    continue;
                }
            };

            for event in self.diff(next) {
                match event {
                    WatchEvent::Modified(path) => {
                        debug!("Modified: {}", path.display());
                        if tx.send(path).await.is_err() {
                            info!("Watcher channel closed, shutting down");
                            return;
                        }
                    }
                    WatchEvent::Created(path) => debug!("Created (ignored): {}", path.display()),
                    WatchEvent::Removed(path) => debug!("Removed (ignored): {}", path.display()),
                }
            }
        }
        info!("Watcher stopped");
    }
}

fn event_path(e: &WatchEvent) -> &Path {
    match e {
        WatchEvent::Modified(p) | WatchEvent::Created(p) | WatchEvent::Removed(p) => p,
    }
}

/// 消费监听事件并分发给技能；通道关闭时退出
pub async fn run_dispatcher(registry: Arc<SkillsRegistry>, mut rx: mpsc::Receiver<PathBuf>) {
    while let Some(path) = rx.recv().await {
        if !registry.dispatch(&path).await {
            debug!("No skill for {}", path.display());
        }
    }
    info!("Dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_existing_files_do_not_fire_on_start() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        let mut w = FileWatcher::new(dir.path(), vec![], Duration::from_millis(10));
        assert_eq!(w.tracked_files(), 1);
        assert!(w.poll_once().is_empty());
    }

    #[test]
    fn test_modify_create_remove() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.md");
        std::fs::write(&a, "a").unwrap();
        std::fs::write(&b, "b").unwrap();
        let mut w = FileWatcher::new(dir.path(), vec![], Duration::from_millis(10));

        std::fs::write(&a, "a changed").unwrap();
        std::fs::remove_file(&b).unwrap();
        let c = dir.path().join("c.md");
        std::fs::write(&c, "c").unwrap();

        let events = w.poll_once();
        assert_eq!(
            events,
            vec![
                WatchEvent::Modified(a.clone()),
                WatchEvent::Removed(b),
                WatchEvent::Created(c),
            ]
        );
        assert!(w.poll_once().is_empty());
    }

    #[test]
    fn test_ignored_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::write(dir.path().join("src/main.py"), "print()").unwrap();
        let w = FileWatcher::new(dir.path(), vec![".git".into()], Duration::from_millis(10));
        assert_eq!(w.tracked_files(), 1);
    }
}
