//! 技能分发集成测试：注册表 + 轮询监听端到端

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use aion::config::SkillsSection;
    use aion::llm::{Cognition, MockLlmClient};
    use aion::memory::Journal;
    use aion::skills::{builtin_registry, SkillError, SkillsRegistry};
    use aion::watcher::{run_dispatcher, FileWatcher};
    use tempfile::TempDir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn counting_registry() -> (SkillsRegistry, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let mut registry = SkillsRegistry::new();
        let ca = a.clone();
        registry.register_fn("*.md", "A", move |_path: PathBuf| {
            let ca = ca.clone();
            async move {
                ca.fetch_add(1, Ordering::SeqCst);
                Ok::<(), SkillError>(())
            }
        });
        let cb = b.clone();
        registry.register_fn("TODO.md", "B", move |_path: PathBuf| {
            let cb = cb.clone();
            async move {
                cb.fetch_add(1, Ordering::SeqCst);
                Ok::<(), SkillError>(())
            }
        });
        (registry, a, b)
    }

    async fn wait_for(cond: impl Fn() -> bool) -> bool {
        for _ in 0..250 {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        cond()
    }

    #[tokio::test]
    async fn test_overlapping_patterns_both_fire() {
        let dir = TempDir::new().unwrap();
        let todo = dir.path().join("TODO.md");
        std::fs::write(&todo, "").unwrap();

        let (registry, a, b) = counting_registry();
        assert!(registry.dispatch(&todo).await);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);

        assert!(!registry.dispatch(&dir.path().join("main.rs")).await);
        assert_eq!(a.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_touch_todo_through_watcher() {
        let dir = TempDir::new().unwrap();
        let todo = dir.path().join("TODO.md");
        std::fs::write(&todo, "").unwrap();

        let (registry, a, b) = counting_registry();
        let watcher = FileWatcher::new(dir.path(), vec![], Duration::from_millis(20));
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(16);
        let watch_task = tokio::spawn(watcher.run(tx, cancel.clone()));
        let dispatch_task = tokio::spawn(run_dispatcher(Arc::new(registry), rx));

        std::fs::write(&todo, "- touched").unwrap();

        let fired = wait_for(|| a.load(Ordering::SeqCst) >= 1 && b.load(Ordering::SeqCst) >= 1).await;
        cancel.cancel();
        watch_task.await.unwrap();
        dispatch_task.await.unwrap();
        assert!(fired, "both handlers should fire for a modified TODO.md");
    }

    #[tokio::test]
    async fn test_new_files_are_not_dispatched() {
        let dir = TempDir::new().unwrap();
        let (registry, a, _b) = counting_registry();
        let watcher = FileWatcher::new(dir.path(), vec![], Duration::from_millis(20));
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(16);
        let watch_task = tokio::spawn(watcher.run(tx, cancel.clone()));
        let dispatch_task = tokio::spawn(run_dispatcher(Arc::new(registry), rx));

        std::fs::write(dir.path().join("fresh.md"), "hello").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();
        watch_task.await.unwrap();
        dispatch_task.await.unwrap();
        assert_eq!(a.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_builtin_skills_answer_notes() {
        let dir = TempDir::new().unwrap();
        let mock = Arc::new(MockLlmClient::scripted(["Rust is a language.", "Monday: rest."]));
        let cognition = Arc::new(Cognition::new("p", mock.clone()));
        let journal = Arc::new(Journal::new(dir.path()));
        let registry = builtin_registry(cognition, journal, &SkillsSection::default());

        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "what is rust ?AION").unwrap();
        assert!(registry.dispatch(&notes).await);
        let content = std::fs::read_to_string(&notes).unwrap();
        assert!(content.ends_with("\n\n> **AION:**\n> Rust is a language.\n"));

        // 回复之后再次分发不会重复回答
        registry.dispatch(&notes).await;
        assert_eq!(mock.calls(), 1);

        let todo = dir.path().join("TODO.md");
        std::fs::write(&todo, "HEY AION: plan my week").unwrap();
        assert!(registry.dispatch(&todo).await);
        let content = std::fs::read_to_string(&todo).unwrap();
        assert!(content.contains("--- AION SAYS: ---\nMonday: rest.\n"));
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_cognition_never_written_to_notes() {
        let dir = TempDir::new().unwrap();
        let cognition = Arc::new(Cognition::new("p", Arc::new(MockLlmClient::failing())));
        let journal = Arc::new(Journal::new(dir.path()));
        let registry = builtin_registry(cognition, journal, &SkillsSection::default());

        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "?RALPH help").unwrap();
        assert!(registry.dispatch(&notes).await);
        assert_eq!(std::fs::read_to_string(&notes).unwrap(), "?RALPH help");
    }
}
