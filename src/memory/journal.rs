//! 串行化 Markdown 日志
//!
//! 监听线程触发的技能与调度循环可能同时追加同一个文件（如 AION_THOUGHTS.md）；
//! Journal 为每个路径持有一把异步锁，保证单次追加不会与另一次交错。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::AsyncWriteExt;

/// 主动研究、行情等"想法"
pub const THOUGHTS_FILE: &str = "AION_THOUGHTS.md";
/// 代码审计评论
pub const CRITIQUES_FILE: &str = "AION_CRITIQUES.md";
/// 自主日记
pub const JOURNAL_FILE: &str = "My_journal.md";
/// 反思提炼出的智慧
pub const WISDOM_FILE: &str = "AION_WISDOM.md";

/// 按路径串行化的追加日志；相对文件名相对于 root 解析
#[derive(Debug)]
pub struct Journal {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Journal {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 解析日志路径：绝对路径原样返回，否则拼到 root 下
    pub fn path_of(&self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// 原样追加文本（持有该文件的锁）
    pub async fn append_raw(&self, file: impl AsRef<Path>, text: &str) -> std::io::Result<()> {
        let path = self.path_of(file);
        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        f.write_all(text.as_bytes()).await?;
        f.flush().await
    }

    /// 追加一个 Markdown 小节：`\n## {heading}\n{body}\n`
    pub async fn append_section(
        &self,
        file: impl AsRef<Path>,
        heading: &str,
        body: &str,
    ) -> std::io::Result<()> {
        self.append_raw(file, &format!("\n## {}\n{}\n", heading, body))
            .await
    }

    /// 读取文件末尾最多 max_chars 个字符；文件不存在时返回空字符串
    pub async fn tail(&self, file: impl AsRef<Path>, max_chars: usize) -> String {
        let path = self.path_of(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => tail_chars(&content, max_chars).to_string(),
            Err(_) => String::new(),
        }
    }
}

/// 取字符串末尾最多 n 个字符（按 char 边界）
pub fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let skip = count - n;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_section_format() {
        let dir = TempDir::new().unwrap();
        let j = Journal::new(dir.path());
        j.append_section(THOUGHTS_FILE, "Proactive Research: rust", "body")
            .await
            .unwrap();
        let content = std::fs::read_to_string(dir.path().join(THOUGHTS_FILE)).unwrap();
        assert_eq!(content, "\n## Proactive Research: rust\nbody\n");
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let j = Arc::new(Journal::new(dir.path()));
        let mut handles = Vec::new();
        for i in 0..20 {
            let j = j.clone();
            handles.push(tokio::spawn(async move {
                let line = format!("entry-{i}-{}\n", "x".repeat(4096));
                j.append_raw("shared.md", &line).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let content = std::fs::read_to_string(dir.path().join("shared.md")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            assert!(line.starts_with("entry-"));
            assert!(line.ends_with(&"x".repeat(4096)));
        }
    }

    #[tokio::test]
    async fn test_tail_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let j = Journal::new(dir.path());
        assert_eq!(j.tail("nope.md", 10).await, "");
    }

    #[test]
    fn test_tail_chars_respects_char_boundaries() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("日本語テキスト", 3), "キスト");
    }
}
