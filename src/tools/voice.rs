//! 语音协作者：调用本机语音合成命令（如 macOS `say`、Linux `espeak`）

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

#[async_trait]
pub trait Voice: Send + Sync {
    async fn speak(&self, text: &str);
}

/// 执行 `<program> [args..] <text>`，带超时；失败只记日志
pub struct CommandVoice {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandVoice {
    /// command 按空白切分，首词为程序名
    pub fn new(command: &str, timeout_secs: u64) -> Option<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[async_trait]
impl Voice for CommandVoice {
    async fn speak(&self, text: &str) {
        let run = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .status();
        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(status)) => tracing::warn!("Voice command exited with {}", status),
            Ok(Err(e)) => tracing::warn!("Voice unavailable ({}): {}", self.program, e),
            Err(_) => tracing::warn!("Voice command timed out"),
        }
    }
}

/// 静默：只记录将要说的话
#[derive(Debug, Default)]
pub struct SilentVoice;

#[async_trait]
impl Voice for SilentVoice {
    async fn speak(&self, text: &str) {
        tracing::info!("(voice) {}", text);
    }
}

/// 按配置的命令选择语音实现；空命令为静默
pub fn voice_from_command(command: &str, timeout_secs: u64) -> Arc<dyn Voice> {
    match CommandVoice::new(command, timeout_secs) {
        Some(v) => Arc::new(v),
        None => Arc::new(SilentVoice),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        let v = CommandVoice::new("espeak -s 150", 5).unwrap();
        assert_eq!(v.program, "espeak");
        assert_eq!(v.args, vec!["-s".to_string(), "150".to_string()]);
        assert!(CommandVoice::new("   ", 5).is_none());
    }

    #[tokio::test]
    async fn test_missing_program_does_not_panic() {
        let v = CommandVoice::new("definitely-not-a-voice-binary", 1).unwrap();
        v.speak("hello").await;
    }
}
