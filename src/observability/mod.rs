//! 可观测性：tracing 日志初始化
//!
//! 终端输出 + 可选的日志文件（守护进程写到 `<root>/Agent_Data/aion_debug.log`，无 ANSI 颜色）。
//! 级别默认 info，可通过 RUST_LOG 覆盖。

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEBUG_LOG_FILE: &str = "aion_debug.log";

/// 初始化全局订阅者；重复调用或文件无法打开时不报错（文件层被跳过）
pub fn init(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Cannot open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init();
}
