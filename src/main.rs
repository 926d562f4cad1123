//! Aion - 自主工作区守护进程
//!
//! 入口：解析命令行、加载配置、分派子命令。启动期错误以非零码退出。

use anyhow::Context;
use aion::cli::{self, Cli};
use aion::config::load_config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.clone()).context("Failed to load configuration")?;
    cli::run(cli, cfg).await.context("Aion failed")?;
    Ok(())
}
