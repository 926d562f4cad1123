//! 外部集成：社交广播（Telegram 等 Provider 经 SocialHub 扇出）

pub mod social;
pub mod telegram;

pub use social::{parse_post, split_thread, SocialError, SocialHub, SocialProvider, SocialStrategy, MAX_POST_CHARS};
pub use telegram::TelegramProvider;

use std::sync::Arc;

/// 按环境变量装配可用的 Provider
pub fn hub_from_env(timeout_secs: u64) -> SocialHub {
    let mut hub = SocialHub::new();
    if let Some(telegram) = TelegramProvider::from_env(timeout_secs) {
        hub = hub.with_provider(Arc::new(telegram));
    }
    tracing::info!("SocialHub: {} provider(s) active", hub.len());
    hub
}
