//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `AION__*` 覆盖（双下划线表示嵌套，如 `AION__LLM__MODEL=llama3`），
//! 最后应用历史遗留变量 `AION_REMOTE_WORKER` / `AION_MODEL` / `TOR_PROXY`。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub will: WillSection,
    pub watcher: WatcherSection,
    pub skills: SkillsSection,
    pub security: SecuritySection,
    pub migrations: MigrationsSection,
    pub integrations: IntegrationsSection,
}

/// [app] 段：工作区根目录与数据目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 未设置时用当前目录；`aion daemon <path>` 优先
    pub workspace_root: Option<PathBuf>,
    /// 守护进程日志目录（相对工作区根）
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "Aion".to_string(),
            workspace_root: None,
            data_dir: PathBuf::from("Agent_Data"),
        }
    }
}

/// [llm] 段：后端选择、主机（主 / 回退）、模型、代理、超时、人格提示
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：ollama / openai / mock
    pub provider: String,
    pub primary_host: String,
    pub fallback_host: String,
    pub model: String,
    pub proxy: Option<String>,
    pub request_timeout_secs: u64,
    pub persona: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            primary_host: crate::llm::ollama::LOCAL_OLLAMA_HOST.to_string(),
            fallback_host: crate::llm::ollama::LOCAL_OLLAMA_HOST.to_string(),
            model: "llama3.1:8b".to_string(),
            proxy: None,
            request_timeout_secs: 120,
            persona: default_persona(),
        }
    }
}

fn default_persona() -> String {
    "You are Aion, an autonomous architect watching over this workspace.\n\
     You act with autonomy and precision, and you are safety-obsessed: never propose destructive operations.\n\
     Speak concisely."
        .to_string()
}

/// [will] 段：调度循环的休眠区间、周期定时器与规划参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WillSection {
    pub min_sleep_secs: u64,
    pub max_sleep_secs: u64,
    pub reflection_interval_secs: u64,
    pub broadcast_interval_secs: u64,
    pub resync_interval_secs: u64,
    /// 每次规划要求生成的目标数
    pub goal_count: usize,
    /// AUDIT 随机选择的源文件扩展名
    pub audit_extensions: Vec<String>,
}

impl Default for WillSection {
    fn default() -> Self {
        Self {
            min_sleep_secs: 30,
            max_sleep_secs: 60,
            reflection_interval_secs: 600,
            broadcast_interval_secs: 3600,
            resync_interval_secs: 1800,
            goal_count: 2,
            audit_extensions: vec!["rs".into(), "py".into()],
        }
    }
}

/// [watcher] 段：轮询间隔与忽略的目录名
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    pub poll_interval_ms: u64,
    pub ignore: Vec<String>,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            ignore: vec![
                ".git".into(),
                "target".into(),
                "node_modules".into(),
                "Agent_Data".into(),
            ],
        }
    }
}

/// [skills] 段：重叠模式策略
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SkillsSection {
    /// 通用笔记技能（*.md / *.txt）跳过的文件名，如 ["TODO.md"]；默认空，即重叠模式都会触发
    pub generic_note_excludes: Vec<String>,
}

/// [security] 段：启动时的 VPN 检查
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub require_vpn: bool,
    pub vpn_retry_secs: u64,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            require_vpn: false,
            vpn_retry_secs: 5,
        }
    }
}

/// [migrations] 段：外部迁移工具
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationsSection {
    pub alembic_bin: String,
}

impl Default for MigrationsSection {
    fn default() -> Self {
        Self {
            alembic_bin: "alembic".to_string(),
        }
    }
}

/// [integrations] 段：语音命令与外部 API 超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntegrationsSection {
    /// 语音合成命令（文本作为最后一个参数）；空字符串表示静默
    pub voice_command: String,
    pub http_timeout_secs: u64,
}

impl Default for IntegrationsSection {
    fn default() -> Self {
        Self {
            voice_command: "say".to_string(),
            http_timeout_secs: 15,
        }
    }
}

/// Tor 代理默认地址（主机为 .onion 时自动启用）
pub const DEFAULT_TOR_PROXY: &str = "socks5h://127.0.0.1:9050";

/// 从 config 目录加载配置，环境变量 AION__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 AION__*（双下划线表示嵌套键）
/// 4. 应用遗留变量（见 [`apply_legacy_env`]）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if !path.exists() {
            return Err(config::ConfigError::NotFound(path.display().to_string()));
        }
        builder = builder.add_source(config::File::from(path.clone()));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("AION")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("watcher.ignore")
            .with_list_parse_key("will.audit_extensions")
            .with_list_parse_key("skills.generic_note_excludes"),
    );

    let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
    apply_legacy_env(&mut cfg, |k| std::env::var(k).ok());
    Ok(cfg)
}

/// 应用遗留环境变量：AION_REMOTE_WORKER（主机）、AION_MODEL（模型）、TOR_PROXY（代理）。
/// 主机为 .onion 且未显式配置代理时，自动使用 TOR_PROXY 或默认 Tor 端口。
pub fn apply_legacy_env(cfg: &mut AppConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(host) = get("AION_REMOTE_WORKER").filter(|s| !s.trim().is_empty()) {
        cfg.llm.primary_host = host;
    }
    if let Some(model) = get("AION_MODEL").filter(|s| !s.trim().is_empty()) {
        cfg.llm.model = model;
    }
    if cfg.llm.primary_host.contains(".onion") && cfg.llm.proxy.is_none() {
        let proxy = get("TOR_PROXY").unwrap_or_else(|| DEFAULT_TOR_PROXY.to_string());
        tracing::info!("Routing cognition through Tor to {}", cfg.llm.primary_host);
        cfg.llm.proxy = Some(proxy);
    }
}
