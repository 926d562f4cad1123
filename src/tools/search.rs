//! 搜索协作者：Brave Search API，未配置 Key 时退化为由认知端口"模拟"的搜索摘要
//!
//! 所有实现都返回字符串，失败时返回描述性文本而非错误，供执行器直接写入日志。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::llm::Cognition;

const BRAVE_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";
const RESULT_COUNT: u32 = 5;

/// 搜索协作者
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn search(&self, query: &str) -> String;
}

#[derive(Deserialize, Default)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize, Default)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
}

/// Brave Search：GET 请求带超时与订阅 Token
pub struct BraveSearch {
    client: Client,
    api_key: String,
}

impl BraveSearch {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<BraveResult>, reqwest::Error> {
        let count = RESULT_COUNT.to_string();
        let resp: BraveResponse = self
            .client
            .get(BRAVE_ENDPOINT)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.web.map(|w| w.results).unwrap_or_default())
    }
}

/// 格式化为 `- title: description (url)` 列表
fn format_results(results: &[BraveResult]) -> String {
    if results.is_empty() {
        return "No search results found.".to_string();
    }
    results
        .iter()
        .map(|r| format!("- {}: {} ({})", r.title, r.description, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Researcher for BraveSearch {
    async fn search(&self, query: &str) -> String {
        match self.fetch(query).await {
            Ok(results) => format_results(&results),
            Err(e) => {
                tracing::error!("Brave Search error: {}", e);
                format!("Search failed: {}", e)
            }
        }
    }
}

/// 无搜索 Key 时：请认知端口根据内部知识给出"搜索结果"摘要
pub struct CognitiveSearch {
    cognition: Arc<Cognition>,
}

impl CognitiveSearch {
    pub fn new(cognition: Arc<Cognition>) -> Self {
        Self { cognition }
    }
}

#[async_trait]
impl Researcher for CognitiveSearch {
    async fn search(&self, query: &str) -> String {
        self.cognition
            .think(
                &format!("Query: {}", query),
                "Simulate a web search result for this query based on your internal knowledge. Format as a search result summary.",
            )
            .await
    }
}

/// 按环境变量 BRAVE_API_KEY 选择实现
pub fn create_researcher(cognition: Arc<Cognition>, timeout_secs: u64) -> Arc<dyn Researcher> {
    match std::env::var("BRAVE_API_KEY").ok().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            tracing::info!("Researcher: Brave Search");
            Arc::new(BraveSearch::new(key, timeout_secs))
        }
        None => {
            tracing::info!("Researcher: no BRAVE_API_KEY, using cognition-simulated search");
            Arc::new(CognitiveSearch::new(cognition))
        }
    }
}
