//! 行情协作者：Financial Modeling Prep 报价与新闻

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const FMP_BASE: &str = "https://financialmodelingprep.com/api/v3";
/// 股票代码长度上限
const MAX_TICKER_LEN: usize = 10;

/// 代码只允许大写字母、数字、`.` 与 `-`，避免模型输出拼进 URL
pub fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// 一组代码的报价快照
    async fn snapshot(&self, symbols: &[String]) -> String;
    /// 单个代码的最新新闻
    async fn news(&self, symbol: &str) -> String;
}

#[derive(Deserialize)]
struct Quote {
    symbol: String,
    #[serde(default)]
    price: f64,
    #[serde(default, rename = "changesPercentage")]
    changes_percentage: f64,
}

#[derive(Deserialize)]
struct NewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

pub struct FmpMarket {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl FmpMarket {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: FMP_BASE.to_string(),
            api_key,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_env(timeout_secs: u64) -> Self {
        Self::new(
            std::env::var("FMP_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            timeout_secs,
        )
    }

    /// API Key 走 query 参数，错误的 Display 会带上它；格式化错误前先 `without_url`
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        key: &str,
    ) -> Result<T, reqwest::Error> {
        self.client
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .query(&[("apikey", key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

fn format_quotes(quotes: &[Quote]) -> String {
    if quotes.is_empty() {
        return "No data found for symbols.".to_string();
    }
    quotes
        .iter()
        .map(|q| format!("{}: ${} ({}%)", q.symbol, q.price, q.changes_percentage))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl MarketData for FmpMarket {
    async fn snapshot(&self, symbols: &[String]) -> String {
        let Some(key) = &self.api_key else {
            return "FMP API key not found.".to_string();
        };
        let symbols: Vec<&str> = symbols
            .iter()
            .map(String::as_str)
            .filter(|s| is_valid_ticker(s))
            .collect();
        if symbols.is_empty() {
            return format_quotes(&[]);
        }
        let path = format!("quote/{}", symbols.join(","));
        match self.get_json::<Vec<Quote>>(&path, &[], key).await {
            Ok(quotes) => format_quotes(&quotes),
            Err(e) => format!("Market check failed: {}", e.without_url()),
        }
    }

    async fn news(&self, symbol: &str) -> String {
        let Some(key) = &self.api_key else {
            return "News unavailable.".to_string();
        };
        if !is_valid_ticker(symbol) {
            return "News unavailable.".to_string();
        }
        let query = [("tickers", symbol), ("limit", "3")];
        match self.get_json::<Vec<NewsItem>>("stock_news", &query, key).await {
            Ok(items) => items
                .iter()
                .map(|n| format!("- {} ({})", n.title, n.url))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                tracing::debug!("News lookup failed for {}: {}", symbol, e.without_url());
                "News unavailable.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_quotes() {
        let quotes: Vec<Quote> = serde_json::from_str(
            r#"[{"symbol":"NVDA","price":120.5,"changesPercentage":-1.25}]"#,
        )
        .unwrap();
        assert_eq!(format_quotes(&quotes), "NVDA: $120.5 (-1.25%)");
        assert_eq!(format_quotes(&[]), "No data found for symbols.");
    }

    #[tokio::test]
    async fn test_missing_key_returns_text() {
        let m = FmpMarket::new(None, 1);
        assert_eq!(m.snapshot(&["SPY".into()]).await, "FMP API key not found.");
        assert_eq!(m.news("SPY").await, "News unavailable.");
    }

    #[test]
    fn test_ticker_validation() {
        assert!(is_valid_ticker("NVDA"));
        assert!(is_valid_ticker("BRK.B"));
        assert!(!is_valid_ticker("NVDA&limit=999"));
        assert!(!is_valid_ticker("../v4"));
        assert!(!is_valid_ticker("nvda"));
        assert!(!is_valid_ticker(""));
        assert!(!is_valid_ticker("ABCDEFGHIJK"));
    }

    #[tokio::test]
    async fn test_failure_text_does_not_leak_api_key() {
        let m = FmpMarket::new(Some("SECRETKEY123".into()), 1).with_base_url("http://127.0.0.1:9/api/v3");
        let snapshot = m.snapshot(&["SPY".into()]).await;
        assert!(snapshot.starts_with("Market check failed:"));
        assert!(!snapshot.contains("SECRETKEY123"));
    }

    #[tokio::test]
    async fn test_invalid_symbols_never_requested() {
        let m = FmpMarket::new(Some("k".into()), 1).with_base_url("http://127.0.0.1:9");
        assert_eq!(m.snapshot(&["NVDA&limit=999".into()]).await, "No data found for symbols.");
        assert_eq!(m.news("a/b").await, "News unavailable.");
    }
}
