//! 交互式对话：stdin REPL 直连认知端口

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::core::AgentError;
use crate::llm::Cognition;
use crate::memory::ConversationMemory;
use crate::tools::{MarketData, Researcher, Voice};

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];
const MARKET_WORDS: &[&str] = &["stock", "market", "portfolio", "price"];
/// 对话上下文中保留的轮数
const MAX_TURNS: usize = 10;

/// 单次对话会话；与终端 I/O 解耦便于测试
pub struct ChatSession {
    cognition: Arc<Cognition>,
    researcher: Arc<dyn Researcher>,
    market: Arc<dyn MarketData>,
    voice: Arc<dyn Voice>,
    memory: ConversationMemory,
}

/// 全大写的 1-5 字母单词视为股票代码
fn tickers(input: &str) -> Vec<String> {
    input
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|w| (1..=5).contains(&w.len()) && w.chars().all(|c| c.is_ascii_uppercase()))
        .map(String::from)
        .collect()
}

impl ChatSession {
    pub fn new(
        cognition: Arc<Cognition>,
        researcher: Arc<dyn Researcher>,
        market: Arc<dyn MarketData>,
        voice: Arc<dyn Voice>,
    ) -> Self {
        Self {
            cognition,
            researcher,
            market,
            voice,
            memory: ConversationMemory::new(MAX_TURNS),
        }
    }

    pub fn is_exit(input: &str) -> bool {
        EXIT_WORDS.contains(&input.trim().to_lowercase().as_str())
    }

    /// 回答一条输入；退出词返回 None
    pub async fn respond(&mut self, input: &str) -> Option<String> {
        let input = input.trim();
        if Self::is_exit(input) {
            return None;
        }
        let lower = input.to_lowercase();

        let mut context = String::new();
        if MARKET_WORDS.iter().any(|w| lower.contains(w)) {
            let symbols = tickers(input);
            if !symbols.is_empty() {
                let info = self.market.snapshot(&symbols).await;
                context.push_str(&format!("Financial Context:\n{}\n\n", info));
            }
        }
        if input.contains('?') || lower.contains("search") {
            let results = self.researcher.search(input).await;
            context.push_str(&format!("Search Results:\n{}\n\n", results));
        }
        if !self.memory.is_empty() {
            context.push_str(&format!("Conversation so far:\n{}\n\n", self.memory.transcript()));
        }
        context.push_str("User is chatting directly via CLI.");

        let response = self.cognition.think(&context, input).await;
        if !Cognition::is_failure(&response) {
            self.memory.record_turn(input, &response);
        }
        if lower.contains("speak") || lower.contains("say") {
            self.voice.speak(&response).await;
        }
        Some(response)
    }
}

/// 终端循环：读到 EOF 或退出词结束
pub async fn run_chat(mut session: ChatSession) -> Result<(), AgentError> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"AION COMM LINK ESTABLISHED. Type 'exit' to quit.\n")
        .await?;
    loop {
        stdout.write_all(b"Query: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        match session.respond(&line).await {
            Some(response) => {
                stdout
                    .write_all(format!("\nAion: {}\n\n", response).as_bytes())
                    .await?;
            }
            None => break,
        }
    }
    stdout.write_all(b"Aion signing off.\n").await?;
    Ok(())
}
