//! 外部协作者：搜索、行情、语音、定位
//!
//! 都以 trait 暴露给执行器；实现永不向调用方抛错，失败时返回描述性文本或只记日志。

pub mod location;
pub mod market;
pub mod search;
pub mod voice;

pub use market::{is_valid_ticker, FmpMarket, MarketData};
pub use search::{create_researcher, BraveSearch, CognitiveSearch, Researcher};
pub use voice::{voice_from_command, CommandVoice, SilentVoice, Voice};
