//! LLM 层：认知端口与后端实现（Ollama / OpenAI 兼容 / Mock）

pub mod cognition;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use cognition::{
    create_cognition_from_config, Cognition, CognitionError, ALL_MINDS_UNREACHABLE,
    FAILURE_PREFIX,
};
pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use traits::{LlmClient, LlmError};
