//! Chat-completion backends (Groq, OpenAI, Anthropic, Ollama) and the
//! LLM-backed external triage assessor.

pub mod assessor;
pub mod provider;
pub mod providers;

pub use assessor::LlmAssessor;
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
