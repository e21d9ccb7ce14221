//! ra-providers: LLM provider implementations for research-assistant
//!
//! Non-streaming chat completion with tool calling for OpenAI-compatible
//! servers and the Anthropic Messages API.

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;
