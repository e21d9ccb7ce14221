//! ra-core: Core types and traits for research-assistant
//!
//! The provider and tool seams, the agent loop, the research record schema
//! with its strict normalizer, and the console/log renderings.

pub mod agent;
pub mod error;
pub mod message;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod render;
pub mod schema;
pub mod tool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{Agent, AgentConfig, AgentRun};
pub use error::Error;
pub use message::{Message, Role, ToolCall, Usage};
pub use normalize::{parse_any, ParseFailure};
pub use prompt::ResearchPrompt;
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use render::{console_report, record_log_entry, text_log_entry, timestamp_now};
pub use schema::{
    BriefRecord, DetailedRecord, FieldKind, FieldSpec, FieldValue, ResearchRecord, SchemaVariant,
};
pub use tool::{
    text_argument, Fidelity, PropertySchema, Tool, ToolDefinition, ToolDescriptor, ToolKind,
    ToolOutput, ToolParameters, ToolRegistry,
};

pub type Result<T> = std::result::Result<T, Error>;
