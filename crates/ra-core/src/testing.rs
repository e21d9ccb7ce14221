//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::error::Error;
use crate::message::{Message, ToolCall, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::tool::{text_argument, Tool, ToolKind, ToolOutput};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<CompletionResponse>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
        }
    }

    /// Queue a final text response.
    /// Responses are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        self.queue_raw_response(CompletionResponse {
            message: Message::assistant(content),
            usage: Usage::new(10, 5),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::Stop,
        });
    }

    /// Queue a response that asks for tool calls and carries no text.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) {
        self.queue_raw_tool_calls("", calls);
    }

    /// Queue a tool-call response with accompanying assistant text.
    pub fn queue_raw_tool_calls(&self, content: &str, calls: Vec<ToolCall>) {
        self.queue_raw_response(CompletionResponse {
            message: Message::assistant_with_tool_calls(content, calls),
            usage: Usage::new(10, 5),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::ToolCalls,
        });
    }

    pub fn queue_raw_response(&self, response: CompletionResponse) {
        self.responses.lock().unwrap().insert(0, response);
    }

    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop() {
            Some(response) => Ok(response),
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}

/// A tool that answers every call with the same text and records the inputs.
pub struct MockTool {
    kind: ToolKind,
    result: Result<String, String>,
    calls: Mutex<Vec<String>>,
}

impl MockTool {
    pub fn new(kind: ToolKind, output: &str) -> Self {
        Self {
            kind,
            result: Ok(output.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A tool whose every call fails with `message`.
    pub fn failing(kind: ToolKind, message: &str) -> Self {
        Self {
            kind,
            result: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Inputs received so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for MockTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
        let input = text_argument(self.kind, &arguments)?;
        self.calls.lock().unwrap().push(input);
        match &self.result {
            Ok(output) => Ok(ToolOutput::enriched(output.as_str())),
            Err(message) => Err(Error::tool(self.kind.name(), message.as_str())),
        }
    }
}
