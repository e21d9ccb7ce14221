//! The agent loop: alternate between the model and the registered tools
//! until the model answers without calling a tool, or the iteration cap is
//! reached.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Error;
use crate::message::{Message, ToolCall, Usage};
use crate::provider::{CompletionRequest, Provider};
use crate::tool::{ToolKind, ToolRegistry};

/// Configuration for an agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name used in logs.
    pub name: String,
    /// Maximum agentic loop iterations.
    pub max_iterations: usize,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_iterations: 15,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// What one agent run produced.
#[derive(Debug, Clone, Default)]
pub struct AgentRun {
    /// Final text. On cap exhaustion, the last non-empty assistant text seen.
    pub output: String,
    /// Tools invoked, in call order (repeats kept).
    pub tools_used: Vec<ToolKind>,
    pub iterations: usize,
    /// True when the loop stopped because it hit `max_iterations`.
    pub exhausted: bool,
    pub usage: Usage,
}

impl AgentRun {
    /// Distinct tool names in first-use order.
    pub fn distinct_tool_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for kind in &self.tools_used {
            if !names.contains(&kind.name()) {
                names.push(kind.name());
            }
        }
        names
    }
}

pub struct Agent;

impl Agent {
    /// Run the loop over an already-assembled message sequence.
    ///
    /// Tool failures are reported back to the model as `Error: ...` text and
    /// never abort the run. Provider failures do.
    pub async fn run(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        context: Vec<Message>,
    ) -> Result<AgentRun, Error> {
        debug!(
            agent = %config.name,
            context_messages = context.len(),
            tools_available = tools.len(),
            max_iterations = config.max_iterations,
            "Agent run starting"
        );

        let mut messages = context;
        let mut run = AgentRun::default();

        for iteration in 0..config.max_iterations {
            run.iterations = iteration + 1;

            debug!(
                agent = %config.name,
                iteration = iteration,
                message_count = messages.len(),
                "Agent iteration starting"
            );

            let mut request =
                CompletionRequest::new(messages.clone()).with_tools(tools.definitions());
            if let Some(model) = &config.model {
                request = request.with_model(model.as_str());
            }
            if let Some(temperature) = config.temperature {
                request = request.with_temperature(temperature);
            }
            if let Some(max_tokens) = config.max_tokens {
                request = request.with_max_tokens(max_tokens);
            }

            let response = provider.complete(request).await?;
            run.usage.add(response.usage);

            let content = response.message.content;
            let tool_calls = response.message.tool_calls;

            if tool_calls.is_empty() {
                debug!(
                    agent = %config.name,
                    iterations = run.iterations,
                    response_len = content.len(),
                    "Agent completed"
                );
                run.output = content;
                return Ok(run);
            }

            if !content.trim().is_empty() {
                run.output = content.clone();
            }

            debug!(
                agent = %config.name,
                tool_count = tool_calls.len(),
                "Agent executing tools"
            );
            messages.push(Message::assistant_with_tool_calls(content, tool_calls.clone()));

            for tool_call in &tool_calls {
                let result = execute_tool(&tools, tool_call).await;
                if let Some(kind) = ToolKind::from_name(&tool_call.name) {
                    if tools.get(kind).is_some() {
                        run.tools_used.push(kind);
                    }
                }
                messages.push(Message::tool_result(&tool_call.id, result));
            }
        }

        warn!(
            agent = %config.name,
            max_iterations = config.max_iterations,
            "Agent stopped at iteration cap; returning partial output"
        );
        run.exhausted = true;
        Ok(run)
    }
}

/// Execute a single tool call, rendering any failure as text for the model.
async fn execute_tool(registry: &ToolRegistry, tool_call: &ToolCall) -> String {
    let Some(tool) = registry.get_by_name(&tool_call.name) else {
        return format!("Error: Unknown tool '{}'", tool_call.name);
    };

    debug!(tool = %tool_call.name, arguments = %tool_call.arguments, "Executing tool");

    match tool.execute(tool_call.arguments.clone()).await {
        Ok(output) => {
            debug!(
                tool = %tool_call.name,
                fidelity = ?output.fidelity,
                result_len = output.content.len(),
                "Tool finished"
            );
            output.content
        }
        Err(e) => {
            warn!(tool = %tool_call.name, error = %e, "Tool failed");
            format!("Error executing tool: {}", e)
        }
    }
}
