//! One research session: prompt, agent run, normalization.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ra_core::{
    Agent, AgentConfig, AgentRun, ParseFailure, Provider, ResearchPrompt, ResearchRecord,
    ToolRegistry,
};

use crate::config::Config;

pub enum Outcome {
    Report(ResearchRecord),
    Unparsed(ParseFailure),
}

pub async fn run_research(
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    config: &Config,
    query: &str,
) -> Result<(Outcome, AgentRun)> {
    let mut prompt = ResearchPrompt::new(config.schema);
    if let Some(preamble) = &config.system_preamble {
        prompt = prompt.with_preamble(preamble.as_str());
    }

    let mut agent_config =
        AgentConfig::new("researcher").with_max_iterations(config.effective_max_iterations());
    if let Some(model) = &config.model {
        agent_config = agent_config.with_model(model.as_str());
    }
    if let Some(temperature) = config.temperature {
        agent_config = agent_config.with_temperature(temperature);
    }

    let run = Agent::run(provider, tools, agent_config, prompt.messages(query))
        .await
        .context("Research agent failed")?;

    info!(
        iterations = run.iterations,
        tool_calls = run.tools_used.len(),
        total_tokens = run.usage.total_tokens,
        exhausted = run.exhausted,
        "Research run finished"
    );

    let outcome = match config.schema.parse(&run.output) {
        Ok(mut record) => {
            if let Some((reported, actual)) = tool_use_mismatch(&record, &run) {
                warn!(
                    reported = ?reported,
                    actual = ?actual,
                    "Reported tools_used differs from the tools actually called"
                );
            }
            // The report lists what the agent really ran, in call order.
            record.set_tools_used(
                run.distinct_tool_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            );
            Outcome::Report(record)
        }
        Err(failure) => Outcome::Unparsed(failure),
    };

    Ok((outcome, run))
}

/// The record's `tools_used` against the tools the agent really ran, when
/// they disagree (order and repeats ignored).
pub fn tool_use_mismatch(
    record: &ResearchRecord,
    run: &AgentRun,
) -> Option<(Vec<String>, Vec<String>)> {
    let mut reported: Vec<String> = record.tools_used().iter().map(|t| t.trim().to_string()).collect();
    reported.sort();
    reported.dedup();

    let mut actual: Vec<String> = run
        .distinct_tool_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    actual.sort();

    (reported != actual).then_some((reported, actual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_core::testing::{MockProvider, MockTool};
    use ra_core::{Role, SchemaVariant, ToolCall, ToolKind};

    const BRIEF: &str = r#"{"topic": "Capital of France", "summary": "Paris.", "sources": ["Wikipedia"], "tools_used": ["wikipedia"]}"#;

    fn minimal_config() -> Config {
        Config {
            schema: SchemaVariant::Minimal,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_report_after_tool_use() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new(ToolKind::Wikipedia, "Page: Paris")));

        let provider = Arc::new(MockProvider::new());
        provider.queue_tool_calls(vec![ToolCall::new(
            "c1",
            "wikipedia",
            serde_json::json!({"query": "France"}),
        )]);
        provider.queue_response(BRIEF);

        let (outcome, run) = run_research(
            provider.clone(),
            Arc::new(registry),
            &minimal_config(),
            "What is the capital of France?",
        )
        .await
        .unwrap();

        let Outcome::Report(record) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(record.topic(), "Capital of France");
        assert!(tool_use_mismatch(&record, &run).is_none());

        let first = &provider.last_request().unwrap().messages[0];
        assert_eq!(first.role, Role::System);
        assert!(first.content.contains("\"tools_used\""));
    }

    #[tokio::test]
    async fn test_unparsed_output_keeps_raw() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("Paris is the capital of France.");

        let (outcome, _) = run_research(
            provider,
            Arc::new(ToolRegistry::new()),
            &minimal_config(),
            "capital of France",
        )
        .await
        .unwrap();

        let Outcome::Unparsed(failure) = outcome else {
            panic!("expected a parse failure");
        };
        assert_eq!(failure.raw, "Paris is the capital of France.");
    }

    #[tokio::test]
    async fn test_config_reaches_agent() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(BRIEF);

        let config = Config {
            model: Some("gpt-4o".to_string()),
            temperature: Some(0.0),
            system_preamble: Some("You are a meticulous librarian.".to_string()),
            ..minimal_config()
        };
        run_research(provider.clone(), Arc::new(ToolRegistry::new()), &config, "q")
            .await
            .unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.messages[0].content.starts_with("You are a meticulous librarian."));
    }

    #[tokio::test]
    async fn test_uncalled_tools_dropped_from_report() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response(
            r#"{"topic": "t", "summary": "s", "sources": [], "tools_used": ["wikipedia", "search"]}"#,
        );

        let (outcome, run) = run_research(
            provider,
            Arc::new(ToolRegistry::new()),
            &minimal_config(),
            "q",
        )
        .await
        .unwrap();

        let Outcome::Report(record) = outcome else {
            panic!("expected a report");
        };
        assert!(run.tools_used.is_empty());
        assert!(record.tools_used().is_empty());
        assert!(!ra_core::console_report(&record).contains("wikipedia"));
    }

    #[tokio::test]
    async fn test_report_lists_called_tools_in_call_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool::new(ToolKind::Search, "Title: a")));
        registry.register(Arc::new(MockTool::new(ToolKind::Wikipedia, "Page: b")));

        let provider = Arc::new(MockProvider::new());
        provider.queue_tool_calls(vec![
            ToolCall::new("c1", "search", serde_json::json!({"query": "x"})),
            ToolCall::new("c2", "wikipedia", serde_json::json!({"query": "x"})),
            ToolCall::new("c3", "search", serde_json::json!({"query": "y"})),
        ]);
        provider.queue_response(
            r#"{"topic": "t", "summary": "s", "sources": [], "tools_used": ["wikipedia", "search_news"]}"#,
        );

        let (outcome, run) =
            run_research(provider, Arc::new(registry), &minimal_config(), "q")
                .await
                .unwrap();

        let Outcome::Report(record) = outcome else {
            panic!("expected a report");
        };
        assert_eq!(run.tools_used.len(), 3);
        assert_eq!(record.tools_used(), ["search".to_string(), "wikipedia".to_string()]);
    }

    #[test]
    fn test_mismatch_ignores_order_and_repeats() {
        let record = ResearchRecord::Brief(ra_core::BriefRecord {
            topic: "t".into(),
            summary: "s".into(),
            sources: vec![],
            tools_used: vec!["wikipedia".into(), "search".into(), "search".into()],
        });
        let run = AgentRun {
            output: String::new(),
            tools_used: vec![ToolKind::Search, ToolKind::Wikipedia],
            iterations: 2,
            exhausted: false,
            usage: Default::default(),
        };
        assert!(tool_use_mismatch(&record, &run).is_none());
    }
}
