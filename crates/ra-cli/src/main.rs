use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ra_core::{console_report, record_log_entry, timestamp_now, Provider, SchemaVariant, ToolRegistry};
use ra_providers::{AnthropicProvider, OpenAIProvider};
use ra_tools::{append_entry, create_research_tools};

mod config;
mod research;

use config::{Config, Overrides, ProviderKind};
use research::{run_research, Outcome};

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Most verbose: request payloads
    Trace,
    /// Verbose: LLM requests, iterations, tool execution details
    Debug,
    /// Standard: run summary, saves
    Info,
    /// Quiet: fallbacks, mismatches and errors
    Warn,
    /// Minimal: only errors
    Error,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Parser)]
#[command(name = "ra")]
#[command(author, version, about = "Research assistant: an LLM agent that searches, reads and reports", long_about = None)]
pub struct Cli {
    /// Research query (read from stdin when omitted)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Output record shape (minimal or extended)
    #[arg(short, long)]
    pub schema: Option<SchemaVariant>,

    /// Provider to use (overrides config)
    #[arg(short = 'P', long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Model to use (overrides config)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Maximum agent iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Run the agent without any tools
    #[arg(long)]
    pub no_tools: bool,

    /// Append the parsed record to the output file
    #[arg(long)]
    pub save: bool,

    /// Output file for saved research
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Enable debug logging (shorthand for --log-level debug)
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to file (JSON-lines format)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            provider: self.provider,
            model: self.model.clone(),
            schema: self.schema,
            max_iterations: self.max_iterations,
            output_file: self.output.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = Config::load_with_dotenv(&cli.overrides())?;
    debug!(provider = %config.provider, schema = %config.schema, "Configuration loaded");

    let provider = create_provider(&config)?;
    let query = read_query(cli.query.as_deref())?;

    let tools = if cli.no_tools {
        ToolRegistry::new()
    } else {
        create_research_tools(&config.search, &config.wikipedia, config.output_file.clone())
    };

    let (outcome, _run) = run_research(provider, Arc::new(tools), &config, &query).await?;

    match outcome {
        Outcome::Report(record) => {
            print!("{}", console_report(&record));
            if cli.save {
                append_entry(&config.output_file, &record_log_entry(&record, &timestamp_now()))
                    .await
                    .with_context(|| {
                        format!("Failed to save research to {}", config.output_file.display())
                    })?;
                println!("Saved to {}", config.output_file.display());
            }
        }
        Outcome::Unparsed(failure) => {
            println!("Error parsing response: {}", failure.reason);
            println!("Raw response:");
            println!("{}", failure.raw);
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    // --debug overrides --log-level
    let log_level = if cli.debug {
        LogLevel::Debug
    } else {
        cli.log_level
    };
    let filter = EnvFilter::new(log_level.as_filter());

    if let Some(log_path) = &cli.log_file {
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config.resolve_api_key()?;

    let provider: Arc<dyn Provider> = match config.provider {
        ProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(api_key);
            if let Some(model) = &config.model {
                provider = provider.with_default_model(model);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAI => {
            let mut provider = OpenAIProvider::new(api_key);
            if let Some(model) = &config.model {
                provider = provider.with_default_model(model);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
    };
    Ok(provider)
}

/// The query from `--query`, or from stdin: one prompted line on a
/// terminal, everything otherwise.
fn read_query(arg: Option<&str>) -> Result<String> {
    let query = match arg {
        Some(q) => q.to_string(),
        None => {
            let stdin = std::io::stdin();
            let mut input = String::new();
            if stdin.is_terminal() {
                eprint!("What can I help you research? ");
                std::io::stderr().flush().ok();
                stdin.read_line(&mut input).context("Failed to read query")?;
            } else {
                stdin.lock().read_to_string(&mut input).context("Failed to read query from stdin")?;
            }
            input
        }
    };

    let query = query.trim();
    if query.is_empty() {
        anyhow::bail!("No query given. Pass --query or provide one on stdin.");
    }
    Ok(query.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "ra", "-q", "climate change", "-s", "minimal", "-P", "anthropic", "--max-iterations", "4",
            "--save", "-o", "out.txt",
        ])
        .unwrap();

        assert_eq!(cli.query.as_deref(), Some("climate change"));
        assert!(cli.save);
        let overrides = cli.overrides();
        assert_eq!(overrides.schema, Some(SchemaVariant::Minimal));
        assert_eq!(overrides.provider, Some(ProviderKind::Anthropic));
        assert_eq!(overrides.max_iterations, Some(4));
        assert_eq!(overrides.output_file, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["ra"]).unwrap();
        assert!(cli.query.is_none());
        assert!(!cli.no_tools);
        assert_eq!(cli.log_level, LogLevel::Warn);
        let overrides = cli.overrides();
        assert!(overrides.provider.is_none());
        assert!(overrides.schema.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_schema() {
        assert!(Cli::try_parse_from(["ra", "--schema", "verbose"]).is_err());
        assert!(Cli::try_parse_from(["ra", "-P", "gemini"]).is_err());
    }

    #[test]
    fn test_read_query_from_argument() {
        assert_eq!(read_query(Some("  rust  ")).unwrap(), "rust");
        assert!(read_query(Some("   ")).is_err());
    }
}
