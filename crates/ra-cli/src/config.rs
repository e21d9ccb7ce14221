//! Layered configuration.
//!
//! Lowest to highest: built-in defaults, `~/.config/ra/config.toml`,
//! `./ra.toml`, `RA_*` environment variables (`__` separates nested keys,
//! e.g. `RA_SEARCH__MAX_RESULTS`), then command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use ra_core::SchemaVariant;
use ra_tools::{SearchConfig, WikipediaConfig, DEFAULT_OUTPUT_FILE};

const ENV_PREFIX: &str = "RA_";
const LOCAL_CONFIG_FILE: &str = "ra.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenAI => write!(f, "openai"),
            ProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    /// Model id; the provider's default when unset.
    pub model: Option<String>,
    /// Endpoint override (OpenAI-compatible servers, proxies).
    pub base_url: Option<String>,
    /// Prefer the provider's environment variable over this.
    pub api_key: Option<String>,
    pub schema: SchemaVariant,
    /// Agent iteration cap; per-schema default when unset.
    pub max_iterations: Option<usize>,
    pub temperature: Option<f32>,
    pub output_file: PathBuf,
    /// Replaces the opening line of the system prompt.
    pub system_preamble: Option<String>,
    pub search: SearchConfig,
    pub wikipedia: WikipediaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key: None,
            schema: SchemaVariant::default(),
            max_iterations: None,
            temperature: None,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            system_preamble: None,
            search: SearchConfig::default(),
            wikipedia: WikipediaConfig::default(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl Config {
    /// Load `.env` from the working directory, then all configuration layers.
    pub fn load_with_dotenv(overrides: &Overrides) -> Result<Self> {
        // A missing .env file is normal.
        let _ = dotenvy::dotenv();
        Self::load(overrides)
    }

    pub fn load(overrides: &Overrides) -> Result<Self> {
        Self::figment(Self::global_path().as_deref(), overrides)
            .extract()
            .context("Invalid configuration")
    }

    /// Build the provider chain. `global` is the per-user config file, if any.
    pub fn figment(global: Option<&Path>, overrides: &Overrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = global {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment
            .merge(Toml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
    }

    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ra").join("config.toml"))
    }

    /// API key for the selected provider: its environment variable first,
    /// then `api_key` from the config files.
    pub fn resolve_api_key(&self) -> Result<String> {
        let var = self.provider.api_key_var();
        std::env::var(var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .with_context(|| {
                format!(
                    "No API key for provider '{}'. Set {} (or api_key in config).",
                    self.provider, var
                )
            })
    }

    pub fn effective_max_iterations(&self) -> usize {
        self.max_iterations
            .filter(|&n| n > 0)
            .unwrap_or_else(|| self.schema.default_max_iterations())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config: Config = Config::figment(None, &Overrides::default()).extract()?;
            assert_eq!(config.provider, ProviderKind::OpenAI);
            assert_eq!(config.schema, SchemaVariant::Extended);
            assert_eq!(config.output_file, PathBuf::from("research_output.txt"));
            assert_eq!(config.search.max_results, 5);
            assert_eq!(config.search.news_prefix, "noticias recientes");
            assert_eq!(config.wikipedia.language, "en");
            assert_eq!(config.effective_max_iterations(), 10);
            Ok(())
        });
    }

    #[test]
    fn test_local_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ra.toml",
                r#"
                    provider = "anthropic"
                    schema = "minimal"
                    output_file = "notes.txt"

                    [wikipedia]
                    language = "es"
                "#,
            )?;
            jail.set_env("RA_SEARCH__MAX_RESULTS", "8");
            jail.set_env("RA_OUTPUT_FILE", "env.txt");

            let config: Config = Config::figment(None, &Overrides::default()).extract()?;
            assert_eq!(config.provider, ProviderKind::Anthropic);
            assert_eq!(config.schema, SchemaVariant::Minimal);
            assert_eq!(config.output_file, PathBuf::from("env.txt"));
            assert_eq!(config.search.max_results, 8);
            assert_eq!(config.search.timeout_secs, 30);
            assert_eq!(config.wikipedia.language, "es");
            assert_eq!(config.wikipedia.sentences, 3);
            assert_eq!(config.effective_max_iterations(), 15);
            Ok(())
        });
    }

    #[test]
    fn test_global_file_is_lowest_file_layer() {
        Jail::expect_with(|jail| {
            jail.create_file("global.toml", "model = \"gpt-4o\"\ntemperature = 0.5\n")?;
            jail.create_file("ra.toml", "model = \"gpt-4o-mini\"\n")?;

            let global = jail.directory().join("global.toml");
            let config: Config = Config::figment(Some(&global), &Overrides::default()).extract()?;
            assert_eq!(config.model.as_deref(), Some("gpt-4o-mini"));
            assert_eq!(config.temperature, Some(0.5));
            Ok(())
        });
    }

    #[test]
    fn test_cli_overrides_win() {
        Jail::expect_with(|jail| {
            jail.create_file("ra.toml", "schema = \"minimal\"\nmax_iterations = 4\n")?;
            jail.set_env("RA_MODEL", "from-env");

            let overrides = Overrides {
                model: Some("from-cli".to_string()),
                schema: Some(SchemaVariant::Extended),
                ..Default::default()
            };
            let config: Config = Config::figment(None, &overrides).extract()?;
            assert_eq!(config.model.as_deref(), Some("from-cli"));
            assert_eq!(config.schema, SchemaVariant::Extended);
            assert_eq!(config.effective_max_iterations(), 4);
            Ok(())
        });
    }

    #[test]
    fn test_api_key_resolution() {
        Jail::expect_with(|jail| {
            jail.set_env("OPENAI_API_KEY", "");
            let mut config = Config::default();
            assert!(config.resolve_api_key().is_err());

            config.api_key = Some("sk-config".to_string());
            assert_eq!(config.resolve_api_key().unwrap(), "sk-config");

            jail.set_env("OPENAI_API_KEY", "sk-env");
            assert_eq!(config.resolve_api_key().unwrap(), "sk-env");

            config.provider = ProviderKind::Anthropic;
            config.api_key = None;
            jail.set_env("ANTHROPIC_API_KEY", "");
            let err = config.resolve_api_key().unwrap_err();
            assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
            Ok(())
        });
    }
}
