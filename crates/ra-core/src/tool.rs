//! Tool capability table and registry.
//!
//! The set of tools is closed: [`ToolKind`] enumerates every capability the
//! agent may be offered, and [`ToolDescriptor`] carries the name, input and
//! description the model sees. The agent loop only talks to the [`Tool`]
//! trait through a [`ToolRegistry`]; it never knows the concrete wrappers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Every tool the research agent can be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Search,
    SearchNews,
    SearchAcademic,
    Wikipedia,
    SaveTextToFile,
}

/// Static description of a tool, known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: &'static str,
    /// Name of the single required text argument.
    pub input: &'static str,
    pub input_description: &'static str,
    /// Optional extra text argument: name and description.
    pub option: Option<(&'static str, &'static str)>,
    pub description: &'static str,
}

const DESCRIPTORS: [ToolDescriptor; 5] = [
    ToolDescriptor {
        kind: ToolKind::Search,
        name: "search",
        input: "query",
        input_description: "The search query",
        option: None,
        description: "Search the web for current and detailed information. Use this to find recent \
                      articles, studies, news, and comprehensive information about any topic. \
                      Returns results with links to sources.",
    },
    ToolDescriptor {
        kind: ToolKind::SearchNews,
        name: "search_news",
        input: "query",
        input_description: "The topic to find recent news about",
        option: None,
        description: "Search for recent news and current events related to the topic. Use this to \
                      find the latest developments and news articles. Returns results with links \
                      to sources.",
    },
    ToolDescriptor {
        kind: ToolKind::SearchAcademic,
        name: "search_academic",
        input: "query",
        input_description: "The topic to find academic work about",
        option: None,
        description: "Search for academic studies, research papers, and scholarly articles about \
                      the topic. Use this to find scientific and academic information. Returns \
                      results with links to sources.",
    },
    ToolDescriptor {
        kind: ToolKind::Wikipedia,
        name: "wikipedia",
        input: "query",
        input_description: "The term to look up on Wikipedia",
        option: None,
        description: "Search Wikipedia for reference information and historical context. Returns \
                      results with links to Wikipedia pages.",
    },
    ToolDescriptor {
        kind: ToolKind::SaveTextToFile,
        name: "save_text_to_file",
        input: "data",
        input_description: "The research data to save (plain text or the JSON research record)",
        option: Some(("filename", "File to append to (defaults to the configured output file)")),
        description: "Saves research results to a text file. Use this tool after completing \
                      research to store the findings. Input should be the research data to save.",
    },
];

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Search,
        ToolKind::SearchNews,
        ToolKind::SearchAcademic,
        ToolKind::Wikipedia,
        ToolKind::SaveTextToFile,
    ];

    pub fn descriptor(self) -> &'static ToolDescriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ToolDescriptor {
    /// JSON-schema definition sent to the provider.
    pub fn definition(&self) -> ToolDefinition {
        let mut parameters = ToolParameters::new().add_property(
            self.input,
            PropertySchema::string(self.input_description),
            true,
        );
        if let Some((name, description)) = self.option {
            parameters = parameters.add_property(name, PropertySchema::string(description), false);
        }
        ToolDefinition::new(self.name, self.description).with_parameters(parameters)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameters::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ToolParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// An object JSON schema. Also used to describe the research record shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
            additional_properties: false,
        }
    }
}

impl ToolParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(
        mut self,
        name: impl Into<String>,
        schema: PropertySchema,
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), schema);
        if required {
            self.required.push(name);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    pub fn string(description: impl Into<String>) -> Self {
        Self {
            schema_type: "string".to_string(),
            description: Some(description.into()),
            items: None,
        }
    }

    pub fn array(description: impl Into<String>, items: PropertySchema) -> Self {
        Self {
            schema_type: "array".to_string(),
            description: Some(description.into()),
            items: Some(Box::new(items)),
        }
    }

    pub fn string_item() -> Self {
        Self {
            schema_type: "string".to_string(),
            description: None,
            items: None,
        }
    }
}

/// Which path produced a tool's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    /// Primary path: structured results with links.
    Enriched,
    /// Fallback path: plain text, no links.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub fidelity: Fidelity,
}

impl ToolOutput {
    pub fn enriched(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fidelity: Fidelity::Enriched,
        }
    }

    pub fn degraded(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            fidelity: Fidelity::Degraded,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.fidelity == Fidelity::Degraded
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error>;

    fn descriptor(&self) -> &'static ToolDescriptor {
        self.kind().descriptor()
    }
}

/// Pull the descriptor's single text argument out of a tool call.
///
/// A bare JSON string is accepted as the argument itself, which some models
/// emit for single-parameter tools.
pub fn text_argument(kind: ToolKind, arguments: &Value) -> Result<String, Error> {
    let input = kind.descriptor().input;
    let value = match arguments {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => match map.get(input) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        _ => None,
    };

    value
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Error::tool(kind.name(), format!("Invalid arguments: missing '{}'", input)))
}

/// The tools offered to one agent run, keyed by capability.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.kind(), tool);
    }

    pub fn get(&self, kind: ToolKind) -> Option<&dyn Tool> {
        self.tools.get(&kind).map(|t| t.as_ref())
    }

    pub fn get_by_name(&self, name: &str) -> Option<&dyn Tool> {
        ToolKind::from_name(name).and_then(|kind| self.get(kind))
    }

    /// Registered kinds in capability-table order.
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|kind| self.tools.contains_key(kind))
            .collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.kinds()
            .into_iter()
            .map(|kind| kind.descriptor().definition())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(ToolKind);

    #[async_trait]
    impl Tool for Echo {
        fn kind(&self) -> ToolKind {
            self.0
        }

        async fn execute(&self, arguments: Value) -> Result<ToolOutput, Error> {
            Ok(ToolOutput::enriched(text_argument(self.0, &arguments)?))
        }
    }

    #[test]
    fn test_descriptor_table_matches_kinds() {
        for kind in ToolKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("calculator"), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(ToolKind::SearchNews.name(), "search_news");
        assert_eq!(ToolKind::SaveTextToFile.descriptor().input, "data");
    }

    #[test]
    fn test_definition_schema() {
        let def = ToolKind::Search.descriptor().definition();
        assert_eq!(def.name, "search");
        assert!(def.parameters.required.contains(&"query".to_string()));

        let json = serde_json::to_value(&def.parameters).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["query"]["type"], "string");
        assert_eq!(json["additionalProperties"], false);

        let save = ToolKind::SaveTextToFile.descriptor().definition();
        assert_eq!(save.parameters.required, vec!["data".to_string()]);
        assert!(save.parameters.properties.contains_key("filename"));
    }

    #[test]
    fn test_text_argument() {
        let args = serde_json::json!({"query": "rust"});
        assert_eq!(text_argument(ToolKind::Search, &args).unwrap(), "rust");

        let bare = serde_json::json!("climate");
        assert_eq!(text_argument(ToolKind::Search, &bare).unwrap(), "climate");

        let object = serde_json::json!({"data": {"topic": "x"}});
        assert_eq!(
            text_argument(ToolKind::SaveTextToFile, &object).unwrap(),
            r#"{"topic":"x"}"#
        );

        let missing = serde_json::json!({"q": "rust"});
        assert!(text_argument(ToolKind::Search, &missing).is_err());
    }

    #[test]
    fn test_tool_output_fidelity() {
        assert!(!ToolOutput::enriched("ok").is_degraded());
        assert!(ToolOutput::degraded("plain").is_degraded());
    }

    #[tokio::test]
    async fn test_registry_order_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo(ToolKind::Wikipedia)));
        registry.register(Arc::new(Echo(ToolKind::Search)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.kinds(), vec![ToolKind::Search, ToolKind::Wikipedia]);

        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["search", "wikipedia"]);

        let tool = registry.get_by_name("wikipedia").unwrap();
        let out = tool
            .execute(serde_json::json!({"query": "Paris"}))
            .await
            .unwrap();
        assert_eq!(out.content, "Paris");
        assert!(registry.get_by_name("search_news").is_none());
    }
}
