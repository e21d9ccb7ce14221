//! Output schema for research answers.
//!
//! Two explicit shapes exist: [`BriefRecord`] for the minimal schema and
//! [`DetailedRecord`] for the extended one. [`SchemaVariant`] selects between
//! them and knows the field table, the JSON schema and the format
//! instructions handed to the model.

use serde::{Deserialize, Deserializer, Serialize};

use crate::tool::{PropertySchema, ToolParameters};

/// How a field is laid out when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Short single-line text.
    Line,
    /// Free text that gets its own block.
    Paragraph,
    /// Ordered strings rendered as a numbered list.
    List,
    /// Ordered strings rendered comma-joined on one line.
    Joined,
}

impl FieldKind {
    pub fn is_sequence(self) -> bool {
        matches!(self, FieldKind::List | FieldKind::Joined)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Human label used on the console.
    pub label: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

const TOPIC: FieldSpec = FieldSpec {
    name: "topic",
    label: "Topic",
    kind: FieldKind::Line,
    description: "The research topic",
};

const SUMMARY: FieldSpec = FieldSpec {
    name: "summary",
    label: "Summary",
    kind: FieldKind::Paragraph,
    description: "Summary of the findings",
};

const KEY_POINTS: FieldSpec = FieldSpec {
    name: "key_points",
    label: "Key points",
    kind: FieldKind::List,
    description: "The most important findings, one per entry",
};

const CURRENT_DEVELOPMENTS: FieldSpec = FieldSpec {
    name: "current_developments",
    label: "Current developments",
    kind: FieldKind::Paragraph,
    description: "Recent news and developments on the topic",
};

const ACADEMIC_INSIGHTS: FieldSpec = FieldSpec {
    name: "academic_insights",
    label: "Academic insights",
    kind: FieldKind::Paragraph,
    description: "What studies and papers say about the topic",
};

const SOURCES: FieldSpec = FieldSpec {
    name: "sources",
    label: "Sources",
    kind: FieldKind::List,
    description: "Names of the sources consulted",
};

const SOURCE_LINKS: FieldSpec = FieldSpec {
    name: "source_links",
    label: "Source links",
    kind: FieldKind::List,
    description: "URLs of the sources consulted",
};

const TOOLS_USED: FieldSpec = FieldSpec {
    name: "tools_used",
    label: "Tools used",
    kind: FieldKind::Joined,
    description: "Names of the tools invoked while researching",
};

const MINIMAL_FIELDS: &[FieldSpec] = &[TOPIC, SUMMARY, SOURCES, TOOLS_USED];

const EXTENDED_FIELDS: &[FieldSpec] = &[
    TOPIC,
    SUMMARY,
    KEY_POINTS,
    CURRENT_DEVELOPMENTS,
    ACADEMIC_INSIGHTS,
    SOURCES,
    SOURCE_LINKS,
    TOOLS_USED,
];

/// Which record shape the agent is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    Minimal,
    #[default]
    Extended,
}

impl SchemaVariant {
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            SchemaVariant::Minimal => MINIMAL_FIELDS,
            SchemaVariant::Extended => EXTENDED_FIELDS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Iteration cap used when none is configured.
    pub fn default_max_iterations(self) -> usize {
        match self {
            SchemaVariant::Minimal => 15,
            SchemaVariant::Extended => 10,
        }
    }

    /// JSON schema describing the record.
    pub fn json_schema(self) -> ToolParameters {
        self.fields()
            .iter()
            .fold(ToolParameters::new(), |schema, field| {
                let property = if field.kind.is_sequence() {
                    PropertySchema::array(field.description, PropertySchema::string_item())
                } else {
                    PropertySchema::string(field.description)
                };
                schema.add_property(field.name, property, true)
            })
    }

    /// Text telling the model exactly how to shape its final answer.
    pub fn format_instructions(self) -> String {
        let schema = serde_json::to_string(&self.json_schema()).unwrap_or_default();
        format!(
            "The output must be a single JSON object that conforms to the JSON schema below.\n\n\
             For example, given the schema {{\"type\": \"object\", \"properties\": {{\"items\": \
             {{\"type\": \"array\", \"items\": {{\"type\": \"string\"}}}}}}, \"required\": \
             [\"items\"]}}\nthe object {{\"items\": [\"a\", \"b\"]}} is a valid instance, while \
             {{\"properties\": {{\"items\": [\"a\", \"b\"]}}}} is not.\n\n\
             Here is the output schema:\n```\n{}\n```",
            schema
        )
    }
}

impl std::fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVariant::Minimal => write!(f, "minimal"),
            SchemaVariant::Extended => write!(f, "extended"),
        }
    }
}

impl std::str::FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" | "brief" => Ok(SchemaVariant::Minimal),
            "extended" | "detailed" => Ok(SchemaVariant::Extended),
            other => Err(format!("unknown schema variant '{}'", other)),
        }
    }
}

/// Accepts either a list of strings or a single string (promoted to a
/// one-element list).
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Minimal research answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefRecord {
    pub topic: String,
    pub summary: String,
    #[serde(deserialize_with = "string_or_list")]
    pub sources: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub tools_used: Vec<String>,
}

/// Extended research answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedRecord {
    pub topic: String,
    pub summary: String,
    #[serde(deserialize_with = "string_or_list")]
    pub key_points: Vec<String>,
    pub current_developments: String,
    pub academic_insights: String,
    #[serde(deserialize_with = "string_or_list")]
    pub sources: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub source_links: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub tools_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResearchRecord {
    Brief(BriefRecord),
    Detailed(DetailedRecord),
}

/// Borrowed view of one field's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    List(&'a [String]),
}

impl ResearchRecord {
    pub fn variant(&self) -> SchemaVariant {
        match self {
            ResearchRecord::Brief(_) => SchemaVariant::Minimal,
            ResearchRecord::Detailed(_) => SchemaVariant::Extended,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            ResearchRecord::Brief(r) => &r.topic,
            ResearchRecord::Detailed(r) => &r.topic,
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            ResearchRecord::Brief(r) => &r.summary,
            ResearchRecord::Detailed(r) => &r.summary,
        }
    }

    pub fn sources(&self) -> &[String] {
        match self {
            ResearchRecord::Brief(r) => &r.sources,
            ResearchRecord::Detailed(r) => &r.sources,
        }
    }

    pub fn tools_used(&self) -> &[String] {
        match self {
            ResearchRecord::Brief(r) => &r.tools_used,
            ResearchRecord::Detailed(r) => &r.tools_used,
        }
    }

    /// Replace the reported tool list.
    pub fn set_tools_used(&mut self, tools: Vec<String>) {
        match self {
            ResearchRecord::Brief(r) => r.tools_used = tools,
            ResearchRecord::Detailed(r) => r.tools_used = tools,
        }
    }

    /// Value of a named field, if this record's variant has it.
    pub fn value(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = match (self, name) {
            (_, "topic") => FieldValue::Text(self.topic()),
            (_, "summary") => FieldValue::Text(self.summary()),
            (_, "sources") => FieldValue::List(self.sources()),
            (_, "tools_used") => FieldValue::List(self.tools_used()),
            (ResearchRecord::Detailed(r), "key_points") => FieldValue::List(&r.key_points),
            (ResearchRecord::Detailed(r), "current_developments") => {
                FieldValue::Text(&r.current_developments)
            }
            (ResearchRecord::Detailed(r), "academic_insights") => {
                FieldValue::Text(&r.academic_insights)
            }
            (ResearchRecord::Detailed(r), "source_links") => FieldValue::List(&r.source_links),
            _ => return None,
        };
        Some(value)
    }

    /// Fields in schema order, paired with their values.
    pub fn fields(&self) -> Vec<(&'static FieldSpec, FieldValue<'_>)> {
        self.variant()
            .fields()
            .iter()
            .filter_map(|spec| self.value(spec.name).map(|v| (spec, v)))
            .collect()
    }
}
