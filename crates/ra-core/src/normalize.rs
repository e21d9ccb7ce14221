//! Turns the agent's final text into a [`ResearchRecord`].
//!
//! Parsing is strict. The answer must be exactly one JSON object, optionally
//! wrapped in a single Markdown code fence. Anything else around it, invalid
//! JSON, or a missing required field is a [`ParseFailure`], which always
//! carries the raw text untouched.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::schema::{BriefRecord, DetailedRecord, ResearchRecord, SchemaVariant};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{reason}")]
pub struct ParseFailure {
    pub reason: String,
    pub raw: String,
}

impl ParseFailure {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

impl SchemaVariant {
    /// Parse raw agent output against this variant's schema.
    pub fn parse(self, raw: &str) -> Result<ResearchRecord, ParseFailure> {
        let body = json_body(raw).map_err(|reason| ParseFailure::new(reason, raw))?;

        match self {
            SchemaVariant::Minimal => decode::<BriefRecord>(body).map(ResearchRecord::Brief),
            SchemaVariant::Extended => {
                decode::<DetailedRecord>(body).map(ResearchRecord::Detailed)
            }
        }
        .map_err(|reason| ParseFailure::new(reason, raw))
    }
}

/// Parse text that might be either record shape, trying the richer one first.
pub fn parse_any(raw: &str) -> Option<ResearchRecord> {
    SchemaVariant::Extended
        .parse(raw)
        .or_else(|_| SchemaVariant::Minimal.parse(raw))
        .ok()
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, String> {
    serde_json::from_str(body).map_err(|e| format!("output does not match schema: {}", e))
}

/// Locate the JSON object, allowing one surrounding code fence.
fn json_body(raw: &str) -> Result<&str, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }

    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            // Drop the info string (e.g. "json") on the opening fence line.
            let (info, inner) = rest.split_once('\n').ok_or("unterminated code fence")?;
            if !info.trim().is_empty() && !info.trim().eq_ignore_ascii_case("json") {
                return Err(format!("unexpected code fence language '{}'", info.trim()));
            }
            inner
                .trim_end()
                .strip_suffix("```")
                .ok_or("unterminated code fence")?
                .trim()
        }
        None => trimmed,
    };

    if !body.starts_with('{') {
        return Err("expected a JSON object but found extra text before it".to_string());
    }
    if !body.ends_with('}') {
        return Err("expected a JSON object but found extra text after it".to_string());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BRIEF: &str = r#"{
        "topic": "Capital of France",
        "summary": "Paris is the capital of France.",
        "sources": ["Wikipedia: Paris"],
        "tools_used": ["wikipedia"]
    }"#;

    const DETAILED: &str = r#"{
        "topic": "Climate change",
        "summary": "Long summary.",
        "key_points": ["Warming", "Sea level"],
        "current_developments": "COP talks continue.",
        "academic_insights": "IPCC AR6 findings.",
        "sources": ["IPCC", "NASA"],
        "source_links": ["https://www.ipcc.ch", "https://climate.nasa.gov"],
        "tools_used": ["search", "search_news"]
    }"#;

    #[test]
    fn test_parse_brief_exact_fields() {
        let record = SchemaVariant::Minimal.parse(BRIEF).unwrap();
        assert_eq!(
            record,
            ResearchRecord::Brief(BriefRecord {
                topic: "Capital of France".into(),
                summary: "Paris is the capital of France.".into(),
                sources: vec!["Wikipedia: Paris".into()],
                tools_used: vec!["wikipedia".into()],
            })
        );
    }

    #[test]
    fn test_parse_detailed() {
        let record = SchemaVariant::Extended.parse(DETAILED).unwrap();
        let ResearchRecord::Detailed(r) = record else {
            panic!("expected detailed record");
        };
        assert_eq!(r.key_points, vec!["Warming", "Sea level"]);
        assert_eq!(r.source_links.len(), 2);
        assert_eq!(r.tools_used, vec!["search", "search_news"]);
    }

    #[test]
    fn test_parse_fenced() {
        let fenced = format!("```json\n{}\n```", BRIEF);
        assert!(SchemaVariant::Minimal.parse(&fenced).is_ok());

        let bare_fence = format!("```\n{}\n```\n", BRIEF);
        assert!(SchemaVariant::Minimal.parse(&bare_fence).is_ok());
    }

    #[test]
    fn test_missing_field_keeps_raw() {
        let raw = r#"{"topic": "x", "summary": "y", "tools_used": []}"#;
        let err = SchemaVariant::Minimal.parse(raw).unwrap_err();
        assert!(err.reason.contains("sources"), "reason: {}", err.reason);
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_extra_text_is_failure() {
        let raw = format!("Here is your answer:\n{}", BRIEF);
        let err = SchemaVariant::Minimal.parse(&raw).unwrap_err();
        assert!(err.reason.contains("before"));
        assert_eq!(err.raw, raw);

        let trailing = format!("{}\nHope this helps!", BRIEF);
        assert!(SchemaVariant::Minimal.parse(&trailing).is_err());
    }

    #[test]
    fn test_empty_output_is_failure() {
        let err = SchemaVariant::Extended.parse("   ").unwrap_err();
        assert_eq!(err.reason, "empty response");
        assert_eq!(err.raw, "   ");
    }

    #[test]
    fn test_single_string_promoted_to_list() {
        let raw = r#"{"topic": "t", "summary": "s", "sources": "Le Monde", "tools_used": "search"}"#;
        let record = SchemaVariant::Minimal.parse(raw).unwrap();
        assert_eq!(record.sources(), ["Le Monde".to_string()]);
        assert_eq!(record.tools_used(), ["search".to_string()]);
    }

    #[test]
    fn test_wrong_type_is_failure() {
        let raw = r#"{"topic": 3, "summary": "s", "sources": [], "tools_used": []}"#;
        assert!(SchemaVariant::Minimal.parse(raw).is_err());
    }

    #[test]
    fn test_minimal_schema_rejects_detailed_only_text() {
        // A brief answer lacks extended fields.
        assert!(SchemaVariant::Extended.parse(BRIEF).is_err());
    }

    #[test]
    fn test_parse_any() {
        assert!(matches!(parse_any(DETAILED), Some(ResearchRecord::Detailed(_))));
        assert!(matches!(parse_any(BRIEF), Some(ResearchRecord::Brief(_))));
        assert!(parse_any("just some notes").is_none());
    }
}
