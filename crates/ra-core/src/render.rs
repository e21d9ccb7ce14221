//! Console and log renderings of a research record.

use std::fmt::Write;

use crate::schema::{FieldKind, FieldValue, ResearchRecord};

const RULE_WIDTH: usize = 60;
const LOG_HEADER: &str = "--- Research Output ---";

/// Timestamp format used in log entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Human-readable report for the terminal.
pub fn console_report(record: &ResearchRecord) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "  RESEARCH REPORT");
    let _ = writeln!(out, "{}", rule);

    for (spec, value) in record.fields() {
        out.push('\n');
        match (spec.kind, value) {
            (FieldKind::Line, FieldValue::Text(text)) => {
                let _ = writeln!(out, "{}: {}", spec.label, text);
            }
            (FieldKind::Paragraph, FieldValue::Text(text)) => {
                let _ = writeln!(out, "{}:", spec.label);
                let _ = writeln!(out, "{}", text);
            }
            (FieldKind::Joined, FieldValue::List(items)) => {
                let _ = writeln!(out, "{}: {}", spec.label, joined(items));
            }
            (_, FieldValue::List(items)) => {
                let _ = writeln!(out, "{}:", spec.label);
                if items.is_empty() {
                    let _ = writeln!(out, "  (none)");
                }
                for (i, item) in items.iter().enumerate() {
                    let _ = writeln!(out, "  {}. {}", i + 1, item);
                }
            }
            (_, FieldValue::Text(text)) => {
                let _ = writeln!(out, "{}: {}", spec.label, text);
            }
        }
    }

    let _ = writeln!(out, "\n{}", rule);
    out
}

/// Log entry for a record: timestamp header, upper-cased labels, blank-line
/// separated blocks.
pub fn record_log_entry(record: &ResearchRecord, timestamp: &str) -> String {
    let mut out = log_header(timestamp);

    for (spec, value) in record.fields() {
        let label = spec.name.to_uppercase();
        match (spec.kind, value) {
            (FieldKind::Paragraph, FieldValue::Text(text)) => {
                let _ = write!(out, "{}:\n{}\n\n", label, text);
            }
            (FieldKind::Joined, FieldValue::List(items)) => {
                let _ = write!(out, "{}: {}\n\n", label, joined(items));
            }
            (_, FieldValue::List(items)) => {
                let _ = writeln!(out, "{}:", label);
                for (i, item) in items.iter().enumerate() {
                    let _ = writeln!(out, "{}. {}", i + 1, item);
                }
                out.push('\n');
            }
            (_, FieldValue::Text(text)) => {
                let _ = write!(out, "{}: {}\n\n", label, text);
            }
        }
    }

    out
}

/// Log entry for opaque text.
pub fn text_log_entry(text: &str, timestamp: &str) -> String {
    format!("{}{}\n\n", log_header(timestamp), text)
}

fn log_header(timestamp: &str) -> String {
    format!("{}\nTimestamp: {}\n\n", LOG_HEADER, timestamp)
}

fn joined(items: &[String]) -> String {
    items.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BriefRecord, DetailedRecord, SchemaVariant};

    fn detailed() -> ResearchRecord {
        ResearchRecord::Detailed(DetailedRecord {
            topic: "Climate change".into(),
            summary: "Warming is accelerating.".into(),
            key_points: vec!["CO2 rising".into(), "Oceans warming".into()],
            current_developments: "New pledges announced.".into(),
            academic_insights: "Models agree on trend.".into(),
            sources: vec!["IPCC".into()],
            source_links: vec!["https://www.ipcc.ch".into()],
            tools_used: vec!["search".into(), "wikipedia".into()],
        })
    }

    #[test]
    fn test_console_report_shows_every_field() {
        let report = console_report(&detailed());
        assert!(report.starts_with(&"=".repeat(RULE_WIDTH)));
        assert!(report.contains("RESEARCH REPORT"));
        assert!(report.contains("Topic: Climate change"));
        assert!(report.contains("Summary:\nWarming is accelerating."));
        assert!(report.contains("Key points:\n  1. CO2 rising\n  2. Oceans warming"));
        assert!(report.contains("Current developments:\nNew pledges announced."));
        assert!(report.contains("Academic insights:\nModels agree on trend."));
        assert!(report.contains("Sources:\n  1. IPCC"));
        assert!(report.contains("Source links:\n  1. https://www.ipcc.ch"));
        assert!(report.contains("Tools used: search, wikipedia"));
    }

    #[test]
    fn test_console_report_brief_skips_extended_fields() {
        let record = ResearchRecord::Brief(BriefRecord {
            topic: "Capital of France".into(),
            summary: "Paris.".into(),
            sources: vec![],
            tools_used: vec![],
        });
        let report = console_report(&record);
        assert!(report.contains("Sources:\n  (none)"));
        assert!(!report.contains("Key points"));
        assert!(!report.contains("Source links"));
    }

    #[test]
    fn test_record_log_entry_layout() {
        let entry = record_log_entry(&detailed(), "2024-05-01 10:00:00");
        let expected = "--- Research Output ---\n\
                        Timestamp: 2024-05-01 10:00:00\n\n\
                        TOPIC: Climate change\n\n\
                        SUMMARY:\nWarming is accelerating.\n\n\
                        KEY_POINTS:\n1. CO2 rising\n2. Oceans warming\n\n\
                        CURRENT_DEVELOPMENTS:\nNew pledges announced.\n\n\
                        ACADEMIC_INSIGHTS:\nModels agree on trend.\n\n\
                        SOURCES:\n1. IPCC\n\n\
                        SOURCE_LINKS:\n1. https://www.ipcc.ch\n\n\
                        TOOLS_USED: search, wikipedia\n\n";
        assert_eq!(entry, expected);
    }

    #[test]
    fn test_text_log_entry() {
        let entry = text_log_entry("raw notes", "2024-05-01 10:00:00");
        assert_eq!(
            entry,
            "--- Research Output ---\nTimestamp: 2024-05-01 10:00:00\n\nraw notes\n\n"
        );
    }

    #[test]
    fn test_render_after_parse_shows_parsed_values() {
        let raw = r#"{"topic": "Rust", "summary": "A language.", "sources": ["rust-lang.org"], "tools_used": ["search"]}"#;
        let record = SchemaVariant::Minimal.parse(raw).unwrap();
        let report = console_report(&record);
        for needle in ["Rust", "A language.", "rust-lang.org", "search"] {
            assert!(report.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_now();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
    }
}
