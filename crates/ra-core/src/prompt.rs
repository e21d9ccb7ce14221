//! Prompt assembly for a research session.

use crate::message::Message;
use crate::schema::SchemaVariant;

const DEFAULT_PREAMBLE: &str =
    "You are a research assistant that helps produce a research document.";

const EXTENDED_GUIDANCE: &str = r#"## Research procedure
Use the tools in this order, each at least once:
1. `search` for a general overview
2. `search_news` for recent news and developments
3. `search_academic` for studies and papers
4. `wikipedia` for reference and historical context
5. `save_text_to_file` to store the final research record

## Content requirements
- The summary must be at least 200 words.
- Provide between 5 and 7 key points.
- Describe current developments and academic insights separately.
- Put the URLs returned by the tools in `source_links`.
- List in `tools_used` only the tools you actually called."#;

/// Builds the message sequence for one query: system instruction, prior
/// turns, then the query. The agent appends its working notes after these.
#[derive(Debug, Clone)]
pub struct ResearchPrompt {
    variant: SchemaVariant,
    preamble: Option<String>,
    history: Vec<Message>,
}

impl ResearchPrompt {
    pub fn new(variant: SchemaVariant) -> Self {
        Self {
            variant,
            preamble: None,
            history: Vec::new(),
        }
    }

    /// Replace the opening role line of the system instruction.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Prior conversation turns placed between the system message and the query.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    pub fn system_instruction(&self) -> String {
        let mut sections = vec![
            self.preamble.as_deref().unwrap_or(DEFAULT_PREAMBLE).to_string(),
            "Always answer in the user's language.\n\
             Answer the user's query and use the tools you need."
                .to_string(),
        ];

        if self.variant == SchemaVariant::Extended {
            sections.push(EXTENDED_GUIDANCE.to_string());
        }

        sections.push(format!(
            "Wrap the output in this format and provide no other text:\n{}",
            self.variant.format_instructions()
        ));

        sections.join("\n\n")
    }

    pub fn messages(&self, query: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.system_instruction()));
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(query));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_message_order() {
        let prompt = ResearchPrompt::new(SchemaVariant::Minimal).with_history(vec![
            Message::user("earlier question"),
            Message::assistant("earlier answer"),
        ]);
        let messages = prompt.messages("What is the capital of France?");

        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[3].content, "What is the capital of France?");
    }

    #[test]
    fn test_system_instruction_minimal() {
        let text = ResearchPrompt::new(SchemaVariant::Minimal).system_instruction();
        assert!(text.contains("user's language"));
        assert!(text.contains("provide no other text"));
        assert!(text.contains("\"tools_used\""));
        assert!(!text.contains("200 words"));
    }

    #[test]
    fn test_system_instruction_extended() {
        let text = ResearchPrompt::new(SchemaVariant::Extended).system_instruction();
        let order: Vec<_> = ["`search`", "`search_news`", "`search_academic`", "`wikipedia`", "`save_text_to_file`"]
            .iter()
            .map(|name| text.find(name).unwrap())
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("at least 200 words"));
        assert!(text.contains("between 5 and 7 key points"));
        assert!(text.contains("\"key_points\""));
    }

    #[test]
    fn test_custom_preamble() {
        let text = ResearchPrompt::new(SchemaVariant::Minimal)
            .with_preamble("You are a careful librarian.")
            .system_instruction();
        assert!(text.starts_with("You are a careful librarian."));
        assert!(!text.contains(DEFAULT_PREAMBLE));
    }
}
