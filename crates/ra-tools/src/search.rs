//! The three web search tools.
//!
//! `search`, `search_news` and `search_academic` share one code path; the
//! latter two only qualify the query with a configured prefix first.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ra_core::{text_argument, Error, Tool, ToolKind, ToolOutput};

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// A web search service.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Structured results with links, at most `max_results`.
    async fn text_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, Error>;

    /// Plain text answer without links. Independent of `text_search`.
    async fn plain_search(&self, query: &str) -> Result<String, Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub news_prefix: String,
    pub academic_prefix: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            news_prefix: "noticias recientes".to_string(),
            academic_prefix: "estudios académicos investigación papers".to_string(),
            timeout_secs: 30,
        }
    }
}

pub struct SearchTool {
    kind: ToolKind,
    prefix: Option<String>,
    max_results: usize,
    backend: Arc<dyn SearchBackend>,
}

impl SearchTool {
    pub fn general(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        Self {
            kind: ToolKind::Search,
            prefix: None,
            max_results: config.max_results,
            backend,
        }
    }

    pub fn news(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        Self {
            kind: ToolKind::SearchNews,
            prefix: Some(config.news_prefix.clone()),
            max_results: config.max_results,
            backend,
        }
    }

    pub fn academic(backend: Arc<dyn SearchBackend>, config: &SearchConfig) -> Self {
        Self {
            kind: ToolKind::SearchAcademic,
            prefix: Some(config.academic_prefix.clone()),
            max_results: config.max_results,
            backend,
        }
    }

    /// The query actually sent to the backend.
    pub fn qualified_query(&self, query: &str) -> String {
        match self.prefix.as_deref().map(str::trim) {
            Some(prefix) if !prefix.is_empty() => format!("{} {}", prefix, query.trim()),
            _ => query.trim().to_string(),
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let query = text_argument(self.kind, &arguments)?;
        Ok(web_search(self.backend.as_ref(), &self.qualified_query(&query), self.max_results).await)
    }
}

/// Search with links, falling back to a plain lookup. Never fails.
pub async fn web_search(backend: &dyn SearchBackend, query: &str, max_results: usize) -> ToolOutput {
    match backend.text_search(query, max_results).await {
        Ok(hits) if !hits.is_empty() => {
            debug!(query, hits = hits.len(), "Search returned results");
            return ToolOutput::enriched(format_hits(&hits));
        }
        Ok(_) => warn!(query, "Search returned no results, using plain lookup"),
        Err(e) => warn!(query, error = %e, "Search failed, using plain lookup"),
    }

    match backend.plain_search(query).await {
        Ok(text) if !text.trim().is_empty() => ToolOutput::degraded(text.trim()),
        Ok(_) => ToolOutput::degraded(format!("No results found for '{}'.", query)),
        Err(e) => {
            warn!(query, error = %e, "Plain lookup failed");
            ToolOutput::degraded(format!("No results found for '{}' ({}).", query, e))
        }
    }
}

fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "Title: {}\nLink: {}\nDescription: {}\n",
                hit.title, hit.link, hit.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockSearch {
        hits: Vec<SearchHit>,
        fail_text: bool,
        plain: Option<String>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchBackend for MockSearch {
        async fn text_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, Error> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail_text {
                return Err(Error::network("connection refused"));
            }
            Ok(self.hits.iter().take(max_results).cloned().collect())
        }

        async fn plain_search(&self, _query: &str) -> Result<String, Error> {
            self.plain
                .clone()
                .ok_or_else(|| Error::network("instant answer unavailable"))
        }
    }

    fn hit(n: usize) -> SearchHit {
        SearchHit {
            title: format!("Result {}", n),
            link: format!("https://example.com/{}", n),
            description: format!("Snippet {}", n),
        }
    }

    #[tokio::test]
    async fn test_search_formats_hits() {
        let backend = Arc::new(MockSearch {
            hits: (1..=7).map(hit).collect(),
            ..Default::default()
        });
        let tool = SearchTool::general(backend, &SearchConfig::default());

        let out = tool
            .execute(serde_json::json!({"query": "rust language"}))
            .await
            .unwrap();

        assert!(!out.is_degraded());
        assert!(out.content.starts_with(
            "Title: Result 1\nLink: https://example.com/1\nDescription: Snippet 1\n\nTitle: Result 2"
        ));
        assert_eq!(out.content.matches("Title: ").count(), 5);
    }

    #[tokio::test]
    async fn test_news_uses_shared_path_with_prefix() {
        let backend = Arc::new(MockSearch {
            hits: vec![hit(1)],
            ..Default::default()
        });
        let tool = SearchTool::news(backend.clone(), &SearchConfig::default());
        assert_eq!(tool.kind(), ToolKind::SearchNews);

        tool.execute(serde_json::json!({"query": "climate change"}))
            .await
            .unwrap();

        assert_eq!(
            *backend.queries.lock().unwrap(),
            vec!["noticias recientes climate change".to_string()]
        );
    }

    #[tokio::test]
    async fn test_academic_prefix() {
        let backend = Arc::new(MockSearch::default());
        let tool = SearchTool::academic(backend, &SearchConfig::default());
        assert_eq!(
            tool.qualified_query("CRISPR"),
            "estudios académicos investigación papers CRISPR"
        );
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_plain() {
        let backend = Arc::new(MockSearch {
            fail_text: true,
            plain: Some("Rust is a programming language.".to_string()),
            ..Default::default()
        });
        let tool = SearchTool::general(backend, &SearchConfig::default());

        let out = tool.execute(serde_json::json!({"query": "rust"})).await.unwrap();
        assert!(out.is_degraded());
        assert_eq!(out.content, "Rust is a programming language.");
        assert!(!out.content.contains("Link:"));
    }

    #[tokio::test]
    async fn test_empty_results_fall_back() {
        let backend = Arc::new(MockSearch {
            plain: Some("An answer".to_string()),
            ..Default::default()
        });
        let out = web_search(backend.as_ref(), "obscure", 5).await;
        assert!(out.is_degraded());
        assert_eq!(out.content, "An answer");
    }

    #[tokio::test]
    async fn test_total_failure_is_non_empty_text() {
        let backend = Arc::new(MockSearch {
            fail_text: true,
            ..Default::default()
        });
        let tool = SearchTool::news(backend, &SearchConfig::default());

        let out = tool.execute(serde_json::json!({"query": "anything"})).await.unwrap();
        assert!(out.is_degraded());
        assert!(out.content.starts_with("No results found for 'noticias recientes anything'"));
    }

    #[tokio::test]
    async fn test_missing_query_is_error() {
        let tool = SearchTool::general(Arc::new(MockSearch::default()), &SearchConfig::default());
        let err = tool.execute(serde_json::json!({})).await.unwrap_err();
        assert!(err.to_string().contains("Invalid arguments"));
    }
}
