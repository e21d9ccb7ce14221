//! The `wikipedia` tool and its HTTP backend.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ra_core::{text_argument, Error, Tool, ToolKind, ToolOutput};

use crate::web::http_client;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// An encyclopedia that can be searched by title.
#[async_trait]
pub trait EncyclopediaBackend: Send + Sync {
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>, Error>;

    async fn page_summary(&self, title: &str, sentences: usize) -> Result<PageSummary, Error>;

    /// Summary of the best match for `query`, without a link. Does not go
    /// through `search_titles`.
    async fn plain_summary(&self, query: &str, sentences: usize) -> Result<String, Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikipediaConfig {
    pub language: String,
    pub max_pages: usize,
    pub sentences: usize,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            max_pages: 3,
            sentences: 3,
        }
    }
}

pub struct WikipediaTool {
    backend: Arc<dyn EncyclopediaBackend>,
    max_pages: usize,
    sentences: usize,
}

impl WikipediaTool {
    pub fn new(backend: Arc<dyn EncyclopediaBackend>, config: &WikipediaConfig) -> Self {
        Self {
            backend,
            max_pages: config.max_pages,
            sentences: config.sentences,
        }
    }

    async fn lookup(&self, query: &str) -> ToolOutput {
        match self.backend.search_titles(query, self.max_pages).await {
            Ok(titles) => {
                let mut pages = Vec::new();
                for title in titles.iter().take(self.max_pages) {
                    match self.backend.page_summary(title, self.sentences).await {
                        Ok(page) => pages.push(format!(
                            "Page: {}\nLink: {}\nSummary: {}\n",
                            page.title, page.url, page.summary
                        )),
                        Err(e) => debug!(title = %title, error = %e, "Skipping page"),
                    }
                }
                if !pages.is_empty() {
                    return ToolOutput::enriched(pages.join("\n"));
                }
                warn!(query, "No Wikipedia pages resolved, using plain summary");
            }
            Err(e) => warn!(query, error = %e, "Wikipedia search failed, using plain summary"),
        }

        match self.backend.plain_summary(query, self.sentences).await {
            Ok(summary) if !summary.trim().is_empty() => ToolOutput::degraded(summary.trim()),
            Ok(_) => ToolOutput::degraded(format!("No Wikipedia results found for '{}'.", query)),
            Err(e) => {
                warn!(query, error = %e, "Wikipedia plain summary failed");
                ToolOutput::degraded(format!("No Wikipedia results found for '{}' ({}).", query, e))
            }
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Wikipedia
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let query = text_argument(ToolKind::Wikipedia, &arguments)?;
        Ok(self.lookup(query.trim()).await)
    }
}

/// Wikipedia over the MediaWiki action API and the REST summary endpoint.
pub struct Wikipedia {
    client: Client,
    language: String,
}

impl Wikipedia {
    pub fn new(language: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            language: language.into(),
        }
    }

    fn host(&self) -> String {
        format!("https://{}.wikipedia.org", self.language)
    }

    fn summary_url(&self, title: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}/api/rest_v1/page/summary/", self.host()))
            .map_err(|e| Error::config(format!("Invalid Wikipedia language '{}': {}", self.language, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::config("Wikipedia URL cannot have path segments"))?
            .pop_if_empty()
            .push(&title.replace(' ', "_"));
        Ok(url)
    }

    async fn fetch_summary(&self, title: &str) -> Result<RestSummary, Error> {
        let response = self
            .client
            .get(self.summary_url(title)?)
            .send()
            .await
            .map_err(|e| Error::network(format!("Wikipedia request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::api(
                response.status().as_u16(),
                format!("No Wikipedia page for '{}'", title),
            ));
        }

        let summary: RestSummary = response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        if summary.page_type == "disambiguation" {
            return Err(Error::invalid_request(format!("'{}' is a disambiguation page", title)));
        }
        if summary.extract.trim().is_empty() {
            return Err(Error::invalid_request(format!("'{}' has no summary", title)));
        }
        Ok(summary)
    }
}

#[async_trait]
impl EncyclopediaBackend for Wikipedia {
    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>, Error> {
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/w/api.php", self.host()))
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| Error::network(format!("Wikipedia search failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::api(
                response.status().as_u16(),
                "Wikipedia search failed".to_string(),
            ));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        Ok(body.query.search.into_iter().map(|r| r.title).collect())
    }

    async fn page_summary(&self, title: &str, sentences: usize) -> Result<PageSummary, Error> {
        let summary = self.fetch_summary(title).await?;
        let url = summary
            .content_urls
            .and_then(|urls| urls.desktop)
            .map(|desktop| desktop.page)
            .unwrap_or_else(|| format!("{}/wiki/{}", self.host(), title.replace(' ', "_")));

        Ok(PageSummary {
            title: summary.title,
            url,
            summary: first_sentences(&summary.extract, sentences),
        })
    }

    async fn plain_summary(&self, query: &str, sentences: usize) -> Result<String, Error> {
        // One request: the search generator feeds the extracts module directly.
        let response = self
            .client
            .get(format!("{}/w/api.php", self.host()))
            .query(&[
                ("action", "query"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", "1"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await
            .map_err(|e| Error::network(format!("Wikipedia extract lookup failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::api(
                response.status().as_u16(),
                "Wikipedia extract lookup failed".to_string(),
            ));
        }

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        best_extract(body)
            .map(|extract| first_sentences(&extract, sentences))
            .ok_or_else(|| Error::invalid_request(format!("No Wikipedia extract for '{}'", query)))
    }
}

fn best_extract(body: ExtractResponse) -> Option<String> {
    body.query?
        .pages
        .into_iter()
        .map(|page| page.extract)
        .find(|extract| !extract.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    search: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RestSummary {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(rename = "type", default)]
    page_type: String,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

/// First `n` sentences of `text`. A sentence ends at `.`, `!` or `?`
/// followed by whitespace.
fn first_sentences(text: &str, n: usize) -> String {
    let text = text.trim();
    let mut count = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                count += 1;
                if count == n {
                    return text[..i + c.len_utf8()].to_string();
                }
            }
        }
    }
    text.to_string()
}
