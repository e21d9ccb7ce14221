//! DuckDuckGo search over HTTP.
//!
//! Structured results come from scraping the HTML endpoint; the plain
//! lookup uses the Instant Answer JSON API, which needs no scraping.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;

use ra_core::Error;

use crate::search::{SearchBackend, SearchHit};

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const INSTANT_ANSWER_ENDPOINT: &str = "https://api.duckduckgo.com/";
const USER_AGENT: &str = concat!("research-assistant/", env!("CARGO_PKG_VERSION"));

/// Related topics included in a plain answer.
const MAX_RELATED_TOPICS: usize = 5;

pub(crate) fn http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

pub struct DuckDuckGo {
    client: Client,
}

impl DuckDuckGo {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGo {
    async fn text_search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, Error> {
        let response = self
            .client
            .post(HTML_ENDPOINT)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::network(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::api(
                response.status().as_u16(),
                format!("Search returned HTTP {}", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read search results: {}", e)))?;

        let hits = parse_html_results(&html, max_results);
        debug!(query, hits = hits.len(), "Parsed DuckDuckGo results");
        Ok(hits)
    }

    async fn plain_search(&self, query: &str) -> Result<String, Error> {
        let response = self
            .client
            .get(INSTANT_ANSWER_ENDPOINT)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::network(format!("Instant answer request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::api(
                response.status().as_u16(),
                format!("Instant answer returned HTTP {}", response.status()),
            ));
        }

        // The API answers with a javascript content type.
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read instant answer: {}", e)))?;
        let answer: InstantAnswer = serde_json::from_str(&body)?;
        Ok(answer.plain_text())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstantAnswer {
    abstract_text: String,
    answer: String,
    definition: String,
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RelatedTopic {
    // Topic groups have no text of their own.
    text: Option<String>,
}

impl InstantAnswer {
    fn plain_text(&self) -> String {
        let mut parts: Vec<&str> = [&self.abstract_text, &self.answer, &self.definition]
            .into_iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        parts.extend(
            self.related_topics
                .iter()
                .filter_map(|t| t.text.as_deref())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .take(MAX_RELATED_TOPICS),
        );

        parts.join("\n")
    }
}

/// Extract result blocks from the DuckDuckGo HTML page, skipping ads.
fn parse_html_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    let (Ok(result), Ok(anchor), Ok(snippet)) = (
        Selector::parse(".result"),
        Selector::parse(".result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    document
        .select(&result)
        .filter(|el| {
            !el.value()
                .classes()
                .any(|class| class == "result--ad")
        })
        .filter_map(|el| {
            let a = el.select(&anchor).next()?;
            let href = a.value().attr("href")?;
            let title = element_text(&a);
            if title.is_empty() {
                return None;
            }
            let description = el
                .select(&snippet)
                .next()
                .map(|s| element_text(&s))
                .unwrap_or_default();
            Some(SearchHit {
                title,
                link: decode_result_link(href),
                description,
            })
        })
        .take(max_results)
        .collect()
}

/// Result links point at a redirect (`//duckduckgo.com/l/?uddg=<target>`);
/// unwrap it to the target URL.
fn decode_result_link(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    Url::parse(&absolute)
        .ok()
        .filter(|url| url.path().starts_with("/l/"))
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "uddg")
                .map(|(_, target)| target.into_owned())
        })
        .unwrap_or(absolute)
}

/// Collapsed text of an element.
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
