//! Main-text extraction from arbitrary article pages.
//!
//! News sources only give a title and a snippet. Before composing the script
//! each article link is fetched and its body text pulled out with a fixed list
//! of "main content" selectors:
//!
//! 1. The first element matching a selector is taken as the container
//! 2. The text of every `<p>` inside it is joined, one paragraph per line
//! 3. If that is shorter than the word threshold, the next selector is tried
//! 4. If no selector qualifies, every `<p>` in the document is used
//!
//! Extraction never fails: network, status and parse problems are logged and
//! produce an empty string, so the run continues with the snippet only.

use crate::cache::TtlCache;
use crate::config::ExtractionSettings;
use crate::error::{PodcastError, Result};
use crate::models::NewsItem;
use crate::utils::{truncate_chars, word_count};
use crate::vendors::check_status;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    ".article-body",
    ".article-content",
    ".story-body",
    ".post-content",
    ".entry-content",
    "#content",
];

static CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Fetches article pages and caches their extracted text by URL.
#[derive(Debug)]
pub struct ArticleFetcher {
    http: reqwest::Client,
    min_words: usize,
    max_chars: usize,
    max_page_bytes: usize,
    cache: TtlCache<String, String>,
}

impl ArticleFetcher {
    pub fn from_settings(settings: &ExtractionSettings, cache_ttl: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| PodcastError::Config(format!("failed to build scraping client: {}", e)))?;
        Ok(Self {
            http,
            min_words: settings.min_words,
            max_chars: settings.max_chars,
            max_page_bytes: settings.max_page_bytes,
            cache: TtlCache::new(cache_ttl),
        })
    }

    /// Return the main text of `url`, or an empty string on any failure.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_text(&self, url: &str) -> String {
        if Url::parse(url).map(|u| !u.scheme().starts_with("http")).unwrap_or(true) {
            debug!("Not an http(s) link; skipping extraction");
            return String::new();
        }
        if let Some(hit) = self.cache.get(&url.to_string()) {
            debug!(chars = hit.chars().count(), "Article cache hit");
            return hit;
        }

        match self.fetch_html(url).await {
            Ok(html) => {
                let text = extract_text_from_html(&html, self.min_words, self.max_chars);
                if text.is_empty() {
                    warn!("No paragraph text found");
                } else {
                    info!(words = word_count(&text), "Extracted article text");
                    self.cache.insert(url.to_string(), text.clone());
                }
                text
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed; continuing without body text");
                String::new()
            }
        }
    }

    /// Read the page body, refusing pages that declare more than
    /// `max_page_bytes` and cutting undeclared ones off at that size.
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?;
        let mut response = check_status("article", response).await?;
        if let Some(len) = response.content_length() {
            if len > self.max_page_bytes as u64 {
                return Err(PodcastError::vendor(
                    "article",
                    format!("page is {} bytes, limit is {}", len, self.max_page_bytes),
                ));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let room = self.max_page_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                debug!(limit = self.max_page_bytes, "Page body cut at size limit");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Fill `full_text_content` for each item, one request at a time.
    #[instrument(level = "info", skip_all, fields(count = items.len()))]
    pub async fn enrich(&self, items: Vec<NewsItem>) -> Vec<NewsItem> {
        let enriched: Vec<NewsItem> = stream::iter(items)
            .then(|mut item| async move {
                let text = self.fetch_text(&item.link).await;
                item.full_text_content = Some(text).filter(|t| !t.is_empty());
                item
            })
            .collect()
            .await;

        let with_text = enriched
            .iter()
            .filter(|i| i.full_text_content.is_some())
            .count();
        info!(with_text, total = enriched.len(), "Article extraction finished");
        enriched
    }
}

/// Extract the main text of an HTML page.
///
/// The result holds one whitespace-normalised paragraph per line and is cut
/// to `max_chars` characters.
pub fn extract_text_from_html(html: &str, min_words: usize, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    for (selector, name) in CONTAINERS.iter().zip(CONTENT_SELECTORS) {
        if let Some(container) = document.select(selector).next() {
            let text = paragraphs(container.select(&PARAGRAPH));
            if word_count(&text) >= min_words {
                debug!(selector = name, "Content container matched");
                return truncate_chars(&text, max_chars);
            }
        }
    }

    let text = paragraphs(document.select(&PARAGRAPH));
    truncate_chars(&text, max_chars)
}

fn paragraphs<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> String {
    elements
        .map(|p| {
            let raw: String = p.text().collect();
            WHITESPACE.replace_all(&raw, " ").trim().to_string()
        })
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
