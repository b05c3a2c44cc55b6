//! Keyword news search through NewsAPI's "everything" endpoint.
//!
//! Topics and companies are combined into one boolean query: topics are OR'd
//! together, companies are OR'd together, and the two groups are AND'd. Only
//! articles published inside the search window (default 24 hours) are
//! requested.

use crate::config::NewsApiSettings;
use crate::error::{PodcastError, Result};
use crate::models::{NewsBatch, NewsItem, NewsQuery};
use crate::vendors::{NewsSource, secret};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// NewsAPI rejects page sizes above this.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct NewsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    sort_by: String,
    language: String,
    window: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<ArticleRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleRecord {
    #[serde(default)]
    source: Option<SourceRecord>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(default)]
    name: Option<String>,
}

impl NewsApiClient {
    pub fn from_settings(settings: &NewsApiSettings, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: secret(&settings.api_key, "NEWS_API_KEY")?,
            sort_by: settings.sort_by.clone(),
            language: settings.language.clone(),
            window: Duration::hours(settings.window_hours),
        })
    }
}

impl NewsSource for NewsApiClient {
    fn name(&self) -> &'static str {
        "newsapi"
    }

    #[instrument(level = "info", skip_all, fields(max_items = query.max_items))]
    async fn search_news(&self, query: &NewsQuery) -> Result<NewsBatch> {
        let q = build_boolean_query(&query.topics, &query.companies).ok_or_else(|| {
            PodcastError::NoNews("no topics or companies to search for".to_string())
        })?;
        let from = window_start(Utc::now(), self.window);
        let page_size = query.max_items.clamp(1, MAX_PAGE_SIZE).to_string();
        info!(%q, %from, "Querying NewsAPI");

        let response = self
            .http
            .get(format!("{}/v2/everything", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", q.as_str()),
                ("from", from.as_str()),
                ("sortBy", self.sort_by.as_str()),
                ("language", self.language.as_str()),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: EverythingResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(PodcastError::vendor("newsapi", format!("HTTP {}", status)));
            }
        };
        if parsed.status != "ok" {
            return Err(PodcastError::vendor(
                "newsapi",
                parsed.message.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        let items = to_news_items(parsed.articles, query.max_items);
        info!(count = items.len(), "NewsAPI returned articles");
        Ok(NewsBatch {
            items,
            ..Default::default()
        })
    }
}

/// Build `(a OR b) AND (c OR d)` from the two lists.
///
/// Multi-word terms are quoted, a group with a single term is left bare and
/// an empty group is omitted. Returns `None` when both lists are empty.
pub fn build_boolean_query(topics: &[String], companies: &[String]) -> Option<String> {
    fn term(t: &str) -> String {
        let t = t.replace('"', "");
        if t.contains(char::is_whitespace) {
            format!("\"{}\"", t)
        } else {
            t
        }
    }

    fn group(terms: &[String]) -> Option<String> {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(term)
            .collect();
        match terms.len() {
            0 => None,
            1 => terms.into_iter().next(),
            _ => Some(format!("({})", terms.join(" OR "))),
        }
    }

    let groups: Vec<String> = [group(topics), group(companies)]
        .into_iter()
        .flatten()
        .collect();
    if groups.is_empty() {
        None
    } else {
        Some(groups.join(" AND "))
    }
}

/// The `from` timestamp: `now - window`, second precision, no zone suffix.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> String {
    (now - window).format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn to_news_items(records: Vec<ArticleRecord>, max_items: usize) -> Vec<NewsItem> {
    records
        .into_iter()
        .filter_map(|r| {
            let title = r.title.map(|t| t.trim().to_string()).unwrap_or_default();
            let link = r.url.unwrap_or_default();
            if title.is_empty() || title == "[Removed]" || link.is_empty() {
                debug!(%title, "Skipping unusable NewsAPI record");
                return None;
            }
            let snippet = r
                .description
                .filter(|d| !d.trim().is_empty())
                .or(r.content)
                .unwrap_or_default();
            let mut item = NewsItem {
                title,
                link,
                snippet: snippet.trim().to_string(),
                source_name: r
                    .source
                    .and_then(|s| s.name)
                    .map(|n| n.trim().to_string())
                    .unwrap_or_default(),
                published_at: r.published_at,
                full_text_content: None,
            };
            if item.source_name.is_empty() {
                item.source_name = item
                    .source_tag()
                    .unwrap_or_else(|| "Unknown Source".to_string());
            }
            Some(item)
        })
        .unique_by(|item| item.link.clone())
        .take(max_items)
        .inspect(|item| {
            if item.snippet.is_empty() {
                warn!(link = %item.link, "NewsAPI record has no description");
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_boolean_query_both_groups() {
        let q = build_boolean_query(
            &strings(&["quantum computing"]),
            &strings(&["OpenAI"]),
        );
        assert_eq!(q.as_deref(), Some("\"quantum computing\" AND OpenAI"));
    }

    #[test]
    fn test_boolean_query_or_groups() {
        let q = build_boolean_query(
            &strings(&["AI", "space technology"]),
            &strings(&["Nvidia", "OpenAI", "SpaceX"]),
        );
        assert_eq!(
            q.as_deref(),
            Some("(AI OR \"space technology\") AND (Nvidia OR OpenAI OR SpaceX)")
        );
    }

    #[test]
    fn test_boolean_query_single_side_and_empty() {
        assert_eq!(
            build_boolean_query(&[], &strings(&["Nvidia", "AMD"])).as_deref(),
            Some("(Nvidia OR AMD)")
        );
        assert_eq!(build_boolean_query(&[], &strings(&["  "])), None);
        assert_eq!(build_boolean_query(&[], &[]), None);
    }

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 30, 0).unwrap();
        assert_eq!(window_start(now, Duration::hours(24)), "2025-05-05T12:30:00");
    }

    fn client(base_url: &str) -> NewsApiClient {
        let settings = NewsApiSettings {
            api_key: Some("news-key".to_string()),
            base_url: base_url.to_string(),
            ..Default::default()
        };
        NewsApiClient::from_settings(&settings, reqwest::Client::new()).unwrap()
    }

    fn query() -> NewsQuery {
        NewsQuery {
            topics: strings(&["quantum computing"]),
            companies: strings(&["OpenAI"]),
            max_items: 3,
        }
    }

    #[tokio::test]
    async fn test_search_news_parses_and_filters_articles() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/everything")
            .match_header("x-api-key", "news-key")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "\"quantum computing\" AND OpenAI".into()),
                Matcher::UrlEncoded("language".into(), "en".into()),
                Matcher::UrlEncoded("sortBy".into(), "publishedAt".into()),
                Matcher::UrlEncoded("pageSize".into(), "3".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                "status": "ok",
                "totalResults": 4,
                "articles": [
                    {"source": {"id": null, "name": "Wired"}, "title": "Qubits scale up",
                     "description": "A new chip.", "url": "https://wired.com/a",
                     "publishedAt": "2025-05-06T10:00:00Z", "content": "Body..."},
                    {"source": {"id": null, "name": "[Removed]"}, "title": "[Removed]",
                     "description": null, "url": "https://removed.com", "publishedAt": "2025-05-06T09:00:00Z"},
                    {"source": {"id": null, "name": "Wired"}, "title": "Qubits scale up (dup)",
                     "description": "Dup.", "url": "https://wired.com/a", "publishedAt": "2025-05-06T10:00:00Z"},
                    {"source": {"id": null, "name": null}, "title": "OpenAI and quantum",
                     "description": "", "url": "https://verge.com/b",
                     "publishedAt": "2025-05-06T08:00:00Z", "content": "Content fallback"}
                ]
            }"#,
            )
            .create_async()
            .await;

        let batch = client(&server.url()).search_news(&query()).await.unwrap();
        mock.assert_async().await;

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].title, "Qubits scale up");
        assert_eq!(batch.items[0].source_name, "Wired");
        assert_eq!(batch.items[0].snippet, "A new chip.");
        assert!(batch.items[0].published_at.is_some());
        assert_eq!(batch.items[1].snippet, "Content fallback");
        assert_eq!(batch.items[1].source_name, "verge");
        assert!(batch.grounded_script.is_none());
    }

    #[tokio::test]
    async fn test_search_news_surfaces_api_error_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/everything")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#)
            .create_async()
            .await;

        let err = client(&server.url()).search_news(&query()).await.unwrap_err();
        assert!(err.to_string().contains("Your API key is invalid."));
    }

    #[tokio::test]
    async fn test_search_news_without_terms_is_no_news() {
        let q = NewsQuery {
            topics: vec![],
            companies: vec![],
            max_items: 3,
        };
        let err = client("http://127.0.0.1:1").search_news(&q).await.unwrap_err();
        assert!(matches!(err, PodcastError::NoNews(_)));
    }
}
