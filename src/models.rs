//! Data models for news items, run requests and run outcomes.
//!
//! This module defines the request-scoped structures that flow through the
//! pipeline:
//! - [`NewsItem`]: One article found by a news source, optionally enriched with body text
//! - [`NewsBatch`]: Everything a single news acquisition returns
//! - [`RunRequest`]: The immutable input of one podcast run
//! - [`RunOutcome`]: What the presentation layer renders after a run
//!
//! Nothing here is persisted beyond the JSON run manifest.

use crate::error::PodcastError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single news article as returned by a news source.
///
/// The link is the only identity an item has. `published_at` is absent for
/// grounded citations, which carry no timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Body text extracted from `link`, filled in by the article scraper.
    pub full_text_content: Option<String>,
}

impl NewsItem {
    /// Extract the domain name (before .com/.org/etc) from the link.
    /// For example: "https://www.reuters.com/tech/x" -> "reuters"
    pub fn source_tag(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.link).ok()?;
        let host = parsed.host_str()?;
        let parts: Vec<&str> = host.split('.').collect();
        if parts.len() >= 2 {
            Some(parts[parts.len() - 2].to_string())
        } else {
            None
        }
    }
}

/// The result of one news acquisition call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsBatch {
    pub items: Vec<NewsItem>,
    /// Rendered search-suggestion HTML from a grounded search, if any.
    pub search_suggestions_html: Option<String>,
    /// A grounded search writes the script in the same call.
    pub grounded_script: Option<String>,
}

/// What to search for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NewsQuery {
    pub topics: Vec<String>,
    pub companies: Vec<String>,
    pub max_items: usize,
}

/// Audio written to disk by the speech step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub byte_len: usize,
}

/// Immutable input of a single podcast run.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub topics: Vec<String>,
    pub companies: Vec<String>,
    pub num_articles: usize,
    pub voice: String,
    pub audio_path: PathBuf,
    pub extract_articles: bool,
    /// Continue with a generic script when the news source finds nothing.
    pub allow_empty_news: bool,
    /// "morning", "afternoon" or "evening"; used in the script greeting.
    pub edition: String,
}

impl RunRequest {
    pub fn news_query(&self) -> NewsQuery {
        NewsQuery {
            topics: self.topics.clone(),
            companies: self.companies.clone(),
            max_items: self.num_articles,
        }
    }
}

/// Stages of a run, in the only order they can happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    FetchingNews,
    ExtractingContent,
    ComposingScript,
    SynthesizingAudio,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::FetchingNews => "fetching_news",
            RunStage::ExtractingContent => "extracting_content",
            RunStage::ComposingScript => "composing_script",
            RunStage::SynthesizingAudio => "synthesizing_audio",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything a finished run leaves behind.
///
/// `stage` is the last stage entered; when `failure` is set the run halted
/// there. Outputs of earlier stages stay available, so a script can be shown
/// even when speech synthesis failed.
#[derive(Debug)]
pub struct RunOutcome {
    pub stage: RunStage,
    pub items: Vec<NewsItem>,
    pub search_suggestions_html: Option<String>,
    pub script: Option<String>,
    pub audio: Option<AudioArtifact>,
    pub failure: Option<PodcastError>,
}

impl RunOutcome {
    pub fn new() -> Self {
        Self {
            stage: RunStage::Idle,
            items: Vec::new(),
            search_suggestions_html: None,
            script: None,
            audio: None,
            failure: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.stage == RunStage::Done
    }
}

impl Default for RunOutcome {
    fn default() -> Self {
        Self::new()
    }
}
