//! JSON run manifest.
//!
//! The manifest records what was asked for and what came back: the request,
//! the stage the run reached, the news items, the script, the audio file and
//! the failure, if any. It is rewritten on every run of the same edition.

use crate::models::{AudioArtifact, NewsItem, RunOutcome, RunRequest, RunStage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serializable view of one run.
#[derive(Debug, Serialize)]
pub struct RunManifest<'a> {
    pub generated_at: DateTime<Utc>,
    pub news_source: &'a str,
    pub request: &'a RunRequest,
    pub stage: RunStage,
    pub success: bool,
    pub items: &'a [NewsItem],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_suggestions_html: Option<&'a str>,
    pub script: Option<&'a str>,
    pub audio: Option<&'a AudioArtifact>,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
}

impl<'a> RunManifest<'a> {
    pub fn new(request: &'a RunRequest, outcome: &'a RunOutcome, news_source: &'a str) -> Self {
        Self {
            generated_at: Utc::now(),
            news_source,
            request,
            stage: outcome.stage,
            success: outcome.is_success(),
            items: &outcome.items,
            search_suggestions_html: outcome.search_suggestions_html.as_deref(),
            script: outcome.script.as_deref(),
            audio: outcome.audio.as_ref(),
            error: outcome.failure.as_ref().map(|e| e.to_string()),
            error_kind: outcome.failure.as_ref().map(|e| e.kind().as_str()),
        }
    }
}

/// Write the manifest as pretty-printed JSON, creating parent directories.
///
/// # Arguments
///
/// * `manifest` - The run view to serialize
/// * `path` - Destination file, usually `{date}_{edition}.json`
///
/// # Errors
///
/// Fails when serialization fails, the directory cannot be created or the
/// file cannot be written.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_manifest(manifest: &RunManifest<'_>, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(manifest)?;

    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create manifest dir");
            return Err(e.into());
        }
    }

    fs::write(path, json).await?;
    info!(items = manifest.items.len(), "Wrote run manifest");
    Ok(())
}
