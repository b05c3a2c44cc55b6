//! Markdown show notes for an episode.

use crate::models::{NewsItem, RunOutcome, RunRequest};
use crate::utils::upcase;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Render the Markdown show notes for one run.
///
/// # Arguments
///
/// * `request` - What was asked for: topics, companies and edition
/// * `outcome` - What the run produced, successful or not
/// * `date` - Local date used in the heading (e.g. `2025-05-06`)
///
/// # Returns
///
/// The notes: heading, topics, audio link, sources and script. Gemini's
/// search suggestions follow the script as a raw HTML block, and a failed
/// run ends with a quoted note naming the stage it stopped at.
///
/// # Examples
///
/// ```rust,ignore
/// let md = show_notes(&request, &outcome, "2025-05-06");
/// assert!(md.starts_with("# Evening Briefing, 2025-05-06"));
/// ```
pub fn show_notes(request: &RunRequest, outcome: &RunOutcome, date: &str) -> String {
    let mut md = format!("# {} Briefing, {}\n\n", upcase(&request.edition), date);

    md.push_str(&format!("**Topics:** {}\n\n", list_or_none(&request.topics)));
    md.push_str(&format!("**Companies:** {}\n\n", list_or_none(&request.companies)));
    if let Some(audio) = &outcome.audio {
        let name = audio
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| audio.path.display().to_string());
        md.push_str(&format!("**Audio:** [{}]({})\n\n", name, name));
    }

    md.push_str("## Sources\n\n");
    if outcome.items.is_empty() {
        md.push_str("_No sources._\n\n");
    } else {
        for item in &outcome.items {
            md.push_str(&source_line(item));
        }
        md.push('\n');
    }

    md.push_str("## Script\n\n");
    match outcome.script.as_deref() {
        Some(script) => {
            md.push_str(script.trim());
            md.push('\n');
        }
        None => md.push_str("_No script was produced._\n"),
    }

    if let Some(html) = outcome.search_suggestions_html.as_deref().map(str::trim) {
        if !html.is_empty() {
            md.push_str("\n## Search suggestions\n\n");
            md.push_str(html);
            md.push('\n');
        }
    }

    if let Some(err) = &outcome.failure {
        md.push_str(&format!("\n> Run stopped at `{}`: {}\n", outcome.stage, err));
    }
    md
}

fn source_line(item: &NewsItem) -> String {
    let mut line = if item.link == "#" {
        format!("- {}", item.title)
    } else {
        format!("- [{}]({})", item.title, item.link)
    };
    if item.source_name != item.title {
        line.push_str(&format!(" ({})", item.source_name));
    }
    if let Some(at) = item.published_at {
        line.push_str(&format!(", {}", at.format("%Y-%m-%d %H:%M UTC")));
    }
    line.push('\n');
    line
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_show_notes(markdown: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    fs::write(path, markdown).await?;
    info!(bytes = markdown.len(), "Wrote show notes");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PodcastError;
    use crate::models::{AudioArtifact, RunStage};
    use std::path::PathBuf;

    fn request() -> RunRequest {
        RunRequest {
            topics: vec!["AI".to_string(), "space technology".to_string()],
            companies: vec![],
            num_articles: 2,
            voice: "alloy".to_string(),
            audio_path: PathBuf::from("out/2025-05-06_evening.mp3"),
            extract_articles: false,
            allow_empty_news: false,
            edition: "evening".to_string(),
        }
    }

    fn outcome() -> RunOutcome {
        let mut outcome = RunOutcome::new();
        outcome.stage = RunStage::Done;
        outcome.items = vec![
            NewsItem {
                title: "Rocket lands".to_string(),
                link: "https://example.com/rocket".to_string(),
                snippet: String::new(),
                source_name: "Example".to_string(),
                published_at: Some("2025-05-06T18:30:00Z".parse().unwrap()),
                full_text_content: None,
            },
            NewsItem {
                title: "reuters.com".to_string(),
                link: "#".to_string(),
                snippet: String::new(),
                source_name: "reuters.com".to_string(),
                published_at: None,
                full_text_content: None,
            },
        ];
        outcome.script = Some("Good evening.\n\nThat's all.".to_string());
        outcome.audio = Some(AudioArtifact {
            path: PathBuf::from("out/2025-05-06_evening.mp3"),
            byte_len: 10,
        });
        outcome
    }

    #[test]
    fn test_show_notes_layout() {
        let md = show_notes(&request(), &outcome(), "2025-05-06");
        assert!(md.starts_with("# Evening Briefing, 2025-05-06\n"));
        assert!(md.contains("**Topics:** AI, space technology"));
        assert!(md.contains("**Companies:** none"));
        assert!(md.contains("**Audio:** [2025-05-06_evening.mp3](2025-05-06_evening.mp3)"));
        assert!(md.contains("- [Rocket lands](https://example.com/rocket) (Example), 2025-05-06 18:30 UTC\n"));
        assert!(md.contains("- reuters.com\n"));
        assert!(md.ends_with("Good evening.\n\nThat's all.\n"));
    }

    #[test]
    fn test_search_suggestions_follow_script() {
        let mut outcome = outcome();
        outcome.search_suggestions_html = Some("<div class=\"chips\">rocket news</div>\n".to_string());
        let md = show_notes(&request(), &outcome, "2025-05-06");
        assert!(md.ends_with(
            "That's all.\n\n## Search suggestions\n\n<div class=\"chips\">rocket news</div>\n"
        ));

        outcome.search_suggestions_html = Some("  ".to_string());
        let md = show_notes(&request(), &outcome, "2025-05-06");
        assert!(!md.contains("Search suggestions"));
    }

    #[test]
    fn test_show_notes_for_failed_run() {
        let mut outcome = RunOutcome::new();
        outcome.stage = RunStage::FetchingNews;
        outcome.failure = Some(PodcastError::NoNews("nothing matched".to_string()));
        let md = show_notes(&request(), &outcome, "2025-05-06");
        assert!(md.contains("_No sources._"));
        assert!(md.contains("_No script was produced._"));
        assert!(md.contains("Run stopped at `fetching_news`: no news found: nothing matched"));
    }

    #[tokio::test]
    async fn test_write_show_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        write_show_notes("# Notes\n", &path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Notes\n");
    }
}
