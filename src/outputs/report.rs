//! Plain-text console report of a run.
//!
//! Mirrors what a user needs after running `generate`: whether it worked,
//! a preview of the script, the sources used and where the audio went.

use crate::error::ErrorKind;
use crate::models::{NewsItem, RunOutcome};
use crate::utils::truncate_chars;

const SCRIPT_PREVIEW_CHARS: usize = 600;

/// Render the end-of-run console report.
///
/// # Arguments
///
/// * `outcome` - The finished run
///
/// # Returns
///
/// A status line, then a script preview cut at 600 characters, the numbered
/// sources and the audio path with its size. Sections with nothing to show
/// are left out.
///
/// # Examples
///
/// ```rust,ignore
/// println!("{}", render_report(&outcome));
/// ```
pub fn render_report(outcome: &RunOutcome) -> String {
    let mut out = String::new();

    match &outcome.failure {
        None => out.push_str("Podcast generated successfully.\n"),
        Some(err) => {
            let label = match err.kind() {
                ErrorKind::Configuration => "Configuration problem",
                ErrorKind::Vendor => "Request failed",
                ErrorKind::Empty => "Nothing to report",
            };
            out.push_str(&format!("{} during {}: {}\n", label, outcome.stage, err));
        }
    }

    if let Some(script) = &outcome.script {
        let preview = truncate_chars(script, SCRIPT_PREVIEW_CHARS);
        out.push_str("\n--- Script ---\n");
        out.push_str(&preview);
        if preview.len() < script.len() {
            out.push_str(&format!(
                "\n[... {} more characters]",
                script.chars().count() - preview.chars().count()
            ));
        }
        out.push('\n');
    }

    if !outcome.items.is_empty() {
        out.push_str("\n--- Sources ---\n");
        out.push_str(&render_items(&outcome.items));
    }

    if let Some(audio) = &outcome.audio {
        out.push_str(&format!(
            "\nAudio: {} ({} bytes)\n",
            audio.path.display(),
            audio.byte_len
        ));
    }
    out
}

/// One numbered line per item, plus the snippet when there is one.
pub fn render_items(items: &[NewsItem]) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {} [{}]\n", i + 1, item.title, item.source_name));
        if item.link != "#" {
            out.push_str(&format!("   {}\n", item.link));
        }
        if !item.snippet.is_empty() {
            out.push_str(&format!("   {}\n", truncate_chars(&item.snippet, 200)));
        }
    }
    out
}
