//! Prompt assembly for script composition and the error sentinel.
//!
//! The prompt is deterministic: a fixed host persona as the system message,
//! and a user message listing the requested topics and companies followed by
//! one `News Item N:` block per item, in input order.

use crate::models::NewsItem;
use crate::utils::upcase;
use std::fmt::Display;

/// Marker that makes a script unusable for speech synthesis.
pub const ERROR_MARKER: &str = "Error";

const DEFAULT_TOPICS: &str = "current global events";
const DEFAULT_COMPANIES: &str = "major relevant companies";

const HOST_PERSONA: &str = "You are the host of a short daily news podcast. \
Write a script that will be read aloud by a text-to-speech voice.\n\n\
Structure:\n\
1. A brief, friendly introduction that greets the listener for this edition.\n\
2. Two to four segments. Each segment opens with a clear headline, explains in two or three \
sentences why the story matters, and names its source.\n\
3. A short outro thanking the listener.\n\n\
Rules: output plain text only. No markdown, asterisks, bullet points, headings, stage \
directions or sound effects. Use natural paragraph breaks. Do not invent facts that are \
not in the material provided.";

/// A system message plus a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPrompt {
    pub system: String,
    pub user: String,
}

/// Build the script prompt for the given items.
///
/// An empty item list still yields a usable prompt: it asks for a general
/// update and tells the model that no specific news was found.
pub fn build_script_prompt(
    items: &[NewsItem],
    topics: &[String],
    companies: &[String],
    edition: &str,
) -> ScriptPrompt {
    let topics = join_or(topics, DEFAULT_TOPICS);
    let companies = join_or(companies, DEFAULT_COMPANIES);

    let mut user = format!(
        "Edition: {}\nTopics of interest: {}\nCompanies of interest: {}\n\n",
        upcase(edition),
        topics,
        companies
    );

    if items.is_empty() {
        user.push_str(
            "There is no specific news available for these topics and companies right now. \
             Write a short, general update on them instead, and tell the listener that no \
             fresh stories were found for this edition.\n",
        );
    } else {
        user.push_str("Cover the following stories:\n\n");
        for (i, item) in items.iter().enumerate() {
            user.push_str(&news_item_block(i + 1, item));
            user.push('\n');
        }
    }

    user.push_str(&format!("\nWrite the {} podcast script now.", edition));

    ScriptPrompt {
        system: HOST_PERSONA.to_string(),
        user,
    }
}

fn news_item_block(n: usize, item: &NewsItem) -> String {
    let published = item
        .published_at
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let snippet = if item.snippet.trim().is_empty() {
        "(none)"
    } else {
        item.snippet.trim()
    };

    let mut block = format!(
        "News Item {}:\nTitle: {}\nSource: {}\nPublished: {}\nLink: {}\nSnippet: {}\n",
        n, item.title, item.source_name, published, item.link, snippet
    );
    if let Some(text) = item.full_text_content.as_deref().filter(|t| !t.trim().is_empty()) {
        block.push_str(&format!("Article text: {}\n", text.trim()));
    }
    block
}

fn join_or(values: &[String], fallback: &str) -> String {
    if values.is_empty() {
        fallback.to_string()
    } else {
        values.join(", ")
    }
}

/// Render a failed script-writer call as a sentinel string.
pub fn error_sentinel(err: &impl Display) -> String {
    format!("{}: {}", ERROR_MARKER, err)
}

/// True when `script` carries the error marker and must not be synthesized.
pub fn is_error_sentinel(script: &str) -> bool {
    script.contains(ERROR_MARKER)
}
