//! Gemini `generateContent`, as a script writer and as a grounded news source.
//!
//! The same client talks either to the AI Studio endpoint (API key) or to
//! Vertex AI (project, region and a Google Cloud access token).
//!
//! [`GeminiSearch`] enables the Google Search tool: one call both researches
//! the news and writes the script, and the response's grounding metadata lists
//! the web pages it cited. That metadata is loosely specified, so every field
//! is optional and anything missing is treated as absent.

use crate::config::{GeminiSettings, GoogleCloudSettings};
use crate::error::{PodcastError, Result};
use crate::models::{NewsBatch, NewsItem, NewsQuery};
use crate::prompt::ScriptPrompt;
use crate::utils::truncate_for_log;
use crate::vendors::google_auth::GoogleAuth;
use crate::vendors::{NewsSource, ScriptWriter, check_status, secret};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
enum GeminiAuth {
    ApiKey(String),
    Vertex(GoogleAuth),
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    auth: GeminiAuth,
    temperature: f32,
    search_temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
    block_reason_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    search_entry_point: Option<SearchEntryPoint>,
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchEntryPoint {
    rendered_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

impl GeminiClient {
    pub fn from_settings(
        settings: &GeminiSettings,
        cloud: &GoogleCloudSettings,
        google_auth: Option<GoogleAuth>,
        http: reqwest::Client,
    ) -> Result<Self> {
        let (endpoint, auth) = if settings.use_vertex {
            let auth = google_auth.ok_or_else(|| {
                PodcastError::Config("Vertex AI needs Google Cloud credentials".to_string())
            })?;
            let project = cloud
                .effective_project_id()
                .ok_or_else(|| PodcastError::MissingCredentials(vec!["GOOGLE_CLOUD_PROJECT".to_string()]))?;
            let region = secret(&cloud.region, "GOOGLE_CLOUD_REGION")?;
            let base = settings
                .vertex_base_url
                .clone()
                .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", region));
            let endpoint = format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                base.trim_end_matches('/'),
                project,
                region,
                settings.model
            );
            (endpoint, GeminiAuth::Vertex(auth))
        } else {
            let endpoint = format!(
                "{}/v1beta/models/{}:generateContent",
                settings.base_url.trim_end_matches('/'),
                settings.model
            );
            (endpoint, GeminiAuth::ApiKey(secret(&settings.api_key, "GEMINI_API_KEY")?))
        };

        Ok(Self {
            http,
            endpoint,
            auth,
            temperature: settings.temperature,
            search_temperature: settings.search_temperature,
        })
    }

    #[instrument(level = "info", skip_all, fields(grounded = with_search))]
    async fn generate(
        &self,
        system: Option<&str>,
        user: &str,
        with_search: bool,
        temperature: f32,
    ) -> Result<GenerateResponse> {
        let t0 = Instant::now();
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user }],
            }],
            system_instruction: system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            tools: if with_search {
                vec![Tool {
                    google_search: GoogleSearch {},
                }]
            } else {
                Vec::new()
            },
            generation_config: GenerationConfig { temperature },
        };

        let request = self.http.post(&self.endpoint).json(&body);
        let request = match &self.auth {
            GeminiAuth::ApiKey(key) => request.header("x-goog-api-key", key),
            GeminiAuth::Vertex(auth) => request.bearer_auth(auth.access_token().await?),
        };
        let response = request.send().await?;
        let text = check_status("gemini", response).await?.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(body = %truncate_for_log(&text, 300), "Malformed Gemini response");
            PodcastError::from(e)
        })?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            candidates = parsed.candidates.len(),
            "Gemini response received"
        );
        Ok(parsed)
    }
}

impl ScriptWriter for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate_script(&self, prompt: &ScriptPrompt) -> Result<String> {
        let response = self
            .generate(Some(&prompt.system), &prompt.user, false, self.temperature)
            .await?;
        let candidate = first_candidate(&response)?;
        Ok(candidate_text(candidate))
    }
}

/// Gemini with Google Search grounding, used as a news source.
#[derive(Debug, Clone)]
pub struct GeminiSearch {
    client: GeminiClient,
}

impl GeminiSearch {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

impl NewsSource for GeminiSearch {
    fn name(&self) -> &'static str {
        "gemini-search"
    }

    #[instrument(level = "info", skip_all, fields(max_items = query.max_items))]
    async fn search_news(&self, query: &NewsQuery) -> Result<NewsBatch> {
        let prompt = grounded_prompt(query);
        debug!(topics = ?query.topics, companies = ?query.companies, "Sending grounded search prompt");
        let response = self
            .client
            .generate(None, &prompt, true, self.client.search_temperature)
            .await?;
        parse_grounded(&response)
    }
}

/// The single prompt of a grounded search: research the news and write the script.
pub fn grounded_prompt(query: &NewsQuery) -> String {
    let topics = if query.topics.is_empty() {
        "current global events".to_string()
    } else {
        query.topics.join(", ")
    };
    let companies = if query.companies.is_empty() {
        "major relevant companies".to_string()
    } else {
        query.companies.join(", ")
    };

    format!(
        "You are an expert news summarizer and podcast script writer.\n\
         Search for the latest news from the last 24 to 48 hours about the topics \"{topics}\" \
         and the companies \"{companies}\", then write a concise, engaging podcast script \
         covering about {n} key stories.\n\n\
         The script must have:\n\
         1. A brief, friendly introduction.\n\
         2. For each story: a clear headline, two or three sentences on why it matters, \
         and the primary source if it is apparent from your search.\n\
         3. A brief, engaging outro.\n\n\
         Write plain text only, suitable for text-to-speech. Do not use markdown, \
         asterisks, headings or lists. Use natural paragraph breaks.\n\n\
         Begin the podcast script now:",
        n = query.max_items
    )
}

fn first_candidate(response: &GenerateResponse) -> Result<&Candidate> {
    if let Some(candidate) = response.candidates.first() {
        return Ok(candidate);
    }
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            let reason = feedback
                .block_reason_message
                .clone()
                .unwrap_or_else(|| reason.clone());
            return Err(PodcastError::Blocked {
                vendor: "gemini",
                reason,
            });
        }
    }
    Err(PodcastError::vendor("gemini", "returned no candidates"))
}

fn candidate_text(candidate: &Candidate) -> String {
    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();
    if text.trim().is_empty() {
        if let Some(reason) = &candidate.finish_reason {
            warn!(finish_reason = %reason, "Gemini candidate has no text");
        }
    }
    text.trim().to_string()
}

fn parse_grounded(response: &GenerateResponse) -> Result<NewsBatch> {
    let candidate = first_candidate(response)?;
    let script = candidate_text(candidate);

    let mut suggestions = None;
    let mut items = Vec::new();
    match &candidate.grounding_metadata {
        Some(meta) => {
            suggestions = meta
                .search_entry_point
                .as_ref()
                .and_then(|e| e.rendered_content.clone());
            items = meta
                .grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .map(|web| {
                    let title = web.title.clone().unwrap_or_else(|| "Unknown Title".to_string());
                    NewsItem {
                        source_name: title.clone(),
                        title,
                        link: web.uri.clone().unwrap_or_else(|| "#".to_string()),
                        snippet: String::new(),
                        published_at: None,
                        full_text_content: None,
                    }
                })
                .unique_by(|item| (item.title.clone(), item.link.clone()))
                .collect();
            info!(count = items.len(), "Extracted cited articles from grounding metadata");
        }
        None => {
            info!("No grounding metadata; the model may have answered without searching");
        }
    }

    if script.is_empty() && items.is_empty() {
        return Err(PodcastError::NoNews(
            "Gemini generated an empty script and found no search results".to_string(),
        ));
    }
    if script.is_empty() {
        return Err(PodcastError::NoScript(format!(
            "Gemini found {} search results but did not write a script",
            items.len()
        )));
    }

    Ok(NewsBatch {
        items,
        search_suggestions_html: suggestions,
        grounded_script: Some(script),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    fn studio_client(base_url: &str) -> GeminiClient {
        let settings = GeminiSettings {
            api_key: Some("gemini-key".to_string()),
            base_url: base_url.to_string(),
            ..Default::default()
        };
        GeminiClient::from_settings(
            &settings,
            &GoogleCloudSettings::default(),
            None,
            reqwest::Client::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_grounded_full_response() {
        let response = parse(
            r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Welcome to the show. "}, {"text": "Today: chips."}]},
                "groundingMetadata": {
                    "searchEntryPoint": {"renderedContent": "<div>suggestions</div>"},
                    "groundingChunks": [
                        {"web": {"uri": "https://vertexaisearch.example/r1", "title": "reuters.com"}},
                        {"web": {"title": "apnews.com"}},
                        {"retrievedContext": {"uri": "gs://x"}},
                        {"web": {"uri": "https://vertexaisearch.example/r1", "title": "reuters.com"}}
                    ]
                }
            }]
        }"#,
        );
        let batch = parse_grounded(&response).unwrap();
        assert_eq!(
            batch.grounded_script.as_deref(),
            Some("Welcome to the show. Today: chips.")
        );
        assert_eq!(batch.search_suggestions_html.as_deref(), Some("<div>suggestions</div>"));
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].source_name, "reuters.com");
        assert_eq!(batch.items[1].link, "#");
        assert!(batch.items[1].published_at.is_none());
    }

    #[test]
    fn test_parse_grounded_missing_metadata_fields() {
        let response = parse(
            r#"{"candidates": [{
                "content": {"parts": [{"text": "Script"}]},
                "groundingMetadata": {"groundingChunks": [{"web": {}}]}
            }]}"#,
        );
        let batch = parse_grounded(&response).unwrap();
        assert!(batch.search_suggestions_html.is_none());
        assert_eq!(batch.items[0].title, "Unknown Title");
        assert_eq!(batch.items[0].link, "#");
    }

    #[test]
    fn test_parse_grounded_without_metadata() {
        let response = parse(r#"{"candidates": [{"content": {"parts": [{"text": "Just text"}]}}]}"#);
        let batch = parse_grounded(&response).unwrap();
        assert!(batch.items.is_empty());
        assert_eq!(batch.grounded_script.as_deref(), Some("Just text"));
    }

    #[test]
    fn test_parse_grounded_blocked_prompt() {
        let response = parse(
            r#"{"promptFeedback": {"blockReason": "SAFETY", "blockReasonMessage": "unsafe prompt"}}"#,
        );
        match parse_grounded(&response) {
            Err(PodcastError::Blocked { reason, .. }) => assert_eq!(reason, "unsafe prompt"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_grounded_no_candidates() {
        let err = parse_grounded(&parse("{}")).unwrap_err();
        assert!(matches!(err, PodcastError::Vendor { .. }));
    }

    #[test]
    fn test_parse_grounded_empty_text() {
        let nothing = parse(r#"{"candidates": [{"content": {"parts": []}, "finishReason": "OTHER"}]}"#);
        assert!(matches!(parse_grounded(&nothing), Err(PodcastError::NoNews(_))));

        let sources_only = parse(
            r#"{"candidates": [{
                "content": {"parts": [{"text": "  "}]},
                "groundingMetadata": {"groundingChunks": [{"web": {"uri": "u", "title": "t"}}]}
            }]}"#,
        );
        assert!(matches!(parse_grounded(&sources_only), Err(PodcastError::NoScript(_))));
    }

    #[test]
    fn test_grounded_prompt_defaults() {
        let prompt = grounded_prompt(&NewsQuery {
            topics: vec![],
            companies: vec!["Nvidia".to_string(), "OpenAI".to_string()],
            max_items: 3,
        });
        assert!(prompt.contains("\"current global events\""));
        assert!(prompt.contains("\"Nvidia, OpenAI\""));
        assert!(prompt.contains("about 3 key stories"));
    }

    #[tokio::test]
    async fn test_search_news_enables_google_search_tool() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
            .match_header("x-goog-api-key", "gemini-key")
            .match_body(Matcher::PartialJson(json!({
                "tools": [{"google_search": {}}],
                "generationConfig": {"temperature": 0.6}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Hello listeners"}]}}]}"#)
            .create_async()
            .await;

        let search = GeminiSearch::new(studio_client(&server.url()));
        let batch = search
            .search_news(&NewsQuery {
                topics: vec!["AI".to_string()],
                companies: vec![],
                max_items: 2,
            })
            .await
            .unwrap();
        assert_eq!(batch.grounded_script.as_deref(), Some("Hello listeners"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_script_sends_system_instruction() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "systemInstruction": {"parts": [{"text": "persona"}]},
                "contents": [{"role": "user", "parts": [{"text": "items"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": " Script body "}]}}]}"#)
            .create_async()
            .await;

        let prompt = ScriptPrompt {
            system: "persona".to_string(),
            user: "items".to_string(),
        };
        let script = studio_client(&server.url())
            .generate_script(&prompt)
            .await
            .unwrap();
        assert_eq!(script, "Script body");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_vertex_endpoint_uses_bearer_token() {
        use crate::vendors::google_auth::CredentialSource;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                "/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-2.0-flash:generateContent",
            )
            .match_header("authorization", "Bearer ya29.test")
            .with_status(200)
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Vertex script"}]}}]}"#)
            .create_async()
            .await;

        let settings = GeminiSettings {
            use_vertex: true,
            vertex_base_url: Some(server.url()),
            ..Default::default()
        };
        let cloud = GoogleCloudSettings {
            project_id: Some("demo".to_string()),
            region: Some("us-central1".to_string()),
            ..Default::default()
        };
        let auth = GoogleAuth::with_sources(
            vec![CredentialSource::AccessToken("ya29.test".to_string())],
            reqwest::Client::new(),
        );
        let client =
            GeminiClient::from_settings(&settings, &cloud, Some(auth), reqwest::Client::new())
                .unwrap();
        let prompt = ScriptPrompt {
            system: "s".to_string(),
            user: "u".to_string(),
        };
        assert_eq!(client.generate_script(&prompt).await.unwrap(), "Vertex script");
        mock.assert_async().await;
    }
}
