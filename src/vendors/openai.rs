//! OpenAI chat completions (script writing) and audio/speech (TTS).
//!
//! Both endpoints share one client. Requests are single blocking round trips
//! bounded by the HTTP client's timeout; nothing is retried.

use crate::config::OpenAiSettings;
use crate::error::{PodcastError, Result};
use crate::prompt::ScriptPrompt;
use crate::vendors::{ScriptWriter, SpeechSynthesizer, check_status, secret};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument};

/// Voices accepted by the audio/speech endpoint.
pub const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    tts_model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

impl OpenAiClient {
    pub fn from_settings(settings: &OpenAiSettings, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: secret(&settings.api_key, "OPENAI_API_KEY")?,
            chat_model: settings.chat_model.clone(),
            tts_model: settings.tts_model.clone(),
            temperature: settings.temperature,
        })
    }
}

impl ScriptWriter for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(level = "info", skip_all, fields(model = %self.chat_model))]
    async fn generate_script(&self, prompt: &ScriptPrompt) -> Result<String> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: ChatResponse = check_status("openai", response).await?.json().await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PodcastError::vendor("openai", "completion has no choices"))?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.len(),
            "Chat completion received"
        );
        Ok(text.trim().to_string())
    }
}

impl SpeechSynthesizer for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn voices(&self) -> &'static [&'static str] {
        OPENAI_VOICES
    }

    #[instrument(level = "info", skip_all, fields(model = %self.tts_model, %voice))]
    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let t0 = Instant::now();
        let body = SpeechRequest {
            model: &self.tts_model,
            voice,
            input: text,
            response_format: "mp3",
        };
        let response = self
            .http
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let bytes = check_status("openai", response).await?.bytes().await?;
        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = bytes.len(),
            "Speech synthesized"
        );
        Ok(bytes.to_vec())
    }
}
