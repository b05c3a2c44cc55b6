//! Google Cloud Text-to-Speech (`text:synthesize`).
//!
//! The API returns the MP3 as base64 inside a JSON body; it is decoded here so
//! callers get raw bytes like from any other synthesizer.

use crate::config::GoogleCloudSettings;
use crate::error::{PodcastError, Result};
use crate::vendors::google_auth::GoogleAuth;
use crate::vendors::{SpeechSynthesizer, check_status};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument};

pub const GOOGLE_VOICES: &[&str] = &[
    "en-US-Standard-A",
    "en-US-Standard-C",
    "en-US-Standard-D",
    "en-US-Standard-F",
    "en-US-Wavenet-A",
    "en-US-Wavenet-D",
    "en-US-Wavenet-F",
    "en-US-Neural2-C",
    "en-US-Neural2-J",
];

#[derive(Debug, Clone)]
pub struct GoogleSpeech {
    http: reqwest::Client,
    auth: GoogleAuth,
    base_url: String,
    project_id: Option<String>,
    language_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

impl GoogleSpeech {
    pub fn from_settings(
        settings: &GoogleCloudSettings,
        auth: GoogleAuth,
        http: reqwest::Client,
    ) -> Self {
        Self {
            http,
            auth,
            base_url: settings.tts_base_url.trim_end_matches('/').to_string(),
            project_id: settings.effective_project_id(),
            language_code: settings.language_code.clone(),
        }
    }
}

impl SpeechSynthesizer for GoogleSpeech {
    fn name(&self) -> &'static str {
        "google"
    }

    fn voices(&self) -> &'static [&'static str] {
        GOOGLE_VOICES
    }

    #[instrument(level = "info", skip_all, fields(%voice, chars = text.chars().count()))]
    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        let t0 = Instant::now();
        let token = self.auth.access_token().await?;
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: voice,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let mut request = self
            .http
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .bearer_auth(token)
            .json(&body);
        if let Some(project) = &self.project_id {
            request = request.header("x-goog-user-project", project);
        }
        let response = request.send().await?;
        let parsed: SynthesizeResponse = check_status("google-tts", response).await?.json().await?;

        let encoded = parsed
            .audio_content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PodcastError::vendor("google-tts", "response has no audio content"))?;
        let audio = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| PodcastError::vendor("google-tts", format!("invalid base64 audio: {}", e)))?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = audio.len(),
            "Speech synthesized"
        );
        Ok(audio)
    }
}
