//! External API integrations behind three capability traits.
//!
//! Every vendor implements one or more of:
//! - [`NewsSource`]: find recent news for a query
//! - [`ScriptWriter`]: turn a prompt into a podcast script
//! - [`SpeechSynthesizer`]: turn a script into MP3 bytes
//!
//! # Supported Vendors
//!
//! | Vendor | Module | Capabilities | Auth |
//! |--------|--------|--------------|------|
//! | NewsAPI | [`newsapi`] | news | API key header |
//! | OpenAI | [`openai`] | script, speech | Bearer API key |
//! | Gemini (AI Studio) | [`gemini`] | grounded news, script | API key header |
//! | Gemini (Vertex AI) | [`gemini`] | grounded news, script | Google Cloud token |
//! | Google Cloud TTS | [`google_tts`] | speech | Google Cloud token |
//!
//! Which implementation backs each capability is decided once, at bootstrap,
//! by [`Providers::bootstrap`]. The provider enums dispatch to the concrete
//! client so the pipeline stays generic over the traits.

pub mod gemini;
pub mod google_auth;
pub mod google_tts;
pub mod newsapi;
pub mod openai;

use crate::cache::CachedNews;
use crate::config::{NewsSourceKind, ScriptVendorKind, Settings, SpeechVendorKind};
use crate::error::{PodcastError, Result};
use crate::models::{NewsBatch, NewsQuery};
use crate::prompt::ScriptPrompt;
use crate::utils::truncate_for_log;
use std::time::Duration;
use tracing::info;

use gemini::{GeminiClient, GeminiSearch};
use google_auth::GoogleAuth;
use google_tts::GoogleSpeech;
use newsapi::NewsApiClient;
use openai::OpenAiClient;

/// Finds recent news for a query.
pub trait NewsSource {
    fn name(&self) -> &'static str;

    async fn search_news(&self, query: &NewsQuery) -> Result<NewsBatch>;
}

/// Sends a composed prompt to a language model and returns its text.
pub trait ScriptWriter {
    fn name(&self) -> &'static str;

    async fn generate_script(&self, prompt: &ScriptPrompt) -> Result<String>;
}

/// Turns text into audio bytes (MP3).
pub trait SpeechSynthesizer {
    fn name(&self) -> &'static str;

    /// The fixed set of voice identifiers this vendor accepts.
    fn voices(&self) -> &'static [&'static str];

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    fn check_voice(&self, voice: &str) -> Result<()> {
        if self.voices().contains(&voice) {
            Ok(())
        } else {
            Err(PodcastError::UnknownVoice {
                vendor: self.name(),
                voice: voice.to_string(),
                allowed: self.voices().iter().map(|v| v.to_string()).collect(),
            })
        }
    }
}

/// The configured news source.
pub enum NewsProvider {
    NewsApi(NewsApiClient),
    GeminiSearch(GeminiSearch),
}

impl NewsSource for NewsProvider {
    fn name(&self) -> &'static str {
        match self {
            NewsProvider::NewsApi(s) => s.name(),
            NewsProvider::GeminiSearch(s) => s.name(),
        }
    }

    async fn search_news(&self, query: &NewsQuery) -> Result<NewsBatch> {
        match self {
            NewsProvider::NewsApi(s) => s.search_news(query).await,
            NewsProvider::GeminiSearch(s) => s.search_news(query).await,
        }
    }
}

/// The configured script writer.
pub enum WriterProvider {
    OpenAi(OpenAiClient),
    Gemini(GeminiClient),
}

impl ScriptWriter for WriterProvider {
    fn name(&self) -> &'static str {
        match self {
            WriterProvider::OpenAi(w) => ScriptWriter::name(w),
            WriterProvider::Gemini(w) => w.name(),
        }
    }

    async fn generate_script(&self, prompt: &ScriptPrompt) -> Result<String> {
        match self {
            WriterProvider::OpenAi(w) => w.generate_script(prompt).await,
            WriterProvider::Gemini(w) => w.generate_script(prompt).await,
        }
    }
}

/// The configured speech synthesizer.
pub enum SpeechProvider {
    OpenAi(OpenAiClient),
    Google(GoogleSpeech),
}

impl SpeechSynthesizer for SpeechProvider {
    fn name(&self) -> &'static str {
        match self {
            SpeechProvider::OpenAi(s) => SpeechSynthesizer::name(s),
            SpeechProvider::Google(s) => s.name(),
        }
    }

    fn voices(&self) -> &'static [&'static str] {
        match self {
            SpeechProvider::OpenAi(s) => s.voices(),
            SpeechProvider::Google(s) => s.voices(),
        }
    }

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        match self {
            SpeechProvider::OpenAi(s) => s.synthesize_speech(text, voice).await,
            SpeechProvider::Google(s) => s.synthesize_speech(text, voice).await,
        }
    }
}

/// Client handles for one process, built from [`Settings`].
pub struct Providers {
    pub news: CachedNews<NewsProvider>,
    pub writer: WriterProvider,
    pub speech: SpeechProvider,
}

impl Providers {
    /// Validate the settings and construct every selected client.
    ///
    /// All missing secrets are reported together so the user can fix them in
    /// one go. No network request is made here.
    pub fn bootstrap(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let http = http_client(settings.request_timeout())?;

        let google_auth = if settings.gemini.use_vertex
            || settings.speech_vendor == SpeechVendorKind::Google
        {
            Some(GoogleAuth::from_settings(&settings.google_cloud, http.clone()))
        } else {
            None
        };

        let gemini = if settings.news_source == NewsSourceKind::GeminiSearch
            || settings.script_vendor == ScriptVendorKind::Gemini
        {
            Some(GeminiClient::from_settings(
                &settings.gemini,
                &settings.google_cloud,
                google_auth.clone(),
                http.clone(),
            )?)
        } else {
            None
        };

        let openai = if settings.script_vendor == ScriptVendorKind::Openai
            || settings.speech_vendor == SpeechVendorKind::Openai
        {
            Some(OpenAiClient::from_settings(&settings.openai, http.clone())?)
        } else {
            None
        };

        let news = match settings.news_source {
            NewsSourceKind::Newsapi => {
                NewsProvider::NewsApi(NewsApiClient::from_settings(&settings.newsapi, http.clone())?)
            }
            NewsSourceKind::GeminiSearch => {
                NewsProvider::GeminiSearch(GeminiSearch::new(require(gemini.clone(), "gemini")?))
            }
        };

        let writer = match settings.script_vendor {
            ScriptVendorKind::Openai => WriterProvider::OpenAi(require(openai.clone(), "openai")?),
            ScriptVendorKind::Gemini => WriterProvider::Gemini(require(gemini, "gemini")?),
        };

        let speech = match settings.speech_vendor {
            SpeechVendorKind::Openai => SpeechProvider::OpenAi(require(openai, "openai")?),
            SpeechVendorKind::Google => SpeechProvider::Google(GoogleSpeech::from_settings(
                &settings.google_cloud,
                require(google_auth, "google cloud credentials")?,
                http,
            )),
        };

        info!(
            news = news.name(),
            writer = writer.name(),
            speech = speech.name(),
            "Vendor clients initialized"
        );

        Ok(Self {
            news: CachedNews::new(news, settings.cache.ttl()),
            writer,
            speech,
        })
    }
}

/// Voices of a speech vendor, known without building its client.
pub fn voices_for(kind: SpeechVendorKind) -> &'static [&'static str] {
    match kind {
        SpeechVendorKind::Openai => openai::OPENAI_VOICES,
        SpeechVendorKind::Google => google_tts::GOOGLE_VOICES,
    }
}

fn require<T>(client: Option<T>, what: &str) -> Result<T> {
    client.ok_or_else(|| PodcastError::Config(format!("{} client was not configured", what)))
}

/// Build the shared HTTP client with a per-request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PodcastError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Turn a non-2xx response into a vendor error carrying the (shortened) body.
pub async fn check_status(
    vendor: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PodcastError::vendor(
        vendor,
        format!("HTTP {}: {}", status, truncate_for_log(&body, 500)),
    ))
}

/// Require a non-blank secret from the settings.
pub fn secret(value: &Option<String>, name: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(PodcastError::MissingCredentials(vec![name.to_string()])),
    }
}
