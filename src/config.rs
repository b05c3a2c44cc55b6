//! Runtime configuration: vendor selection, endpoints, models and secrets.
//!
//! Settings come from an optional YAML file; every field has a default, so an
//! empty or absent file is valid. Command-line flags and environment variables
//! are applied on top by [`crate::cli::GlobalArgs::apply_to`].
//!
//! ```yaml
//! news_source: gemini-search
//! script_vendor: gemini
//! speech_vendor: google
//! gemini:
//!   use_vertex: true
//!   model: gemini-2.0-flash
//! google_cloud:
//!   project_id: my-project
//!   region: us-central1
//! cache:
//!   ttl_secs: 600
//! ```

use crate::error::{PodcastError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NewsSourceKind {
    /// Keyword search over NewsAPI's "everything" endpoint
    #[default]
    Newsapi,
    /// Gemini with the Google Search grounding tool
    GeminiSearch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptVendorKind {
    #[default]
    Openai,
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechVendorKind {
    #[default]
    Openai,
    /// Google Cloud Text-to-Speech
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub tts_model: String,
    pub temperature: f32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            tts_model: "tts-1".to_string(),
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsApiSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub sort_by: String,
    pub language: String,
    /// How far back to search.
    pub window_hours: i64,
}

impl Default for NewsApiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://newsapi.org".to_string(),
            sort_by: "publishedAt".to_string(),
            language: "en".to_string(),
            window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    /// AI Studio endpoint; ignored when `use_vertex` is set.
    pub base_url: String,
    /// Overrides the regional Vertex AI endpoint.
    pub vertex_base_url: Option<String>,
    /// Reach Gemini through Vertex AI with Google Cloud credentials.
    pub use_vertex: bool,
    pub temperature: f32,
    pub search_temperature: f32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            vertex_base_url: None,
            use_vertex: false,
            temperature: 0.7,
            search_temperature: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleCloudSettings {
    pub project_id: Option<String>,
    pub region: Option<String>,
    /// Inline service-account key (the JSON document itself).
    pub service_account_json: Option<String>,
    /// Path to a service-account key file.
    pub credentials_path: Option<PathBuf>,
    /// A ready OAuth access token.
    pub access_token: Option<String>,
    /// Fall back to the GCE metadata server for ambient credentials.
    pub use_metadata_server: bool,
    pub metadata_url: String,
    pub tts_base_url: String,
    pub language_code: String,
}

/// The one field of a service-account key that settings care about.
#[derive(Deserialize)]
struct KeyProject {
    #[serde(default)]
    project_id: Option<String>,
}

impl GoogleCloudSettings {
    /// The explicit `project_id`, or else the one recorded in the
    /// service-account key (inline JSON first, then the key file).
    pub fn effective_project_id(&self) -> Option<String> {
        if let Some(id) = non_blank(&self.project_id) {
            return Some(id);
        }
        let from_inline = self
            .service_account_json
            .as_deref()
            .and_then(|json| serde_json::from_str::<KeyProject>(json).ok());
        let from_file = || {
            self.credentials_path
                .as_deref()
                .and_then(|path| std::fs::read_to_string(path).ok())
                .and_then(|data| serde_json::from_str::<KeyProject>(&data).ok())
        };
        from_inline
            .and_then(|k| non_blank(&k.project_id))
            .or_else(|| from_file().and_then(|k| non_blank(&k.project_id)))
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Default for GoogleCloudSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            region: None,
            service_account_json: None,
            credentials_path: None,
            access_token: None,
            use_metadata_server: true,
            metadata_url: "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token".to_string(),
            tts_base_url: "https://texttospeech.googleapis.com".to_string(),
            language_code: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub enabled: bool,
    pub max_chars: usize,
    pub min_words: usize,
    /// Largest page body read before parsing.
    pub max_page_bytes: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: 4000,
            min_words: 50,
            max_page_bytes: 2 * 1024 * 1024,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 1800 }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub news_source: NewsSourceKind,
    pub script_vendor: ScriptVendorKind,
    pub speech_vendor: SpeechVendorKind,
    pub request_timeout_secs: u64,
    pub openai: OpenAiSettings,
    pub newsapi: NewsApiSettings,
    pub gemini: GeminiSettings,
    pub google_cloud: GoogleCloudSettings,
    pub extraction: ExtractionSettings,
    pub cache: CacheSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            news_source: NewsSourceKind::default(),
            script_vendor: ScriptVendorKind::default(),
            speech_vendor: SpeechVendorKind::default(),
            request_timeout_secs: 15,
            openai: OpenAiSettings::default(),
            newsapi: NewsApiSettings::default(),
            gemini: GeminiSettings::default(),
            google_cloud: GoogleCloudSettings::default(),
            extraction: ExtractionSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path).map_err(|e| {
            PodcastError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_yaml(&data)
            .map_err(|e| PodcastError::Config(format!("{}: {}", path.display(), e)))?;
        info!(config_path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    pub fn from_yaml(data: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn needs_gemini(&self) -> bool {
        self.news_source == NewsSourceKind::GeminiSearch
            || self.script_vendor == ScriptVendorKind::Gemini
    }

    fn needs_openai(&self) -> bool {
        self.script_vendor == ScriptVendorKind::Openai
            || self.speech_vendor == SpeechVendorKind::Openai
    }

    /// Names of every secret the selected vendors need but do not have.
    pub fn missing_credentials(&self) -> Vec<String> {
        fn absent(v: &Option<String>) -> bool {
            non_blank(v).is_none()
        }
        let no_project = self.google_cloud.effective_project_id().is_none();

        let mut missing = Vec::new();
        let mut need = |name: &str| {
            if !missing.iter().any(|m: &String| m == name) {
                missing.push(name.to_string());
            }
        };

        if self.news_source == NewsSourceKind::Newsapi && absent(&self.newsapi.api_key) {
            need("NEWS_API_KEY");
        }
        if self.needs_openai() && absent(&self.openai.api_key) {
            need("OPENAI_API_KEY");
        }
        if self.needs_gemini() {
            if self.gemini.use_vertex {
                if no_project {
                    need("GOOGLE_CLOUD_PROJECT");
                }
                if absent(&self.google_cloud.region) {
                    need("GOOGLE_CLOUD_REGION");
                }
            } else if absent(&self.gemini.api_key) {
                need("GEMINI_API_KEY");
            }
        }
        if self.speech_vendor == SpeechVendorKind::Google && no_project {
            need("GOOGLE_CLOUD_PROJECT");
        }
        missing
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_credentials();
        if !missing.is_empty() {
            return Err(PodcastError::MissingCredentials(missing));
        }
        if self.request_timeout_secs == 0 || self.extraction.timeout_secs == 0 {
            return Err(PodcastError::Config("timeouts must be at least one second".to_string()));
        }
        if self.extraction.max_chars == 0 || self.extraction.max_page_bytes == 0 {
            return Err(PodcastError::Config(
                "extraction.max_chars and extraction.max_page_bytes must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.news_source, NewsSourceKind::Newsapi);
        assert_eq!(s.script_vendor, ScriptVendorKind::Openai);
        assert_eq!(s.speech_vendor, SpeechVendorKind::Openai);
        assert_eq!(s.request_timeout(), Duration::from_secs(15));
        assert_eq!(s.cache.ttl(), Duration::from_secs(1800));
        assert_eq!(s.extraction.min_words, 50);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
news_source: gemini-search
speech_vendor: google
gemini:
  use_vertex: true
google_cloud:
  project_id: demo
  region: europe-west1
cache:
  ttl_secs: 60
"#;
        let s = Settings::from_yaml(yaml).unwrap();
        assert_eq!(s.news_source, NewsSourceKind::GeminiSearch);
        assert_eq!(s.speech_vendor, SpeechVendorKind::Google);
        assert!(s.gemini.use_vertex);
        assert_eq!(s.gemini.model, "gemini-2.0-flash");
        assert_eq!(s.google_cloud.region.as_deref(), Some("europe-west1"));
        assert_eq!(s.google_cloud.language_code, "en-US");
        assert_eq!(s.cache.ttl_secs, 60);
        assert_eq!(s.openai.tts_model, "tts-1");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let s = Settings::from_yaml("  \n").unwrap();
        assert_eq!(s.request_timeout_secs, 15);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "news_source: carrier-pigeon\n").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, PodcastError::Config(_)));
    }

    #[test]
    fn test_missing_credentials_for_defaults() {
        let s = Settings::default();
        assert_eq!(s.missing_credentials(), vec!["NEWS_API_KEY", "OPENAI_API_KEY"]);
        assert!(matches!(s.validate(), Err(PodcastError::MissingCredentials(_))));
    }

    #[test]
    fn test_missing_credentials_for_cloud_variant() {
        let mut s = Settings::default();
        s.news_source = NewsSourceKind::GeminiSearch;
        s.script_vendor = ScriptVendorKind::Gemini;
        s.speech_vendor = SpeechVendorKind::Google;
        s.gemini.use_vertex = true;
        assert_eq!(
            s.missing_credentials(),
            vec!["GOOGLE_CLOUD_PROJECT", "GOOGLE_CLOUD_REGION"]
        );

        s.google_cloud.project_id = Some("demo".to_string());
        s.google_cloud.region = Some("us-central1".to_string());
        assert!(s.missing_credentials().is_empty());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_project_id_read_from_service_account_key() {
        let mut s = Settings::default();
        s.news_source = NewsSourceKind::GeminiSearch;
        s.script_vendor = ScriptVendorKind::Gemini;
        s.speech_vendor = SpeechVendorKind::Google;
        s.gemini.use_vertex = true;
        s.google_cloud.region = Some("us-central1".to_string());
        s.google_cloud.service_account_json = Some(r#"{"project_id":"from-key"}"#.to_string());
        assert_eq!(s.google_cloud.effective_project_id().as_deref(), Some("from-key"));
        assert!(s.missing_credentials().is_empty());

        s.google_cloud.project_id = Some("explicit".to_string());
        assert_eq!(s.google_cloud.effective_project_id().as_deref(), Some("explicit"));
    }

    #[test]
    fn test_project_id_read_from_key_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key.json");
        std::fs::write(&path, r#"{"type":"service_account","project_id":"file-project"}"#).unwrap();
        let cloud = GoogleCloudSettings {
            service_account_json: Some("not json".to_string()),
            credentials_path: Some(path),
            ..Default::default()
        };
        assert_eq!(cloud.effective_project_id().as_deref(), Some("file-project"));

        let cloud = GoogleCloudSettings {
            credentials_path: Some(tmp.path().join("missing.json")),
            ..Default::default()
        };
        assert!(cloud.effective_project_id().is_none());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let mut s = Settings::default();
        s.news_source = NewsSourceKind::GeminiSearch;
        s.gemini.api_key = Some("   ".to_string());
        s.openai.api_key = Some("sk-test".to_string());
        assert_eq!(s.missing_credentials(), vec!["GEMINI_API_KEY"]);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut s = Settings::default();
        s.newsapi.api_key = Some("n".to_string());
        s.openai.api_key = Some("o".to_string());
        s.request_timeout_secs = 0;
        assert!(matches!(s.validate(), Err(PodcastError::Config(_))));
    }
}
