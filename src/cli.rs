//! Command-line interface definitions for News Podcast.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets can be provided via command-line flags or environment variables;
//! anything given here overrides the YAML settings file.

use crate::config::{NewsSourceKind, ScriptVendorKind, Settings, SpeechVendorKind};
use crate::utils::parse_list;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Podcast application.
///
/// # Examples
///
/// ```sh
/// # Default vendors (NewsAPI + OpenAI), keys from the environment
/// news_podcast generate --topics "AI, space technology" --companies "Nvidia, SpaceX"
///
/// # Grounded Gemini search, Google Cloud voice
/// news_podcast --news-source gemini-search --script-vendor gemini --speech-vendor google \
///     generate --voice en-US-Neural2-J -o ./episodes
///
/// # Just look at what the news source returns
/// news_podcast news --topics "quantum computing" --companies OpenAI
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "NEWS_PODCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where news comes from
    #[arg(long, global = true, value_enum)]
    pub news_source: Option<NewsSourceKind>,

    /// Which model writes the script
    #[arg(long, global = true, value_enum)]
    pub script_vendor: Option<ScriptVendorKind>,

    /// Which service reads the script aloud
    #[arg(long, global = true, value_enum)]
    pub speech_vendor: Option<SpeechVendorKind>,

    /// Reach Gemini through Vertex AI instead of an AI Studio key
    #[arg(long, global = true)]
    pub vertex: bool,

    /// NewsAPI key
    #[arg(long, global = true, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<String>,

    /// OpenAI API key
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Gemini (AI Studio) API key
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Google Cloud project for Vertex AI and Text-to-Speech
    #[arg(long, global = true, env = "GOOGLE_CLOUD_PROJECT")]
    pub google_cloud_project: Option<String>,

    /// Google Cloud region for Vertex AI
    #[arg(long, global = true, env = "GOOGLE_CLOUD_REGION")]
    pub google_cloud_region: Option<String>,

    /// Service-account key as an inline JSON string
    #[arg(long, global = true, env = "GOOGLE_SERVICE_ACCOUNT_JSON", hide_env_values = true)]
    pub google_service_account_json: Option<String>,

    /// Path to a service-account key file
    #[arg(long, global = true, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub google_application_credentials: Option<PathBuf>,

    /// A ready OAuth access token for Google Cloud
    #[arg(long, global = true, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub google_access_token: Option<String>,
}

impl GlobalArgs {
    /// Overlay flags and environment values on settings loaded from file.
    pub fn apply_to(&self, settings: &mut Settings) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        if let Some(kind) = self.news_source {
            settings.news_source = kind;
        }
        if let Some(kind) = self.script_vendor {
            settings.script_vendor = kind;
        }
        if let Some(kind) = self.speech_vendor {
            settings.speech_vendor = kind;
        }
        if self.vertex {
            settings.gemini.use_vertex = true;
        }

        set(&mut settings.newsapi.api_key, &self.news_api_key);
        set(&mut settings.openai.api_key, &self.openai_api_key);
        set(&mut settings.gemini.api_key, &self.gemini_api_key);
        set(&mut settings.google_cloud.project_id, &self.google_cloud_project);
        set(&mut settings.google_cloud.region, &self.google_cloud_region);
        set(
            &mut settings.google_cloud.service_account_json,
            &self.google_service_account_json,
        );
        set(
            &mut settings.google_cloud.credentials_path,
            &self.google_application_credentials,
        );
        set(&mut settings.google_cloud.access_token, &self.google_access_token);
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch news, write a script and synthesize the podcast
    Generate(GenerateArgs),
    /// Only run the news search and print the items found
    News(QueryArgs),
    /// Extract the main text of an article page
    Extract {
        /// Article URL
        url: String,
    },
    /// List the voices of the selected speech vendor
    Voices,
}

/// What to search for.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Comma-separated topics
    #[arg(short, long, default_value = "latest AI breakthroughs, space technology advancements")]
    pub topics: String,

    /// Comma-separated companies
    #[arg(short = 'k', long, default_value = "Nvidia, OpenAI, SpaceX")]
    pub companies: String,

    /// Target number of news items in the script
    #[arg(short = 'n', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub articles: u8,
}

impl QueryArgs {
    pub fn topic_list(&self) -> Vec<String> {
        parse_list(&self.topics)
    }

    pub fn company_list(&self) -> Vec<String> {
        parse_list(&self.companies)
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Voice id; defaults to the vendor's first voice
    #[arg(short, long)]
    pub voice: Option<String>,

    /// Directory for the audio, manifest and show notes
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Explicit audio file path (overrides the dated file name)
    #[arg(long)]
    pub audio_file: Option<PathBuf>,

    /// Skip fetching full article text
    #[arg(long)]
    pub no_extract: bool,

    /// Write a generic episode when no news is found instead of stopping
    #[arg(long)]
    pub allow_empty_news: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::parse_from(["news_podcast", "generate"]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(
            args.query.topic_list(),
            vec!["latest AI breakthroughs", "space technology advancements"]
        );
        assert_eq!(args.query.company_list(), vec!["Nvidia", "OpenAI", "SpaceX"]);
        assert_eq!(args.query.articles, 3);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(args.voice.is_none());
        assert!(!args.no_extract);
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from([
            "news_podcast",
            "--speech-vendor",
            "google",
            "generate",
            "-t",
            "quantum computing",
            "-k",
            "OpenAI",
            "-n",
            "2",
            "-v",
            "en-US-Neural2-J",
            "-o",
            "/tmp/episodes",
            "--no-extract",
            "--allow-empty-news",
        ]);
        assert_eq!(cli.global.speech_vendor, Some(SpeechVendorKind::Google));
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.query.topic_list(), vec!["quantum computing"]);
        assert_eq!(args.query.articles, 2);
        assert_eq!(args.voice.as_deref(), Some("en-US-Neural2-J"));
        assert_eq!(args.output_dir, PathBuf::from("/tmp/episodes"));
        assert!(args.no_extract && args.allow_empty_news);
    }

    #[test]
    fn test_article_count_is_bounded() {
        assert!(Cli::try_parse_from(["news_podcast", "generate", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["news_podcast", "generate", "-n", "11"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "news_podcast",
            "news",
            "--news-source",
            "gemini-search",
            "--vertex",
        ]);
        assert_eq!(cli.global.news_source, Some(NewsSourceKind::GeminiSearch));
        assert!(cli.global.vertex);
        assert!(matches!(cli.command, Command::News(_)));
    }

    #[test]
    fn test_extract_and_voices() {
        let cli = Cli::parse_from(["news_podcast", "extract", "https://example.com/a"]);
        assert!(matches!(cli.command, Command::Extract { ref url } if url == "https://example.com/a"));
        let cli = Cli::parse_from(["news_podcast", "voices"]);
        assert!(matches!(cli.command, Command::Voices));
    }

    #[test]
    fn test_apply_to_overrides_file_settings() {
        let mut settings = Settings::from_yaml("openai:\n  api_key: from-file\n").unwrap();
        let args = GlobalArgs {
            script_vendor: Some(ScriptVendorKind::Gemini),
            vertex: true,
            gemini_api_key: Some("gem".to_string()),
            google_cloud_region: Some("europe-west4".to_string()),
            ..Default::default()
        };
        args.apply_to(&mut settings);

        assert_eq!(settings.script_vendor, ScriptVendorKind::Gemini);
        assert!(settings.gemini.use_vertex);
        assert_eq!(settings.openai.api_key.as_deref(), Some("from-file"));
        assert_eq!(settings.gemini.api_key.as_deref(), Some("gem"));
        assert_eq!(settings.google_cloud.region.as_deref(), Some("europe-west4"));
    }
}
