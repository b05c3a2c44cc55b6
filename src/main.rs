//! # News Podcast
//!
//! Turns a list of topics and companies into a short spoken news briefing.
//!
//! ## Features
//!
//! - Finds recent news with NewsAPI keyword search, or with Gemini and
//!   Google Search grounding
//! - Scrapes the main text of each article for extra context
//! - Writes a plain-text podcast script with OpenAI or Gemini
//! - Reads it aloud with OpenAI TTS or Google Cloud Text-to-Speech
//! - Outputs an MP3, a JSON run manifest and Markdown show notes
//!
//! ## Usage
//!
//! ```sh
//! news_podcast generate --topics "AI, space technology" --companies "Nvidia, SpaceX" -o ./episodes
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Bootstrap**: Validate settings and build the selected vendor clients
//! 2. **News**: Search for recent articles (or a grounded script)
//! 3. **Extraction**: Fetch article bodies, one at a time
//! 4. **Script**: Compose the prompt and ask the writer for a script
//! 5. **Speech**: Synthesize the script and write the MP3
//! 6. **Output**: Print the report, write the manifest and show notes

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod prompt;
mod scrapers;
mod utils;
mod vendors;

use cli::{Cli, Command, GenerateArgs, QueryArgs};
use config::Settings;
use models::{NewsQuery, RunRequest};
use outputs::OutputPaths;
use outputs::json::{RunManifest, write_manifest};
use outputs::markdown::{show_notes, write_show_notes};
use outputs::report::{render_items, render_report};
use scrapers::article::ArticleFetcher;
use utils::{ensure_writable_dir, time_of_day};
use vendors::{NewsSource, Providers, SpeechSynthesizer, voices_for};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_podcast starting up");

    // Parse CLI
    let cli = Cli::parse();
    debug!(command = ?cli.command, config = ?cli.global.config, "Parsed CLI arguments");

    let mut settings = Settings::load(cli.global.config.as_deref())?;
    cli.global.apply_to(&mut settings);

    match cli.command {
        Command::Voices => {
            for voice in voices_for(settings.speech_vendor) {
                println!("{}", voice);
            }
        }
        Command::Extract { url } => {
            let fetcher = ArticleFetcher::from_settings(&settings.extraction, settings.cache.ttl())?;
            let text = fetcher.fetch_text(&url).await;
            if text.is_empty() {
                warn!(%url, "No article text could be extracted");
            } else {
                println!("{}", text);
            }
        }
        Command::News(query) => news(&query, &settings).await?,
        Command::Generate(args) => generate(args, &settings).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Build the vendor clients, logging configuration problems before bailing.
fn bootstrap(settings: &Settings) -> Result<Providers, Box<dyn Error>> {
    Providers::bootstrap(settings).map_err(|e| {
        error!(kind = e.kind().as_str(), error = %e, "Configuration error; nothing was run");
        e.into()
    })
}

async fn news(query: &QueryArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let providers = bootstrap(settings)?;
    let query = NewsQuery {
        topics: query.topic_list(),
        companies: query.company_list(),
        max_items: query.articles as usize,
    };
    let batch = providers.news.search_news(&query).await?;

    print!("{}", render_items(&batch.items));
    if let Some(script) = &batch.grounded_script {
        println!("\n--- Grounded script ---\n{}", script);
    }
    Ok(())
}

async fn generate(args: GenerateArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let providers = bootstrap(settings)?;

    let voice = match args.voice {
        Some(voice) => voice,
        None => providers
            .speech
            .voices()
            .first()
            .map(|v| v.to_string())
            .ok_or("speech vendor offers no voices")?,
    };
    providers.speech.check_voice(&voice)?;

    // ---- Output locations ----
    let edition = time_of_day();
    let local_date = Local::now().date_naive().to_string();
    let paths = match args.audio_file {
        Some(path) => OutputPaths::beside(path),
        None => OutputPaths::for_edition(&args.output_dir, &local_date, &edition),
    };
    let dir = paths
        .audio
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    // Early check: ensure the output dir is writable before any vendor call
    if let Err(e) = ensure_writable_dir(dir).await {
        error!(
            path = %dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = ArticleFetcher::from_settings(&settings.extraction, settings.cache.ttl())?;
    let request = RunRequest {
        topics: args.query.topic_list(),
        companies: args.query.company_list(),
        num_articles: args.query.articles as usize,
        voice,
        audio_path: paths.audio.clone(),
        extract_articles: settings.extraction.enabled && !args.no_extract,
        allow_empty_news: args.allow_empty_news,
        edition,
    };
    info!(
        topics = ?request.topics,
        companies = ?request.companies,
        articles = request.num_articles,
        audio = %request.audio_path.display(),
        "Starting podcast run"
    );

    let outcome = pipeline::run(
        &request,
        &providers.news,
        &providers.writer,
        &providers.speech,
        &fetcher,
    )
    .await;

    println!("{}", render_report(&outcome));

    // ---- Manifest and show notes ----
    let manifest = RunManifest::new(&request, &outcome, providers.news.name());
    if let Err(e) = write_manifest(&manifest, &paths.manifest).await {
        error!(path = %paths.manifest.display(), error = %e, "Failed to write run manifest");
    }
    let notes = show_notes(&request, &outcome, &local_date);
    if let Err(e) = write_show_notes(&notes, &paths.notes).await {
        error!(path = %paths.notes.display(), error = %e, "Failed writing show notes");
    }

    match outcome.failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
