//! One podcast run: news → article text → script → audio.
//!
//! [`run`] walks the stages in order and stops at the first failure. It never
//! returns an error itself; whatever happened is recorded in the
//! [`RunOutcome`], including the outputs of the stages that did finish.
//!
//! The vendors are passed in as trait implementations, so the same code runs
//! against real clients and against the test doubles below.

use crate::error::{PodcastError, Result};
use crate::models::{AudioArtifact, NewsBatch, RunOutcome, RunRequest, RunStage};
use crate::prompt::{ScriptPrompt, build_script_prompt, error_sentinel, is_error_sentinel};
use crate::scrapers::article::ArticleFetcher;
use crate::utils::truncate_for_log;
use crate::vendors::{NewsSource, ScriptWriter, SpeechSynthesizer};
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tracing::{error, info, instrument, warn};

fn enter(outcome: &mut RunOutcome, stage: RunStage) {
    info!(from = %outcome.stage, to = %stage, "Stage transition");
    outcome.stage = stage;
}

fn fail(mut outcome: RunOutcome, err: PodcastError) -> RunOutcome {
    error!(stage = %outcome.stage, kind = ?err.kind(), error = %err, "Run failed");
    outcome.failure = Some(err);
    outcome
}

/// Execute a full run for `request`.
///
/// Stages run in order: fetching news, extracting article text, composing
/// the script and synthesizing audio. A grounded news result already carries
/// its script, so extraction and the writer are skipped for it.
///
/// # Arguments
///
/// * `request` - Topics, companies, voice and output path of this run
/// * `news` - Where the news items come from
/// * `writer` - Turns the composed prompt into a script
/// * `speech` - Reads the script aloud
/// * `fetcher` - Pulls article text when `request.extract_articles` is set
///
/// # Returns
///
/// A [`RunOutcome`] in every case. On failure it records the stage reached
/// and the error, along with whatever items and script were produced first.
///
/// # Examples
///
/// ```rust,ignore
/// let outcome = pipeline::run(&request, &news, &writer, &speech, &fetcher).await;
/// if outcome.is_success() {
///     println!("{}", outcome.audio.unwrap().path.display());
/// }
/// ```
#[instrument(level = "info", skip_all, fields(edition = %request.edition, voice = %request.voice))]
pub async fn run<N, W, S>(
    request: &RunRequest,
    news: &N,
    writer: &W,
    speech: &S,
    fetcher: &ArticleFetcher,
) -> RunOutcome
where
    N: NewsSource,
    W: ScriptWriter,
    S: SpeechSynthesizer,
{
    let t0 = Instant::now();
    let mut outcome = RunOutcome::new();

    // ---- News ----
    enter(&mut outcome, RunStage::FetchingNews);
    let batch = match news.search_news(&request.news_query()).await {
        Ok(batch) => batch,
        Err(PodcastError::NoNews(reason)) if request.allow_empty_news => {
            warn!(%reason, "No news found; continuing with a generic script");
            NewsBatch::default()
        }
        Err(e) => return fail(outcome, e),
    };
    if batch.items.is_empty() && batch.grounded_script.is_none() && !request.allow_empty_news {
        let reason = format!("{} returned no articles for this query", news.name());
        return fail(outcome, PodcastError::NoNews(reason));
    }
    info!(count = batch.items.len(), source = news.name(), "News acquired");
    outcome.search_suggestions_html = batch.search_suggestions_html;

    // ---- Script ----
    let script = match batch.grounded_script {
        Some(script) => {
            outcome.items = batch.items;
            enter(&mut outcome, RunStage::ComposingScript);
            info!(chars = script.chars().count(), "Using the script written during grounded search");
            script
        }
        None => {
            let mut items = batch.items;
            if request.extract_articles && !items.is_empty() {
                enter(&mut outcome, RunStage::ExtractingContent);
                items = fetcher.enrich(items).await;
            }
            outcome.items = items;

            enter(&mut outcome, RunStage::ComposingScript);
            let prompt = build_script_prompt(
                &outcome.items,
                &request.topics,
                &request.companies,
                &request.edition,
            );
            compose_script(writer, &prompt).await
        }
    };

    if script.trim().is_empty() {
        return fail(
            outcome,
            PodcastError::NoScript(format!("{} returned an empty script", writer.name())),
        );
    }
    if is_error_sentinel(&script) {
        return fail(outcome, PodcastError::ScriptRejected(script));
    }
    outcome.script = Some(script.clone());

    // ---- Audio ----
    enter(&mut outcome, RunStage::SynthesizingAudio);
    let written = synthesize_to_file(speech, &script, &request.voice, &request.audio_path).await;
    match written {
        Ok(Some(audio)) => outcome.audio = Some(audio),
        Ok(None) => {
            return fail(outcome, PodcastError::NoScript("nothing to synthesize".to_string()));
        }
        Err(e) => return fail(outcome, e),
    }

    enter(&mut outcome, RunStage::Done);
    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "Run complete");
    outcome
}

/// Ask the writer for a script.
///
/// Failures come back as an `Error: ...` string rather than an error value;
/// callers check it with [`is_error_sentinel`].
///
/// # Returns
///
/// The script text, or the sentinel string when the writer failed.
pub async fn compose_script<W: ScriptWriter>(writer: &W, prompt: &ScriptPrompt) -> String {
    match writer.generate_script(prompt).await {
        Ok(script) => {
            info!(writer = writer.name(), chars = script.chars().count(), "Script composed");
            script
        }
        Err(e) => {
            error!(writer = writer.name(), error = %e, "Script generation failed");
            error_sentinel(&e)
        }
    }
}

/// Synthesize `text` and write the MP3 to `path`.
///
/// Empty or sentinel text is refused with a warning and `Ok(None)`; the
/// synthesizer is not called.
#[instrument(level = "info", skip_all, fields(path = %path.display(), %voice))]
pub async fn synthesize_to_file<S: SpeechSynthesizer>(
    speech: &S,
    text: &str,
    voice: &str,
    path: &Path,
) -> Result<Option<AudioArtifact>> {
    if text.trim().is_empty() {
        warn!("Refusing to synthesize an empty script");
        return Ok(None);
    }
    if is_error_sentinel(text) {
        warn!(script = %truncate_for_log(text, 120), "Refusing to synthesize an error message");
        return Ok(None);
    }

    let audio = speech.synthesize_speech(text, voice).await?;
    if audio.is_empty() {
        return Err(PodcastError::vendor(speech.name(), "returned no audio"));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, &audio).await?;
    info!(bytes = audio.len(), "Wrote audio file");

    Ok(Some(AudioArtifact {
        path: path.to_path_buf(),
        byte_len: audio.len(),
    }))
}
