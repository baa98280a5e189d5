//! Application entry point — speecher.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse the command line.
//! 3. Load [`AppConfig`] from disk (default on first run), apply environment
//!    and command-line overrides, validate. `--save-config` writes the
//!    file-plus-flags settings back and exits here.
//! 4. Create the [`tokio`] runtime.
//! 5. Obtain the text: extractor API (`--url`), a file (`--file`) or stdin.
//! 6. Run the [`SpeechPipeline`] while a reporter task prints progress.
//! 7. Hand the audio to the [`LocalUploader`] and print its location.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;

use speecher::config::{AppConfig, AppPaths};
use speecher::extract::{ArticleExtractor, ExtractorApiClient};
use speecher::pipeline::{PipelineEvent, ProgressSink, SpeechPipeline};
use speecher::tts::{OpenAiSynthesizer, Voice};
use speecher::upload::{AudioMetadata, AudioUploader, LocalUploader};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Read a webpage or a text document aloud into a single MP3.
#[derive(Debug, Parser)]
#[command(name = "speecher", version)]
struct Cli {
    /// Webpage to read; its text is fetched through the extractor API.
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,

    /// Text file to read. Reads stdin when neither --url nor --file is given.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Voice: alloy, echo, fable, onyx, nova or shimmer.
    #[arg(long)]
    voice: Option<Voice>,

    /// Title recorded with the output (defaults to the page title or file name).
    #[arg(long)]
    title: Option<String>,

    /// Settings file to use instead of the platform default.
    #[arg(long, env = "SPEECHER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory to write the MP3 into.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum simultaneous synthesis requests.
    #[arg(long)]
    max_concurrent: Option<usize>,

    /// Write the settings (with the overrides above) to the settings file and exit.
    #[arg(long, conflicts_with_all = ["url", "file"])]
    save_config: bool,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Command line
    let cli = Cli::parse();

    // 3. Configuration
    if cli.save_config {
        let path = save_config(&cli)?;
        println!("Saved settings to {}", path.display());
        return Ok(());
    }
    let config = load_config(&cli)?;

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(run(cli, config))
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = file_config(cli)?;
    config.apply_env();
    config.validate()?;

    if config.tts.api_key.as_deref().unwrap_or("").is_empty() {
        log::warn!("No speech API key configured; requests will be sent unauthenticated");
    }
    Ok(config)
}

/// Settings from disk plus command-line overrides. Environment keys are left
/// out so `--save-config` never writes secrets to disk.
fn file_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    config.apply_env();
    if let Some(dir) = &cli.output_dir {
        config.output.dir = Some(dir.clone());
    }
    if let Some(n) = cli.max_concurrent {
        config.tts.max_concurrent_requests = n;
    }
    Ok(config)
}

fn save_config(cli: &Cli) -> Result<PathBuf> {
    let config = file_config(cli)?;
    config.validate()?;
    match &cli.config {
        Some(path) => {
            config.save_to(path)?;
            Ok(path.clone())
        }
        None => {
            config.save()?;
            Ok(AppPaths::new().settings_file)
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    // 5. Input text
    let (title, text) = read_input(&cli, &config).await?;
    if text.trim().is_empty() {
        bail!("input text is empty");
    }
    let voice = cli.voice.unwrap_or(config.tts.default_voice);
    log::info!(
        "Reading '{title}' ({} chars) with voice {voice}",
        text.chars().count()
    );

    // 6. Pipeline + progress reporter
    let synth = Arc::new(OpenAiSynthesizer::from_config(&config.tts));
    let pipeline = SpeechPipeline::from_config(synth, &config);

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let reporter = tokio::spawn(report_progress(event_rx));

    let result = pipeline
        .run(&text, voice, &ProgressSink::new(event_tx))
        .await;
    // The sink (and with it the sender) is gone; the reporter drains and exits.
    if let Err(e) = reporter.await {
        log::warn!("Progress reporter stopped early: {e}");
    }
    let audio = result.context("could not produce audio")?;

    // 7. Store
    let uploader = LocalUploader::from_config(&config.output);
    log::info!("Storing audio in {}", uploader.dir().display());
    let meta = AudioMetadata::now(title.clone(), voice);
    let location = uploader
        .upload(&audio, &meta)
        .await
        .context("could not store audio")?;

    println!("Here's the audio for '{title}':\n{location}");
    Ok(())
}

async fn read_input(cli: &Cli, config: &AppConfig) -> Result<(String, String)> {
    if let Some(url) = &cli.url {
        let extractor = ExtractorApiClient::from_config(&config.extractor);
        let article = extractor
            .extract(url)
            .await
            .with_context(|| format!("could not extract text from {url}"))?;
        let title = cli
            .title
            .clone()
            .or_else(|| Some(article.title.clone()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| url.clone());
        return Ok((title, article.text));
    }

    if let Some(path) = &cli.file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let title = cli.title.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Untitled".into())
        });
        return Ok((title, text));
    }

    let text = tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map(|_| buf)
    })
    .await
    .context("stdin reader panicked")?
    .context("could not read stdin")?;
    let title = cli.title.clone().unwrap_or_else(|| "Untitled".into());
    Ok((title, text))
}

/// Print user-facing progress until the pipeline drops its sender.
async fn report_progress(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            PipelineEvent::Chunked { segments, chars } => {
                eprintln!("Split {chars} characters into {segments} chunk(s)");
            }
            PipelineEvent::SegmentStarted { index, total } => {
                eprintln!("Fetching chunk {} of {total}", index + 1);
            }
            PipelineEvent::SegmentFetched {
                completed, total, ..
            } => {
                eprintln!("Received {completed}/{total} chunks");
            }
            PipelineEvent::Assembled { bytes } => {
                eprintln!("Assembled {bytes} bytes of audio");
            }
            PipelineEvent::StateChanged(state) => {
                log::debug!("pipeline state: {}", state.label());
            }
        }
    }
}
