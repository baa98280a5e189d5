//! Pipeline runner — drives text → chunks → concurrent synthesis → joined audio.
//!
//! # Pipeline flow
//!
//! ```text
//! run_into(text, voice, writer)
//!   └─▶ chunk_text(text, limit)                  [Chunking]
//!         └─▶ FetchOrchestrator::fetch_all       [Fetching]
//!               └─▶ assemble(buffers, writer)    [Assembling]
//!                     └─▶ Ok(bytes written)      [Done]
//!   any error ──────────────────────────────────▶ [Failed]
//! ```
//!
//! The writer is only touched once every segment has been fetched, so a
//! synthesis failure never leaves partial audio behind.

use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWrite;

use crate::config::AppConfig;
use crate::pipeline::assemble::{assemble, AssemblyError};
use crate::pipeline::chunker::{chunk_text, ChunkingError};
use crate::pipeline::fetch::FetchOrchestrator;
use crate::pipeline::state::{PipelineEvent, PipelineState, ProgressSink};
use crate::tts::{SpeechSynthesizer, SynthesisError, Voice};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// The single error a pipeline run reports to its caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not split text: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("could not assemble audio: {0}")]
    Assembly(#[from] AssemblyError),
}

// ---------------------------------------------------------------------------
// SpeechPipeline
// ---------------------------------------------------------------------------

/// Turns a document into one continuous recording.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use speecher::config::AppConfig;
/// use speecher::pipeline::{ProgressSink, SpeechPipeline};
/// use speecher::tts::{OpenAiSynthesizer, Voice};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let synth = Arc::new(OpenAiSynthesizer::from_config(&config.tts));
/// let pipeline = SpeechPipeline::from_config(synth, &config);
///
/// let mp3 = pipeline
///     .run("A long article. With many sentences.", Voice::Alloy, &ProgressSink::none())
///     .await
///     .unwrap();
/// # }
/// ```
pub struct SpeechPipeline {
    fetcher: FetchOrchestrator,
    limit: usize,
}

impl SpeechPipeline {
    /// # Arguments
    ///
    /// * `synth`          — synthesis backend shared by every segment task.
    /// * `limit`          — maximum characters per segment.
    /// * `max_concurrent` — ceiling on simultaneous requests.
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, limit: usize, max_concurrent: usize) -> Self {
        Self {
            fetcher: FetchOrchestrator::new(synth, max_concurrent),
            limit,
        }
    }

    pub fn from_config(synth: Arc<dyn SpeechSynthesizer>, config: &AppConfig) -> Self {
        Self::new(
            synth,
            config.chunking.limit,
            config.tts.max_concurrent_requests,
        )
    }

    /// Run the pipeline and return the joined audio.
    pub async fn run(
        &self,
        text: &str,
        voice: Voice,
        progress: &ProgressSink,
    ) -> Result<Vec<u8>, PipelineError> {
        let mut out = Vec::new();
        self.run_into(text, voice, &mut out, progress).await?;
        Ok(out)
    }

    /// Run the pipeline, streaming the joined audio into `writer`.
    ///
    /// Returns the number of bytes written.
    pub async fn run_into<W>(
        &self,
        text: &str,
        voice: Voice,
        writer: &mut W,
        progress: &ProgressSink,
    ) -> Result<u64, PipelineError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut run = PipelineRun::new(progress.clone());

        match self.drive(&mut run, text, voice, writer).await {
            Ok(bytes) => {
                run.advance(PipelineState::Done);
                log::info!("pipeline: done, {bytes} bytes of audio");
                Ok(bytes)
            }
            Err(e) => {
                log::error!("pipeline: failed while {}: {e}", run.state().label());
                run.advance(PipelineState::Failed);
                Err(e)
            }
        }
    }

    async fn drive<W>(
        &self,
        run: &mut PipelineRun,
        text: &str,
        voice: Voice,
        writer: &mut W,
    ) -> Result<u64, PipelineError>
    where
        W: AsyncWrite + Unpin,
    {
        // ── 1. Chunk ─────────────────────────────────────────────────────
        run.advance(PipelineState::Chunking);
        let segments = chunk_text(text, self.limit)?;
        let chars: usize = segments.iter().map(|s| s.char_len()).sum();
        log::info!(
            "pipeline: {chars} chars split into {} segments (limit {})",
            segments.len(),
            self.limit
        );
        run.progress.emit(PipelineEvent::Chunked {
            segments: segments.len(),
            chars,
        });

        // ── 2. Fetch ─────────────────────────────────────────────────────
        run.advance(PipelineState::Fetching);
        let audio = self.fetcher.fetch_all(segments, voice, &run.progress).await?;

        // ── 3. Assemble ──────────────────────────────────────────────────
        run.advance(PipelineState::Assembling);
        let bytes = assemble(&audio, writer).await?;
        run.progress.emit(PipelineEvent::Assembled { bytes });

        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// PipelineRun
// ---------------------------------------------------------------------------

/// State of one in-progress run.
struct PipelineRun {
    state: PipelineState,
    progress: ProgressSink,
}

impl PipelineRun {
    fn new(progress: ProgressSink) -> Self {
        Self {
            state: PipelineState::Idle,
            progress,
        }
    }

    fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        log::debug!("pipeline: {} → {}", self.state.label(), next.label());
        self.state = next;
        if next.is_terminal() {
            log::info!("pipeline: finished ({})", next.label());
        }
        self.progress.emit(PipelineEvent::StateChanged(next));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
