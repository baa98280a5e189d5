//! Concurrent per-segment synthesis with index-ordered fan-in.
//!
//! [`FetchOrchestrator::fetch_all`] spawns one task per [`TextSegment`] into a
//! `JoinSet`. Each task waits for a semaphore permit, calls the
//! [`SpeechSynthesizer`], drains the audio stream into its own buffer and
//! returns a [`SegmentResult`] as its join value. The orchestrator drops each
//! result into the slot matching its index, so completion order never
//! affects output order.
//!
//! ```text
//! segments ──spawn──▶ [task 0] [task 1] … [task n-1]   (≤ max_concurrent in flight)
//!                         │        │            │
//!                         ▼        ▼            ▼
//!               join_next() in completion order
//!                         │
//!                         ▼
//!               slots[index] = audio       ──▶ Vec<Vec<u8>> in index order
//! ```
//!
//! Failure is fail-fast for the result but not for the tasks: every spawned
//! task is joined before returning, requests already in flight run to
//! completion, and tasks still waiting for a permit skip their request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::pipeline::chunker::TextSegment;
use crate::pipeline::state::{PipelineEvent, ProgressSink};
use crate::tts::{SpeechSynthesizer, SynthesisError, Voice};

// ---------------------------------------------------------------------------
// SegmentResult
// ---------------------------------------------------------------------------

/// Terminal state of one fetch task.
#[derive(Debug)]
pub enum SegmentOutcome {
    /// The full audio body for the segment.
    Audio(Vec<u8>),
    /// The request or the body read failed.
    Failed(SynthesisError),
    /// Another segment failed before this one was dispatched.
    Skipped,
}

/// What a fetch task hands back to the orchestrator.
#[derive(Debug)]
pub struct SegmentResult {
    pub index: usize,
    pub outcome: SegmentOutcome,
}

// ---------------------------------------------------------------------------
// FetchOrchestrator
// ---------------------------------------------------------------------------

/// Fans segments out to a shared synthesizer and gathers the audio in order.
///
/// The permit pool belongs to the orchestrator, so runs that share one
/// orchestrator also share its request ceiling.
pub struct FetchOrchestrator {
    synth: Arc<dyn SpeechSynthesizer>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl FetchOrchestrator {
    /// Create an orchestrator allowing at most `max_concurrent` requests in
    /// flight. Values below 1 are raised to 1.
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            synth,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Synthesize every segment and return the audio buffers in index order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SynthesisError`] observed once all tasks have
    /// finished. When several segments fail concurrently, which one is
    /// reported is unspecified.
    pub async fn fetch_all(
        &self,
        segments: Vec<TextSegment>,
        voice: Voice,
        progress: &ProgressSink,
    ) -> Result<Vec<Vec<u8>>, SynthesisError> {
        let total = segments.len();
        check_indices(&segments)?;
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for segment in segments {
            tasks.spawn(fetch_segment(
                Arc::clone(&self.synth),
                Arc::clone(&self.permits),
                Arc::clone(&failed),
                segment,
                voice,
                total,
                progress.clone(),
            ));
        }
        log::debug!("fetch: dispatched {total} segments (max {} in flight)", self.max_concurrent);

        let mut slots: Vec<Option<Vec<u8>>> = vec![None; total];
        let mut first_error: Option<SynthesisError> = None;
        let mut completed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    failed.store(true, Ordering::SeqCst);
                    log::error!("fetch: task did not finish: {e}");
                    if first_error.is_none() {
                        first_error = Some(SynthesisError::Task(e.to_string()));
                    }
                    continue;
                }
            };

            match result.outcome {
                SegmentOutcome::Audio(audio) => {
                    completed += 1;
                    log::info!(
                        "fetch: segment {} done ({completed}/{total}, {} bytes)",
                        result.index + 1,
                        audio.len()
                    );
                    progress.emit(PipelineEvent::SegmentFetched {
                        index: result.index,
                        completed,
                        total,
                        bytes: audio.len(),
                    });
                    slots[result.index] = Some(audio);
                }
                SegmentOutcome::Failed(err) => {
                    log::error!("fetch: segment {} of {total} failed: {err}", result.index + 1);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                SegmentOutcome::Skipped => {
                    log::debug!("fetch: segment {} skipped", result.index + 1);
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| SynthesisError::Task(format!("segment {index} produced no audio")))
            })
            .collect()
    }
}

/// Segment indices must be exactly `0..len`, each once, so every result has
/// its own slot.
fn check_indices(segments: &[TextSegment]) -> Result<(), SynthesisError> {
    let mut seen = vec![false; segments.len()];
    for segment in segments {
        match seen.get_mut(segment.index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(SynthesisError::InvalidSegments(format!(
                    "index {} appears more than once",
                    segment.index
                )))
            }
            None => {
                return Err(SynthesisError::InvalidSegments(format!(
                    "index {} is outside 0..{}",
                    segment.index,
                    segments.len()
                )))
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Task body
// ---------------------------------------------------------------------------

async fn fetch_segment(
    synth: Arc<dyn SpeechSynthesizer>,
    permits: Arc<Semaphore>,
    failed: Arc<AtomicBool>,
    segment: TextSegment,
    voice: Voice,
    total: usize,
    progress: ProgressSink,
) -> SegmentResult {
    let index = segment.index;

    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return SegmentResult {
                index,
                outcome: SegmentOutcome::Failed(SynthesisError::Task("permit pool closed".into())),
            }
        }
    };

    if failed.load(Ordering::SeqCst) {
        return SegmentResult {
            index,
            outcome: SegmentOutcome::Skipped,
        };
    }

    log::info!(
        "fetch: requesting segment {} of {total} ({} chars)",
        index + 1,
        segment.char_len()
    );
    progress.emit(PipelineEvent::SegmentStarted { index, total });

    let outcome = match download(synth.as_ref(), &segment.content, voice).await {
        Ok(audio) => SegmentOutcome::Audio(audio),
        Err(err) => {
            failed.store(true, Ordering::SeqCst);
            SegmentOutcome::Failed(err)
        }
    };

    SegmentResult { index, outcome }
}

/// Issue one request and read the whole body.
async fn download(
    synth: &dyn SpeechSynthesizer,
    text: &str,
    voice: Voice,
) -> Result<Vec<u8>, SynthesisError> {
    let mut stream = synth.synthesize(text, voice).await?;
    let mut audio = Vec::new();
    while let Some(chunk) = stream.next().await {
        audio.extend_from_slice(&chunk?);
    }
    Ok(audio)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
