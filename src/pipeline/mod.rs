//! The chunk-fetch-join pipeline.
//!
//! This module turns arbitrarily long text into one continuous recording
//! using a synthesis service that only accepts bounded inputs.
//!
//! # Architecture
//!
//! ```text
//! text
//!   │
//!   ▼
//! chunk_text(text, limit)            → Vec<TextSegment>   (sentence-aligned)
//!   │
//!   ▼
//! FetchOrchestrator::fetch_all       → Vec<Vec<u8>>       (≤ N requests in flight,
//!   │                                                      placed by index)
//!   ▼
//! assemble(buffers, writer)          → one audio stream   (raw concatenation)
//! ```
//!
//! [`SpeechPipeline`] wires the three together and reports progress as
//! [`PipelineEvent`]s through a [`ProgressSink`].

pub mod assemble;
pub mod chunker;
pub mod fetch;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use assemble::{assemble, AssemblyError};
pub use chunker::{chunk_text, ChunkingError, TextSegment, DEFAULT_CHUNK_LIMIT, MAX_INPUT_CHARS};
pub use fetch::{FetchOrchestrator, SegmentOutcome, SegmentResult};
pub use runner::{PipelineError, SpeechPipeline};
pub use state::{PipelineEvent, PipelineState, ProgressSink};
