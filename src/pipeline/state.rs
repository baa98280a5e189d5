//! Pipeline state machine and progress events.
//!
//! [`PipelineState`] tracks where a single run is. [`PipelineEvent`]s are
//! pushed through a [`ProgressSink`] so a front-end can report progress
//! ("fetching chunk 3 of 7") while the final result stays all-or-nothing.

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of one pipeline run.
///
/// The state machine transitions are:
///
/// ```text
/// Idle ──▶ Chunking ──▶ Fetching ──▶ Assembling ──▶ Done
///             │            │             │
///             └────────────┴─────────────┴──▶ Failed
/// ```
///
/// No state is re-entered; a run is single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Created, nothing started yet.
    #[default]
    Idle,

    /// Splitting the input text into segments.
    Chunking,

    /// Segment requests are in flight.
    Fetching,

    /// Writing the joined audio to the output.
    Assembling,

    /// The output holds the complete recording.
    Done,

    /// A step failed; no output is guaranteed.
    Failed,
}

impl PipelineState {
    /// Returns `true` for `Done` and `Failed`.
    ///
    /// ```
    /// use speecher::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Fetching.is_terminal());
    /// assert!(PipelineState::Done.is_terminal());
    /// assert!(PipelineState::Failed.is_terminal());
    /// ```
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Whether the machine may move from `self` to `next`.
    pub fn can_advance_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Chunking)
                | (Chunking, Fetching)
                | (Fetching, Assembling)
                | (Assembling, Done)
                | (Chunking, Failed)
                | (Fetching, Failed)
                | (Assembling, Failed)
        )
    }

    /// A short human-readable label for progress output.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Chunking => "Chunking",
            PipelineState::Fetching => "Fetching",
            PipelineState::Assembling => "Assembling",
            PipelineState::Done => "Done",
            PipelineState::Failed => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineEvent
// ---------------------------------------------------------------------------

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// The run moved to a new state.
    StateChanged(PipelineState),
    /// Chunking finished.
    Chunked { segments: usize, chars: usize },
    /// A segment request was dispatched.
    SegmentStarted { index: usize, total: usize },
    /// A segment's audio was fully received.
    SegmentFetched {
        index: usize,
        completed: usize,
        total: usize,
        bytes: usize,
    },
    /// The joined audio was written.
    Assembled { bytes: u64 },
}

// ---------------------------------------------------------------------------
// ProgressSink
// ---------------------------------------------------------------------------

/// Optional, non-blocking destination for [`PipelineEvent`]s.
///
/// Cheap to clone. Sending never waits and a dropped receiver is ignored, so
/// a slow or absent listener cannot stall the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<PipelineEvent>>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineState::*;

    const ALL: [PipelineState; 6] = [Idle, Chunking, Fetching, Assembling, Done, Failed];

    #[test]
    fn default_pipeline_state_is_idle() {
        assert_eq!(PipelineState::default(), Idle);
    }

    #[test]
    fn happy_path_transitions_are_allowed() {
        assert!(Idle.can_advance_to(Chunking));
        assert!(Chunking.can_advance_to(Fetching));
        assert!(Fetching.can_advance_to(Assembling));
        assert!(Assembling.can_advance_to(Done));
    }

    #[test]
    fn failed_is_reachable_from_working_states_only() {
        for state in ALL {
            let expected = matches!(state, Chunking | Fetching | Assembling);
            assert_eq!(state.can_advance_to(Failed), expected, "{state:?} -> Failed");
        }
    }

    #[test]
    fn no_state_is_reentered() {
        for state in ALL {
            assert!(!state.can_advance_to(state), "{state:?} re-entered");
        }
    }

    #[test]
    fn terminal_states_go_nowhere() {
        for next in ALL {
            assert!(!Done.can_advance_to(next));
            assert!(!Failed.can_advance_to(next));
        }
    }

    #[test]
    fn labels() {
        assert_eq!(Idle.label(), "Idle");
        assert_eq!(Fetching.label(), "Fetching");
        assert_eq!(Done.label(), "Done");
        assert_eq!(Failed.label(), "Failed");
    }

    #[test]
    fn sink_delivers_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);
        sink.emit(PipelineEvent::StateChanged(Chunking));
        assert_eq!(rx.try_recv().unwrap(), PipelineEvent::StateChanged(Chunking));
    }

    #[test]
    fn sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ProgressSink::new(tx).emit(PipelineEvent::Assembled { bytes: 1 });
        ProgressSink::none().emit(PipelineEvent::Assembled { bytes: 1 });
    }
}
