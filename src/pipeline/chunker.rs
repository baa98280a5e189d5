//! Sentence-aligned text chunking.
//!
//! The synthesis service rejects inputs longer than [`MAX_INPUT_CHARS`], so a
//! document is cut into ordered [`TextSegment`]s of at most `limit`
//! characters each. Cuts land just after the last `.` inside the window when
//! there is one, and fall back to a hard cut mid-sentence when there is not.
//!
//! Lengths are counted in `char`s, so a cut never splits a UTF-8 sequence.

use thiserror::Error;

/// Hard input limit of the speech endpoint, in characters.
pub const MAX_INPUT_CHARS: usize = 4096;

/// Default segment limit: one below [`MAX_INPUT_CHARS`].
pub const DEFAULT_CHUNK_LIMIT: usize = MAX_INPUT_CHARS - 1;

/// Errors raised before any segment is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkingError {
    #[error("segment limit must be greater than zero, got {0}")]
    InvalidLimit(usize),
}

/// One bounded slice of the input, tagged with its emission position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    /// 0-based position in emission order.
    pub index: usize,
    pub content: String,
}

impl TextSegment {
    /// Length of the segment in characters.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Split `text` into ordered segments of at most `limit` characters.
///
/// Concatenating the returned contents in order reproduces `text` exactly.
/// Empty input yields no segments.
///
/// ```
/// use speecher::pipeline::chunk_text;
///
/// let segments = chunk_text("One. Two. Three.", 10).unwrap();
/// let contents: Vec<_> = segments.iter().map(|s| s.content.as_str()).collect();
/// assert_eq!(contents, ["One. Two.", " Three."]);
/// ```
pub fn chunk_text(text: &str, limit: usize) -> Result<Vec<TextSegment>, ChunkingError> {
    if limit == 0 {
        return Err(ChunkingError::InvalidLimit(limit));
    }

    let mut segments = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let (head, tail) = rest.split_at(next_cut(rest, limit));
        segments.push(TextSegment {
            index: segments.len(),
            content: head.to_string(),
        });
        rest = tail;
    }

    Ok(segments)
}

/// Byte length of the next segment taken from the front of `rest`.
///
/// The window covers characters `0..limit`; the period scan looks at every
/// one of them, including the last, and never past it. Always returns at
/// least one character's worth of bytes for a non-empty `rest`.
fn next_cut(rest: &str, limit: usize) -> usize {
    let window_end = match rest.char_indices().nth(limit) {
        Some((byte, _)) => byte,
        None => return rest.len(),
    };

    match rest[..window_end].rfind('.') {
        Some(period) => period + '.'.len_utf8(),
        None => window_end,
    }
}
