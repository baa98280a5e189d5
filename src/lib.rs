//! speecher — read long text aloud through a length-limited speech API.
//!
//! * [`pipeline`] — chunk text, synthesize segments concurrently, join the audio.
//! * [`tts`] — speech-synthesis client and voice set.
//! * [`extract`] — webpage → readable text.
//! * [`upload`] — store the finished recording and report where it went.
//! * [`config`] — TOML settings and platform paths.

pub mod config;
pub mod extract;
pub mod pipeline;
pub mod tts;
pub mod upload;
