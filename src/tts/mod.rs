//! Text-to-speech client module.
//!
//! This module provides:
//! * [`SpeechSynthesizer`] — async trait implemented by all synthesis backends.
//! * [`OpenAiSynthesizer`] — OpenAI-compatible `/v1/audio/speech` client.
//! * [`Voice`] — the enumerated voice set (default `alloy`).
//! * [`SynthesisError`] — error variants for a single synthesis call.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use speecher::config::AppConfig;
//! use speecher::tts::{OpenAiSynthesizer, SpeechSynthesizer, Voice};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let synth = OpenAiSynthesizer::from_config(&config.tts);
//!
//!     let mut audio = synth.synthesize("Hello world.", Voice::Nova).await.unwrap();
//!     while let Some(chunk) = audio.next().await {
//!         println!("{} bytes", chunk.unwrap().len());
//!     }
//! }
//! ```

pub mod client;
pub mod voice;

pub use client::{AudioStream, OpenAiSynthesizer, SpeechRequest, SpeechSynthesizer, SynthesisError};
pub use voice::{UnknownVoice, Voice};

#[cfg(test)]
pub use client::{MockReply, MockSynthesizer};
