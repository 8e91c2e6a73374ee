//! Client for the text-to-speech voice API (ElevenLabs).
//!
//! The worker only depends on the [`SpeechSynthesis`] trait; the HTTP client
//! is one implementation of it.

pub mod client;
pub mod error;
pub mod types;

pub use client::{ElevenLabsClient, SpeechSynthesis, VoiceConfig};
pub use error::{VoiceError, VoiceResult};
pub use types::{SpeechRequest, VoiceSettings};
