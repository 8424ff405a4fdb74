//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `vits` - MMS-TTS VITS models exported to ONNX (e.g. `facebook/mms-tts-tgk`)

#[cfg(feature = "vits")]
pub mod vits;
