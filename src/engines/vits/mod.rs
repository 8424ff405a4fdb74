//! MMS-TTS (VITS) text-to-speech engine.
//!
//! Runs an ONNX export of Facebook's Massively Multilingual Speech model for
//! Tajik, `facebook/mms-tts-tgk`. MMS models are single-speaker and
//! character-based: no phonemizer is needed, text is mapped straight to
//! vocabulary ids.
//!
//! # Model Directory Layout
//!
//! ```text
//! models/mms-tts-tgk/
//! ├── model.onnx               # VITS graph (input_ids -> waveform)
//! ├── vocab.json               # character vocabulary
//! ├── tokenizer_config.json    # add_blank / normalize / pad_token (optional)
//! └── config.json              # sampling_rate, noise scales (optional)
//! ```
//!
//! Export the Hugging Face checkpoint with `optimum-cli export onnx` or an
//! equivalent `torch.onnx.export` of `VitsModel`, then copy the tokenizer JSON
//! files next to it.
//!
//! # Graph Inputs
//!
//! | Input | Type | Required |
//! |---|---|---|
//! | `input_ids` | `i64 [1, T]` | yes |
//! | `attention_mask` | `i64 [1, T]` | if declared |
//! | `seed` | `i64 [1]` | if declared; needed for reproducible output |
//! | `noise_scale`, `length_scale`, `noise_scale_duration` | `f32 [1]` | if declared |
//!
//! The first output (or the one named `waveform`) is taken as mono f32 audio.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tajik_tts::{SynthesisEngine, SynthesisRequest, engines::vits::VitsEngine};
//! use std::path::PathBuf;
//!
//! let mut engine = VitsEngine::new();
//! engine.load_model(&PathBuf::from("models/mms-tts-tgk"))?;
//!
//! let request = SynthesisRequest::new("Субҳ барвақт бедор шудам.", Some(42))?;
//! engine.synthesize_to_file(&request, &PathBuf::from("out.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod model;
pub mod tokenizer;

pub use engine::{VitsEngine, VitsInferenceParams, VitsModelParams};
pub use model::VitsError;
