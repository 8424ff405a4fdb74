//! # tajik-tts
//!
//! A Rust front end for Tajik text-to-speech built around Facebook's
//! MMS-TTS (VITS) model for Tajik.
//!
//! ## Features
//!
//! - **Sentence chunking**: long input is split on sentence boundaries
//! - **Sequential batch synthesis**: one model call per chunk, in order
//! - **Audio recombination**: chunk waveforms are concatenated, with graceful fallbacks
//! - **Reproducible output**: an optional seed fixes the model's randomness
//! - **Speed control**: linear-interpolation time-stretch after synthesis
//! - **History**: the last 5 generated artifacts are kept on disk
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tajik-tts = { version = "2026.10", features = ["vits"] }
//! ```
//!
//! ```ignore
//! use std::path::PathBuf;
//! use tajik_tts::{engines::vits::VitsEngine, GenerationOptions, SynthesisEngine, TtsPipeline};
//!
//! let mut engine = VitsEngine::new();
//! engine.load_model(&PathBuf::from("models/mms-tts-tgk"))?;
//!
//! let mut pipeline = TtsPipeline::new(engine);
//! let generation = pipeline.generate(
//!     "Субҳ барвақт бедор шудам. Ба ошхона рафтам.",
//!     &GenerationOptions::default(),
//!     &mut |_| {},
//! )?;
//! generation.artifact.write_wav(&PathBuf::from("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod artifact;
pub mod audio;
pub mod batch;
pub mod chunker;
pub mod engines;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod request;

pub use artifact::AudioArtifact;
pub use error::TtsError;
pub use history::{HistoryCache, HistoryEntry};
pub use pipeline::{
    Generation, GenerationOptions, GenerationOptionsBuilder, PipelineWarning, TtsPipeline,
};
pub use request::{SeedLabel, SynthesisRequest};

use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A mono waveform: raw f32 samples plus the sample rate needed to interpret them.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio in Hz (16000 for MMS-TTS)
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    fn wav_spec(&self) -> Result<hound::WavSpec, TtsError> {
        // hound divides by the rate when writing the header.
        if self.sample_rate == 0 {
            return Err(hound::Error::FormatError("sample rate must be non-zero").into());
        }
        Ok(hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        })
    }

    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), TtsError> {
        let mut writer = hound::WavWriter::create(path, self.wav_spec()?)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Encode the audio as an in-memory 32-bit float WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, TtsError> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.wav_spec()?)?;
            for &sample in &self.samples {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Size in bytes of the WAV file [`Waveform::write_wav`] would produce.
    ///
    /// Only the header is encoded; the data chunk is four bytes per sample.
    pub fn encoded_len(&self) -> Result<u64, TtsError> {
        let header = Waveform::new(Vec::new(), self.sample_rate).to_wav_bytes()?.len() as u64;
        Ok(header + 4 * self.samples.len() as u64)
    }

    /// Read a WAV file, converting integer PCM to f32 and mixing channels down to mono.
    pub fn read_wav(path: &Path) -> Result<Self, TtsError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()?
            }
        };

        let channels = usize::from(spec.channels.max(1));
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Descriptive metadata about a loaded speech model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub sample_rate: u32,
    pub language: String,
    pub model_kind: String,
    pub source_url: String,
}

/// Common interface for text-to-speech synthesis engines.
///
/// An engine is an explicit service object: it is created once, loaded once with
/// [`SynthesisEngine::load_model`], and then handed to whoever needs to synthesize.
pub trait SynthesisEngine {
    /// Parameters for configuring model loading (threads, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), TtsError> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), TtsError>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Metadata of the loaded model, `None` before [`SynthesisEngine::load_model`].
    fn model_info(&self) -> Option<ModelInfo>;

    /// Synthesize speech for a validated request.
    ///
    /// When the request carries a seed, identical `(text, seed)` pairs must yield
    /// bit-identical waveforms.
    fn synthesize(&mut self, request: &SynthesisRequest) -> Result<Waveform, TtsError>;

    /// Whether a fixed seed actually makes output reproducible.
    ///
    /// Engines backed by a model that cannot take a seed return `false`.
    fn honours_seed(&self) -> bool {
        true
    }

    /// Synthesize speech and write it to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `Waveform::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        request: &SynthesisRequest,
        wav_path: &Path,
    ) -> Result<(), TtsError> {
        self.synthesize(request)?.write_wav(wav_path)
    }
}

#[cfg(test)]
mod tests {
    use super::{TtsError, Waveform};

    #[test]
    fn wav_file_round_trip_keeps_rate_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.wav");
        let waveform = Waveform::new(vec![0.0, 0.25, -0.5, 1.0], 16_000);
        waveform.write_wav(&path).unwrap();

        let read = Waveform::read_wav(&path).unwrap();
        assert_eq!(read, waveform);
    }

    #[test]
    fn in_memory_wav_has_header_plus_four_bytes_per_sample() {
        let waveform = Waveform::new(vec![0.1; 100], 16_000);
        let bytes = waveform.to_wav_bytes().unwrap();
        assert!(bytes.starts_with(b"RIFF"));
        assert!(bytes.len() >= 44 + 400);
    }

    #[test]
    fn encoded_len_matches_the_encoded_bytes() {
        for len in [0, 1, 321, 16_000] {
            let waveform = Waveform::new(vec![0.2; len], 22_050);
            assert_eq!(
                waveform.encoded_len().unwrap(),
                waveform.to_wav_bytes().unwrap().len() as u64
            );
        }
    }

    #[test]
    fn zero_sample_rate_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let waveform = Waveform::new(vec![0.1; 10], 0);
        assert!(matches!(waveform.to_wav_bytes(), Err(TtsError::Wav(_))));
        assert!(waveform.write_wav(&dir.path().join("zero.wav")).is_err());
    }

    #[test]
    fn reads_integer_pcm_as_normalized_floats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("int.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MAX).unwrap();
        writer.write_sample(0_i16).unwrap();
        writer.finalize().unwrap();

        let read = Waveform::read_wav(&path).unwrap();
        assert_eq!(read.sample_rate, 22_050);
        assert!((read.samples[0] - 1.0).abs() < 1e-3);
        assert_eq!(read.samples[1], 0.0);
    }

    #[test]
    fn duration_is_samples_over_rate() {
        let waveform = Waveform::new(vec![0.0; 8_000], 16_000);
        assert!((waveform.duration_secs() - 0.5).abs() < f64::EPSILON);
    }
}
