//! One generation request, end to end.
//!
//! text → chunker → batch synthesis → combiner → speed adjustment →
//! artifact → history.

use std::fmt;

use derive_builder::Builder;

use crate::audio::{adjust_speed, combine, CombineOutcome, CombineStrategy, MAX_SPEED, MIN_SPEED};
use crate::batch::{synthesize_all, ChunkSpool, Progress};
use crate::chunker::{self, DEFAULT_MAX_CHARS, MAX_MAX_CHARS, MIN_MAX_CHARS};
use crate::request::validate_seed;
use crate::{
    AudioArtifact, HistoryCache, HistoryEntry, SeedLabel, SynthesisEngine, SynthesisRequest,
    TtsError, Waveform,
};

/// Longest accepted input, in characters.
pub const MAX_INPUT_CHARS: usize = 50_000;

/// Inputs longer than this get a [`PipelineWarning::LongInput`].
pub const LONG_INPUT_WARN_CHARS: usize = 10_000;

const LONG_INPUT_INFO_CHARS: usize = 5_000;

/// User-tunable settings for a generation request.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(default)]
pub struct GenerationOptions {
    /// Split text longer than `max_chars_per_chunk` into sentence chunks.
    pub split_long_text: bool,
    /// Chunk bound in characters, 100..=1000.
    pub max_chars_per_chunk: usize,
    /// Fixed seed for reproducible output, 0..=999999.
    #[builder(setter(strip_option))]
    pub seed: Option<u32>,
    /// Playback speed factor, 0.5..=2.0.
    pub speed: f32,
    pub save_to_history: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            split_long_text: true,
            max_chars_per_chunk: DEFAULT_MAX_CHARS,
            seed: None,
            speed: 1.0,
            save_to_history: true,
        }
    }
}

impl GenerationOptions {
    pub fn validate(&self) -> Result<(), TtsError> {
        if !(MIN_MAX_CHARS..=MAX_MAX_CHARS).contains(&self.max_chars_per_chunk) {
            return Err(TtsError::InvalidRequest(format!(
                "max chars per chunk must be in {MIN_MAX_CHARS}..={MAX_MAX_CHARS}, got {}",
                self.max_chars_per_chunk
            )));
        }
        if !self.speed.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(TtsError::InvalidRequest(format!(
                "speed must be between {MIN_SPEED} and {MAX_SPEED}, got {}",
                self.speed
            )));
        }
        validate_seed(self.seed)
    }
}

/// Something the user should know about even though the request succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// Input is long enough that processing may be slow.
    LongInput { chars: usize },
    /// Some chunks came back at a different sample rate and were resampled.
    SampleRateMismatch { expected: u32, found: Vec<u32> },
    /// Chunks were combined from the spooled files instead of memory.
    CombineFallback,
    /// Combining failed entirely; only the first chunk was kept.
    ChunksDropped { dropped: usize, reason: String },
    /// Speed adjustment failed; the audio plays at normal speed.
    SpeedAdjustFailed { reason: String },
    /// The artifact could not be saved to the history.
    HistorySaveFailed { reason: String },
    /// The engine cannot take a seed, so the output is not reproducible.
    SeedIgnored { seed: u32 },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongInput { chars } => write!(
                f,
                "Very long text ({chars} chars). \
                 Processing may take a while and use significant memory."
            ),
            Self::SampleRateMismatch { expected, found } => write!(
                f,
                "Sample rate mismatch: chunks at {found:?} Hz were resampled to {expected} Hz"
            ),
            Self::CombineFallback => {
                f.write_str("Used alternative method to combine audio chunks")
            }
            Self::ChunksDropped { dropped, reason } => write!(
                f,
                "Could not combine audio chunks ({reason}). \
                 Saving first chunk only; {dropped} chunk(s) dropped."
            ),
            Self::SpeedAdjustFailed { reason } => {
                write!(f, "Could not adjust speed: {reason}. Using original audio.")
            }
            Self::HistorySaveFailed { reason } => write!(f, "Could not save to history: {reason}"),
            Self::SeedIgnored { seed } => write!(
                f,
                "The loaded model cannot take a seed; seed {seed} will not reproduce this audio"
            ),
        }
    }
}

/// Outcome of a successful generation request.
#[derive(Debug, Clone)]
pub struct Generation {
    pub artifact: AudioArtifact,
    /// Number of chunks the text was synthesized in.
    pub chunk_count: usize,
    pub warnings: Vec<PipelineWarning>,
    /// Set when the artifact was recorded in the history.
    pub history_entry: Option<HistoryEntry>,
}

/// Drives a loaded [`SynthesisEngine`] through the full generation flow.
pub struct TtsPipeline<E: SynthesisEngine> {
    engine: E,
    history: Option<HistoryCache>,
}

impl<E: SynthesisEngine> TtsPipeline<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            history: None,
        }
    }

    /// Attach a history cache used when `save_to_history` is set.
    pub fn with_history(mut self, history: HistoryCache) -> Self {
        self.history = Some(history);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn history(&self) -> Option<&HistoryCache> {
        self.history.as_ref()
    }

    pub fn history_mut(&mut self) -> Option<&mut HistoryCache> {
        self.history.as_mut()
    }

    pub fn into_parts(self) -> (E, Option<HistoryCache>) {
        (self.engine, self.history)
    }

    /// Turn `text` into an audio artifact.
    ///
    /// `progress` is called after every synthesized chunk.
    pub fn generate(
        &mut self,
        text: &str,
        options: &GenerationOptions,
        progress: &mut dyn FnMut(Progress),
    ) -> Result<Generation, TtsError> {
        options.validate()?;
        if text.trim().is_empty() {
            return Err(TtsError::InvalidRequest(
                "Please enter some text to generate audio".to_string(),
            ));
        }

        let chars = text.chars().count();
        if chars > MAX_INPUT_CHARS {
            return Err(TtsError::InvalidRequest(format!(
                "text is {chars} characters long; the limit is {MAX_INPUT_CHARS}"
            )));
        }

        let mut warnings = Vec::new();
        if chars > LONG_INPUT_WARN_CHARS {
            log::warn!("Very long text ({chars} chars)");
            warnings.push(PipelineWarning::LongInput { chars });
        } else if chars > LONG_INPUT_INFO_CHARS {
            log::info!("Long text ({chars} chars). Consider splitting it for better quality.");
        }

        let seed_label = match options.seed {
            Some(seed) if !self.engine.honours_seed() => {
                log::warn!("Seed {seed} requested, but the loaded model cannot take a seed");
                warnings.push(PipelineWarning::SeedIgnored { seed });
                SeedLabel::Random
            }
            seed => seed.into(),
        };

        let (waveform, chunk_count) =
            if options.split_long_text && chars > options.max_chars_per_chunk {
                self.synthesize_chunked(text, options, progress, &mut warnings)?
            } else {
                let request = SynthesisRequest::new(text, options.seed)?;
                let waveform = self.engine.synthesize(&request)?;
                progress(Progress {
                    completed: 1,
                    total: 1,
                });
                (waveform, 1)
            };

        let waveform = apply_speed(waveform, options.speed, &mut warnings);
        let artifact = AudioArtifact::new(waveform, seed_label, chars)?;
        log::info!(
            "Audio generated: {:.2}s, {:.2} KB, seed {}",
            artifact.duration_secs,
            artifact.size_kb(),
            artifact.seed
        );

        let history_entry = if options.save_to_history {
            self.save_to_history(&artifact, text, &mut warnings)
        } else {
            None
        };

        Ok(Generation {
            artifact,
            chunk_count,
            warnings,
            history_entry,
        })
    }

    fn synthesize_chunked(
        &mut self,
        text: &str,
        options: &GenerationOptions,
        progress: &mut dyn FnMut(Progress),
        warnings: &mut Vec<PipelineWarning>,
    ) -> Result<(Waveform, usize), TtsError> {
        let chunks = chunker::split(text, options.max_chars_per_chunk);
        log::info!("Text split into {} chunks", chunks.len());

        // The spool only backs the fallback combine path; run without it if unavailable.
        let mut spool = match ChunkSpool::new() {
            Ok(spool) => Some(spool),
            Err(e) => {
                log::warn!("Cannot create temporary chunk directory: {e}");
                None
            }
        };

        let buffers = synthesize_all(
            &mut self.engine,
            &chunks,
            options.seed,
            spool.as_mut(),
            progress,
        )?;
        let spooled = spool.as_ref().map(ChunkSpool::files).unwrap_or_default();

        let waveform = resolve_combined(combine(buffers, spooled), warnings)?;
        Ok((waveform, chunks.len()))
    }

    fn save_to_history(
        &mut self,
        artifact: &AudioArtifact,
        text: &str,
        warnings: &mut Vec<PipelineWarning>,
    ) -> Option<HistoryEntry> {
        let history = match self.history.as_mut() {
            Some(history) => history,
            None => {
                log::debug!("No history attached, not saving");
                return None;
            }
        };
        match history.record(artifact, text) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Could not save to history: {e}");
                warnings.push(PipelineWarning::HistorySaveFailed {
                    reason: e.to_string(),
                });
                None
            }
        }
    }
}

/// Unwrap a combine outcome, turning every fallback into a warning.
fn resolve_combined(
    outcome: CombineOutcome,
    warnings: &mut Vec<PipelineWarning>,
) -> Result<Waveform, TtsError> {
    match outcome {
        CombineOutcome::Combined {
            waveform,
            strategy,
            mismatched_rates,
        } => {
            if !mismatched_rates.is_empty() {
                warnings.push(PipelineWarning::SampleRateMismatch {
                    expected: waveform.sample_rate,
                    found: mismatched_rates,
                });
            }
            if strategy == CombineStrategy::Spooled {
                warnings.push(PipelineWarning::CombineFallback);
            }
            log::info!("Combined audio chunks ({:?})", strategy);
            Ok(waveform)
        }
        CombineOutcome::PartialFallback {
            waveform,
            dropped,
            reason,
        } => {
            log::warn!("Could not combine audio chunks: {reason}. Keeping first chunk only.");
            warnings.push(PipelineWarning::ChunksDropped { dropped, reason });
            Ok(waveform)
        }
        CombineOutcome::Failed(e) => Err(e),
    }
}

fn apply_speed(
    waveform: Waveform,
    speed: f32,
    warnings: &mut Vec<PipelineWarning>,
) -> Waveform {
    if speed == 1.0 {
        return waveform;
    }
    match adjust_speed(&waveform, speed) {
        Ok(adjusted) => {
            log::info!(
                "Speed adjusted to {speed}x (Duration: {:.1}s -> {:.1}s)",
                waveform.duration_secs(),
                adjusted.duration_secs()
            );
            adjusted
        }
        Err(e) => {
            log::warn!("{e}. Using original audio.");
            warnings.push(PipelineWarning::SpeedAdjustFailed {
                reason: e.to_string(),
            });
            waveform
        }
    }
}
