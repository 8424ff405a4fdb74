use std::path::PathBuf;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::{TtsError, Waveform};

/// How a combined waveform was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineStrategy {
    /// Concatenated from the in-memory chunk buffers.
    InMemory,
    /// Concatenated from the chunk WAV files spooled to disk.
    Spooled,
}

/// Result of merging per-chunk waveforms.
#[derive(Debug)]
pub enum CombineOutcome {
    /// Every chunk made it into the output.
    Combined {
        waveform: Waveform,
        strategy: CombineStrategy,
        /// Sample rates of chunks that disagreed with the first chunk.
        mismatched_rates: Vec<u32>,
    },
    /// Both strategies failed; only the first chunk survives.
    PartialFallback {
        waveform: Waveform,
        dropped: usize,
        reason: String,
    },
    /// Nothing could be produced.
    Failed(TtsError),
}

/// Merge chunk waveforms into one, in order, at the first chunk's sample rate.
///
/// `spooled` holds the chunk WAV files written during synthesis; they are only
/// read if in-memory concatenation fails.
pub fn combine(buffers: Vec<Waveform>, spooled: &[PathBuf]) -> CombineOutcome {
    let total = buffers.len();
    if total <= 1 {
        return match buffers.into_iter().next() {
            Some(waveform) => CombineOutcome::Combined {
                waveform,
                strategy: CombineStrategy::InMemory,
                mismatched_rates: Vec::new(),
            },
            None => CombineOutcome::Failed(TtsError::CombineFailed(
                "no audio chunks to combine".to_string(),
            )),
        };
    }

    let primary = match concat_in_memory(&buffers) {
        Ok((waveform, mismatched_rates)) => {
            return CombineOutcome::Combined {
                waveform,
                strategy: CombineStrategy::InMemory,
                mismatched_rates,
            }
        }
        Err(e) => e,
    };
    log::warn!("In-memory concatenation failed ({primary}), reading spooled chunk files");

    let fallback = match concat_spooled(spooled, total) {
        Ok((waveform, mismatched_rates)) => {
            return CombineOutcome::Combined {
                waveform,
                strategy: CombineStrategy::Spooled,
                mismatched_rates,
            }
        }
        Err(e) => e,
    };
    log::warn!("Spooled concatenation failed too ({fallback}), keeping the first chunk only");

    let reason = format!("{primary}; fallback: {fallback}");
    match buffers.into_iter().next() {
        Some(waveform) => CombineOutcome::PartialFallback {
            waveform,
            dropped: total - 1,
            reason,
        },
        None => CombineOutcome::Failed(TtsError::CombineFailed(reason)),
    }
}

/// Concatenate buffers, resampling any chunk whose rate differs from the first.
pub fn concat_in_memory(buffers: &[Waveform]) -> Result<(Waveform, Vec<u32>), TtsError> {
    let first = buffers
        .first()
        .ok_or_else(|| TtsError::CombineFailed("no audio chunks to combine".to_string()))?;
    let sample_rate = first.sample_rate;
    if sample_rate == 0 {
        return Err(TtsError::CombineFailed(
            "first chunk declares a sample rate of 0 Hz".to_string(),
        ));
    }

    let capacity = buffers.iter().map(Waveform::len).sum();
    let mut samples = Vec::with_capacity(capacity);
    let mut mismatched_rates = Vec::new();

    for (i, buffer) in buffers.iter().enumerate() {
        if buffer.sample_rate == sample_rate {
            samples.extend_from_slice(&buffer.samples);
            continue;
        }
        if buffer.sample_rate == 0 {
            return Err(TtsError::CombineFailed(format!(
                "chunk {i} declares a sample rate of 0 Hz"
            )));
        }
        log::warn!(
            "Sample rate mismatch: chunk {i} is {} Hz vs {sample_rate} Hz, resampling",
            buffer.sample_rate
        );
        samples.extend(resample(&buffer.samples, buffer.sample_rate, sample_rate)?);
        mismatched_rates.push(buffer.sample_rate);
    }

    Ok((Waveform::new(samples, sample_rate), mismatched_rates))
}

/// Read spooled chunk files back and concatenate their raw samples.
///
/// Rate mismatches are reported but not corrected: the output declares the
/// first file's rate.
pub fn concat_spooled(
    paths: &[PathBuf],
    expected: usize,
) -> Result<(Waveform, Vec<u32>), TtsError> {
    if paths.len() != expected {
        return Err(TtsError::CombineFailed(format!(
            "only {} of {expected} chunk files were spooled",
            paths.len()
        )));
    }

    let mut sample_rate = None;
    let mut samples = Vec::new();
    let mut mismatched_rates = Vec::new();

    for path in paths {
        let chunk = Waveform::read_wav(path)?;
        match sample_rate {
            None => sample_rate = Some(chunk.sample_rate),
            Some(rate) if rate != chunk.sample_rate => {
                log::warn!(
                    "Sample rate mismatch: {} Hz vs {rate} Hz. Using {rate} Hz.",
                    chunk.sample_rate
                );
                mismatched_rates.push(chunk.sample_rate);
            }
            Some(_) => {}
        }
        samples.extend(chunk.samples);
    }

    let sample_rate = sample_rate
        .ok_or_else(|| TtsError::CombineFailed("no chunk files to read".to_string()))?;
    Ok((Waveform::new(samples, sample_rate), mismatched_rates))
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, TtsError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| TtsError::CombineFailed(format!("cannot build resampler: {e}")))?;
    let delay = resampler.output_delay();

    let input = vec![samples.to_vec()];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| TtsError::CombineFailed(format!("resampling failed: {e}")))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // Flush the delay line with silence until the tail has come out.
    while output.len() < expected + delay {
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| TtsError::CombineFailed(format!("resampling failed: {e}")))?
            .into_iter()
            .next()
            .unwrap_or_default();
        if tail.is_empty() {
            break;
        }
        output.extend(tail);
    }

    let mut output: Vec<f32> = output.into_iter().skip(delay).collect();
    output.resize(expected, 0.0);
    Ok(output)
}
