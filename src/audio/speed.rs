//! Playback-speed adjustment by linear-interpolation resampling.
//!
//! The sample count is scaled by `1 / factor` while the declared sample rate
//! stays the same, so duration and pitch both change.

use crate::{TtsError, Waveform};

/// Slowest supported speed factor.
pub const MIN_SPEED: f32 = 0.5;

/// Fastest supported speed factor.
pub const MAX_SPEED: f32 = 2.0;

/// Return a copy of `waveform` played `factor` times faster.
///
/// `factor == 1.0` returns the input unchanged. The output holds
/// `round(len / factor)` samples interpolated at evenly spaced positions over
/// the original sequence.
pub fn adjust_speed(waveform: &Waveform, factor: f32) -> Result<Waveform, TtsError> {
    if !factor.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&factor) {
        return Err(TtsError::SpeedAdjustFailed(format!(
            "speed must be between {MIN_SPEED} and {MAX_SPEED}, got {factor}"
        )));
    }
    if factor == 1.0 {
        return Ok(waveform.clone());
    }

    let input = &waveform.samples;
    if input.is_empty() {
        return Err(TtsError::SpeedAdjustFailed(
            "cannot change the speed of empty audio".to_string(),
        ));
    }

    let target_len = ((input.len() as f64 / factor as f64).round() as usize).max(1);
    let samples = interpolate(input, target_len);

    log::debug!(
        "Speed {factor}x: {} -> {} samples",
        input.len(),
        samples.len()
    );
    Ok(Waveform::new(samples, waveform.sample_rate))
}

fn interpolate(input: &[f32], target_len: usize) -> Vec<f32> {
    let last = input.len() - 1;
    if target_len == 1 || last == 0 {
        return vec![input[0]; target_len];
    }

    let step = last as f64 / (target_len - 1) as f64;
    (0..target_len)
        .map(|i| {
            let position = i as f64 * step;
            let lo = (position.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            let frac = (position - lo as f64) as f32;
            input[lo] + (input[hi] - input[lo]) * frac
        })
        .collect()
}
