use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TtsError;

/// Largest seed accepted for reproducible generation.
pub const MAX_SEED: u32 = 999_999;

/// Seed used for a generation, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeedLabel {
    Fixed(u32),
    Random,
}

impl From<Option<u32>> for SeedLabel {
    fn from(seed: Option<u32>) -> Self {
        seed.map_or(SeedLabel::Random, SeedLabel::Fixed)
    }
}

impl fmt::Display for SeedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedLabel::Fixed(seed) => write!(f, "{seed}"),
            SeedLabel::Random => f.write_str("Random"),
        }
    }
}

/// Text to synthesize plus an optional seed. Validated on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    text: String,
    seed: Option<u32>,
}

impl SynthesisRequest {
    /// Build a request, rejecting blank text and seeds above [`MAX_SEED`].
    pub fn new(text: impl Into<String>, seed: Option<u32>) -> Result<Self, TtsError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(TtsError::InvalidRequest(
                "Please enter some text to generate audio".to_string(),
            ));
        }
        validate_seed(seed)?;
        Ok(Self { text, seed })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn seed(&self) -> Option<u32> {
        self.seed
    }

    pub fn seed_label(&self) -> SeedLabel {
        self.seed.into()
    }
}

pub(crate) fn validate_seed(seed: Option<u32>) -> Result<(), TtsError> {
    match seed {
        Some(seed) if seed > MAX_SEED => Err(TtsError::InvalidRequest(format!(
            "seed {seed} is out of range (0-{MAX_SEED})"
        ))),
        _ => Ok(()),
    }
}
