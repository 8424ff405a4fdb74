use std::path::Path;

use crate::{SeedLabel, TtsError, Waveform};

/// The final audio of one generation request plus derived metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub waveform: Waveform,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Size of the encoded WAV file in bytes.
    pub byte_size: u64,
    pub seed: SeedLabel,
    /// Length of the source text in characters.
    pub text_chars: usize,
}

impl AudioArtifact {
    pub fn new(waveform: Waveform, seed: SeedLabel, text_chars: usize) -> Result<Self, TtsError> {
        let byte_size = waveform.encoded_len()?;
        Ok(Self {
            duration_secs: waveform.duration_secs(),
            byte_size,
            waveform,
            seed,
            text_chars,
        })
    }

    pub fn size_kb(&self) -> f64 {
        self.byte_size as f64 / 1024.0
    }

    /// Suggested download name, e.g. `tajik_speech_120chars.wav`.
    pub fn file_name(&self) -> String {
        format!("tajik_speech_{}chars.wav", self.text_chars)
    }

    pub fn write_wav(&self, path: &Path) -> Result<(), TtsError> {
        self.waveform.write_wav(path)
    }

    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, TtsError> {
        self.waveform.to_wav_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_derived_from_the_waveform() {
        let artifact =
            AudioArtifact::new(Waveform::new(vec![0.0; 16_000], 16_000), SeedLabel::Fixed(42), 12)
                .unwrap();

        assert!((artifact.duration_secs - 1.0).abs() < f64::EPSILON);
        assert_eq!(
            artifact.byte_size,
            artifact.to_wav_bytes().unwrap().len() as u64
        );
        assert_eq!(artifact.file_name(), "tajik_speech_12chars.wav");
    }

    #[test]
    fn written_file_matches_reported_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let artifact =
            AudioArtifact::new(Waveform::new(vec![0.25; 321], 16_000), SeedLabel::Random, 3)
                .unwrap();
        artifact.write_wav(&path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), artifact.byte_size);
    }
}
