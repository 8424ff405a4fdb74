/// Troubleshooting text attached to model loading failures.
pub const MODEL_UNAVAILABLE_HINT: &str = "Troubleshooting:\n\
     1. Check that the model directory exists and contains model.onnx and vocab.json\n\
     2. Verify you have enough disk space (the model is ~140MB)\n\
     3. Make sure the ONNX Runtime shared library can be found";

/// Troubleshooting text attached to inference failures.
pub const SYNTHESIS_FAILED_HINT: &str = "Troubleshooting:\n\
     1. Make sure the text contains Tajik (Cyrillic) characters the model knows\n\
     2. Try a shorter text or enable chunking of long text\n\
     3. Check that the ONNX export matches the expected inputs (input_ids, attention_mask)";

#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("Model unavailable: {reason}\n{hint}")]
    ModelUnavailable { reason: String, hint: &'static str },
    #[error("Error generating audio: {source}\n{hint}")]
    SynthesisFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        hint: &'static str,
    },
    #[error("Could not combine audio chunks: {0}")]
    CombineFailed(String),
    #[error("Could not adjust speed: {0}")]
    SpeedAdjustFailed(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("History error: {0}")]
    History(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl TtsError {
    pub fn model_unavailable(reason: impl Into<String>) -> Self {
        Self::ModelUnavailable {
            reason: reason.into(),
            hint: MODEL_UNAVAILABLE_HINT,
        }
    }

    pub fn synthesis(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::SynthesisFailed {
            source: source.into(),
            hint: SYNTHESIS_FAILED_HINT,
        }
    }
}
