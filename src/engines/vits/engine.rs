use std::path::{Path, PathBuf};

use crate::{ModelInfo, SynthesisEngine, SynthesisRequest, TtsError, Waveform};

use super::model::{ModelConfig, VitsError, VitsModel};

pub const MODEL_NAME: &str = "facebook/mms-tts-tgk";
pub const MODEL_SOURCE_URL: &str = "https://huggingface.co/facebook/mms-tts-tgk";

/// Parameters for configuring VITS model loading.
#[derive(Debug, Clone, Default)]
pub struct VitsModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    /// Path for caching the Level3-optimized ONNX graph.
    ///
    /// Must be writable; the first load creates it, later loads skip graph
    /// optimization by reading it back.
    pub optimized_model_cache_path: Option<PathBuf>,
}

/// Sampling knobs passed to the graph when it exposes them.
///
/// Defaults come from the model's `config.json`.
#[derive(Debug, Clone)]
pub struct VitsInferenceParams {
    pub noise_scale: f32,
    pub noise_scale_duration: f32,
    /// Model-side speaking rate; 1.0 is the trained pace.
    pub speaking_rate: f32,
}

/// MMS-TTS (VITS) engine running an ONNX export of `facebook/mms-tts-tgk`.
///
/// # Quick Start
///
/// ```rust,no_run
/// use tajik_tts::{SynthesisEngine, SynthesisRequest, engines::vits::VitsEngine};
/// use std::path::PathBuf;
///
/// let mut engine = VitsEngine::new();
/// engine.load_model(&PathBuf::from("models/mms-tts-tgk"))?;
/// let request = SynthesisRequest::new("Салом, дунё!", Some(42))?;
/// let waveform = engine.synthesize(&request)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Default)]
pub struct VitsEngine {
    model: Option<VitsModel>,
    model_path: Option<PathBuf>,
    inference: Option<VitsInferenceParams>,
}

impl VitsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the sampling knobs read from `config.json`.
    pub fn set_inference_params(&mut self, params: VitsInferenceParams) {
        self.inference = Some(params);
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }
}

impl Drop for VitsEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for VitsEngine {
    type ModelParams = VitsModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), TtsError> {
        if !model_path.is_dir() {
            return Err(TtsError::model_unavailable(format!(
                "model directory {} does not exist",
                model_path.display()
            )));
        }

        let model = VitsModel::load(
            model_path,
            params.num_threads,
            params.optimized_model_cache_path.as_deref(),
        )
        .map_err(|e| TtsError::model_unavailable(e.to_string()))?;

        self.model = Some(model);
        self.model_path = Some(model_path.to_path_buf());
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
        self.model_path = None;
    }

    fn model_info(&self) -> Option<ModelInfo> {
        self.model.as_ref().map(|model| ModelInfo {
            name: MODEL_NAME.to_string(),
            sample_rate: model.sample_rate(),
            language: "Tajik (tgk)".to_string(),
            model_kind: "VITS (Variational Inference with adversarial learning)".to_string(),
            source_url: MODEL_SOURCE_URL.to_string(),
        })
    }

    fn honours_seed(&self) -> bool {
        self.model.as_ref().map_or(true, VitsModel::accepts_seed)
    }

    fn synthesize(&mut self, request: &SynthesisRequest) -> Result<Waveform, TtsError> {
        let model = self
            .model
            .as_mut()
            .ok_or_else(|| TtsError::model_unavailable(VitsError::ModelNotLoaded.to_string()))?;

        let seed = match request.seed() {
            Some(seed) => i64::from(seed),
            None => fastrand::i64(0..i64::MAX),
        };
        let params = match &self.inference {
            Some(p) => ModelConfig {
                noise_scale: p.noise_scale,
                noise_scale_duration: p.noise_scale_duration,
                speaking_rate: p.speaking_rate,
                ..model.config().clone()
            },
            None => model.config().clone(),
        };

        let samples = model
            .synthesize_text(request.text(), seed, &params)
            .map_err(TtsError::synthesis)?;
        let waveform = Waveform::new(samples, model.sample_rate());
        log::info!(
            "Audio generated: {:.2}s at {} Hz (seed {})",
            waveform.duration_secs(),
            waveform.sample_rate,
            request.seed_label()
        );
        Ok(waveform)
    }
}
