use std::borrow::Cow;
use std::path::{Path, PathBuf};

use ndarray::{arr1, Array2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;
use serde::Deserialize;

use super::tokenizer::Tokenizer;

/// Sample rate used when `config.json` does not declare one.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

#[derive(thiserror::Error, Debug)]
pub enum VitsError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("No .onnx file found in {0}")]
    OnnxNotFound(PathBuf),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid model config: {0}")]
    Config(String),
    #[error("Text has no characters known to the model: {0:?}")]
    NoTokens(String),
    #[error("Model returned no waveform output")]
    NoOutput,
}

/// Values read from the model's `config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub sampling_rate: u32,
    pub noise_scale: f32,
    pub noise_scale_duration: f32,
    pub speaking_rate: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLE_RATE,
            noise_scale: 0.667,
            noise_scale_duration: 0.8,
            speaking_rate: 1.0,
        }
    }
}

impl ModelConfig {
    fn load_or_default(path: &Path) -> Result<Self, VitsError> {
        if !path.exists() {
            log::warn!("config.json not found, assuming {DEFAULT_SAMPLE_RATE} Hz output");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| VitsError::Config(format!("Failed to parse config.json: {e}")))
    }
}

/// Optional graph inputs detected at load time.
#[derive(Debug, Clone, Copy, Default)]
struct GraphInputs {
    attention_mask: bool,
    seed: bool,
    noise_scale: bool,
    length_scale: bool,
    noise_scale_duration: bool,
}

/// Internal VITS ONNX model state.
pub struct VitsModel {
    session: Session,
    tokenizer: Tokenizer,
    config: ModelConfig,
    inputs: GraphInputs,
}

impl VitsModel {
    /// Load the VITS model from a directory.
    ///
    /// The directory must contain:
    /// - An `.onnx` file (preferably `model.onnx`)
    /// - A `vocab.json` character vocabulary
    /// - Optionally `tokenizer_config.json` and `config.json`
    pub fn load(
        model_dir: &Path,
        num_threads: Option<usize>,
        optimized_cache_path: Option<&Path>,
    ) -> Result<Self, VitsError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading MMS-TTS model from {}", onnx_path.display());

        let session = init_session(&onnx_path, num_threads, optimized_cache_path)?;
        let inputs = detect_inputs(&session);
        log::info!("Detected optional inputs: {inputs:?}");
        if !inputs.seed {
            log::warn!(
                "ONNX graph has no `seed` input; fixed seeds will not make output reproducible"
            );
        }

        let tokenizer = Tokenizer::load(model_dir)?;
        let config = ModelConfig::load_or_default(&model_dir.join("config.json"))?;
        log::info!("Model loaded successfully ({} Hz)", config.sampling_rate);

        Ok(Self {
            session,
            tokenizer,
            config,
            inputs,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sampling_rate
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Whether the graph declares a `seed` input.
    pub fn accepts_seed(&self) -> bool {
        self.inputs.seed
    }

    /// Synthesize audio for `text`, seeding the graph's noise with `seed`.
    pub fn synthesize_text(
        &mut self,
        text: &str,
        seed: i64,
        params: &ModelConfig,
    ) -> Result<Vec<f32>, VitsError> {
        let ids = self.tokenizer.encode(text);
        if ids.is_empty() {
            return Err(VitsError::NoTokens(text.to_string()));
        }
        log::debug!("Encoded {} characters into {} tokens", text.chars().count(), ids.len());

        let seq_len = ids.len();
        let ids_arr = Array2::from_shape_vec((1, seq_len), ids)?;
        let mask_arr = Array2::<i64>::ones((1, seq_len));
        let seed_arr = arr1(&[seed]);
        let noise_arr = arr1(&[params.noise_scale]);
        let length_arr = arr1(&[1.0 / params.speaking_rate.max(f32::EPSILON)]);
        let duration_arr = arr1(&[params.noise_scale_duration]);

        let mut feed: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            inputs!["input_ids" => TensorRef::from_array_view(ids_arr.view())?];
        if self.inputs.attention_mask {
            push_input(&mut feed, "attention_mask", TensorRef::from_array_view(mask_arr.view())?);
        }
        if self.inputs.seed {
            push_input(&mut feed, "seed", TensorRef::from_array_view(seed_arr.view())?);
        }
        if self.inputs.noise_scale {
            push_input(&mut feed, "noise_scale", TensorRef::from_array_view(noise_arr.view())?);
        }
        if self.inputs.length_scale {
            push_input(&mut feed, "length_scale", TensorRef::from_array_view(length_arr.view())?);
        }
        if self.inputs.noise_scale_duration {
            push_input(
                &mut feed,
                "noise_scale_duration",
                TensorRef::from_array_view(duration_arr.view())?,
            );
        }

        let output = self.session.run(feed)?;

        // Prefer the `waveform` output, else take the first one.
        let waveform = output
            .iter()
            .find(|(name, _)| *name == "waveform")
            .or_else(|| output.iter().next())
            .ok_or(VitsError::NoOutput)?;
        let audio = waveform.1.try_extract_array::<f32>()?;

        Ok(audio.iter().copied().collect())
    }
}

fn push_input<'v>(
    feed: &mut Vec<(Cow<'_, str>, SessionInputValue<'v>)>,
    name: &'static str,
    value: impl Into<SessionInputValue<'v>>,
) {
    feed.push((Cow::Borrowed(name), value.into()));
}

/// Find the ONNX model file in the given directory.
///
/// Prefers `model.onnx`, then falls back to the first `.onnx` file found.
fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, VitsError> {
    let preferred = model_dir.join("model.onnx");
    if preferred.exists() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(model_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            log::info!("Using ONNX file: {}", path.display());
            return Ok(path);
        }
    }

    Err(VitsError::OnnxNotFound(model_dir.to_path_buf()))
}

/// Initialize an ONNX session with optional on-disk graph caching.
///
/// The first load runs Level3 graph optimization and, when
/// `optimized_cache_path` is given, serialises the result there. Later loads
/// read the cached graph with optimization disabled.
fn init_session(
    onnx_path: &Path,
    num_threads: Option<usize>,
    optimized_cache_path: Option<&Path>,
) -> Result<Session, VitsError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let (load_path, opt_level, write_cache) = match optimized_cache_path {
        Some(cache) if cache.exists() => {
            log::info!("Loading pre-optimized graph from {}", cache.display());
            (cache, GraphOptimizationLevel::Disable, None)
        }
        Some(cache) => {
            log::info!(
                "First load: running Level3 optimization; saving graph to {}",
                cache.display()
            );
            (onnx_path, GraphOptimizationLevel::Level3, Some(cache))
        }
        None => (onnx_path, GraphOptimizationLevel::Level3, None),
    };

    let mut builder = Session::builder()?
        .with_optimization_level(opt_level)?
        .with_execution_providers(providers)?;

    if let Some(cache) = write_cache {
        builder = builder.with_optimized_model_path(cache)?;
    }

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(load_path)?)
}

fn detect_inputs(session: &Session) -> GraphInputs {
    let mut inputs = GraphInputs::default();
    for input in session.inputs() {
        match input.name() {
            "attention_mask" => inputs.attention_mask = true,
            "seed" => inputs.seed = true,
            "noise_scale" => inputs.noise_scale = true,
            "length_scale" => inputs.length_scale = true,
            "noise_scale_duration" => inputs.noise_scale_duration = true,
            _ => {}
        }
    }
    inputs
}
