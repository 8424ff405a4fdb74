use std::path::Path;

use tajik_tts::batch::Progress;
use tajik_tts::chunker;
use tajik_tts::{
    GenerationOptions, GenerationOptionsBuilder, HistoryCache, ModelInfo, PipelineWarning,
    SeedLabel, SynthesisEngine, SynthesisRequest, TtsError, TtsPipeline, Waveform,
};

const RATE: u32 = 16_000;
const SAMPLES_PER_CHAR: usize = 40;

/// Deterministic stand-in for the VITS model: noise seeded by (text, seed).
#[derive(Default)]
struct FakeEngine {
    fail_on: Option<&'static str>,
    /// Chunks containing the marker come back at the given rate.
    odd_rate: Option<(&'static str, u32)>,
    /// Chunks containing the marker come back with no samples.
    silent_on: Option<&'static str>,
    ignores_seed: bool,
    calls: usize,
}

impl SynthesisEngine for FakeEngine {
    type ModelParams = ();

    fn load_model_with_params(&mut self, _: &Path, _: ()) -> Result<(), TtsError> {
        Ok(())
    }

    fn unload_model(&mut self) {}

    fn model_info(&self) -> Option<ModelInfo> {
        Some(ModelInfo {
            name: "fake".to_string(),
            sample_rate: RATE,
            language: "Tajik (tgk)".to_string(),
            model_kind: "test".to_string(),
            source_url: String::new(),
        })
    }

    fn honours_seed(&self) -> bool {
        !self.ignores_seed
    }

    fn synthesize(&mut self, request: &SynthesisRequest) -> Result<Waveform, TtsError> {
        self.calls += 1;
        let text = request.text();
        if let Some(marker) = self.fail_on {
            if text.contains(marker) {
                return Err(TtsError::synthesis("fake model failure"));
            }
        }

        let seed = request
            .seed()
            .map(u64::from)
            .unwrap_or_else(|| fastrand::u64(..));
        let mixed = text
            .bytes()
            .fold(seed, |h, b| h.wrapping_mul(31).wrapping_add(u64::from(b)));
        let mut rng = fastrand::Rng::with_seed(mixed);
        let len = match self.silent_on {
            Some(marker) if text.contains(marker) => 0,
            _ => text.chars().count() * SAMPLES_PER_CHAR,
        };
        let samples = (0..len)
            .map(|_| rng.f32() * 2.0 - 1.0)
            .collect();

        let rate = match self.odd_rate {
            Some((marker, rate)) if text.contains(marker) => rate,
            _ => RATE,
        };
        Ok(Waveform::new(samples, rate))
    }
}

fn long_text(sentences: usize) -> String {
    (0..sentences)
        .map(|i| format!("Ҷумлаи рақами {i} дар бораи рӯзи хуб аст"))
        .collect::<Vec<_>>()
        .join(". ")
}

fn options() -> GenerationOptionsBuilder {
    let mut builder = GenerationOptionsBuilder::default();
    builder.save_to_history(false);
    builder
}

fn run(
    pipeline: &mut TtsPipeline<FakeEngine>,
    text: &str,
    options: &GenerationOptions,
) -> Result<tajik_tts::Generation, TtsError> {
    pipeline.generate(text, options, &mut |_| {})
}

#[test]
fn short_text_is_synthesized_in_one_pass() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let opts = options().seed(42).build().unwrap();
    let mut steps = Vec::new();

    let generation = pipeline
        .generate("Салом, дунё!", &opts, &mut |p| steps.push(p))
        .unwrap();

    assert_eq!(generation.chunk_count, 1);
    assert_eq!(steps, vec![Progress { completed: 1, total: 1 }]);
    assert_eq!(generation.artifact.seed, SeedLabel::Fixed(42));
    assert_eq!(generation.artifact.text_chars, 12);
    assert_eq!(generation.artifact.waveform.len(), 12 * SAMPLES_PER_CHAR);
    assert!(generation.warnings.is_empty());
    assert!(generation.history_entry.is_none());
}

#[test]
fn long_text_is_chunked_and_combined_in_order() {
    let text = long_text(10);
    let chunks = chunker::split(&text, 100);
    assert!(chunks.len() > 1);

    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let opts = options().max_chars_per_chunk(100).seed(7).build().unwrap();
    let mut steps = Vec::new();
    let generation = pipeline
        .generate(&text, &opts, &mut |p| steps.push(p))
        .unwrap();

    assert_eq!(generation.chunk_count, chunks.len());
    assert_eq!(pipeline.engine().calls, chunks.len());
    let completed: Vec<usize> = steps.iter().map(|p| p.completed).collect();
    assert_eq!(completed, (1..=chunks.len()).collect::<Vec<_>>());
    assert!(steps.iter().all(|p| p.total == chunks.len()));

    let expected: usize = chunks
        .iter()
        .map(|c| c.chars().count() * SAMPLES_PER_CHAR)
        .sum();
    assert_eq!(generation.artifact.waveform.len(), expected);
    assert_eq!(generation.artifact.waveform.sample_rate, RATE);

    // The first chunk's audio leads the combined waveform.
    let mut engine = FakeEngine::default();
    let first = engine
        .synthesize(&SynthesisRequest::new(chunks[0].as_str(), Some(7)).unwrap())
        .unwrap();
    assert_eq!(
        &generation.artifact.waveform.samples[..first.len()],
        first.samples.as_slice()
    );
}

#[test]
fn disabling_split_synthesizes_long_text_at_once() {
    let text = long_text(10);
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let opts = options()
        .max_chars_per_chunk(100)
        .split_long_text(false)
        .build()
        .unwrap();

    let generation = run(&mut pipeline, &text, &opts).unwrap();

    assert_eq!(generation.chunk_count, 1);
    assert_eq!(pipeline.engine().calls, 1);
}

#[test]
fn same_seed_reproduces_audio_and_different_seeds_do_not() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let text = "Субҳ барвақт бедор шудам.";

    let a = run(&mut pipeline, text, &options().seed(42).build().unwrap()).unwrap();
    let b = run(&mut pipeline, text, &options().seed(42).build().unwrap()).unwrap();
    let c = run(&mut pipeline, text, &options().seed(123).build().unwrap()).unwrap();

    assert_eq!(a.artifact.waveform, b.artifact.waveform);
    assert_eq!(a.artifact.waveform.sample_rate, c.artifact.waveform.sample_rate);
    assert_ne!(a.artifact.waveform.samples, c.artifact.waveform.samples);
}

#[test]
fn missing_seed_is_labelled_random() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let generation = run(&mut pipeline, "Салом", &options().build().unwrap()).unwrap();
    assert_eq!(generation.artifact.seed, SeedLabel::Random);
    assert_eq!(generation.artifact.seed.to_string(), "Random");
}

#[test]
fn double_speed_halves_the_audio() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let text = "Ба ошхона рафтам.";

    let normal = run(&mut pipeline, text, &options().seed(1).build().unwrap()).unwrap();
    let fast = run(
        &mut pipeline,
        text,
        &options().seed(1).speed(2.0).build().unwrap(),
    )
    .unwrap();

    let n = normal.artifact.waveform.len();
    assert_eq!(fast.artifact.waveform.len(), (n as f64 / 2.0).round() as usize);
    assert_eq!(fast.artifact.waveform.sample_rate, RATE);
    assert!((fast.artifact.duration_secs - normal.artifact.duration_secs / 2.0).abs() < 1e-3);
}

#[test]
fn chunk_failure_fails_the_whole_request() {
    let text = long_text(10);
    let engine = FakeEngine {
        fail_on: Some("рақами 6"),
        ..FakeEngine::default()
    };
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = TtsPipeline::new(engine).with_history(HistoryCache::new(dir.path()));
    let opts = options()
        .max_chars_per_chunk(100)
        .save_to_history(true)
        .build()
        .unwrap();

    let err = run(&mut pipeline, &text, &opts).unwrap_err();

    assert!(matches!(err, TtsError::SynthesisFailed { .. }));
    assert!(pipeline.history().unwrap().is_empty());
}

#[test]
fn mismatched_chunk_rate_is_resampled_with_a_warning() {
    let mut text = long_text(4);
    text.push_str(". ODD хотима");
    let engine = FakeEngine {
        odd_rate: Some(("ODD", 22_050)),
        ..FakeEngine::default()
    };
    let mut pipeline = TtsPipeline::new(engine);
    let opts = options().max_chars_per_chunk(100).seed(3).build().unwrap();

    let generation = run(&mut pipeline, &text, &opts).unwrap();

    assert_eq!(generation.artifact.waveform.sample_rate, RATE);
    assert!(generation.warnings.contains(&PipelineWarning::SampleRateMismatch {
        expected: RATE,
        found: vec![22_050],
    }));
}

#[test]
fn history_keeps_the_five_newest_generations() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline =
        TtsPipeline::new(FakeEngine::default()).with_history(HistoryCache::new(dir.path()));
    let opts = options().save_to_history(true).build().unwrap();

    let mut entries = Vec::new();
    for i in 0..6 {
        let text = format!("Матни рақами {i}");
        let generation = run(&mut pipeline, &text, &opts).unwrap();
        entries.push(generation.history_entry.unwrap());
    }

    let history = pipeline.history().unwrap();
    assert_eq!(history.len(), 5);
    assert!(!entries[0].file_path.exists());
    assert!(entries[1..].iter().all(|e| e.file_path.exists()));
    assert_eq!(history.list()[0].full_text, "Матни рақами 5");
    assert_eq!(history.list()[4].full_text, "Матни рақами 1");
}

#[test]
fn saving_without_attached_history_is_a_no_op() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let opts = options().save_to_history(true).build().unwrap();

    let generation = run(&mut pipeline, "Салом", &opts).unwrap();

    assert!(generation.history_entry.is_none());
    assert!(generation.warnings.is_empty());
}

#[test]
fn invalid_requests_are_rejected_before_synthesis() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());

    let bad_seed = options().seed(1_000_000).build().unwrap();
    let bad_speed = options().speed(3.0).build().unwrap();
    let bad_chunk = options().max_chars_per_chunk(50).build().unwrap();
    let ok = options().build().unwrap();

    for (text, opts) in [
        ("Салом", &bad_seed),
        ("Салом", &bad_speed),
        ("Салом", &bad_chunk),
        ("   \n", &ok),
    ] {
        let err = run(&mut pipeline, text, opts).unwrap_err();
        assert!(matches!(err, TtsError::InvalidRequest(_)), "{err}");
    }
    assert_eq!(pipeline.engine().calls, 0);
}

#[test]
fn very_long_input_warns_and_oversized_input_is_rejected() {
    let mut pipeline = TtsPipeline::new(FakeEngine::default());
    let opts = options().max_chars_per_chunk(1000).seed(5).build().unwrap();

    let long = long_text(300);
    assert!(long.chars().count() > 10_000);
    let generation = run(&mut pipeline, &long, &opts).unwrap();
    assert!(generation
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::LongInput { .. })));

    let huge = "а".repeat(50_001);
    let err = run(&mut pipeline, &huge, &opts).unwrap_err();
    assert!(matches!(err, TtsError::InvalidRequest(_)));
}

#[test]
fn unusable_chunk_keeps_only_the_first_chunk_with_a_warning() {
    let text = long_text(10);
    let chunks = chunker::split(&text, 100);
    // A 0 Hz chunk breaks in-memory concatenation and cannot be spooled either.
    let engine = FakeEngine {
        odd_rate: Some(("рақами 3", 0)),
        ..FakeEngine::default()
    };
    let mut pipeline = TtsPipeline::new(engine);
    let opts = options().max_chars_per_chunk(100).seed(9).build().unwrap();

    let generation = run(&mut pipeline, &text, &opts).unwrap();

    let expected_dropped = chunks.len() - 1;
    assert!(generation.warnings.iter().any(|w| matches!(
        w,
        PipelineWarning::ChunksDropped { dropped, .. } if *dropped == expected_dropped
    )));
    let first = FakeEngine::default()
        .synthesize(&SynthesisRequest::new(chunks[0].as_str(), Some(9)).unwrap())
        .unwrap();
    assert_eq!(generation.artifact.waveform, first);
}

#[test]
fn failed_speed_change_is_reported_and_audio_kept() {
    let engine = FakeEngine {
        silent_on: Some("хомӯш"),
        ..FakeEngine::default()
    };
    let mut pipeline = TtsPipeline::new(engine);
    let opts = options().speed(1.5).build().unwrap();

    let generation = run(&mut pipeline, "Ҳама хомӯш шуданд.", &opts).unwrap();

    assert!(generation.artifact.waveform.is_empty());
    assert!(generation
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::SpeedAdjustFailed { .. })));
}

#[test]
fn unwritable_history_is_reported_without_failing_the_request() {
    // A regular file where the history directory should be.
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let mut pipeline =
        TtsPipeline::new(FakeEngine::default()).with_history(HistoryCache::new(blocker.path()));
    let opts = options().save_to_history(true).build().unwrap();

    let generation = run(&mut pipeline, "Салом", &opts).unwrap();

    assert!(generation.history_entry.is_none());
    assert!(!generation.artifact.waveform.is_empty());
    assert!(generation
        .warnings
        .iter()
        .any(|w| matches!(w, PipelineWarning::HistorySaveFailed { .. })));
    assert!(pipeline.history().unwrap().is_empty());
}

#[test]
fn seed_the_engine_cannot_take_is_reported() {
    let engine = FakeEngine {
        ignores_seed: true,
        ..FakeEngine::default()
    };
    let mut pipeline = TtsPipeline::new(engine);

    let seeded = run(&mut pipeline, "Салом", &options().seed(42).build().unwrap()).unwrap();
    assert_eq!(
        seeded.warnings,
        vec![PipelineWarning::SeedIgnored { seed: 42 }]
    );
    assert_eq!(seeded.artifact.seed, SeedLabel::Random);

    let unseeded = run(&mut pipeline, "Салом", &options().build().unwrap()).unwrap();
    assert!(unseeded.warnings.is_empty());
}

#[test]
fn reopened_history_stays_within_its_bound_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options().save_to_history(true).build().unwrap();

    // One pipeline per run, each dropped without an explicit save.
    for i in 0..6 {
        let history = HistoryCache::open(dir.path()).unwrap();
        let mut pipeline = TtsPipeline::new(FakeEngine::default()).with_history(history);
        let text = format!("Даври {i}");
        let generation = run(&mut pipeline, &text, &opts).unwrap();
        assert!(generation.history_entry.is_some());
    }

    let wavs = std::fs::read_dir(dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().extension() == Some("wav".as_ref()))
        .count();
    let history = HistoryCache::open(dir.path()).unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(wavs, 5);
    assert_eq!(history.list()[0].full_text, "Даври 5");
}
