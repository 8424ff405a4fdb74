use std::path::PathBuf;
use std::time::Instant;

use tajik_tts::{
    engines::vits::{VitsEngine, VitsInferenceParams, VitsModelParams},
    GenerationOptionsBuilder, SynthesisEngine, SynthesisRequest, TtsPipeline,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = VitsEngine::new();
    let model_path = PathBuf::from("models/mms-tts-tgk");

    let load_start = Instant::now();
    engine.load_model_with_params(&model_path, VitsModelParams::default())?;
    println!("Model loaded in {:.2?}", load_start.elapsed());

    if let Some(info) = engine.model_info() {
        println!("{} ({} Hz, {})", info.name, info.sample_rate, info.language);
    }

    // A calmer voice than the checkpoint's defaults.
    engine.set_inference_params(VitsInferenceParams {
        noise_scale: 0.5,
        noise_scale_duration: 0.6,
        speaking_rate: 1.0,
    });

    let text = "Салом! Ман забони тоҷикӣ ҳарф мезанам.";
    let request = SynthesisRequest::new(text, Some(42))?;

    let synth_start = Instant::now();
    let waveform = engine.synthesize(&request)?;
    let synth_dur = synth_start.elapsed();

    let audio_duration = waveform.duration_secs();
    let speedup = audio_duration / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        audio_duration, synth_dur, speedup
    );

    engine.synthesize_to_file(&request, &PathBuf::from("output.wav"))?;
    println!("Saved to output.wav");

    // Long text goes through the pipeline: chunked, combined, sped up.
    let story = "Субҳ барвақт бедор шудам. Ба ошхона рафтам. Чой тайёр кардам. \
                 Бо оилаам наҳорӣ хӯрдам. Баъд ба кор рафтам.";
    let options = GenerationOptionsBuilder::default()
        .max_chars_per_chunk(100)
        .seed(42)
        .speed(1.25)
        .save_to_history(false)
        .build()?;

    let mut pipeline = TtsPipeline::new(engine);
    let generation = pipeline.generate(story, &options, &mut |p| {
        println!("  chunk {}/{}", p.completed, p.total);
    })?;
    for warning in &generation.warnings {
        println!("warning: {warning}");
    }
    generation.artifact.write_wav(&PathBuf::from("story.wav"))?;
    println!(
        "Saved story.wav ({:.2}s, {} chunks)",
        generation.artifact.duration_secs, generation.chunk_count
    );

    Ok(())
}
