use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use tajik_tts::batch::{synthesize_batch, Progress};
use tajik_tts::chunker::DEFAULT_MAX_CHARS;
use tajik_tts::engines::vits::{VitsEngine, VitsModelParams};
use tajik_tts::{GenerationOptions, HistoryCache, SynthesisEngine, TtsPipeline};

const DEFAULT_MODEL_DIR: &str = "models/mms-tts-tgk";
const DEFAULT_HISTORY_DIR: &str = "tajik_tts_history";

/// Tajik text-to-speech with Facebook's MMS-TTS model.
#[derive(Parser)]
#[command(name = "tajik-tts", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize Tajik text into a WAV file.
    Say(SayArgs),
    /// Synthesize one WAV file per line of a text file.
    Batch(BatchArgs),
    /// Load the model and print what it is.
    Info {
        #[arg(long, default_value = DEFAULT_MODEL_DIR)]
        model: PathBuf,
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Inspect or clear the saved generations.
    History {
        #[arg(long, default_value = DEFAULT_HISTORY_DIR)]
        history_dir: PathBuf,
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    List,
    Clear,
}

#[derive(Args)]
struct SayArgs {
    /// Text to speak. Read from stdin when neither this nor --file is given.
    #[arg(conflicts_with = "file")]
    text: Option<String>,
    /// Read the text from a UTF-8 file.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Output WAV path. Defaults to tajik_speech_<N>chars.wav.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    model: PathBuf,
    /// Fixed seed (0-999999) for reproducible output.
    #[arg(long)]
    seed: Option<u32>,
    /// Playback speed factor (0.5-2.0).
    #[arg(long, default_value_t = 1.0)]
    speed: f32,
    /// Maximum characters per chunk (100-1000).
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
    max_chars: usize,
    /// Synthesize long text in a single pass.
    #[arg(long)]
    no_split: bool,
    /// Do not record the result in the history.
    #[arg(long)]
    no_history: bool,
    #[arg(long, default_value = DEFAULT_HISTORY_DIR)]
    history_dir: PathBuf,
    /// CPU threads for inference.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args)]
struct BatchArgs {
    /// UTF-8 file with one text per line; blank lines are skipped.
    #[arg(long)]
    file: PathBuf,
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,
    /// File name prefix: <prefix>_001.wav, <prefix>_002.wav, ...
    #[arg(long, default_value = "audio")]
    prefix: String,
    #[arg(long, default_value = DEFAULT_MODEL_DIR)]
    model: PathBuf,
    /// Fixed seed (0-999999) shared by every text.
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Say(args) => say(args),
        Command::Batch(args) => batch(args),
        Command::Info { model, threads } => info(model, threads),
        Command::History {
            history_dir,
            action,
        } => history(history_dir, action),
    }
}

fn load_engine(model: &Path, threads: Option<usize>) -> Result<VitsEngine> {
    let mut engine = VitsEngine::new();
    let params = VitsModelParams {
        num_threads: threads,
        ..Default::default()
    };

    let load_start = Instant::now();
    engine
        .load_model_with_params(model, params)
        .with_context(|| format!("failed to load model from {}", model.display()))?;
    log::info!("Model loaded in {:.2?}", load_start.elapsed());
    Ok(engine)
}

fn read_text(args: &SayArgs) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("failed to read text from stdin")?;
    Ok(text)
}

fn say(args: SayArgs) -> Result<()> {
    let text = read_text(&args)?;
    if text.trim().is_empty() {
        bail!("Please enter some text to generate audio");
    }

    let options = GenerationOptions {
        split_long_text: !args.no_split,
        max_chars_per_chunk: args.max_chars,
        seed: args.seed,
        speed: args.speed,
        save_to_history: !args.no_history,
    };
    options.validate()?;

    let engine = load_engine(&args.model, args.threads)?;
    let mut pipeline = TtsPipeline::new(engine);
    if options.save_to_history {
        let history = HistoryCache::open(&args.history_dir).with_context(|| {
            format!("failed to open history in {}", args.history_dir.display())
        })?;
        pipeline = pipeline.with_history(history);
    }

    let synth_start = Instant::now();
    let mut report = |p: Progress| {
        if p.total > 1 {
            eprint!("\rGenerating chunk {}/{}...", p.completed, p.total);
            if p.completed == p.total {
                eprintln!();
            }
            let _ = io::stderr().flush();
        }
    };
    let generation = pipeline.generate(&text, &options, &mut report)?;
    let elapsed = synth_start.elapsed();

    for warning in &generation.warnings {
        eprintln!("warning: {warning}");
    }

    let artifact = &generation.artifact;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(artifact.file_name()));
    artifact
        .write_wav(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Audio generated: {} ({:.2}s, {:.2} KB, {} chunk(s), seed {}) in {:.2?}",
        output.display(),
        artifact.duration_secs,
        artifact.size_kb(),
        generation.chunk_count,
        artifact.seed,
        elapsed
    );
    Ok(())
}

fn batch(args: BatchArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let texts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if texts.is_empty() {
        bail!("{} contains no text", args.file.display());
    }

    let mut engine = load_engine(&args.model, args.threads)?;
    if args.seed.is_some() && !engine.honours_seed() {
        eprintln!("warning: this model export ignores seeds; output will not be reproducible");
    }

    let files = synthesize_batch(
        &mut engine,
        &texts,
        &args.output_dir,
        &args.prefix,
        args.seed,
        &mut |p| eprintln!("Generated {}/{}", p.completed, p.total),
    )?;
    println!("Generated {} audio files in {}", files.len(), args.output_dir.display());
    Ok(())
}

fn info(model: PathBuf, threads: Option<usize>) -> Result<()> {
    let engine = load_engine(&model, threads)?;
    let Some(info) = engine.model_info() else {
        bail!("model at {} reported no info", model.display());
    };

    println!("Model:       {}", info.name);
    println!("Type:        {}", info.model_kind);
    println!("Language:    {}", info.language);
    println!("Sample rate: {} Hz", info.sample_rate);
    println!("Source:      {}", info.source_url);
    Ok(())
}

fn history(dir: PathBuf, action: HistoryAction) -> Result<()> {
    let mut cache = HistoryCache::open(&dir)
        .with_context(|| format!("failed to open history in {}", dir.display()))?;

    match action {
        HistoryAction::List => {
            if cache.is_empty() {
                println!("No history yet. Generated audio will appear here.");
                return Ok(());
            }
            println!("Recent generations ({}/{}):", cache.len(), cache.capacity());
            for (i, entry) in cache.list().into_iter().enumerate() {
                let status = if entry.file_exists() { "" } else { " [missing]" };
                println!(
                    "{}. [{}] {} chars, seed {}, {:.1} KB{}",
                    i + 1,
                    entry.display_time(),
                    entry.char_count,
                    entry.seed,
                    entry.size_kb(),
                    status
                );
                println!("   {}", entry.preview);
                println!("   {}", entry.file_path.display());
            }
        }
        HistoryAction::Clear => {
            let count = cache.len();
            cache.clear()?;
            println!("History cleared ({count} item(s) removed)");
        }
    }
    Ok(())
}
