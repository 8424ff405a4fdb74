//! Sequential synthesis of text chunks.
//!
//! Chunks are synthesized strictly in order, one engine call each. Every chunk
//! waveform is also written to a [`ChunkSpool`], a temporary directory that the
//! combiner can read back when in-memory concatenation fails. The spool is
//! removed when dropped, whichever way the request ends.
//!
//! [`synthesize_batch`] is the multi-text counterpart: each text becomes its
//! own numbered WAV file in an output directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{SynthesisEngine, SynthesisRequest, TtsError, Waveform};

/// Progress of a batch after a chunk completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f32 / self.total as f32
    }
}

/// Temporary per-chunk WAV files for one request.
pub struct ChunkSpool {
    dir: Option<TempDir>,
    files: Vec<PathBuf>,
}

impl ChunkSpool {
    pub fn new() -> Result<Self, TtsError> {
        let dir = tempfile::Builder::new()
            .prefix("tajik-tts-chunks-")
            .tempdir()?;
        log::debug!("Spooling chunk audio to {}", dir.path().display());
        Ok(Self {
            dir: Some(dir),
            files: Vec::new(),
        })
    }

    /// Write one chunk's audio to the spool.
    pub fn store(&mut self, index: usize, waveform: &Waveform) -> Result<&Path, TtsError> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| TtsError::Io(std::io::Error::other("chunk spool already closed")))?;
        let path = dir.path().join(format!("chunk_{index:03}.wav"));
        waveform.write_wav(&path)?;
        self.files.push(path);
        Ok(&self.files[self.files.len() - 1])
    }

    /// Spooled files, in chunk order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(TempDir::path)
    }
}

impl Drop for ChunkSpool {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!(
                    "Failed to remove temporary chunk files in {}: {e}",
                    path.display()
                );
            }
        }
    }
}

/// Synthesize every chunk in order, reporting progress after each one.
///
/// The first failure aborts the batch; no partial results are returned. A
/// spool write failure is only logged, since the spool is a fallback source.
pub fn synthesize_all<E: SynthesisEngine + ?Sized>(
    engine: &mut E,
    chunks: &[String],
    seed: Option<u32>,
    mut spool: Option<&mut ChunkSpool>,
    progress: &mut dyn FnMut(Progress),
) -> Result<Vec<Waveform>, TtsError> {
    let total = chunks.len();
    let mut waveforms = Vec::with_capacity(total);

    for (index, chunk) in chunks.iter().enumerate() {
        let request = SynthesisRequest::new(chunk.as_str(), seed)?;
        let waveform = engine.synthesize(&request)?;

        if let Some(spool) = spool.as_deref_mut() {
            if let Err(e) = spool.store(index, &waveform) {
                log::warn!("Could not spool chunk {index}: {e}");
            }
        }
        waveforms.push(waveform);

        let step = Progress {
            completed: index + 1,
            total,
        };
        log::info!(
            "Synthesized chunk {}/{} ({:.0}%)",
            step.completed,
            step.total,
            step.fraction() * 100.0
        );
        progress(step);
    }

    Ok(waveforms)
}

/// Synthesize each text to `output_dir/{prefix}_{NNN}.wav`, numbered from 1.
///
/// All texts share `seed`. The directory is created if needed. The first
/// failure aborts the batch; files written before it are left in place.
pub fn synthesize_batch<E: SynthesisEngine + ?Sized>(
    engine: &mut E,
    texts: &[String],
    output_dir: &Path,
    prefix: &str,
    seed: Option<u32>,
    progress: &mut dyn FnMut(Progress),
) -> Result<Vec<PathBuf>, TtsError> {
    std::fs::create_dir_all(output_dir)?;

    let total = texts.len();
    let mut outputs = Vec::with_capacity(total);
    for (index, text) in texts.iter().enumerate() {
        let request = SynthesisRequest::new(text.as_str(), seed)?;
        let path = output_dir.join(format!("{prefix}_{:03}.wav", index + 1));
        engine.synthesize_to_file(&request, &path)?;
        log::debug!("Wrote {}", path.display());
        outputs.push(path);

        progress(Progress {
            completed: index + 1,
            total,
        });
    }

    log::info!("Generated {} audio files in {}", outputs.len(), output_dir.display());
    Ok(outputs)
}
