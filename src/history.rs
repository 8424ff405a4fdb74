//! Bounded history of generated audio.
//!
//! The cache keeps at most [`DEFAULT_CAPACITY`] entries, each backed by one WAV
//! file in the history directory. Evicting or clearing an entry deletes its
//! file as well. A cache built with [`HistoryCache::new`] lives in memory
//! only. One loaded with [`HistoryCache::open`] rewrites `history.json` on
//! every change, so the manifest and the WAV files never drift apart.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{AudioArtifact, SeedLabel, TtsError};

/// Number of artifacts kept before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 5;

/// Characters of source text shown in an entry preview.
pub const PREVIEW_CHARS: usize = 100;

const MANIFEST_FILE: &str = "history.json";

const FILE_PREFIX: &str = "tajik_audio_";

/// One previously generated artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Local>,
    pub preview: String,
    pub full_text: String,
    pub char_count: usize,
    pub seed: SeedLabel,
    pub file_path: PathBuf,
    pub file_name: String,
    /// Size of the backing file in bytes.
    pub file_size: u64,
}

impl HistoryEntry {
    pub fn size_kb(&self) -> f64 {
        self.file_size as f64 / 1024.0
    }

    pub fn file_exists(&self) -> bool {
        self.file_path.exists()
    }

    /// Timestamp formatted for display, e.g. `2026-10-19 14:03:11`.
    pub fn display_time(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

pub struct HistoryCache {
    dir: PathBuf,
    capacity: usize,
    /// Oldest first.
    entries: Vec<HistoryEntry>,
    /// Write the manifest after every `record` and `clear`.
    autosave: bool,
}

impl HistoryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_capacity(dir, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
            entries: Vec::new(),
            autosave: false,
        }
    }

    /// Rebuild a cache from previously saved entries (oldest first).
    ///
    /// Entries beyond the capacity are evicted the same way `record` would.
    pub fn from_entries(dir: impl Into<PathBuf>, entries: Vec<HistoryEntry>) -> Self {
        let mut cache = Self::new(dir);
        cache.entries = entries;
        cache.enforce_capacity();
        cache
    }

    /// Load the manifest in `dir`, or start empty, and keep it in sync.
    ///
    /// History WAV files in `dir` that the manifest does not list are deleted.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TtsError> {
        let dir = dir.into();
        let manifest = dir.join(MANIFEST_FILE);
        let mut cache = match fs::read_to_string(&manifest) {
            Ok(content) => {
                let entries: Vec<HistoryEntry> = serde_json::from_str(&content).map_err(|e| {
                    TtsError::History(format!("Failed to parse {}: {e}", manifest.display()))
                })?;
                log::debug!(
                    "Loaded {} history entries from {}",
                    entries.len(),
                    manifest.display()
                );
                Self::from_entries(dir, entries)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Self::new(dir),
            Err(e) => return Err(e.into()),
        };
        cache.autosave = true;
        cache.remove_orphans();
        Ok(cache)
    }

    /// Write the entry list to `history.json` in the history directory.
    pub fn save(&self) -> Result<(), TtsError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| TtsError::History(format!("Failed to serialize history: {e}")))?;
        fs::write(self.dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    /// Persist `artifact` to the history directory and add an entry for it.
    ///
    /// When the cache is full, the oldest entry and its file are removed.
    pub fn record(
        &mut self,
        artifact: &AudioArtifact,
        text: &str,
    ) -> Result<HistoryEntry, TtsError> {
        fs::create_dir_all(&self.dir)?;

        let timestamp = Local::now();
        let file_name = self.unique_file_name(&timestamp);
        let file_path = self.dir.join(&file_name);
        artifact.write_wav(&file_path)?;
        let file_size = fs::metadata(&file_path)?.len();

        let entry = HistoryEntry {
            timestamp,
            preview: preview(text),
            full_text: text.to_string(),
            char_count: text.chars().count(),
            seed: artifact.seed,
            file_path,
            file_name,
            file_size,
        };
        self.entries.push(entry.clone());
        self.enforce_capacity();
        if self.autosave {
            self.save()?;
        }

        log::info!(
            "Saved to history: {} ({}/{} items)",
            entry.file_name,
            self.entries.len(),
            self.capacity
        );
        Ok(entry)
    }

    /// Entries, newest first.
    pub fn list(&self) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().collect()
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Delete every backing file and forget all entries.
    pub fn clear(&mut self) -> Result<(), TtsError> {
        for entry in self.entries.drain(..) {
            remove_backing_file(&entry.file_path);
        }
        if self.autosave {
            self.save()?;
        }
        Ok(())
    }

    pub fn autosaves(&self) -> bool {
        self.autosave
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let oldest = self.entries.remove(0);
            log::debug!("Evicting history entry {}", oldest.file_name);
            remove_backing_file(&oldest.file_path);
        }
    }

    fn remove_orphans(&self) {
        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                log::warn!("Cannot scan history directory {}: {e}", self.dir.display());
                return;
            }
        };
        for dir_entry in listing.flatten() {
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if is_history_file(name) && !self.entries.iter().any(|e| e.file_name == name) {
                log::info!("Removing history file missing from the manifest: {name}");
                remove_backing_file(&dir_entry.path());
            }
        }
    }

    fn unique_file_name(&self, timestamp: &DateTime<Local>) -> String {
        let stem = format!("{FILE_PREFIX}{}", timestamp.format("%Y%m%d_%H%M%S_%3f"));
        let taken = |name: &str| {
            self.dir.join(name).exists() || self.entries.iter().any(|e| e.file_name == name)
        };

        let mut name = format!("{stem}.wav");
        let mut n = 1;
        while taken(&name) {
            name = format!("{stem}_{n}.wav");
            n += 1;
        }
        name
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// `tajik_audio_<YYYYmmdd_HHMMSS>...wav`, as written by `record`.
fn is_history_file(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(".wav"))
        .and_then(|stamp| stamp.get(..15))
        .is_some_and(|stamp| NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M%S").is_ok())
}

fn remove_backing_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to delete history file {}: {e}", path.display()),
    }
}
