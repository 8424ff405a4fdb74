use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::VitsError;

/// Load the character vocabulary from an MMS `vocab.json` file.
///
/// The file maps token strings (mostly single characters) to integer ids.
pub fn load_vocab(vocab_path: &Path) -> Result<HashMap<String, i64>, VitsError> {
    let content = std::fs::read_to_string(vocab_path)?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| VitsError::Config(format!("Failed to parse vocab.json: {e}")))?;

    let vocab_obj = json
        .as_object()
        .ok_or_else(|| VitsError::Config("vocab.json must be an object".to_string()))?;

    let mut map = HashMap::with_capacity(vocab_obj.len());
    for (k, v) in vocab_obj {
        if k.is_empty() {
            return Err(VitsError::Config("Empty key in vocab.json".to_string()));
        }
        let id = v
            .as_i64()
            .ok_or_else(|| VitsError::Config(format!("Non-integer vocab value for key {k:?}")))?;
        map.insert(k.clone(), id);
    }

    Ok(map)
}

/// Subset of `tokenizer_config.json` the tokenizer honours.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub add_blank: bool,
    pub normalize: bool,
    pub pad_token: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            add_blank: true,
            normalize: true,
            pad_token: "<pad>".to_string(),
        }
    }
}

impl TokenizerConfig {
    /// Read `tokenizer_config.json`, falling back to MMS defaults when absent.
    pub fn load_or_default(path: &Path) -> Result<Self, VitsError> {
        if !path.exists() {
            log::warn!("tokenizer_config.json not found, using MMS defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| VitsError::Config(format!("Failed to parse tokenizer_config.json: {e}")))
    }
}

/// Character-level MMS tokenizer.
pub struct Tokenizer {
    vocab: HashMap<String, i64>,
    /// Multi-character vocabulary entries, longest first, for normalization.
    multi_char: Vec<String>,
    add_blank: bool,
    normalize: bool,
    pad_id: i64,
}

impl Tokenizer {
    pub fn new(vocab: HashMap<String, i64>, config: &TokenizerConfig) -> Self {
        let pad_id = vocab.get(&config.pad_token).copied().unwrap_or(0);
        let mut multi_char: Vec<String> = vocab
            .keys()
            .filter(|k| k.chars().count() > 1)
            .cloned()
            .collect();
        multi_char.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

        Self {
            vocab,
            multi_char,
            add_blank: config.add_blank,
            normalize: config.normalize,
            pad_id,
        }
    }

    /// Load `vocab.json` and `tokenizer_config.json` from a model directory.
    pub fn load(model_dir: &Path) -> Result<Self, VitsError> {
        let vocab_path = model_dir.join("vocab.json");
        if !vocab_path.exists() {
            return Err(VitsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Vocabulary not found at {}", vocab_path.display()),
            )));
        }
        let vocab = load_vocab(&vocab_path)?;
        let config = TokenizerConfig::load_or_default(&model_dir.join("tokenizer_config.json"))?;
        log::info!(
            "Loaded vocabulary with {} tokens (add_blank={}, normalize={})",
            vocab.len(),
            config.add_blank,
            config.normalize
        );
        Ok(Self::new(vocab, &config))
    }

    /// Convert text into model input ids.
    ///
    /// Characters missing from the vocabulary are dropped. With `add_blank`,
    /// the pad id is interleaved between tokens and at both ends.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        let normalized = if self.normalize {
            self.normalize_text(text)
        } else {
            text.to_string()
        };

        let mut buf = [0u8; 4];
        let ids: Vec<i64> = normalized
            .chars()
            .filter_map(|ch| self.vocab.get(&*ch.encode_utf8(&mut buf)).copied())
            .collect();
        let ids = trim_edge_spaces(ids, self.vocab.get(" ").copied());

        if !self.add_blank || ids.is_empty() {
            return ids;
        }
        let mut interleaved = vec![self.pad_id; ids.len() * 2 + 1];
        for (i, id) in ids.into_iter().enumerate() {
            interleaved[2 * i + 1] = id;
        }
        interleaved
    }

    /// Keep vocabulary entries verbatim and lowercase everything else.
    fn normalize_text(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'outer: while let Some(ch) = rest.chars().next() {
            for token in &self.multi_char {
                if rest.starts_with(token.as_str()) {
                    out.push_str(token);
                    rest = &rest[token.len()..];
                    continue 'outer;
                }
            }
            let mut buf = [0u8; 4];
            if self.vocab.contains_key(&*ch.encode_utf8(&mut buf)) {
                out.push(ch);
            } else {
                out.extend(ch.to_lowercase());
            }
            rest = &rest[ch.len_utf8()..];
        }
        out
    }
}

fn trim_edge_spaces(mut ids: Vec<i64>, space_id: Option<i64>) -> Vec<i64> {
    let Some(space) = space_id else {
        return ids;
    };
    while ids.last() == Some(&space) {
        ids.pop();
    }
    let leading = ids.iter().take_while(|&&id| id == space).count();
    ids.drain(..leading);
    ids
}
