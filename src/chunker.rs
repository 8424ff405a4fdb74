//! Sentence-boundary text chunking for long input.
//!
//! Text is split on the literal `". "` delimiter and sentences are packed
//! greedily into chunks of at most `max_chars` characters. A sentence is never
//! cut in half: one that alone exceeds the bound becomes an oversized chunk.

/// Delimiter between sentences.
pub const SENTENCE_DELIMITER: &str = ". ";

/// Default maximum characters per chunk.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Smallest accepted `max_chars`.
pub const MIN_MAX_CHARS: usize = 100;

/// Largest accepted `max_chars`.
pub const MAX_MAX_CHARS: usize = 1000;

/// One chunk of input text with its position in the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

/// Split `text` into chunks of at most `max_chars` characters on sentence boundaries.
///
/// Lengths are counted in characters, not bytes. Text that already fits is
/// returned unchanged as the only chunk.
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let sentences: Vec<&str> = text.split(SENTENCE_DELIMITER).collect();
    let last = sentences.len() - 1;

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for (i, sentence) in sentences.iter().enumerate() {
        // The delimiter was consumed by the split, except after the final sentence.
        let delimiter = if i < last { SENTENCE_DELIMITER } else { "" };
        let piece_len = sentence.chars().count() + delimiter.chars().count();

        if current_len + piece_len > max_chars {
            push_trimmed(&mut chunks, &current);
            current.clear();
            current_len = 0;
        }
        current.push_str(sentence);
        current.push_str(delimiter);
        current_len += piece_len;
    }
    push_trimmed(&mut chunks, &current);

    if chunks.is_empty() {
        chunks.push(text.trim().to_string());
    }
    chunks
}

/// Like [`split`], but tags every chunk with its index.
pub fn split_indexed(text: &str, max_chars: usize) -> Vec<TextChunk> {
    split(text, max_chars)
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextChunk { index, text })
        .collect()
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(word: &str, repeat: usize) -> String {
        vec![word; repeat].join(" ")
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let text = "Субҳ барвақт бедор шудам. Ба ошхона рафтам.";
        assert_eq!(split(text, 1000), vec![text.to_string()]);
    }

    #[test]
    fn packs_sentences_up_to_the_bound() {
        let a = sentence("салом", 10); // 59 chars
        let b = sentence("дӯст", 10); // 49 chars
        let c = sentence("китоб", 10); // 59 chars
        let text = format!("{a}. {b}. {c}.");

        let chunks = split(&text, 120);
        assert_eq!(chunks, vec![format!("{a}. {b}."), format!("{c}.")]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 120));
    }

    #[test]
    fn rejoining_chunks_reconstructs_the_input() {
        let text = (0..30)
            .map(|i| format!("Ин ҷумлаи рақами {i} аст"))
            .collect::<Vec<_>>()
            .join(". ")
            + ".";

        let chunks = split(&text, 100);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn oversized_sentence_becomes_its_own_chunk() {
        let long = sentence("калима", 40); // 279 chars, no delimiter inside
        let text = format!("Кӯтоҳ. {long}. Охир.");

        let chunks = split(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1], format!("{long}."));
        for chunk in &chunks {
            let single_sentence = !chunk.trim_end_matches('.').contains(SENTENCE_DELIMITER);
            assert!(chunk.chars().count() <= 100 || single_sentence);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        // 60 Cyrillic characters are 120 bytes.
        let text = "ҳ".repeat(60);
        assert_eq!(split(&text, 100), vec![text.clone()]);
    }

    #[test]
    fn text_without_delimiter_is_one_chunk() {
        let text = sentence("ҷаҳон", 50);
        assert_eq!(split(&text, 100), vec![text.clone()]);
    }

    #[test]
    fn indexed_chunks_are_numbered_in_order() {
        let text = format!("{}. {}", sentence("як", 60), sentence("ду", 60));
        let chunks = split_indexed(&text, 200);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
        assert!(chunks[1].text.starts_with("ду"));
    }
}
