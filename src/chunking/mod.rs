//! Fixed-window chunking for breaking transcripts into searchable fragments.
//!
//! Splitting is deterministic and character-based so that re-indexing a video
//! produces the same fragments every time.

use regex::Regex;
use std::sync::OnceLock;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Split text into overlapping fixed-size windows.
///
/// Whitespace runs are collapsed to single spaces and the text is trimmed
/// before windowing. Window positions are counted in characters, not bytes,
/// so multi-byte text never splits inside a code point.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let text = whitespace_re().replace_all(text, " ");
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    let effective_overlap = overlap.min(max_chars.saturating_sub(1));
    let step = max_chars - effective_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_chars).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if start + max_chars >= chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_text("", 1000, 150).is_empty());
        assert!(chunk_text("   \n\t  ", 1000, 150).is_empty());
    }

    #[test]
    fn test_short_text_is_a_single_chunk() {
        let chunks = chunk_text("hello   world", 1000, 150);
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_whitespace_is_collapsed_before_windowing() {
        let chunks = chunk_text("  a\n\nb\t\tc  ", 1000, 150);
        assert_eq!(chunks, vec!["a b c".to_string()]);
    }

    #[test]
    fn test_window_positions_with_defaults() {
        let text: String = std::iter::repeat('x').take(2500).collect();
        let chunks = chunk_text(&text, 1000, 150);

        // step = 1000 - 150 = 850, windows at 0, 850, 1700
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 1000);
        assert_eq!(chunks[2].chars().count(), 800);
    }

    #[test]
    fn test_second_window_starts_at_step() {
        let text: String = (0..2500).map(|i| ((b'a' + (i % 26) as u8) as char)).collect();
        let chunks = chunk_text(&text, 1000, 150);

        let expected_second: String = text.chars().skip(850).take(1000).collect();
        assert_eq!(chunks[1], expected_second);
    }

    #[test]
    fn test_overlap_clamped_below_window_size() {
        // overlap >= max_chars clamps to max_chars - 1 so the step is
        // always at least one.
        let text: String = std::iter::repeat('y').take(25).collect();
        let chunks = chunk_text(&text, 10, 50);
        assert_eq!(chunks[0].chars().count(), 10);
        let expected_second: String = text.chars().skip(1).take(10).collect();
        assert_eq!(chunks[1], expected_second);
    }

    #[test]
    fn test_zero_overlap_tiles_without_repeats() {
        let text: String = (0..30).map(|i| ((b'a' + (i % 26) as u8) as char)).collect();
        let chunks = chunk_text(&text, 10, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text: String = std::iter::repeat('ø').take(120).collect();
        let chunks = chunk_text(&text, 50, 10);
        for chunk in &chunks {
            assert!(chunk.chars().all(|c| c == 'ø'));
        }
        assert_eq!(chunks[0].chars().count(), 50);
    }

    #[test]
    fn test_deterministic() {
        let text: String = (0..5000).map(|i| ((b'a' + (i % 26) as u8) as char)).collect();
        assert_eq!(chunk_text(&text, 1000, 150), chunk_text(&text, 1000, 150));
    }
}
