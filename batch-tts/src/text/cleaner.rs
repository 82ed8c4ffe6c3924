//! Line normalization for TTS input.
//!
//! The synthesis service reads best when a line carries only word characters
//! and sentence punctuation, with no spacing at all. Everything else is
//! dropped rather than replaced.

/// Punctuation kept in normalized text (ASCII and full-width forms).
const KEPT_PUNCTUATION: &[char] = &[',', '，', '.', '。', '?', '？'];

/// Period characters whose repeated runs are collapsed.
const PERIODS: &[char] = &['.', '。'];

/// Normalize a single source line.
///
/// Removes every character that is not a word character, comma, period or
/// question mark, then removes all whitespace.
pub fn normalize_line(line: &str) -> String {
    line.chars().filter(|&c| is_kept_char(c)).collect()
}

/// Normalize an assembled chunk: line normalization plus period collapsing.
///
/// Applying this to its own output returns the same string.
pub fn normalize_chunk(text: &str) -> String {
    collapse_periods(&normalize_line(text))
}

fn is_kept_char(c: char) -> bool {
    if c.is_whitespace() {
        return false;
    }
    is_word_char(c) || KEPT_PUNCTUATION.contains(&c)
}

/// Unicode word character: letters, digits and underscore.
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replace a run of the same period character with a single one.
fn collapse_periods(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous: Option<char> = None;

    for c in text.chars() {
        if PERIODS.contains(&c) && previous == Some(c) {
            continue;
        }
        result.push(c);
        previous = Some(c);
    }

    result
}
