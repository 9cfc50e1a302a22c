//! Plain-text normalization for ingested sources.
//!
//! Scraped page text and extracted PDF text both arrive with irregular
//! whitespace, stray control characters, and platform line endings. This
//! module reduces them to a canonical plain-text form before fingerprinting
//! and chunking, so that cosmetic differences do not trigger re-indexing.
//!
//! # Rules
//!
//! 1. `\r\n` and lone `\r` become `\n`.
//! 2. Control characters other than `\n` and `\t` are dropped.
//! 3. Runs of spaces and tabs collapse to a single space; lines are trimmed.
//! 4. Three or more consecutive newlines collapse to one blank line.
//! 5. The result is trimmed; an empty result is rejected.

/// Normalization failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Nothing but whitespace or control characters remained.
    #[error("source text is empty after normalization")]
    Empty,
}

/// Normalize raw source text into canonical plain text.
///
/// # Example
///
/// ```rust
/// use support_harness_core::normalize::normalize_text;
///
/// let text = normalize_text("  Check-in\t\tfrom  2pm\r\n\r\n\r\n\r\nLate checkout ").unwrap();
/// assert_eq!(text, "Check-in from 2pm\n\nLate checkout");
/// ```
pub fn normalize_text(raw: &str) -> Result<String, NormalizeError> {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut lines: Vec<String> = Vec::new();
    for line in unified.split('\n') {
        let cleaned: String = line
            .chars()
            .filter(|c| *c == '\t' || !c.is_control())
            .collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        lines.push(collapsed);
    }

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;
    for line in lines {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        blank_run = 0;
        out.push_str(&line);
    }

    if out.is_empty() {
        return Err(NormalizeError::Empty);
    }
    Ok(out)
}

/// Truncate `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_blank_input() {
        assert_eq!(normalize_text(""), Err(NormalizeError::Empty));
        assert_eq!(normalize_text(" \n\t\r\n "), Err(NormalizeError::Empty));
        assert_eq!(normalize_text("\u{0007}\u{0000}"), Err(NormalizeError::Empty));
    }

    #[test]
    fn test_collapses_whitespace_within_lines() {
        let text = normalize_text("Rooms   by\tthe   hour").unwrap();
        assert_eq!(text, "Rooms by the hour");
    }

    #[test]
    fn test_keeps_single_paragraph_break() {
        let text = normalize_text("First\n\n\n\n\nSecond\nThird").unwrap();
        assert_eq!(text, "First\n\nSecond\nThird");
    }

    #[test]
    fn test_strips_control_characters() {
        let text = normalize_text("Pool\u{0000} open\u{001b} daily").unwrap();
        assert_eq!(text, "Pool open daily");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_text("  a \r\n\r\n b  \n c").unwrap();
        let twice = normalize_text(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("", 3), "");
    }
}
