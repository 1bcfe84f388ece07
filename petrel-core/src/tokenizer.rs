//! Text normalization for passages and queries
//!
//! The corpus policy is byte-oriented: 7-bit ASCII survives (lowercased,
//! punctuation stripped to spaces) and every non-ASCII byte becomes a
//! separator. Passages and queries must go through the same normalization
//! or lexicon lookups silently miss.

/// Normalize a passage or query into a whitespace-tokenizable string.
///
/// For each byte: ASCII non-punctuation is lowercased and kept; ASCII
/// punctuation and all non-ASCII bytes are replaced with a single space.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for &b in text.as_bytes() {
        if b.is_ascii() && !b.is_ascii_punctuation() {
            cleaned.push(b.to_ascii_lowercase() as char);
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
}

/// Split normalized text into terms. Empty terms never appear because
/// `split_ascii_whitespace` collapses separator runs.
pub fn tokenize(cleaned: &str) -> impl Iterator<Item = &str> {
    cleaned.split_ascii_whitespace()
}
