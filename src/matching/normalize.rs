/*!
 * Text normalization for name matching.
 *
 * All comparisons run over folded text: Unicode NFKD with combining marks
 * stripped, lowercased, punctuation treated as whitespace and whitespace
 * collapsed. "JOSÉ  da Silva," and "jose da silva" fold to the same string.
 */

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text into its canonical matching form
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_space = true;
        }
    }

    out
}

/// Normalized whitespace-separated tokens of a text
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}
