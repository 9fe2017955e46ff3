/*!
 * Fuzzy name comparison.
 *
 * Normalized Levenshtein similarity plus the token-window scan used by the
 * proximity strategy: a candidate name slides across the page tokens one
 * window at a time and the best window similarity wins.
 */

/// Similarity between two normalized strings in 0.0..=1.0
// @returns: 1.0 for identical strings, 0.0 when either side is empty
pub fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = levenshtein_distance(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - (distance as f32 / max_len as f32)
}

/// Best similarity of a candidate name against any token window of a page
// @returns: the score and the winning window text, ("", 0.0) when inputs are empty
pub fn best_window(page_tokens: &[String], name_tokens: &[String]) -> (f32, String) {
    if page_tokens.is_empty() || name_tokens.is_empty() {
        return (0.0, String::new());
    }

    let name_joined = name_tokens.join(" ");
    let width = name_tokens.len();

    if page_tokens.len() <= width {
        let window = page_tokens.join(" ");
        let score = similarity(&window, &name_joined);
        return (score, window);
    }

    let mut best_score = 0.0f32;
    let mut best_text = String::new();
    for window in page_tokens.windows(width) {
        let window_joined = window.join(" ");
        let score = similarity(&window_joined, &name_joined);
        if score > best_score {
            best_score = score;
            best_text = window_joined;
            if best_score >= 1.0 {
                break;
            }
        }
    }
    (best_score, best_text)
}

/// Levenshtein edit distance over characters
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1) // deletion
                .min(curr_row[j] + 1) // insertion
                .min(prev_row[j] + cost); // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}
