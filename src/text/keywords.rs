use std::collections::HashMap;

use super::content_tokens;

/// Return the `top_n` most frequent non-stop-word terms of `text`.
///
/// Non-letters are treated as separators, so numbers never become keywords. Ties are broken
/// alphabetically so the output is stable across runs.
pub fn extract_keywords(text: &str, top_n: usize) -> Vec<String> {
    if text.trim().is_empty() || top_n == 0 {
        return Vec::new();
    }

    let letters_only: String = text
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in content_tokens(&letters_only) {
        *counts.entry(token).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(left_term, left), (right_term, right)| {
        right.cmp(left).then_with(|| left_term.cmp(right_term))
    });
    ranked.into_iter().take(top_n).map(|(term, _)| term).collect()
}
