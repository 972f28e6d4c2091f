use super::{TfidfVectorizer, split_sentences};

/// Pick the `n_sentences` highest-weighted sentences of `text` and return them in reading order.
///
/// Each sentence is scored by the sum of its TF-IDF row, treating sentences as the corpus.
/// Texts with no more than `n_sentences` sentences are returned whole. Equal scores favor the
/// earlier sentence.
pub fn extractive_summary(text: &str, n_sentences: usize) -> String {
    let sentences = split_sentences(text);
    if sentences.len() <= n_sentences {
        return sentences.join(" ");
    }

    let matrix = TfidfVectorizer::new().fit_transform(&sentences);
    let mut ranked: Vec<(usize, f64)> = (0..sentences.len())
        .map(|index| (index, matrix.row_sum(index)))
        .collect();
    ranked.sort_by(|(left_index, left), (right_index, right)| {
        right
            .total_cmp(left)
            .then_with(|| left_index.cmp(right_index))
    });

    let mut chosen: Vec<usize> = ranked
        .into_iter()
        .take(n_sentences)
        .map(|(index, _)| index)
        .collect();
    chosen.sort_unstable();

    chosen
        .into_iter()
        .map(|index| sentences[index].as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_texts_are_returned_whole() {
        let text = "One fact.  Two facts!";
        assert_eq!(extractive_summary(text, 5), "One fact. Two facts!");
    }

    #[test]
    fn keeps_dense_sentences_in_original_order() {
        let text = "Quarterly revenue increased sharply across regions. It was so. \
                    Operating margins improved despite supply constraints. Yes. \
                    Headcount remained flat.";
        let summary = extractive_summary(text, 2);
        assert_eq!(
            summary,
            "Quarterly revenue increased sharply across regions. \
             Operating margins improved despite supply constraints."
        );
    }

    #[test]
    fn zero_sentences_requested_yields_empty_summary() {
        assert_eq!(extractive_summary("A b c. D e f. G h i.", 0), "");
    }
}
