//! Text analysis primitives shared by the summarizer, keyword extractor, and clusterer.
//!
//! Everything here is pure and synchronous: sentence splitting, tokenization with an English
//! stop-word list, TF-IDF weighting, frequency keywords, and the extractive summary used when no
//! abstractive provider is configured (or when one fails).

mod extractive;
mod keywords;
mod sentences;
mod stopwords;
mod tfidf;

pub use extractive::extractive_summary;
pub use keywords::extract_keywords;
pub use sentences::split_sentences;
pub use stopwords::is_stop_word;
pub use tfidf::{TfidfMatrix, TfidfVectorizer};

/// Split text into lowercase word tokens of at least two alphanumeric characters.
///
/// Stop words are kept; callers that want them removed filter with [`is_stop_word`].
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Tokenize and drop English stop words.
pub fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| !is_stop_word(token))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_single_characters_and_punctuation() {
        assert_eq!(
            tokenize("A quick, brown fox_2 -- x!"),
            vec!["quick", "brown", "fox_2"]
        );
    }

    #[test]
    fn content_tokens_remove_stop_words() {
        assert_eq!(
            content_tokens("The contract was signed by the parties"),
            vec!["contract", "signed", "parties"]
        );
    }
}
