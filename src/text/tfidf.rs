use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::content_tokens;

/// TF-IDF vectorizer with smoothed inverse document frequency and L2-normalized rows.
///
/// Terms whose document-frequency ratio exceeds `max_df` are pruned from the vocabulary.
/// English stop words never enter the vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct TfidfVectorizer {
    max_df: f64,
}

/// Sparse TF-IDF matrix: one row per input document, columns indexed into [`TfidfMatrix::terms`].
#[derive(Debug, Clone, Default)]
pub struct TfidfMatrix {
    terms: Vec<String>,
    rows: Vec<Vec<(usize, f64)>>,
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TfidfVectorizer {
    /// Vectorizer that keeps every non-stop-word term.
    pub const fn new() -> Self {
        Self { max_df: 1.0 }
    }

    /// Prune terms appearing in more than `max_df` (a ratio in `(0, 1]`) of the documents.
    pub fn with_max_df(mut self, max_df: f64) -> Self {
        self.max_df = max_df.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    /// Build the vocabulary from `documents` and weight every document against it.
    pub fn fit_transform<S: AsRef<str>>(&self, documents: &[S]) -> TfidfMatrix {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|document| content_tokens(document.as_ref()))
            .collect();
        let total = tokenized.len();
        if total == 0 {
            return TfidfMatrix::default();
        }

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            let unique: BTreeSet<&str> = tokens.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let max_count = self.max_df * total as f64;
        let mut terms = Vec::new();
        let mut idf = Vec::new();
        let mut column_of: HashMap<&str, usize> = HashMap::new();
        for (term, df) in document_frequency {
            if df as f64 > max_count {
                continue;
            }
            column_of.insert(term, terms.len());
            terms.push(term.to_string());
            idf.push(((1.0 + total as f64) / (1.0 + df as f64)).ln() + 1.0);
        }

        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
                for token in tokens {
                    if let Some(&column) = column_of.get(token.as_str()) {
                        *counts.entry(column).or_default() += 1.0;
                    }
                }
                let mut row: Vec<(usize, f64)> = counts
                    .into_iter()
                    .map(|(column, count)| (column, count * idf[column]))
                    .collect();
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, weight) in &mut row {
                        *weight /= norm;
                    }
                }
                row
            })
            .collect();

        TfidfMatrix { terms, rows }
    }
}

impl TfidfMatrix {
    /// Vocabulary in column order (alphabetical).
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Number of document rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sparse `(column, weight)` pairs for one document.
    pub fn row(&self, index: usize) -> &[(usize, f64)] {
        self.rows.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sum of the weights in one row.
    pub fn row_sum(&self, index: usize) -> f64 {
        self.row(index).iter().map(|(_, weight)| weight).sum()
    }

    /// Dense column-wise mean over the selected rows.
    pub fn mean_row(&self, indices: &[usize]) -> Vec<f64> {
        let mut mean = vec![0.0; self.terms.len()];
        if indices.is_empty() {
            return mean;
        }
        for &index in indices {
            for &(column, weight) in self.row(index) {
                mean[column] += weight;
            }
        }
        let count = indices.len() as f64;
        for value in &mut mean {
            *value /= count;
        }
        mean
    }
}
