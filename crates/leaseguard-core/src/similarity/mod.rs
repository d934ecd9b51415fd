//! TF-IDF lexical similarity over a clause set.
//!
//! The clause set is the whole corpus: document frequencies are computed over
//! exactly the texts passed in, on every call. Nothing is cached between calls.
//!
//! Weighting follows the common smoothed form:
//! - term frequency is the raw count of the term in the text
//! - `idf(t) = ln((1 + n) / (1 + df(t))) + 1`
//! - each row is L2-normalized, so cosine similarity is a dot product

mod tokenizer;

pub use tokenizer::{tokenize, StopWords, VectorizerConfig};

use serde::Serialize;
use std::collections::BTreeMap;

/// Sparse L2-normalized TF-IDF vector keyed by vocabulary index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    weights: BTreeMap<usize, f64>,
}

impl TermVector {
    /// Cosine similarity against another normalized vector.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        let (small, large) = if self.weights.len() <= other.weights.len() {
            (&self.weights, &other.weights)
        } else {
            (&other.weights, &self.weights)
        };

        small
            .iter()
            .filter_map(|(term, w)| large.get(term).map(|v| w * v))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }

    /// True when the text produced no terms.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }
}

/// Fits a vocabulary and IDF table to a corpus and vectorizes it.
#[derive(Debug, Clone, Default)]
pub struct TfIdfVectorizer {
    config: VectorizerConfig,
}

impl TfIdfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Vectorize every text against IDF weights computed over `texts`.
    pub fn fit_transform<S: AsRef<str>>(&self, texts: &[S]) -> Vec<TermVector> {
        let documents: Vec<Vec<String>> = texts
            .iter()
            .map(|text| tokenize(text.as_ref(), &self.config))
            .collect();

        // Vocabulary in sorted term order keeps vectorization deterministic.
        let mut vocabulary: BTreeMap<&str, usize> = BTreeMap::new();
        for term in documents.iter().flatten() {
            vocabulary.entry(term.as_str()).or_insert(0);
        }
        for (index, slot) in vocabulary.values_mut().enumerate() {
            *slot = index;
        }

        let mut document_frequency = vec![0usize; vocabulary.len()];
        let mut counts: Vec<BTreeMap<usize, f64>> = Vec::with_capacity(documents.len());
        for tokens in &documents {
            let mut tf: BTreeMap<usize, f64> = BTreeMap::new();
            for token in tokens {
                *tf.entry(vocabulary[token.as_str()]).or_insert(0.0) += 1.0;
            }
            for term in tf.keys() {
                document_frequency[*term] += 1;
            }
            counts.push(tf);
        }

        let n = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        counts
            .into_iter()
            .map(|tf| {
                let mut weights: BTreeMap<usize, f64> = tf
                    .into_iter()
                    .map(|(term, count)| (term, count * idf[term]))
                    .collect();
                let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for w in weights.values_mut() {
                        *w /= norm;
                    }
                }
                TermVector { weights }
            })
            .collect()
    }

    /// Pairwise similarity matrix, or `None` for fewer than two non-empty texts.
    ///
    /// Blank texts are ignored; matrix indices refer to the remaining texts in
    /// their original order.
    pub fn similarity_matrix<S: AsRef<str>>(&self, texts: &[S]) -> Option<SimilarityMatrix> {
        let texts: Vec<&str> = texts
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();
        if texts.len() < 2 {
            return None;
        }

        let vectors = self.fit_transform(&texts);
        let size = vectors.len();
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
            for j in (i + 1)..size {
                let score = vectors[i].cosine(&vectors[j]);
                values[i * size + j] = score;
                values[j * size + i] = score;
            }
        }

        tracing::debug!(
            texts = size,
            vocabulary_empty = vectors.iter().all(TermVector::is_empty),
            "Computed similarity matrix"
        );
        Some(SimilarityMatrix { size, values })
    }
}

/// Pairwise similarity matrix with the default vectorizer.
pub fn similarity_matrix<S: AsRef<str>>(texts: &[S]) -> Option<SimilarityMatrix> {
    TfIdfVectorizer::default().similarity_matrix(texts)
}

/// Symmetric `size × size` similarity matrix with unit diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn size(&self) -> usize {
        self.size
    }

    /// Similarity between texts `i` and `j`, or `None` if out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.size && j < self.size {
            Some(self.values[i * self.size + j])
        } else {
            None
        }
    }

    /// Rows of the matrix, for display.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.size)
    }
}
