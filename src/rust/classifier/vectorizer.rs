//! TF-IDF feature extraction against a pre-fitted vocabulary.
//!
//! The vocabulary is produced at training time and loaded once; this module
//! only ever reads it. Tokenization mirrors the fitted vectorizer: optional
//! lowercasing, then maximal runs of word characters at least two
//! characters long, optionally combined into space-joined n-grams.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use log::info;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::normalize_vector;

const MIN_TOKEN_CHARS: usize = 2;

/// Post-weighting normalization applied to the feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L2,
}

fn default_true() -> bool {
    true
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

/// Token → index mapping plus per-index IDF weights, as fitted during training.
///
/// Terms are kept sorted so the serialized artifact is byte-stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f32>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub norm: Option<Norm>,
}

impl Vocabulary {
    /// Creates a vocabulary with the plain `tf × idf` weighting.
    pub fn new(vocabulary: BTreeMap<String, usize>, idf: Vec<f32>) -> Self {
        Self {
            vocabulary,
            idf,
            lowercase: true,
            ngram_range: default_ngram_range(),
            sublinear_tf: false,
            norm: None,
        }
    }

    pub fn with_norm(mut self, norm: Option<Norm>) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }

    pub fn with_ngram_range(mut self, lo: usize, hi: usize) -> Self {
        self.ngram_range = (lo, hi);
        self
    }

    /// Loads a vocabulary from its JSON artifact and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ClassifierError::artifact(path, e))?;
        let vocabulary: Vocabulary =
            serde_json::from_str(&json).map_err(|e| ClassifierError::artifact(path, e))?;
        vocabulary.validate()?;
        info!(
            "Vocabulary loaded from {:?}: {} terms, {} features",
            path,
            vocabulary.vocabulary.len(),
            vocabulary.len()
        );
        Ok(vocabulary)
    }

    /// Number of features, `V`.
    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// Checks the structural invariants a fitted vocabulary must satisfy.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.idf.is_empty() {
            return Err(ClassifierError::Configuration("Vocabulary has no features".into()));
        }
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(ClassifierError::Configuration(format!(
                "Invalid n-gram range ({}, {})",
                lo, hi
            )));
        }
        if let Some(pos) = self.idf.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(ClassifierError::Configuration(format!(
                "IDF weight at index {} is not a finite non-negative number",
                pos
            )));
        }
        let mut seen = HashSet::with_capacity(self.vocabulary.len());
        for (term, &index) in &self.vocabulary {
            if index >= self.idf.len() {
                return Err(ClassifierError::Configuration(format!(
                    "Term '{}' maps to index {} but only {} IDF weights exist",
                    term,
                    index,
                    self.idf.len()
                )));
            }
            if !seen.insert(index) {
                return Err(ClassifierError::Configuration(format!(
                    "Index {} is assigned to more than one term",
                    index
                )));
            }
        }
        Ok(())
    }
}

/// Maps raw text to a dense TF-IDF feature vector of length `V`.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: Vocabulary,
}

impl TfidfVectorizer {
    pub fn new(vocabulary: Vocabulary) -> Result<Self, ClassifierError> {
        vocabulary.validate()?;
        Ok(Self { vocabulary })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Width of every vector this vectorizer produces.
    pub fn feature_count(&self) -> usize {
        self.vocabulary.len()
    }

    /// Splits text into tokens using the fitted tokenization rule.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = if self.vocabulary.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
            .map(str::to_string)
            .collect()
    }

    /// Expands tokens into the terms the vocabulary was fitted on.
    fn terms(&self, tokens: &[String]) -> Vec<String> {
        let (lo, hi) = self.vocabulary.ngram_range;
        if (lo, hi) == (1, 1) {
            return tokens.to_vec();
        }
        let mut terms = Vec::new();
        for n in lo..=hi.min(tokens.len()) {
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }

    /// Produces the feature vector for `text`. Never fails; unseen terms
    /// contribute nothing and the empty string yields the zero vector.
    pub fn vectorize(&self, text: &str) -> Array1<f32> {
        let mut features = Array1::<f32>::zeros(self.feature_count());

        for term in self.terms(&self.tokenize(text)) {
            if let Some(&index) = self.vocabulary.vocabulary.get(&term) {
                features[index] += 1.0;
            }
        }

        let sublinear = self.vocabulary.sublinear_tf;
        for (value, &idf) in features.iter_mut().zip(self.vocabulary.idf.iter()) {
            if *value > 0.0 {
                let tf = if sublinear { 1.0 + value.ln() } else { *value };
                *value = tf * idf;
            }
        }

        match self.vocabulary.norm {
            Some(Norm::L2) => normalize_vector(&features),
            None => features,
        }
    }
}
