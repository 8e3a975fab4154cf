#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use moodlens::classifier::network::{HIDDEN_1, HIDDEN_2};
use moodlens::{LinearParams, ModelParameters, SentimentClassifier, Vocabulary, DEFAULT_CATEGORIES};
use ndarray::{Array1, Array2};

pub const FEATURES: usize = 64;
pub const NORMAL_BIAS: f32 = 0.5;

/// (term, feature index, idf, category index)
pub const TERMS: [(&str, usize, f32, usize); 10] = [
    ("worried", 0, 1.5, 0),
    ("anxious", 42, 3.0, 0),
    ("manic", 5, 2.0, 1),
    ("hopeless", 9, 2.0, 2),
    ("empty", 10, 1.0, 2),
    ("sunshine", 17, 2.5, 3),
    ("narcissistic", 23, 2.0, 4),
    ("deadline", 30, 2.0, 5),
    ("overwhelmed", 31, 1.5, 5),
    ("goodbye", 50, 2.0, 6),
];

// Initialize test logger
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

pub fn vocabulary() -> Vocabulary {
    let terms: BTreeMap<String, usize> = TERMS.iter().map(|&(t, i, _, _)| (t.to_string(), i)).collect();
    let mut idf = vec![1.0; FEATURES];
    for &(_, index, weight, _) in &TERMS {
        idf[index] = weight;
    }
    Vocabulary::new(terms, idf)
}

/// Weights that pass each known term straight through to its category's
/// logit, so every expected prediction can be worked out by hand:
/// `logit[c] = Σ tfidf(term) for terms of c`, plus a bias on "Normal".
pub fn parameters() -> ModelParameters {
    let fc1 = Array2::from_shape_fn((HIDDEN_1, FEATURES), |(o, i)| if o == i { 1.0 } else { 0.0 });
    let fc2 = Array2::from_shape_fn((HIDDEN_2, HIDDEN_1), |(o, i)| if o == i { 1.0 } else { 0.0 });
    let mut fc3 = Array2::<f32>::zeros((DEFAULT_CATEGORIES.len(), HIDDEN_2));
    for &(_, index, _, category) in &TERMS {
        fc3[[category, index]] = 1.0;
    }
    let mut bias3 = Array1::<f32>::zeros(DEFAULT_CATEGORIES.len());
    bias3[3] = NORMAL_BIAS;

    ModelParameters::new(
        LinearParams::new(fc1, Array1::zeros(HIDDEN_1)),
        LinearParams::new(fc2, Array1::zeros(HIDDEN_2)),
        LinearParams::new(fc3, bias3),
    )
    .with_categories(DEFAULT_CATEGORIES.to_vec())
}

pub fn classifier() -> SentimentClassifier {
    SentimentClassifier::builder()
        .with_vocabulary(vocabulary())
        .with_parameters(parameters())
        .build()
        .expect("Failed to create classifier")
}

/// Writes `vocabulary.json` and `model.safetensors` into a fresh temp dir.
pub fn write_artifacts(tag: &str, params: &ModelParameters) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("moodlens-test-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("vocabulary.json"), serde_json::to_string(&vocabulary()).unwrap()).unwrap();
    std::fs::write(dir.join("model.safetensors"), params.to_bytes().unwrap()).unwrap();
    dir
}

/// Softmax probability of the winning logit `top` among `others`.
pub fn expected_confidence(top: f32, others: &[f32]) -> f32 {
    let max = others.iter().copied().fold(top, f32::max);
    let denom: f32 = std::iter::once(top).chain(others.iter().copied()).map(|x| (x - max).exp()).sum();
    (top - max).exp() / denom
}
