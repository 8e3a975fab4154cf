use serde::Serialize;

mod error;
mod utils;
pub mod vectorizer;
pub mod network;
pub mod normalizer;
pub mod params;
#[allow(clippy::module_inception)]
mod classifier;
pub mod builder;

pub use error::{ClassifierError, PredictionFailure};
pub use classifier::{Prediction, SentimentClassifier};
pub use builder::ClassifierBuilder;

/// Information about the configuration of a classifier
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierInfo {
    /// Path to the vocabulary artifact, if loaded from disk
    pub vocabulary_path: Option<String>,
    /// Path to the weights artifact, if loaded from disk
    pub weights_path: Option<String>,
    /// Length of the feature vector, `V`
    pub vocabulary_size: usize,
    /// Widths of the two hidden layers
    pub hidden_sizes: (usize, usize),
    /// Number of categories, `C`
    pub num_classes: usize,
    /// Category names in output order
    pub class_labels: Vec<String>,
}
