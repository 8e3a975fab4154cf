//! A thread-safe mental-health sentiment classifier: TF-IDF features, a
//! three-layer feed-forward network, and softmax confidence scoring.
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use moodlens::SentimentClassifier;
//!
//! let classifier = SentimentClassifier::builder()
//!     .with_artifacts("lib/ml-models")?
//!     .build()?;
//!
//! let prediction = classifier.predict("I feel so empty and hopeless")?;
//! println!("{} ({:.2})", prediction.sentiment, prediction.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Artifacts
//!
//! An artifact directory holds `vocabulary.json` (the fitted TF-IDF
//! vocabulary) and `model.safetensors` (the network weights, optionally with
//! the ordered category table in its metadata). Both are loaded once; every
//! shape invariant is checked by [`ClassifierBuilder::build`] so a
//! misconfigured service never starts.
//!
//! # Serving
//!
//! [`server::create_router`] exposes the classifier as `POST /analyze`,
//! answering `{ "sentiment", "confidence" }` or `{ "error" }` with a 500.

use std::sync::Once;

pub mod classifier;
pub mod runtime;
pub mod artifact_manager;
pub mod server;

pub use classifier::{
    ClassifierBuilder, ClassifierError, ClassifierInfo, Prediction, PredictionFailure,
    SentimentClassifier,
};
pub use classifier::normalizer::{CategoryTable, DEFAULT_CATEGORIES};
pub use classifier::params::{LinearParams, ModelParameters};
pub use classifier::vectorizer::{Norm, TfidfVectorizer, Vocabulary};
pub use runtime::{RuntimeConfig, create_runtime};
pub use artifact_manager::{ArtifactManager, ArtifactError, ArtifactInfo};

static LOGGER: Once = Once::new();

/// Installs `env_logger`, defaulting to `info` unless `RUST_LOG` says otherwise.
pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    });
}
