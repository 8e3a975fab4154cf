use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error};
use ndarray::Array1;
use serde::Serialize;

use super::error::{ClassifierError, PredictionFailure};
use super::network::{ClassifierNetwork, HIDDEN_1, HIDDEN_2};
use super::normalizer::ScoreNormalizer;
use super::vectorizer::TfidfVectorizer;

/// The label and confidence returned for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub sentiment: String,
    pub confidence: f32,
}

/// A thread-safe sentiment classifier: TF-IDF features, a feed-forward
/// network, and softmax scoring over a fixed category table.
///
/// # Thread Safety
///
/// Every component is immutable after [`build`](super::ClassifierBuilder::build)
/// and held behind an `Arc`, so clones are cheap and predictions can run
/// concurrently from any number of threads without locking.
///
/// ```rust,no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use moodlens::SentimentClassifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(
///     SentimentClassifier::builder()
///         .with_artifacts("artifacts")?
///         .build()?,
/// );
///
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     let prediction = classifier_clone.predict("I can't stop worrying").unwrap();
///     println!("{} ({:.2})", prediction.sentiment, prediction.confidence);
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    pub(super) vocabulary_path: Option<String>,
    pub(super) weights_path: Option<String>,
    pub(super) vectorizer: Arc<TfidfVectorizer>,
    pub(super) network: Arc<ClassifierNetwork>,
    pub(super) normalizer: Arc<ScoreNormalizer>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<SentimentClassifier>();
    }
};

impl SentimentClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's configuration
    pub fn info(&self) -> super::ClassifierInfo {
        super::ClassifierInfo {
            vocabulary_path: self.vocabulary_path.clone(),
            weights_path: self.weights_path.clone(),
            vocabulary_size: self.network.input_width(),
            hidden_sizes: (HIDDEN_1, HIDDEN_2),
            num_classes: self.network.output_width(),
            class_labels: self.normalizer.categories().labels().to_vec(),
        }
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    /// Feature vector for `text`, exactly as it enters the network.
    pub fn vectorize(&self, text: &str) -> Array1<f32> {
        self.vectorizer.vectorize(text)
    }

    /// Runs the pipeline and reports failures with their typed cause.
    pub fn try_predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let features = self.vectorizer.vectorize(text);
        let logits = self.network.forward(&features)?;
        let (sentiment, confidence) = self.normalizer.normalize(&logits)?;
        Ok(Prediction {
            sentiment,
            confidence,
        })
    }

    /// Classifies `text`.
    ///
    /// Empty text is a valid input. Any failure inside the pipeline,
    /// including a panic, is reported once as a [`PredictionFailure`].
    ///
    /// # Example
    /// ```rust,no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let classifier = moodlens::SentimentClassifier::builder()
    /// #     .with_artifacts("artifacts")?
    /// #     .build()?;
    /// let prediction = classifier.predict("Today was a good day")?;
    /// println!("{}: {:.2}", prediction.sentiment, prediction.confidence);
    /// # Ok(())
    /// # }
    /// ```
    pub fn predict(&self, text: &str) -> Result<Prediction, PredictionFailure> {
        match guarded(|| self.try_predict(text)) {
            Ok(prediction) => {
                debug!(
                    "Predicted {} ({:.4}) for {:?}",
                    prediction.sentiment,
                    prediction.confidence,
                    preview(text)
                );
                Ok(prediction)
            }
            Err(failure) => {
                error!("Error in sentiment analysis [{}]: {}", failure.code, failure.message);
                Err(failure)
            }
        }
    }
}

/// Runs `f`, folding both errors and panics into a [`PredictionFailure`].
fn guarded<T>(f: impl FnOnce() -> Result<T, ClassifierError>) -> Result<T, PredictionFailure> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(PredictionFailure::from),
        Err(payload) => {
            let cause = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ClassifierError::Internal(cause).into())
        }
    }
}

fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 50;
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
