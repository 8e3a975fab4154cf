use thiserror::Error;

/// Represents the different types of errors that can occur in the sentiment classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Missing or incompatible artifacts, or components whose shapes disagree.
    /// Raised while building the classifier; the service must not start.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// An artifact file could not be read or deserialized
    #[error("Artifact error ({path}): {message}")]
    Artifact { path: String, message: String },
    /// A vector or tensor did not have the width a component expects
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The network's output width and the category table disagree, so some
    /// class index has no label
    #[error("Network produced {logits} logits for a category table of length {len}")]
    IndexOutOfRange { logits: usize, len: usize },
    /// Anything else that went wrong inside the pipeline
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClassifierError {
    /// Stable code for logs and diagnostics. Never exposed in the HTTP body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "E_CONFIG",
            Self::Artifact { .. } => "E_ARTIFACT",
            Self::ShapeMismatch { .. } => "E_SHAPE",
            Self::IndexOutOfRange { .. } => "E_INDEX",
            Self::Internal(_) => "E_INTERNAL",
        }
    }

    pub(crate) fn artifact(path: impl AsRef<std::path::Path>, message: impl ToString) -> Self {
        Self::Artifact {
            path: path.as_ref().display().to_string(),
            message: message.to_string(),
        }
    }
}

/// The single failure outcome of [`SentimentClassifier::predict`](super::SentimentClassifier::predict).
///
/// Carries the internal error code next to the human-readable cause so the
/// serving layer can log it, while only the message crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prediction failed: {message}")]
pub struct PredictionFailure {
    pub code: &'static str,
    pub message: String,
}

impl From<ClassifierError> for PredictionFailure {
    fn from(err: ClassifierError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
