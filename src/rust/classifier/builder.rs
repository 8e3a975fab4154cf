use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};

use super::classifier::SentimentClassifier;
use super::error::ClassifierError;
use super::network::ClassifierNetwork;
use super::normalizer::{CategoryTable, ScoreNormalizer};
use super::params::ModelParameters;
use super::vectorizer::{TfidfVectorizer, Vocabulary};
use crate::ArtifactManager;

/// File name of the fitted vocabulary inside an artifact directory.
pub const VOCABULARY_FILE: &str = "vocabulary.json";
/// File name of the network parameters inside an artifact directory.
pub const WEIGHTS_FILE: &str = "model.safetensors";

/// A builder for constructing a SentimentClassifier with a fluent interface.
///
/// All shape checks happen in [`build`](Self::build), so a classifier that
/// exists is one whose vectorizer, network and category table agree.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    vocabulary_path: Option<String>,
    weights_path: Option<String>,
    vocabulary: Option<Vocabulary>,
    parameters: Option<ModelParameters>,
    categories: Option<CategoryTable>,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `vocabulary.json` and `model.safetensors` from `dir`.
    ///
    /// # Example
    /// ```no_run
    /// use moodlens::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_artifacts("lib/ml-models");
    /// ```
    pub fn with_artifacts(self, dir: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ClassifierError::Configuration(format!(
                "Artifact directory not found: {}",
                dir.display()
            )));
        }
        self.with_vocabulary_file(dir.join(VOCABULARY_FILE))?
            .with_weights_file(dir.join(WEIGHTS_FILE))
    }

    /// Loads artifacts previously fetched into an [`ArtifactManager`] cache.
    pub fn with_managed_artifacts(
        self,
        manager: &ArtifactManager,
        name: &str,
    ) -> Result<Self, ClassifierError> {
        if !manager.is_downloaded(name) {
            return Err(ClassifierError::Configuration(format!(
                "Artifacts '{}' are not downloaded. Fetch them first using ArtifactManager::download()",
                name
            )));
        }
        self.with_vocabulary_file(manager.get_vocabulary_path(name))?
            .with_weights_file(manager.get_weights_path(name))
    }

    pub fn with_vocabulary_file(mut self, path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        if self.vocabulary.is_some() {
            return Err(ClassifierError::Configuration("Vocabulary already set".into()));
        }
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::Configuration(format!(
                "Vocabulary file not found: {}",
                path.display()
            )));
        }
        let vocabulary = Vocabulary::from_file(path).map_err(|e| {
            error!("Failed to load vocabulary: {}", e);
            e
        })?;
        self.vocabulary_path = Some(path.to_string_lossy().to_string());
        self.vocabulary = Some(vocabulary);
        Ok(self)
    }

    pub fn with_weights_file(mut self, path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        if self.parameters.is_some() {
            return Err(ClassifierError::Configuration("Model parameters already set".into()));
        }
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifierError::Configuration(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let parameters = ModelParameters::from_file(path).map_err(|e| {
            error!("Failed to load model parameters: {}", e);
            e
        })?;
        self.weights_path = Some(path.to_string_lossy().to_string());
        self.parameters = Some(parameters);
        Ok(self)
    }

    /// Uses an in-memory vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Uses in-memory model parameters.
    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Overrides the category table, whatever the weights artifact says.
    pub fn with_categories(mut self, categories: Vec<impl Into<String>>) -> Result<Self, ClassifierError> {
        self.categories = Some(CategoryTable::new(categories)?);
        Ok(self)
    }

    /// Builds and returns the final SentimentClassifier.
    ///
    /// # Returns
    /// * `Err(ClassifierError::Configuration)` if:
    ///   - the vocabulary or parameters are missing
    ///   - the layer widths do not chain `V → 256 → 128 → C`
    ///   - the vocabulary size differs from the network input width
    ///   - the category count differs from the network output width
    pub fn build(self) -> Result<SentimentClassifier, ClassifierError> {
        let vocabulary = self
            .vocabulary
            .ok_or_else(|| ClassifierError::Configuration("Vocabulary must be set".into()))?;
        let parameters = self
            .parameters
            .ok_or_else(|| ClassifierError::Configuration("Model parameters must be set".into()))?;

        let categories = match (self.categories, &parameters.categories) {
            (Some(explicit), _) => explicit,
            (None, Some(shipped)) => CategoryTable::new(shipped.clone())?,
            (None, None) => {
                warn!("Model parameters carry no category table; using the built-in ordering");
                CategoryTable::default()
            }
        };

        let vectorizer = TfidfVectorizer::new(vocabulary)?;
        let network = ClassifierNetwork::from_parameters(parameters)?;
        Self::validate_pipeline(&vectorizer, &network, &categories)?;
        info!(
            "Classifier ready: {} features, {} categories",
            network.input_width(),
            categories.len()
        );

        Ok(SentimentClassifier {
            vocabulary_path: self.vocabulary_path,
            weights_path: self.weights_path,
            vectorizer: Arc::new(vectorizer),
            network: Arc::new(network),
            normalizer: Arc::new(ScoreNormalizer::new(categories)),
        })
    }

    /// Checks the widths that connect the three pipeline stages.
    fn validate_pipeline(
        vectorizer: &TfidfVectorizer,
        network: &ClassifierNetwork,
        categories: &CategoryTable,
    ) -> Result<(), ClassifierError> {
        if vectorizer.feature_count() != network.input_width() {
            return Err(ClassifierError::Configuration(format!(
                "Shape mismatch: vectorizer produces {} features but the network expects {}",
                vectorizer.feature_count(),
                network.input_width()
            )));
        }
        if categories.len() != network.output_width() {
            return Err(ClassifierError::Configuration(format!(
                "Shape mismatch: {} categories but the network produces {} logits",
                categories.len(),
                network.output_width()
            )));
        }
        Ok(())
    }
}
