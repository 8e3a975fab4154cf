use ndarray::Array1;

use super::error::ClassifierError;
use super::utils::{argmax, softmax};

/// The categories the bundled weights were trained on, in output order.
pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "Anxiety",
    "Bipolar",
    "Depression",
    "Normal",
    "Personality disorder",
    "Stress",
    "Suicidal",
];

/// Ordered category names; position `i` labels network output `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    labels: Vec<String>,
}

impl CategoryTable {
    pub fn new(labels: Vec<impl Into<String>>) -> Result<Self, ClassifierError> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifierError::Configuration("Category table cannot be empty".into()));
        }
        if let Some(pos) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(ClassifierError::Configuration(format!(
                "Category {} has an empty name",
                pos
            )));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(ClassifierError::Configuration(format!(
                    "Duplicate category '{}'",
                    label
                )));
            }
        }
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Turns logits into the top category and its softmax probability.
#[derive(Debug, Clone)]
pub struct ScoreNormalizer {
    categories: CategoryTable,
}

impl ScoreNormalizer {
    pub fn new(categories: CategoryTable) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    /// Softmax over `logits`, then the most probable category (lowest index
    /// on ties) with its probability.
    pub fn normalize(&self, logits: &Array1<f32>) -> Result<(String, f32), ClassifierError> {
        let out_of_range = || ClassifierError::IndexOutOfRange {
            logits: logits.len(),
            len: self.categories.len(),
        };
        if logits.len() != self.categories.len() {
            return Err(out_of_range());
        }

        let probabilities = softmax(logits);
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::Internal(
                "Softmax produced a non-finite probability".into(),
            ));
        }

        let index = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::Internal("No logits to normalize".into()))?;
        let label = self.categories.get(index).ok_or_else(out_of_range)?;
        Ok((label.to_string(), probabilities[index].clamp(0.0, 1.0)))
    }
}
