use std::marker::PhantomData;

use ndarray::{Array1, Array2};

use super::error::ClassifierError;
use super::params::{LinearParams, ModelParameters};
use super::utils::relu;

/// Width of the first hidden layer.
pub const HIDDEN_1: usize = 256;
/// Width of the second hidden layer.
pub const HIDDEN_2: usize = 128;
/// Dropout probability used while the weights were trained.
pub const DROPOUT_P: f32 = 0.3;

mod sealed {
    pub trait Sealed {}
}

/// Execution mode of a [`ClassifierNetwork`], fixed by its type.
///
/// Only [`Inference`] exists, and the network can only be built in that mode,
/// so the training-time dropout stage can never run on a served request.
pub trait Mode: sealed::Sealed + Send + Sync + 'static {
    fn dropout(x: Array1<f32>, p: f32) -> Array1<f32>;
}

/// Deterministic evaluation mode: dropout is the identity.
#[derive(Debug, Clone, Copy)]
pub struct Inference;

impl sealed::Sealed for Inference {}

impl Mode for Inference {
    #[inline]
    fn dropout(x: Array1<f32>, _p: f32) -> Array1<f32> {
        x
    }
}

#[derive(Debug, Clone)]
struct Linear {
    name: &'static str,
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    fn new(name: &'static str, params: LinearParams) -> Result<Self, ClassifierError> {
        if params.bias.len() != params.out_features() {
            return Err(ClassifierError::Configuration(format!(
                "{}: bias has {} values but weight has {} output rows",
                name,
                params.bias.len(),
                params.out_features()
            )));
        }
        Ok(Self {
            name,
            weight: params.weight,
            bias: params.bias,
        })
    }

    fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    fn forward(&self, x: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        if x.len() != self.in_features() {
            return Err(ClassifierError::ShapeMismatch {
                context: self.name,
                expected: self.in_features(),
                actual: x.len(),
            });
        }
        Ok(self.weight.dot(x) + &self.bias)
    }
}

/// The fixed three-layer feed-forward classifier:
/// `V → 256 (ReLU, dropout) → 128 (ReLU, dropout) → C`.
#[derive(Debug, Clone)]
pub struct ClassifierNetwork<M: Mode = Inference> {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
    _mode: PhantomData<M>,
}

impl ClassifierNetwork<Inference> {
    /// Builds an inference-mode network, checking that the layers chain
    /// `V → 256 → 128 → C`.
    pub fn from_parameters(params: ModelParameters) -> Result<Self, ClassifierError> {
        let fc1 = Linear::new("fc1", params.fc1)?;
        let fc2 = Linear::new("fc2", params.fc2)?;
        let fc3 = Linear::new("fc3", params.fc3)?;

        let expectations = [
            ("fc1 output", HIDDEN_1, fc1.out_features()),
            ("fc2 input", HIDDEN_1, fc2.in_features()),
            ("fc2 output", HIDDEN_2, fc2.out_features()),
            ("fc3 input", HIDDEN_2, fc3.in_features()),
        ];
        for (what, expected, actual) in expectations {
            if expected != actual {
                return Err(ClassifierError::Configuration(format!(
                    "Shape mismatch: {} width is {}, architecture requires {}",
                    what, actual, expected
                )));
            }
        }
        if fc1.in_features() == 0 || fc3.out_features() == 0 {
            return Err(ClassifierError::Configuration(
                "Network input and output widths must be non-zero".into(),
            ));
        }

        Ok(Self {
            fc1,
            fc2,
            fc3,
            _mode: PhantomData,
        })
    }
}

impl<M: Mode> ClassifierNetwork<M> {
    /// Feature width the first layer expects, `V`.
    pub fn input_width(&self) -> usize {
        self.fc1.in_features()
    }

    /// Number of logits produced, `C`.
    pub fn output_width(&self) -> usize {
        self.fc3.out_features()
    }

    /// Runs the forward pass and returns raw logits.
    pub fn forward(&self, x: &Array1<f32>) -> Result<Array1<f32>, ClassifierError> {
        if x.len() != self.input_width() {
            return Err(ClassifierError::ShapeMismatch {
                context: "network input",
                expected: self.input_width(),
                actual: x.len(),
            });
        }
        let h = M::dropout(relu(self.fc1.forward(x)?), DROPOUT_P);
        let h = M::dropout(relu(self.fc2.forward(&h)?), DROPOUT_P);
        self.fc3.forward(&h)
    }
}
