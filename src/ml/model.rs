use burn::{
    nn::{
        loss::BinaryCrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, sigmoid},
};

/// Hidden layer widths of the default topology: four decreasing
/// ReLU layers, followed by the output layer (five dense layers).
pub const DEFAULT_HIDDEN_SIZES: [usize; 4] = [128, 64, 32, 16];

/// Probability above which a label counts as present
pub const DECISION_THRESHOLD: f64 = 0.5;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct SpectrumClassifierConfig {
    /// Number of spectrum bins
    pub input_size:   usize,
    pub hidden_sizes: Vec<usize>,
    /// 1 for the binary Ag task, one per element for multi-label
    pub num_outputs:  usize,
    /// Applied after every hidden activation; 0.0 disables it
    #[config(default = 0.0)]
    pub dropout:      f64,
}

impl SpectrumClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SpectrumClassifier<B> {
        let mut hidden = Vec::with_capacity(self.hidden_sizes.len());
        let mut width  = self.input_size;
        for &size in &self.hidden_sizes {
            hidden.push(LinearConfig::new(width, size).init(device));
            width = size;
        }
        let output  = LinearConfig::new(width, self.num_outputs).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        SpectrumClassifier { hidden, output, dropout }
    }
}

#[derive(Module, Debug)]
pub struct SpectrumClassifier<B: Backend> {
    pub hidden:  Vec<Linear<B>>,
    pub output:  Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> SpectrumClassifier<B> {
    /// features: [batch, input_size] → logits: [batch, num_outputs]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = features;
        for layer in &self.hidden {
            // Dropout is a no-op unless the backend tracks gradients
            x = self.dropout.forward(relu(layer.forward(x)));
        }
        self.output.forward(x)
    }

    /// Sigmoid of the logits: one independent probability per label
    pub fn forward_probs(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        sigmoid(self.forward(features))
    }

    /// Binary cross-entropy averaged over batch and labels.
    pub fn forward_loss(
        &self,
        features: Tensor<B, 2>,
        targets:  Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(features);
        let bce = BinaryCrossEntropyLossConfig::new()
            .with_logits(true)
            .init(&logits.device());
        let loss = bce.forward(logits.clone(), targets);
        (loss, logits)
    }
}

/// Number of (sample, label) cells predicted correctly at the 0.5
/// threshold, and the number of cells in total. Dividing the two
/// gives elementwise binary accuracy.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 2, Int>) -> (usize, usize) {
    let [batch, outputs] = targets.dims();
    let predicted = sigmoid(logits).greater_elem(DECISION_THRESHOLD).int();
    let correct: i64 = predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    (correct as usize, batch * outputs)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> SpectrumClassifierConfig {
        SpectrumClassifierConfig::new(16, DEFAULT_HIDDEN_SIZES.to_vec(), 1)
    }

    #[test]
    fn test_default_topology_has_five_dense_layers() {
        let device = Default::default();
        let model: SpectrumClassifier<TestBackend> = config().init(&device);
        assert_eq!(model.hidden.len() + 1, 5);
        assert_eq!(config().dropout, 0.0);
    }

    #[test]
    fn test_output_shape_and_probability_range() {
        let device = Default::default();
        let model: SpectrumClassifier<TestBackend> =
            SpectrumClassifierConfig::new(16, vec![8, 4], 3).init(&device);
        let x = Tensor::<TestBackend, 2>::ones([5, 16], &device);

        let probs = model.forward_probs(x);
        assert_eq!(probs.dims(), [5, 3]);
        let values: Vec<f32> = probs.into_data().to_vec().unwrap();
        assert!(values.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let device = Default::default();
        let model: SpectrumClassifier<TestBackend> = config().init(&device);
        let x = Tensor::<TestBackend, 2>::ones([4, 16], &device);
        let y = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1i64, 0, 1, 0], [4, 1]),
            &device,
        );
        let (loss, logits) = model.forward_loss(x, y);
        assert_eq!(logits.dims(), [4, 1]);
        let loss: f32 = loss.into_scalar().elem();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_count_correct_thresholds_at_half() {
        let device = Default::default();
        // sigmoid(2) > 0.5, sigmoid(-2) < 0.5
        let logits = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![2.0f32, -2.0, 2.0, -2.0], [2, 2]),
            &device,
        );
        let targets = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1i64, 0, 0, 0], [2, 2]),
            &device,
        );
        assert_eq!(count_correct(logits, targets), (3, 4));
    }
}
