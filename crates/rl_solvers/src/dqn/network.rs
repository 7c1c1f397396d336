//! Q-function approximators for the DQN solver.
//!
//! The solver only needs the black-box capability described by
//! [`QFunction`]: a forward pass, a backward pass that accumulates gradients
//! for a given output gradient, and a gradient-descent step. [`Mlp`] is the
//! default implementation, a single tanh hidden layer on `ndarray`.

use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::Rng;

/// A differentiable map from a state vector to one value per action.
pub trait QFunction {
    /// Length of the state vector.
    fn input_size(&self) -> usize;

    /// Width of the hidden representation, reported in snapshots.
    fn hidden_units(&self) -> usize;

    /// Number of actions.
    fn output_size(&self) -> usize;

    /// Computes the action values of `input`.
    fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64>;

    /// Accumulates parameter gradients for `input`, given the gradient of the
    /// loss with respect to the outputs.
    fn backward(&mut self, input: ArrayView1<'_, f64>, output_gradient: ArrayView1<'_, f64>);

    /// Applies `param -= learning_rate * grad` and clears the accumulated
    /// gradients.
    fn update(&mut self, learning_rate: f64);

    /// Draws fresh parameters.
    fn reinitialize(&mut self, rng: &mut StdRng);

    /// All parameters, flattened.
    fn parameters(&self) -> Vec<f64>;

    /// Overwrites all parameters from a flattened slice.
    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()>;
}

/// A two-layer perceptron: `y = W2 tanh(W1 x + b1) + b2`.
///
/// Weights use Xavier/Glorot uniform initialization, biases start at zero.
/// Flattened parameter order is `w1, b1, w2, b2`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Mlp {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array2<f64>,
    b2: Array1<f64>,
    dw1: Array2<f64>,
    db1: Array1<f64>,
    dw2: Array2<f64>,
    db2: Array1<f64>,
}

impl Mlp {
    /// Creates a randomly initialized network.
    pub fn new(input_size: usize, hidden_units: usize, output_size: usize, rng: &mut StdRng) -> Self {
        let mut net = Self {
            w1: Array2::zeros((hidden_units, input_size)),
            b1: Array1::zeros(hidden_units),
            w2: Array2::zeros((output_size, hidden_units)),
            b2: Array1::zeros(output_size),
            dw1: Array2::zeros((hidden_units, input_size)),
            db1: Array1::zeros(hidden_units),
            dw2: Array2::zeros((output_size, hidden_units)),
            db2: Array1::zeros(output_size),
        };
        net.reinitialize(rng);
        net
    }

    fn xavier(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
        let scale = (6.0 / (rows + cols) as f64).sqrt();
        Array2::from_shape_fn((rows, cols), |_| (rng.random::<f64>() * 2.0 - 1.0) * scale)
    }

    fn hidden(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut h = self.w1.dot(&input) + &self.b1;
        h.mapv_inplace(f64::tanh);
        h
    }

    /// Total number of parameters.
    pub fn parameter_count(&self) -> usize {
        self.w1.len() + self.b1.len() + self.w2.len() + self.b2.len()
    }

    fn clear_gradients(&mut self) {
        self.dw1.fill(0.0);
        self.db1.fill(0.0);
        self.dw2.fill(0.0);
        self.db2.fill(0.0);
    }
}

fn outer(column: &Array1<f64>, row: ArrayView1<'_, f64>) -> Array2<f64> {
    column
        .view()
        .insert_axis(Axis(1))
        .dot(&row.insert_axis(Axis(0)))
}

impl QFunction for Mlp {
    fn input_size(&self) -> usize {
        self.w1.ncols()
    }

    fn hidden_units(&self) -> usize {
        self.w1.nrows()
    }

    fn output_size(&self) -> usize {
        self.w2.nrows()
    }

    fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let h = self.hidden(input);
        self.w2.dot(&h) + &self.b2
    }

    fn backward(&mut self, input: ArrayView1<'_, f64>, output_gradient: ArrayView1<'_, f64>) {
        let h = self.hidden(input);
        let g = output_gradient.to_owned();

        self.dw2 += &outer(&g, h.view());
        self.db2 += &g;

        // d tanh(z) / dz = 1 - tanh(z)^2
        let dh = self.w2.t().dot(&g);
        let dz = &dh * &h.mapv(|v| 1.0 - v * v);

        self.dw1 += &outer(&dz, input);
        self.db1 += &dz;
    }

    fn update(&mut self, learning_rate: f64) {
        self.w1.scaled_add(-learning_rate, &self.dw1);
        self.b1.scaled_add(-learning_rate, &self.db1);
        self.w2.scaled_add(-learning_rate, &self.dw2);
        self.b2.scaled_add(-learning_rate, &self.db2);
        self.clear_gradients();
    }

    fn reinitialize(&mut self, rng: &mut StdRng) {
        let (hidden, input) = self.w1.dim();
        let output = self.w2.nrows();
        self.w1 = Self::xavier(hidden, input, rng);
        self.b1.fill(0.0);
        self.w2 = Self::xavier(output, hidden, rng);
        self.b2.fill(0.0);
        self.clear_gradients();
    }

    fn parameters(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.parameter_count());
        out.extend(self.w1.iter());
        out.extend(self.b1.iter());
        out.extend(self.w2.iter());
        out.extend(self.b2.iter());
        out
    }

    fn set_parameters(&mut self, parameters: &[f64]) -> Result<()> {
        let expected = self.parameter_count();
        if parameters.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: parameters.len(),
            });
        }

        let mut source = parameters.iter().copied();
        for target in self
            .w1
            .iter_mut()
            .chain(self.b1.iter_mut())
            .chain(self.w2.iter_mut())
            .chain(self.b2.iter_mut())
        {
            if let Some(value) = source.next() {
                *target = value;
            }
        }
        self.clear_gradients();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn net() -> Mlp {
        Mlp::new(3, 5, 2, &mut StdRng::seed_from_u64(9))
    }

    #[test]
    fn test_shapes() {
        let net = net();
        assert_eq!(net.input_size(), 3);
        assert_eq!(net.hidden_units(), 5);
        assert_eq!(net.output_size(), 2);
        assert_eq!(net.parameter_count(), 3 * 5 + 5 + 5 * 2 + 2);
        assert_eq!(net.parameters().len(), net.parameter_count());

        let out = net.forward(array![0.1, -0.2, 0.3].view());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_xavier_bounds_and_zero_biases() {
        let net = net();
        let limit = (6.0 / 8.0f64).sqrt();
        assert!(net.w1.iter().all(|w| w.abs() <= limit));
        assert!(net.b1.iter().all(|b| *b == 0.0));
        assert!(net.b2.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn test_gradient_step_reduces_error_on_one_output() {
        let mut net = net();
        let x = array![0.5, -0.5, 1.0];
        let target = 1.0;

        let before = net.forward(x.view());
        let err_before = (before[0] - target).abs();
        let untouched = before[1];

        for _ in 0..20 {
            let pred = net.forward(x.view());
            let grad = array![pred[0] - target, 0.0];
            net.backward(x.view(), grad.view());
            net.update(0.05);
        }

        let after = net.forward(x.view());
        assert!((after[0] - target).abs() < err_before);
        // Output 1 only moves through the shared hidden layer.
        assert!((after[1] - untouched).abs() < 1.0);
    }

    #[test]
    fn test_zero_gradient_leaves_parameters() {
        let mut net = net();
        let before = net.parameters();
        net.backward(array![1.0, 2.0, 3.0].view(), array![0.0, 0.0].view());
        net.update(0.1);
        assert_eq!(net.parameters(), before);
    }

    #[test]
    fn test_set_parameters() {
        let mut a = net();
        let b = Mlp::new(3, 5, 2, &mut StdRng::seed_from_u64(10));
        assert_ne!(a.parameters(), b.parameters());

        a.set_parameters(&b.parameters()).unwrap();
        assert_eq!(a.parameters(), b.parameters());
        let x = array![0.3, 0.2, 0.1];
        assert_eq!(a.forward(x.view()), b.forward(x.view()));

        assert!(matches!(
            a.set_parameters(&[0.0; 4]),
            Err(Error::DimensionMismatch { actual: 4, .. })
        ));
    }

    #[test]
    fn test_reinitialize_is_seeded() {
        let mut a = net();
        let mut b = net();
        a.reinitialize(&mut StdRng::seed_from_u64(1));
        b.reinitialize(&mut StdRng::seed_from_u64(1));
        assert_eq!(a.parameters(), b.parameters());
    }
}
