pub mod gradient_clipper;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub use gradient_clipper::GradientClipper;

/// Parameter update rule.
///
/// `layer` identifies which layer's parameters are being updated so that
/// stateful optimizers keep separate moment estimates per layer. `step` is
/// called once after every layer has been updated for a minibatch.
pub trait Optimizer {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32);
    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32);
    fn step(&mut self) {}
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum OptimizerWrapper {
    SGD(SGD),
    Adam(Adam),
}

impl Optimizer for OptimizerWrapper {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_weights(layer, weights, gradients, learning_rate),
        }
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
            OptimizerWrapper::Adam(optimizer) => optimizer.update_biases(layer, biases, gradients, learning_rate),
        }
    }

    fn step(&mut self) {
        match self {
            OptimizerWrapper::SGD(optimizer) => optimizer.step(),
            OptimizerWrapper::Adam(optimizer) => optimizer.step(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SGD;

impl SGD {
    pub fn new() -> SGD {
        SGD
    }
}

impl Optimizer for SGD {
    fn update_weights(&mut self, _layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        weights.zip_mut_with(gradients, |w, &g| *w -= learning_rate * g);
    }

    fn update_biases(&mut self, _layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        biases.zip_mut_with(gradients, |b, &g| *b -= learning_rate * g);
    }
}

/// Adam with bias-corrected moment estimates.
///
/// Moment buffers are allocated lazily the first time a layer is updated, so
/// the optimizer can be built before the network it drives.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Adam {
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    m_weights: Vec<Array2<f32>>,
    v_weights: Vec<Array2<f32>>,
    m_biases: Vec<Array1<f32>>,
    v_biases: Vec<Array1<f32>>,
    pub t: usize,
}

impl Adam {
    pub fn new(beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Adam {
            beta1,
            beta2,
            epsilon,
            m_weights: Vec::new(),
            v_weights: Vec::new(),
            m_biases: Vec::new(),
            v_biases: Vec::new(),
            t: 1,
        }
    }

    fn bias_correction(&self) -> (f32, f32) {
        (
            1.0 - self.beta1.powi(self.t as i32),
            1.0 - self.beta2.powi(self.t as i32),
        )
    }
}

impl Default for Adam {
    fn default() -> Self {
        Self::new(0.9, 0.999, 1e-7)
    }
}

fn ensure_slot2(slots: &mut Vec<Array2<f32>>, layer: usize, dim: (usize, usize)) {
    while slots.len() <= layer {
        slots.push(Array2::zeros((0, 0)));
    }
    if slots[layer].dim() != dim {
        slots[layer] = Array2::zeros(dim);
    }
}

fn ensure_slot1(slots: &mut Vec<Array1<f32>>, layer: usize, len: usize) {
    while slots.len() <= layer {
        slots.push(Array1::zeros(0));
    }
    if slots[layer].len() != len {
        slots[layer] = Array1::zeros(len);
    }
}

impl Optimizer for Adam {
    fn update_weights(&mut self, layer: usize, weights: &mut Array2<f32>, gradients: &Array2<f32>, learning_rate: f32) {
        ensure_slot2(&mut self.m_weights, layer, weights.dim());
        ensure_slot2(&mut self.v_weights, layer, weights.dim());
        let (c1, c2) = self.bias_correction();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        let m = &mut self.m_weights[layer];
        let v = &mut self.v_weights[layer];
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(weights)
            .and(&*m)
            .and(&*v)
            .for_each(|w, &m, &v| *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps));
    }

    fn update_biases(&mut self, layer: usize, biases: &mut Array1<f32>, gradients: &Array1<f32>, learning_rate: f32) {
        ensure_slot1(&mut self.m_biases, layer, biases.len());
        ensure_slot1(&mut self.v_biases, layer, biases.len());
        let (c1, c2) = self.bias_correction();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);

        let m = &mut self.m_biases[layer];
        let v = &mut self.v_biases[layer];
        m.zip_mut_with(gradients, |m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        v.zip_mut_with(gradients, |v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        ndarray::Zip::from(biases)
            .and(&*m)
            .and(&*v)
            .for_each(|b, &m, &v| *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + eps));
    }

    fn step(&mut self) {
        self.t += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_sgd_step() {
        let mut sgd = SGD::new();
        let mut w = array![[1.0, 2.0]];
        sgd.update_weights(0, &mut w, &array![[0.5, -0.5]], 0.1);
        assert_relative_eq!(w[[0, 0]], 0.95);
        assert_relative_eq!(w[[0, 1]], 2.05);
    }

    #[test]
    fn test_adam_first_step_moves_by_learning_rate() {
        // With bias correction the first Adam step has magnitude ~lr regardless of gradient scale
        let mut adam = Adam::default();
        let mut w = array![[0.0, 0.0]];
        adam.update_weights(0, &mut w, &array![[100.0, -0.01]], 0.01);
        assert_relative_eq!(w[[0, 0]], -0.01, epsilon = 1e-5);
        assert_relative_eq!(w[[0, 1]], 0.01, epsilon = 1e-4);
    }

    #[test]
    fn test_adam_keeps_state_per_layer() {
        let mut adam = Adam::default();
        let mut w0 = array![[0.0]];
        let mut w1 = array![[0.0, 0.0, 0.0]];
        adam.update_weights(0, &mut w0, &array![[1.0]], 0.1);
        adam.update_weights(1, &mut w1, &array![[1.0, 1.0, 1.0]], 0.1);
        adam.step();
        adam.update_weights(0, &mut w0, &array![[1.0]], 0.1);
        assert_eq!(adam.t, 2);
        assert!(w0[[0, 0]] < w1[[0, 0]]);
    }
}
