use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Regression loss used by the value network.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum LossFunction {
    /// Mean of squared errors over every element of the batch
    MeanSquared,
    /// Smooth L1: quadratic inside `delta`, linear outside
    Huber { delta: f32 },
}

impl Default for LossFunction {
    fn default() -> Self {
        LossFunction::MeanSquared
    }
}

impl LossFunction {
    pub fn compute(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> f32 {
        let diff = &predictions - &targets;
        let count = diff.len().max(1) as f32;
        match *self {
            LossFunction::MeanSquared => diff.mapv(|x| x * x).sum() / count,
            LossFunction::Huber { delta } => {
                diff.mapv(|x| {
                    let abs_x = x.abs();
                    if abs_x <= delta {
                        0.5 * x * x
                    } else {
                        delta * abs_x - 0.5 * delta * delta
                    }
                })
                .sum()
                    / count
            }
        }
    }

    /// Gradient of [`LossFunction::compute`] with respect to `predictions`.
    pub fn gradient(&self, predictions: ArrayView2<f32>, targets: ArrayView2<f32>) -> Array2<f32> {
        let diff = &predictions - &targets;
        let count = diff.len().max(1) as f32;
        match *self {
            LossFunction::MeanSquared => diff.mapv(|x| 2.0 * x / count),
            LossFunction::Huber { delta } => diff.mapv(|x| x.max(-delta).min(delta) / count),
        }
    }
}
