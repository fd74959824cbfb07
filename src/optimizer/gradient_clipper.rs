use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Gradient clipping methods
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GradientClipper {
    /// Clip every gradient element into `[min, max]`
    ClipByValue { min: f32, max: f32 },

    /// Rescale a gradient tensor whose L2 norm exceeds `max_norm`
    ClipByNorm { max_norm: f32 },

    /// No clipping
    None,
}

impl Default for GradientClipper {
    fn default() -> Self {
        GradientClipper::None
    }
}

impl GradientClipper {
    /// Symmetric value clipping, `[-limit, limit]`.
    pub fn by_value(limit: f32) -> Self {
        GradientClipper::ClipByValue { min: -limit, max: limit }
    }

    /// Clip weight gradients
    pub fn clip_weights(&self, gradients: &mut Array2<f32>) {
        match *self {
            GradientClipper::ClipByValue { min, max } => {
                gradients.mapv_inplace(|g| g.max(min).min(max));
            }
            GradientClipper::ClipByNorm { max_norm } => {
                let norm = gradients.iter().map(|&g| g * g).sum::<f32>().sqrt();
                if norm > max_norm {
                    let scale = max_norm / norm;
                    gradients.mapv_inplace(|g| g * scale);
                }
            }
            GradientClipper::None => {}
        }
    }

    /// Clip bias gradients
    pub fn clip_biases(&self, gradients: &mut Array1<f32>) {
        match *self {
            GradientClipper::ClipByValue { min, max } => {
                gradients.mapv_inplace(|g| g.max(min).min(max));
            }
            GradientClipper::ClipByNorm { max_norm } => {
                let norm = gradients.iter().map(|&g| g * g).sum::<f32>().sqrt();
                if norm > max_norm {
                    let scale = max_norm / norm;
                    gradients.mapv_inplace(|g| g * scale);
                }
            }
            GradientClipper::None => {}
        }
    }
}
