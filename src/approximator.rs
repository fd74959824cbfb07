//! # Function Approximator Interface
//!
//! The agent only ever talks to its value networks through [`QFunction`]:
//! batched prediction, one supervised update per call, and wholesale weight
//! snapshot/restore. [`crate::network::NeuralNetwork`] is the bundled
//! implementation; anything else that can map a batch of states to per-action
//! values can be plugged in instead.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{DdqnError, Result};

/// A trainable state -> per-action value mapping.
pub trait QFunction {
    /// Opaque parameter snapshot exchanged by `get_weights`/`set_weights`.
    type Weights: Clone;

    /// Width of a single state vector.
    fn input_size(&self) -> usize;

    /// Number of discrete actions (columns of every prediction).
    fn num_actions(&self) -> usize;

    /// Predict a `batch x num_actions` value matrix for a `batch x input_size` state matrix.
    fn predict(&self, states: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// One supervised regression step towards `targets`; returns the scalar loss.
    fn train_on_batch(&mut self, states: ArrayView2<f32>, targets: ArrayView2<f32>) -> Result<f32>;

    /// Snapshot of the current parameters.
    fn get_weights(&self) -> Self::Weights;

    /// Replace all parameters with `weights`.
    fn set_weights(&mut self, weights: Self::Weights) -> Result<()>;

    /// Greedy action and the full value vector for one state.
    fn action_value(&self, state: ArrayView1<f32>) -> Result<(usize, Array1<f32>)> {
        let q_values = self.predict(state.insert_axis(Axis(0)))?;
        let values = q_values.row(0).to_owned();
        let best = argmax(values.view())?;
        Ok((best, values))
    }
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: ArrayView1<f32>) -> Result<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &value) in values.iter().enumerate() {
        if value.is_nan() {
            return Err(DdqnError::Numerical(format!("NaN value at action {}", idx)));
        }
        match best {
            Some((_, current)) if value <= current => {}
            _ => best = Some((idx, value)),
        }
    }
    best.map(|(idx, _)| idx)
        .ok_or_else(|| DdqnError::Numerical("argmax over empty value vector".to_string()))
}

/// Row-wise [`argmax`].
pub fn argmax_rows(values: ArrayView2<f32>) -> Result<Vec<usize>> {
    values.outer_iter().map(argmax).collect()
}

/// Row-wise maximum.
pub fn max_rows(values: ArrayView2<f32>) -> Array1<f32> {
    values.map_axis(Axis(1), |row| {
        row.iter().fold(f32::NEG_INFINITY, |max, &v| max.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_argmax_first_wins_on_tie() {
        assert_eq!(argmax(array![1.0, 3.0, 3.0, 2.0].view()).unwrap(), 1);
    }

    #[test]
    fn test_argmax_rejects_nan_and_empty() {
        assert!(argmax(array![1.0, f32::NAN].view()).is_err());
        assert!(argmax(Array1::<f32>::zeros(0).view()).is_err());
    }

    #[test]
    fn test_row_helpers() {
        let q = array![[0.5, -1.0], [-2.0, 4.0]];
        assert_eq!(argmax_rows(q.view()).unwrap(), vec![0, 1]);
        assert_eq!(max_rows(q.view()), array![0.5, 4.0]);
    }
}
