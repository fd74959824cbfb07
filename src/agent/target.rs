//! Bootstrapped regression targets for a sampled minibatch.
//!
//! Each training step flips a fair coin between two formulas for the
//! bootstrapped value of the next state:
//!
//! - [`TargetForm::SingleNetwork`]: `max_a target(s')[a]`
//! - [`TargetForm::DoubleNetwork`]: `target(s')[argmax_a online(s')[a]]`
//!
//! The double form lets the network being trained choose the next action
//! while the frozen target network judges it, which removes the upward bias
//! of taking a max over noisy estimates.

use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::approximator::{argmax_rows, max_rows, QFunction};
use crate::error::{DdqnError, Result};
use crate::replay_buffer::Batch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetForm {
    SingleNetwork,
    DoubleNetwork,
}

impl TargetForm {
    /// Fair coin flip between the two forms.
    pub fn choose<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen::<f64>() > 0.5 {
            TargetForm::SingleNetwork
        } else {
            TargetForm::DoubleNetwork
        }
    }
}

/// `target_q[i]`: reward plus the discounted next-state value, or the bare
/// reward for terminal transitions.
pub fn bootstrap_values<Q: QFunction>(
    form: TargetForm,
    batch: &Batch,
    online: &Q,
    target: &Q,
    gamma: f32,
) -> Result<Array1<f32>> {
    let next_target = target.predict(batch.next_states.view())?;
    check_rows("target", &next_target, batch.len())?;

    let next_values: Array1<f32> = match form {
        TargetForm::SingleNetwork => max_rows(next_target.view()),
        TargetForm::DoubleNetwork => {
            let next_online = online.predict(batch.next_states.view())?;
            if next_online.dim() != next_target.dim() {
                return Err(DdqnError::dimension_mismatch(
                    format!("online values of shape {:?}", next_target.dim()),
                    format!("online values of shape {:?}", next_online.dim()),
                ));
            }
            let best_actions = argmax_rows(next_online.view())?;
            best_actions
                .iter()
                .enumerate()
                .map(|(i, &a)| {
                    next_target.get((i, a)).copied().ok_or(DdqnError::InvalidAction {
                        action: a,
                        num_actions: next_target.ncols(),
                    })
                })
                .collect::<Result<Array1<f32>>>()?
        }
    };

    Ok(batch
        .rewards
        .iter()
        .zip(next_values.iter())
        .zip(batch.dones.iter())
        .map(|((&reward, &next), &done)| if done { reward } else { reward + gamma * next })
        .collect())
}

/// Regression targets for the online network: its own current predictions
/// on the batch states, with only the taken action's column replaced by the
/// bootstrapped value.
pub fn build_targets<Q: QFunction>(
    form: TargetForm,
    batch: &Batch,
    online: &Q,
    target: &Q,
    gamma: f32,
) -> Result<Array2<f32>> {
    let target_q = bootstrap_values(form, batch, online, target, gamma)?;
    let mut target_f = online.predict(batch.states.view())?;
    check_rows("online", &target_f, batch.len())?;
    let num_actions = target_f.ncols();

    for (i, &action) in batch.actions.iter().enumerate() {
        if action >= num_actions {
            return Err(DdqnError::InvalidAction { action, num_actions });
        }
        target_f[[i, action]] = target_q[i];
    }
    Ok(target_f)
}

fn check_rows(source: &str, values: &Array2<f32>, expected: usize) -> Result<()> {
    if values.nrows() != expected {
        return Err(DdqnError::dimension_mismatch(
            format!("{} {} rows", expected, source),
            format!("{} {} rows", values.nrows(), source),
        ));
    }
    Ok(())
}
