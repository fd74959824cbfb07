use tracing::debug;

use crate::approximator::QFunction;
use crate::error::{DdqnError, Result};

/// Owner of the target approximator.
///
/// The target can only be read through [`TargetSync::target`] and only
/// changed by [`TargetSync::sync`], a full copy of the online parameters.
pub struct TargetSync<Q: QFunction> {
    target: Q,
    update_iter: usize,
    syncs: usize,
}

impl<Q: QFunction> TargetSync<Q> {
    /// Take ownership of `target` and overwrite it with `online`'s parameters
    /// so both start from the same point.
    pub fn new(online: &Q, mut target: Q, update_iter: usize) -> Result<Self> {
        if update_iter == 0 {
            return Err(DdqnError::invalid_parameter("target_update_iter", "must be at least 1"));
        }
        if online.input_size() != target.input_size() || online.num_actions() != target.num_actions() {
            return Err(DdqnError::dimension_mismatch(
                format!("target {}x{}", online.input_size(), online.num_actions()),
                format!("target {}x{}", target.input_size(), target.num_actions()),
            ));
        }
        target.set_weights(online.get_weights())?;
        Ok(TargetSync {
            target,
            update_iter,
            syncs: 0,
        })
    }

    pub fn target(&self) -> &Q {
        &self.target
    }

    pub fn update_iter(&self) -> usize {
        self.update_iter
    }

    /// Cadence syncs performed since construction.
    pub fn sync_count(&self) -> usize {
        self.syncs
    }

    /// Whether environment step `step` falls on the sync cadence.
    pub fn is_due(&self, step: usize) -> bool {
        step % self.update_iter == 0
    }

    /// Hard copy: the target's parameters become a snapshot of `online`'s.
    pub fn sync(&mut self, online: &Q) -> Result<()> {
        self.target.set_weights(online.get_weights())?;
        self.syncs += 1;
        debug!(syncs = self.syncs, "target network synced");
        Ok(())
    }

    pub fn into_inner(self) -> Q {
        self.target
    }
}
