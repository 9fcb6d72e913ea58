//! The modifier-binding state machine behind the grant-stat node.
//!
//! A binding owns at most one outstanding [`ModifierHandle`]. Socket handlers
//! translate changes into the transitions below; the transitions themselves
//! only need a [`StatSystem`], so they can be driven directly.

use stat_rules::{EntityId, ModifierHandle, ModifierType, StatError, StatKind, StatSystem};
use tracing::{debug, warn};

/// Whether a binding currently holds a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingPhase {
    Inactive,
    Active,
}

/// Socket values a binding reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindingInputs {
    pub target: Option<EntityId>,
    pub active: bool,
    pub magnitude: f32,
}

impl BindingInputs {
    /// The target a handle should exist for, if any.
    fn desired_target(&self) -> Option<EntityId> {
        self.target.filter(|_| self.active)
    }
}

#[derive(Debug)]
struct Outstanding {
    handle: ModifierHandle,
    target: EntityId,
    magnitude: f32,
}

/// Why a binding may be out of step with its inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingFailure {
    /// The stat system refused a call.
    #[error(transparent)]
    Rejected(#[from] StatError),
    /// A transition could not run at all.
    #[error("{0} unavailable")]
    Unavailable(&'static str),
}

#[derive(Debug)]
pub struct ModifierBinding {
    stat: StatKind,
    mode: ModifierType,
    outstanding: Option<Outstanding>,
    last_failure: Option<BindingFailure>,
}

impl ModifierBinding {
    pub fn new(stat: StatKind, mode: ModifierType) -> Self {
        Self {
            stat,
            mode,
            outstanding: None,
            last_failure: None,
        }
    }

    pub fn stat(&self) -> StatKind {
        self.stat
    }

    pub fn mode(&self) -> ModifierType {
        self.mode
    }

    pub fn phase(&self) -> BindingPhase {
        match self.outstanding {
            Some(_) => BindingPhase::Active,
            None => BindingPhase::Inactive,
        }
    }

    /// Target of the outstanding handle.
    pub fn target(&self) -> Option<EntityId> {
        self.outstanding.as_ref().map(|o| o.target)
    }

    /// Magnitude the outstanding handle was last accepted with.
    pub fn magnitude(&self) -> Option<f32> {
        self.outstanding.as_ref().map(|o| o.magnitude)
    }

    pub fn handle(&self) -> Option<&ModifierHandle> {
        self.outstanding.as_ref().map(|o| &o.handle)
    }

    /// The most recent failure, cleared by the next evaluation that succeeds.
    pub fn last_failure(&self) -> Option<&BindingFailure> {
        self.last_failure.as_ref()
    }

    /// Bring the binding in line with the current target, active flag and
    /// magnitude.
    ///
    /// An outstanding handle for the wanted target is kept, with its magnitude
    /// updated in place if it differs. A handle for any other target is
    /// removed before the new one is added.
    pub fn evaluate(
        &mut self,
        stats: &mut dyn StatSystem,
        inputs: BindingInputs,
    ) -> Result<(), StatError> {
        let result = self.reconcile(stats, inputs);
        if result.is_ok() {
            self.last_failure = None;
        }
        result
    }

    /// The target is about to change; drop the handle against the old one.
    pub fn on_target_changing(&mut self, stats: &mut dyn StatSystem) -> Result<(), StatError> {
        self.release(stats)
    }

    /// Follow a magnitude change.
    ///
    /// An outstanding handle is updated in place. Without one, this is a
    /// fresh evaluation, so a binding whose add was rejected retries.
    pub fn on_magnitude_changed(
        &mut self,
        stats: &mut dyn StatSystem,
        inputs: BindingInputs,
    ) -> Result<(), StatError> {
        self.evaluate(stats, inputs)
    }

    /// Remove the outstanding handle, if any. The binding is `Inactive`
    /// afterwards whether or not the stat system accepted the removal.
    pub fn release(&mut self, stats: &mut dyn StatSystem) -> Result<(), StatError> {
        let Some(Outstanding { handle, target, .. }) = self.outstanding.take() else {
            return Ok(());
        };

        let raw = handle.raw();
        match stats.remove_handle(handle) {
            Ok(()) => {
                debug!(handle = raw, %target, stat = %self.stat, "binding released modifier");
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Note that a transition was skipped because `what` could not be reached.
    /// The binding keeps whatever handle it holds until the next evaluation.
    pub fn record_unavailable(&mut self, what: &'static str) {
        warn!(stat = %self.stat, what, "modifier binding skipped a change");
        self.last_failure = Some(BindingFailure::Unavailable(what));
    }

    fn reconcile(
        &mut self,
        stats: &mut dyn StatSystem,
        inputs: BindingInputs,
    ) -> Result<(), StatError> {
        let Some(wanted) = inputs.desired_target() else {
            return self.release(stats);
        };

        let held = self.outstanding.as_ref().map(|o| (o.target, o.magnitude));
        match held {
            Some((target, magnitude)) if target == wanted => {
                if magnitude == inputs.magnitude {
                    Ok(())
                } else {
                    self.update(stats, inputs.magnitude)
                }
            }
            _ => {
                let released = self.release(stats);
                let acquired = self.acquire(stats, wanted, inputs.magnitude);
                released.and(acquired)
            }
        }
    }

    fn acquire(
        &mut self,
        stats: &mut dyn StatSystem,
        target: EntityId,
        magnitude: f32,
    ) -> Result<(), StatError> {
        match stats.add_handle(target, self.stat, magnitude, self.mode) {
            Ok(handle) => {
                debug!(handle = handle.raw(), %target, stat = %self.stat, magnitude, "binding applied modifier");
                self.outstanding = Some(Outstanding {
                    handle,
                    target,
                    magnitude,
                });
                Ok(())
            }
            Err(err) => Err(self.record(err)),
        }
    }

    fn update(&mut self, stats: &mut dyn StatSystem, magnitude: f32) -> Result<(), StatError> {
        let Some(current) = self.outstanding.as_mut() else {
            return Ok(());
        };

        match stats.update_handle_magnitude(&current.handle, magnitude) {
            Ok(()) => {
                current.magnitude = magnitude;
                Ok(())
            }
            Err(err) => {
                // The stat system no longer agrees about this handle.
                if let Some(stale) = self.outstanding.take() {
                    if let Err(remove_err) = stats.remove_handle(stale.handle) {
                        debug!(error = %remove_err, "stale modifier could not be removed");
                    }
                }
                Err(self.record(err))
            }
        }
    }

    fn record(&mut self, err: StatError) -> StatError {
        warn!(stat = %self.stat, error = %err, "modifier binding rejected by stat system");
        self.last_failure = Some(BindingFailure::Rejected(err.clone()));
        err
    }
}
