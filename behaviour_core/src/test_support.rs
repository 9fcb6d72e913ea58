//! A stat system that records every accepted call, for ordering assertions.

use std::collections::HashMap;

use stat_rules::{EntityId, ModifierHandle, ModifierType, StatError, StatKind, StatSystem};

#[derive(Debug, Clone, PartialEq)]
pub enum StatCall {
    Add {
        handle: u64,
        target: EntityId,
        magnitude: f32,
    },
    Remove {
        handle: u64,
    },
    Update {
        handle: u64,
        magnitude: f32,
    },
}

#[derive(Debug, Default)]
pub struct RecordingStats {
    pub calls: Vec<StatCall>,
    /// Reject every add as if the target did not exist.
    pub fail_adds: bool,
    live: HashMap<u64, (EntityId, StatKind, f32)>,
    next_handle: u64,
}

impl RecordingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adds(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, StatCall::Add { .. }))
            .count()
    }

    pub fn removes(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, StatCall::Remove { .. }))
            .count()
    }

    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// Current magnitude of an outstanding handle.
    pub fn magnitude(&self, handle: u64) -> Option<f32> {
        self.live.get(&handle).map(|(_, _, magnitude)| *magnitude)
    }
}

impl StatSystem for RecordingStats {
    fn add_handle(
        &mut self,
        target: EntityId,
        stat: StatKind,
        magnitude: f32,
        _mode: ModifierType,
    ) -> Result<ModifierHandle, StatError> {
        if self.fail_adds {
            return Err(StatError::UnknownEntity(target));
        }
        self.next_handle += 1;
        let handle = self.next_handle;
        self.live.insert(handle, (target, stat, magnitude));
        self.calls.push(StatCall::Add {
            handle,
            target,
            magnitude,
        });
        Ok(ModifierHandle::from_raw(handle))
    }

    fn remove_handle(&mut self, handle: ModifierHandle) -> Result<(), StatError> {
        let raw = handle.raw();
        self.live.remove(&raw).ok_or(StatError::UnknownHandle(raw))?;
        self.calls.push(StatCall::Remove { handle: raw });
        Ok(())
    }

    fn update_handle_magnitude(
        &mut self,
        handle: &ModifierHandle,
        magnitude: f32,
    ) -> Result<(), StatError> {
        if !magnitude.is_finite() {
            return Err(StatError::NonFiniteMagnitude(magnitude));
        }
        let raw = handle.raw();
        let entry = self.live.get_mut(&raw).ok_or(StatError::UnknownHandle(raw))?;
        entry.2 = magnitude;
        self.calls.push(StatCall::Update {
            handle: raw,
            magnitude,
        });
        Ok(())
    }
}
