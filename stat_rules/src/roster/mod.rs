//! Character roster - the in-memory stat system behaviour graphs act on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::entities::{Character, EntityId, StatKind};
use crate::error::StatError;
use crate::mechanics::{ModifierHandle, ModifierType, StatSystem};

/// Where an outstanding modifier lives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandleRecord {
    pub target: EntityId,
    pub stat: StatKind,
    pub mode: ModifierType,
}

/// All characters plus the arena of outstanding modifier handles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterRoster {
    characters: HashMap<EntityId, Character>,

    /// Raw handle id -> where its modifier was applied.
    handles: HashMap<u64, HandleRecord>,

    next_handle: u64,
}

impl CharacterRoster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a character to the roster.
    pub fn add_character(&mut self, character: Character) -> EntityId {
        let id = character.id;
        self.characters.insert(id, character);
        id
    }

    /// Remove a character. Handles that targeted it become stale.
    pub fn remove_character(&mut self, id: EntityId) -> Option<Character> {
        let removed = self.characters.remove(&id)?;
        self.handles.retain(|_, record| record.target != id);
        Some(removed)
    }

    /// Get character by ID.
    pub fn get_character(&self, id: EntityId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Derived value of one stat on one character.
    pub fn stat_value(&self, id: EntityId, stat: StatKind) -> Option<f32> {
        self.characters.get(&id).map(|c| c.stat(stat))
    }

    /// Number of modifiers currently outstanding across all characters.
    pub fn outstanding_handles(&self) -> usize {
        self.handles.len()
    }

    /// Look up where a handle's modifier was applied.
    pub fn handle_record(&self, handle: &ModifierHandle) -> Option<&HandleRecord> {
        self.handles.get(&handle.raw())
    }
}

impl StatSystem for CharacterRoster {
    fn add_handle(
        &mut self,
        target: EntityId,
        stat: StatKind,
        magnitude: f32,
        mode: ModifierType,
    ) -> Result<ModifierHandle, StatError> {
        if !magnitude.is_finite() {
            return Err(StatError::NonFiniteMagnitude(magnitude));
        }
        let character = self
            .characters
            .get_mut(&target)
            .ok_or(StatError::UnknownEntity(target))?;

        self.next_handle += 1;
        let slot = self.next_handle;
        character
            .stats
            .instance_mut(stat)
            .add_modifier(slot, mode, magnitude);
        self.handles.insert(slot, HandleRecord { target, stat, mode });

        debug!(handle = slot, %target, %stat, magnitude, ?mode, "modifier added");
        Ok(ModifierHandle::from_raw(slot))
    }

    fn remove_handle(&mut self, handle: ModifierHandle) -> Result<(), StatError> {
        let slot = handle.raw();
        let record = self
            .handles
            .remove(&slot)
            .ok_or(StatError::UnknownHandle(slot))?;

        if let Some(character) = self.characters.get_mut(&record.target) {
            character
                .stats
                .instance_mut(record.stat)
                .remove_modifier(slot, record.mode);
        }

        debug!(handle = slot, target = %record.target, stat = %record.stat, "modifier removed");
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
        let slot = handle.raw();
        let record = *self
            .handles
            .get(&slot)
            .ok_or(StatError::UnknownHandle(slot))?;
        let character = self
            .characters
            .get_mut(&record.target)
            .ok_or(StatError::UnknownEntity(record.target))?;

        if !character
            .stats
            .instance_mut(record.stat)
            .set_modifier(slot, record.mode, magnitude)
        {
            return Err(StatError::UnknownHandle(slot));
        }

        debug!(handle = slot, magnitude, "modifier updated");
        Ok(())
    }
}
