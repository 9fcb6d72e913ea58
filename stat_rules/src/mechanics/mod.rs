//! Modifier mechanics: combination modes, handles, and the stat-system contract.

use serde::{Deserialize, Serialize};

use crate::entities::{EntityId, StatKind};
use crate::error::StatError;

/// How a modifier combines with a stat's base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModifierType {
    /// Added to the base before multipliers apply.
    #[default]
    Additive,
    /// Summed with other multipliers, then scales the total (0.5 = +50%).
    Multiplicative,
}

impl ModifierType {
    /// Render a magnitude in this mode, e.g. `+5` or `+50%`.
    pub fn render(&self, magnitude: f32) -> String {
        match self {
            ModifierType::Additive => format!("{:+}", magnitude),
            ModifierType::Multiplicative => format!("{:+}%", magnitude * 100.0),
        }
    }
}

/// Opaque token for one outstanding modifier.
///
/// Not `Clone` or `Copy`: a handle has exactly one owner, and removing the
/// modifier consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ModifierHandle(u64);

impl ModifierHandle {
    /// Wrap a raw slot id. Only stat-system implementations should mint handles.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw slot id this handle refers to.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ModifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The operations a behaviour graph may perform against a stat system.
pub trait StatSystem {
    /// Apply a modifier to `stat` on `target`.
    fn add_handle(
        &mut self,
        target: EntityId,
        stat: StatKind,
        magnitude: f32,
        mode: ModifierType,
    ) -> Result<ModifierHandle, StatError>;

    /// Retract a modifier.
    fn remove_handle(&mut self, handle: ModifierHandle) -> Result<(), StatError>;

    /// Change an outstanding modifier's magnitude in place.
    fn update_handle_magnitude(
        &mut self,
        handle: &ModifierHandle,
        magnitude: f32,
    ) -> Result<(), StatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_rendering() {
        assert_eq!(ModifierType::Additive.render(5.0), "+5");
        assert_eq!(ModifierType::Additive.render(-2.5), "-2.5");
        assert_eq!(ModifierType::Multiplicative.render(0.25), "+25%");
    }

    #[test]
    fn test_handle_raw() {
        let handle = ModifierHandle::from_raw(42);
        assert_eq!(handle.raw(), 42);
        assert_eq!(handle.to_string(), "#42");
    }
}
