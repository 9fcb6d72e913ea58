//! Character definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{EntityId, StatKind, StatSheet};

/// A character whose stats can be modified by behaviour graphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,

    pub stats: StatSheet,

    // Host data the stat system carries but never interprets
    #[serde(default)]
    pub extra_components: HashMap<String, serde_json::Value>,
}

impl Character {
    /// Create a new character with the given name and default stats.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            stats: StatSheet::default(),
            extra_components: HashMap::new(),
        }
    }

    /// Set the base value of one stat.
    pub fn with_stat(mut self, kind: StatKind, base: f32) -> Self {
        self.stats = self.stats.with_base(kind, base);
        self
    }

    /// Derived value of a stat after modifiers.
    pub fn stat(&self, kind: StatKind) -> f32 {
        self.stats.value(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character() {
        let character = Character::new("Test Hero");
        assert_eq!(character.name, "Test Hero");
        assert_eq!(character.stat(StatKind::Strength), 10.0);
    }

    #[test]
    fn test_with_stat() {
        let character = Character::new("Brute").with_stat(StatKind::Strength, 18.0);
        assert_eq!(character.stat(StatKind::Strength), 18.0);
    }
}
