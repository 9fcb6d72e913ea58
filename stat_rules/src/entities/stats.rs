//! Stat definitions and modifier arithmetic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::mechanics::ModifierType;

/// The stats a character carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatKind {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
    MaxHealth,
    MaxMana,
    ArmorClass,
    MoveSpeed,
}

impl StatKind {
    /// Every stat kind, in declaration order.
    pub const ALL: [StatKind; 10] = [
        StatKind::Strength,
        StatKind::Dexterity,
        StatKind::Constitution,
        StatKind::Intelligence,
        StatKind::Wisdom,
        StatKind::Charisma,
        StatKind::MaxHealth,
        StatKind::MaxMana,
        StatKind::ArmorClass,
        StatKind::MoveSpeed,
    ];

    /// Human-readable stat name.
    pub fn name(&self) -> &'static str {
        match self {
            StatKind::Strength => "Strength",
            StatKind::Dexterity => "Dexterity",
            StatKind::Constitution => "Constitution",
            StatKind::Intelligence => "Intelligence",
            StatKind::Wisdom => "Wisdom",
            StatKind::Charisma => "Charisma",
            StatKind::MaxHealth => "Max Health",
            StatKind::MaxMana => "Max Mana",
            StatKind::ArmorClass => "Armor Class",
            StatKind::MoveSpeed => "Move Speed",
        }
    }

    /// Base value a freshly created character starts with.
    pub fn default_base(&self) -> f32 {
        match self {
            StatKind::MaxHealth => 10.0,
            StatKind::MaxMana => 0.0,
            StatKind::MoveSpeed => 30.0,
            _ => 10.0,
        }
    }

    /// Render a modifier of this stat for display, e.g. `+5 Strength`.
    pub fn render_modifier(&self, magnitude: f32, mode: ModifierType) -> String {
        format!("{} {}", mode.render(magnitude), self.name())
    }
}

impl std::fmt::Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single stat with its outstanding modifiers.
///
/// Modifiers are keyed by the raw id of the handle that created them.
/// The derived value is `(base + sum(flat)) * (1 + sum(multiplier))`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatInstance {
    pub base: f32,
    flat: BTreeMap<u64, f32>,
    multiplier: BTreeMap<u64, f32>,
}

impl StatInstance {
    /// Create a stat with no modifiers.
    pub fn new(base: f32) -> Self {
        Self {
            base,
            ..Default::default()
        }
    }

    fn modifiers(&self, mode: ModifierType) -> &BTreeMap<u64, f32> {
        match mode {
            ModifierType::Additive => &self.flat,
            ModifierType::Multiplicative => &self.multiplier,
        }
    }

    fn modifiers_mut(&mut self, mode: ModifierType) -> &mut BTreeMap<u64, f32> {
        match mode {
            ModifierType::Additive => &mut self.flat,
            ModifierType::Multiplicative => &mut self.multiplier,
        }
    }

    /// Insert a modifier under `slot`.
    pub fn add_modifier(&mut self, slot: u64, mode: ModifierType, magnitude: f32) {
        self.modifiers_mut(mode).insert(slot, magnitude);
    }

    /// Remove the modifier under `slot`, returning its magnitude.
    pub fn remove_modifier(&mut self, slot: u64, mode: ModifierType) -> Option<f32> {
        self.modifiers_mut(mode).remove(&slot)
    }

    /// Change the magnitude of an existing modifier. Returns false if `slot` is unknown.
    pub fn set_modifier(&mut self, slot: u64, mode: ModifierType, magnitude: f32) -> bool {
        match self.modifiers_mut(mode).get_mut(&slot) {
            Some(existing) => {
                *existing = magnitude;
                true
            }
            None => false,
        }
    }

    /// Number of modifiers of the given mode.
    pub fn modifier_count(&self, mode: ModifierType) -> usize {
        self.modifiers(mode).len()
    }

    /// The derived value after all modifiers.
    pub fn value(&self) -> f32 {
        let flat: f32 = self.flat.values().sum();
        let multiplier: f32 = self.multiplier.values().sum();
        (self.base + flat) * (1.0 + multiplier)
    }
}

/// All stats of one character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSheet {
    stats: HashMap<StatKind, StatInstance>,
}

impl Default for StatSheet {
    fn default() -> Self {
        Self {
            stats: StatKind::ALL
                .iter()
                .map(|kind| (*kind, StatInstance::new(kind.default_base())))
                .collect(),
        }
    }
}

impl StatSheet {
    /// Create a sheet with every stat at its default base value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base value of a stat.
    pub fn with_base(mut self, kind: StatKind, base: f32) -> Self {
        self.instance_mut(kind).base = base;
        self
    }

    /// Get a stat instance.
    pub fn instance(&self, kind: StatKind) -> Option<&StatInstance> {
        self.stats.get(&kind)
    }

    /// Get a mutable stat instance, creating it at its default base if missing.
    pub fn instance_mut(&mut self, kind: StatKind) -> &mut StatInstance {
        self.stats
            .entry(kind)
            .or_insert_with(|| StatInstance::new(kind.default_base()))
    }

    /// Derived value of a stat.
    pub fn value(&self, kind: StatKind) -> f32 {
        self.instance(kind)
            .map(StatInstance::value)
            .unwrap_or_else(|| kind.default_base())
    }
}
