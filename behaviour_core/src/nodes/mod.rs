//! The built-in node library.

mod binding;
mod math;
mod stats;
mod values;

pub use binding::*;
pub use math::*;
pub use stats::*;
pub use values::*;

use crate::unpack::NodeRegistry;

impl NodeRegistry {
    /// A registry holding every built-in node kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register::<FloatValueNode>()
            .register::<BoolValueNode>()
            .register::<OwnerNode>()
            .register::<AddNode>()
            .register::<GreaterThanNode>()
            .register::<StatsNode>();
        registry
    }
}
