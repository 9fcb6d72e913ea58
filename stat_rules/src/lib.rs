//! # Stat Rules
//!
//! The stat-system crate behaviour graphs drive. It owns character stats, the
//! modifier arithmetic, and the handle contract used to apply and retract
//! modifiers. It knows nothing about graphs or sockets.

pub mod entities;
pub mod error;
pub mod mechanics;
pub mod roster;

pub use entities::*;
pub use error::*;
pub use mechanics::*;
pub use roster::*;
