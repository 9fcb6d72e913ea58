//! Errors raised by the stat system.

use thiserror::Error;

use crate::entities::EntityId;

/// A stat-system operation that was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatError {
    #[error("no character with id {0}")]
    UnknownEntity(EntityId),

    #[error("modifier handle #{0} is not outstanding")]
    UnknownHandle(u64),

    #[error("modifier magnitude must be finite, got {0}")]
    NonFiniteMagnitude(f32),
}
