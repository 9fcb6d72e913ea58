//! Sockets - typed attachment points on nodes.
//!
//! Sockets themselves carry no values. An [`OutputSocket`] is an identity
//! assigned at unpack time; an [`InputSocket`] records which output it reads
//! from. Values live in [`ConnectionEntry`] cells owned by the
//! [`BehaviourContext`](crate::node::BehaviourContext).

mod connection;

pub use connection::*;

use serde::{Deserialize, Serialize};

/// Ordinal identity of an output socket, unique within an unpack session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputId(pub u64);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An output declared by a node. Identity is the assigned id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSocket {
    id: OutputId,
}

impl OutputSocket {
    pub fn new(id: OutputId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }
}

/// An input declared by a node: the output it is wired to, if any.
///
/// `None` means the reference could not be resolved, or the input was left
/// unconnected. Either way the node sees "no input attached".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSocket {
    target: Option<OutputId>,
}

impl InputSocket {
    /// An input wired to `target`.
    pub fn new(target: OutputId) -> Self {
        Self {
            target: Some(target),
        }
    }

    /// An input with nothing attached.
    pub fn unresolved() -> Self {
        Self { target: None }
    }

    pub fn target(&self) -> Option<OutputId> {
        self.target
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

impl From<Option<OutputId>> for InputSocket {
    fn from(target: Option<OutputId>) -> Self {
        Self { target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_identity_is_id() {
        assert_eq!(OutputSocket::new(OutputId(3)), OutputSocket::new(OutputId(3)));
        assert_ne!(OutputSocket::new(OutputId(3)), OutputSocket::new(OutputId(4)));
    }

    #[test]
    fn test_sockets_deserialize_from_resolved_form() {
        let output: OutputSocket = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(output.id(), OutputId(7));

        let wired: InputSocket = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(wired.target(), Some(OutputId(7)));

        let loose: InputSocket = serde_json::from_value(serde_json::Value::Null).unwrap();
        assert!(!loose.is_resolved());
        assert_eq!(loose, InputSocket::unresolved());
    }
}
