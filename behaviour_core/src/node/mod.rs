//! Nodes - units of behaviour with sockets and a two-phase lifecycle.

mod context;

pub use context::*;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::error::BehaviourError;
use crate::socket::{InputSocket, OutputSocket};

/// Process-local identity of a node within a graph.
///
/// Rendered and parsed as `0x`-prefixed hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u64);

impl LocalId {
    /// Draw a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_u64_pair().0)
    }

    /// Reference token for one of this node's output fields.
    pub fn output_token(&self, field: &str) -> String {
        format!("{self}.{field}")
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// A string that is not a valid [`LocalId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid local id `{0}`")]
pub struct ParseLocalIdError(String);

impl FromStr for LocalId {
    type Err = ParseLocalIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16)
            .map(LocalId)
            .map_err(|_| ParseLocalIdError(s.to_string()))
    }
}

impl Serialize for LocalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Upcast helper so hosts can reach a node's concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The contract every node kind implements.
///
/// `setup` runs once after the whole graph is constructed and wired, so it may
/// read any other node's sockets. `remove` must undo every side effect `setup`
/// or later handlers left on external collaborators.
pub trait Node: AsAny + fmt::Debug {
    /// Input sockets by field name.
    fn inputs(&self) -> Vec<(&'static str, InputSocket)> {
        Vec::new()
    }

    /// Output sockets by field name.
    fn outputs(&self) -> Vec<(&'static str, OutputSocket)> {
        Vec::new()
    }

    /// Install reactive behaviour.
    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError>;

    /// Detach reactive behaviour and release external resources.
    fn remove(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError>;
}

/// Lifecycle state of a node instance.
///
/// Nodes only exist once constructed, so there is no unconstructed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Unpacked and wired, inert.
    Constructed,
    /// Setup has run; handlers are installed.
    Active,
    /// Remove has run; the node is finished.
    Removed,
}

/// A node owned by a graph, with its identity and lifecycle state.
#[derive(Debug)]
pub struct NodeInstance {
    id: LocalId,
    kind: &'static str,
    state: NodeState,
    node: Box<dyn Node>,
}

impl NodeInstance {
    pub(crate) fn new(id: LocalId, kind: &'static str, node: Box<dyn Node>) -> Self {
        Self {
            id,
            kind,
            state: NodeState::Constructed,
            node,
        }
    }

    pub fn id(&self) -> LocalId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn node(&self) -> &dyn Node {
        self.node.as_ref()
    }

    /// Borrow the node as its concrete kind.
    pub fn downcast_ref<T: Node + 'static>(&self) -> Option<&T> {
        AsAny::as_any(self.node.as_ref()).downcast_ref::<T>()
    }

    /// Run setup. The node is `Active` afterwards even if setup reported an
    /// error, so that a later `remove` releases whatever it did install.
    pub fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        self.transition(NodeState::Constructed, NodeState::Active, "set up")?;
        debug!(node = %self.id, kind = self.kind, "node setup");
        self.node.setup(ctx)
    }

    /// Run remove. Only an `Active` node can be removed.
    pub fn remove(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        self.transition(NodeState::Active, NodeState::Removed, "remove")?;
        debug!(node = %self.id, kind = self.kind, "node removed");
        self.node.remove(ctx)
    }

    fn transition(
        &mut self,
        from: NodeState,
        to: NodeState,
        operation: &'static str,
    ) -> Result<(), BehaviourError> {
        if self.state != from {
            return Err(BehaviourError::Lifecycle {
                node: self.id,
                state: self.state,
                operation,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use stat_rules::CharacterRoster;

    #[derive(Debug, Default)]
    struct CallLog {
        calls: Vec<&'static str>,
    }

    impl Node for CallLog {
        fn setup(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
            self.calls.push("setup");
            Ok(())
        }

        fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
            self.calls.push("remove");
            Ok(())
        }
    }

    fn context() -> BehaviourContext {
        BehaviourContext::new(Rc::new(RefCell::new(CharacterRoster::new())))
    }

    #[test]
    fn test_local_id_round_trip_text() {
        let id = LocalId(0xdead_beef);
        assert_eq!(id.to_string(), "0x00000000deadbeef");
        assert_eq!("0x00000000deadbeef".parse::<LocalId>().unwrap(), id);
        assert_eq!("deadbeef".parse::<LocalId>().unwrap(), id);
        assert!("not-hex".parse::<LocalId>().is_err());
        assert_eq!(id.output_token("output"), "0x00000000deadbeef.output");
    }

    #[test]
    fn test_local_id_serde() {
        let id: LocalId = serde_json::from_value(serde_json::json!("0x2a")).unwrap();
        assert_eq!(id, LocalId(42));
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!("0x000000000000002a"));
    }

    #[test]
    fn test_lifecycle_transitions() {
        let ctx = context();
        let mut instance = NodeInstance::new(LocalId(1), "Test/CallLog", Box::new(CallLog::default()));
        assert_eq!(instance.state(), NodeState::Constructed);

        instance.setup(&ctx).unwrap();
        assert_eq!(instance.state(), NodeState::Active);

        instance.remove(&ctx).unwrap();
        assert_eq!(instance.state(), NodeState::Removed);

        let log = instance.downcast_ref::<CallLog>().unwrap();
        assert_eq!(log.calls, vec!["setup", "remove"]);
    }

    #[test]
    fn test_lifecycle_misuse_is_reported() {
        let ctx = context();
        let mut instance = NodeInstance::new(LocalId(1), "Test/CallLog", Box::new(CallLog::default()));

        let err = instance.remove(&ctx).unwrap_err();
        assert!(matches!(
            err,
            BehaviourError::Lifecycle { state: NodeState::Constructed, .. }
        ));

        instance.setup(&ctx).unwrap();
        assert!(instance.setup(&ctx).is_err());

        let log = instance.downcast_ref::<CallLog>().unwrap();
        assert_eq!(log.calls, vec!["setup"]);
    }
}
