//! Node shape registry - maps kind names to static shape descriptors.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::node::Node;

/// How the unpacker treats a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    /// Decoded straight from the payload.
    Plain,
    /// Payload carries an output reference token to resolve.
    Input,
    /// Synthesized: gets the next output id, never read from the payload.
    Output,
}

/// One declared field of a node shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub role: FieldRole,
}

impl FieldDescriptor {
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Plain,
        }
    }

    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Input,
        }
    }

    pub const fn output(name: &'static str) -> Self {
        Self {
            name,
            role: FieldRole::Output,
        }
    }
}

/// A concrete node kind the unpacker can build.
///
/// `FIELDS` lists sockets in declaration order; that order fixes the order
/// output ids are assigned in. Socket fields decode from the resolved form
/// the unpacker writes into the payload.
pub trait NodeKind: Node + DeserializeOwned + 'static {
    /// Kind name used in serialized records.
    const KIND: &'static str;
    /// Editor grouping, e.g. `Attribute`.
    const CATEGORY: &'static str;
    const FIELDS: &'static [FieldDescriptor];
}

/// Builds a node from a hydrated payload.
pub type NodeDecoder = fn(Value) -> Result<Box<dyn Node>, serde_json::Error>;

fn decode_node<T: NodeKind>(payload: Value) -> Result<Box<dyn Node>, serde_json::Error> {
    Ok(Box::new(serde_json::from_value::<T>(payload)?))
}

/// Static description of one node kind.
#[derive(Debug, Clone)]
pub struct NodeShape {
    kind: &'static str,
    category: &'static str,
    fields: &'static [FieldDescriptor],
    decode: NodeDecoder,
}

impl NodeShape {
    pub fn of<T: NodeKind>() -> Self {
        Self {
            kind: T::KIND,
            category: T::CATEGORY,
            fields: T::FIELDS,
            decode: decode_node::<T>,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn category(&self) -> &'static str {
        self.category
    }

    pub fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    pub fn inputs(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.role == FieldRole::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.role == FieldRole::Output)
    }

    pub fn decode(&self, payload: Value) -> Result<Box<dyn Node>, serde_json::Error> {
        (self.decode)(payload)
    }
}

/// Every node kind known to the runtime, keyed by kind name.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    shapes: HashMap<&'static str, NodeShape>,
}

impl NodeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node kind. Re-registering a kind name replaces it.
    pub fn register<T: NodeKind>(&mut self) -> &mut Self {
        self.register_shape(NodeShape::of::<T>())
    }

    pub fn register_shape(&mut self, shape: NodeShape) -> &mut Self {
        if self.shapes.insert(shape.kind, shape.clone()).is_some() {
            warn!(kind = shape.kind, "node kind registered twice, replacing");
        }
        self
    }

    pub fn shape(&self, kind: &str) -> Option<&NodeShape> {
        self.shapes.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.shapes.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.shapes.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }
}
