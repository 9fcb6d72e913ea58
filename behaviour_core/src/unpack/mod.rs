//! Graph unpacking - serialized node records into a wired, inert node set.
//!
//! Unpacking runs in two passes over the records, in file order:
//! 1. **Identity**: resolve each kind to its shape and give every output
//!    field the next id from the cursor, recording its token.
//! 2. **Hydration**: resolve each input token against every output known so
//!    far (forward and backward references both work), then decode the node.
//!
//! No node is set up here; the caller activates the graph explicitly.

mod cursor;
mod registry;

pub use cursor::*;
pub use registry::*;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::{UnpackConfig, UnresolvedPolicy};
use crate::error::UnpackError;
use crate::graph::BehaviourGraph;
use crate::node::{LocalId, NodeInstance};
use crate::socket::OutputId;

/// One serialized node: its kind name and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNode {
    #[serde(rename = "type")]
    pub kind: String,

    /// Plain field values and input reference tokens.
    #[serde(default)]
    pub data: Value,

    /// Editor layout data, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<Value>,
}

/// A serialized node together with the identity the host assigns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    pub id: LocalId,
    #[serde(flatten)]
    pub node: SerializedNode,
}

impl GraphRecord {
    pub fn new(id: LocalId, kind: impl Into<String>, data: Value) -> Self {
        Self {
            id,
            node: SerializedNode {
                kind: kind.into(),
                data,
                editor: None,
            },
        }
    }
}

/// A serialized graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<GraphRecord>,
}

impl SerializedGraph {
    pub fn from_json_str(text: &str) -> Result<Self, UnpackError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, UnpackError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

struct PlannedNode<'r> {
    shape: &'r NodeShape,
    outputs: Vec<(&'static str, OutputId)>,
}

/// Turns serialized records into a [`BehaviourGraph`].
#[derive(Debug, Clone, Copy)]
pub struct GraphUnpacker<'r> {
    registry: &'r NodeRegistry,
    unresolved: UnresolvedPolicy,
}

impl<'r> GraphUnpacker<'r> {
    pub fn new(registry: &'r NodeRegistry) -> Self {
        Self {
            registry,
            unresolved: UnresolvedPolicy::default(),
        }
    }

    pub fn with_config(registry: &'r NodeRegistry, config: &UnpackConfig) -> Self {
        Self {
            registry,
            unresolved: config.unresolved_inputs,
        }
    }

    pub fn unresolved_policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved = policy;
        self
    }

    /// Unpack a whole graph document.
    pub fn unpack_graph(
        &self,
        graph: &SerializedGraph,
        cursor: &mut UnpackCursor,
    ) -> Result<BehaviourGraph, UnpackError> {
        self.unpack(&graph.nodes, cursor)
    }

    /// Unpack records in order.
    ///
    /// The cursor only advances when the whole unpack succeeds; a structural
    /// error leaves it exactly as it was.
    pub fn unpack(
        &self,
        records: &[GraphRecord],
        cursor: &mut UnpackCursor,
    ) -> Result<BehaviourGraph, UnpackError> {
        let mut working = cursor.clone();
        let planned = self.assign_identities(records, &mut working)?;

        let mut unresolved = 0usize;
        let mut nodes = Vec::with_capacity(records.len());
        for (index, (record, plan)) in records.iter().zip(&planned).enumerate() {
            let payload = self.hydrate(index, record, plan, &working, &mut unresolved)?;
            let node = plan
                .shape
                .decode(payload)
                .map_err(|source| UnpackError::MalformedPayload {
                    index,
                    id: record.id,
                    kind: record.node.kind.clone(),
                    source,
                })?;
            nodes.push(NodeInstance::new(record.id, plan.shape.kind(), node));
        }

        info!(
            nodes = nodes.len(),
            first_output = cursor.last_output_id() + 1,
            last_output = working.last_output_id(),
            unresolved,
            "graph unpacked"
        );
        *cursor = working;
        Ok(BehaviourGraph::new(nodes))
    }

    fn assign_identities(
        &self,
        records: &[GraphRecord],
        cursor: &mut UnpackCursor,
    ) -> Result<Vec<PlannedNode<'r>>, UnpackError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut planned = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            if !seen.insert(record.id) {
                return Err(UnpackError::DuplicateNodeId {
                    index,
                    id: record.id,
                });
            }

            let registry = self.registry;
            let shape =
                registry
                    .shape(&record.node.kind)
                    .ok_or_else(|| UnpackError::UnknownKind {
                        index,
                        id: record.id,
                        kind: record.node.kind.clone(),
                    })?;

            let mut outputs = Vec::new();
            for field in shape.outputs() {
                let id = cursor.assign(record.id.output_token(field.name));
                outputs.push((field.name, id));
            }
            planned.push(PlannedNode { shape, outputs });
        }

        Ok(planned)
    }

    fn hydrate(
        &self,
        index: usize,
        record: &GraphRecord,
        plan: &PlannedNode<'_>,
        cursor: &UnpackCursor,
        unresolved: &mut usize,
    ) -> Result<Value, UnpackError> {
        let mut fields = match &record.node.data {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => {
                return Err(UnpackError::PayloadNotObject {
                    index,
                    id: record.id,
                    kind: record.node.kind.clone(),
                })
            }
        };

        for (name, id) in &plan.outputs {
            fields.insert((*name).to_string(), json!(id.0));
        }

        for field in plan.shape.inputs() {
            let target = match fields.get(field.name) {
                None | Some(Value::Null) => None,
                Some(Value::String(token)) if token.is_empty() => None,
                Some(Value::String(token)) => match cursor.resolve(token) {
                    Some(id) => Some(id),
                    None => {
                        *unresolved += 1;
                        self.unresolved_input(index, record.id, field.name, token)?;
                        None
                    }
                },
                Some(_) => {
                    return Err(UnpackError::InvalidReference {
                        index,
                        id: record.id,
                        field: field.name,
                    })
                }
            };
            fields.insert(field.name.to_string(), json!(target.map(|id| id.0)));
        }

        Ok(Value::Object(fields))
    }

    fn unresolved_input(
        &self,
        index: usize,
        id: LocalId,
        field: &'static str,
        token: &str,
    ) -> Result<(), UnpackError> {
        match self.unresolved {
            UnresolvedPolicy::Allow => {
                debug!(record = index, node = %id, field, token, "input left unconnected");
                Ok(())
            }
            UnresolvedPolicy::Warn => {
                warn!(record = index, node = %id, field, token, "input references unknown output");
                Ok(())
            }
            UnresolvedPolicy::Deny => Err(UnpackError::UnresolvedInput {
                index,
                id,
                field,
                token: token.to_string(),
            }),
        }
    }
}
