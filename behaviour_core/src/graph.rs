//! The live node set produced by an unpack.

use tracing::{info, warn};

use crate::error::BehaviourError;
use crate::node::{BehaviourContext, LocalId, NodeInstance, NodeState};
use crate::socket::{InputSocket, OutputId, OutputSocket};

/// One input's resolved connection, as reported by [`BehaviourGraph::wiring`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub node: LocalId,
    pub field: &'static str,
    /// The output this input reads from, `None` when unconnected.
    pub source: Option<OutputId>,
}

/// Nodes in record order, exclusively owned by the graph.
#[derive(Debug, Default)]
pub struct BehaviourGraph {
    nodes: Vec<NodeInstance>,
}

impl BehaviourGraph {
    pub(crate) fn new(nodes: Vec<NodeInstance>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeInstance] {
        &self.nodes
    }

    pub fn node(&self, id: LocalId) -> Option<&NodeInstance> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn node_mut(&mut self, id: LocalId) -> Option<&mut NodeInstance> {
        self.nodes.iter_mut().find(|node| node.id() == id)
    }

    /// Append nodes from a later unpack in the same session. They stay
    /// `Constructed` until the next [`setup`](Self::setup).
    pub fn extend(&mut self, other: BehaviourGraph) {
        self.nodes.extend(other.nodes);
    }

    fn require(&self, id: LocalId) -> Result<&NodeInstance, BehaviourError> {
        self.node(id).ok_or(BehaviourError::UnknownNode(id))
    }

    /// An output socket by node and field name.
    pub fn output_socket(&self, id: LocalId, field: &str) -> Result<OutputSocket, BehaviourError> {
        self.require(id)?
            .node()
            .outputs()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, socket)| socket)
            .ok_or_else(|| BehaviourError::UnknownSocket {
                node: id,
                direction: "output",
                field: field.to_string(),
            })
    }

    /// An input socket by node and field name.
    pub fn input_socket(&self, id: LocalId, field: &str) -> Result<InputSocket, BehaviourError> {
        self.require(id)?
            .node()
            .inputs()
            .into_iter()
            .find(|(name, _)| *name == field)
            .map(|(_, socket)| socket)
            .ok_or_else(|| BehaviourError::UnknownSocket {
                node: id,
                direction: "input",
                field: field.to_string(),
            })
    }

    /// Every output in the graph, in assignment order.
    pub fn output_ids(&self) -> Vec<(LocalId, &'static str, OutputId)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                let id = node.id();
                node.node()
                    .outputs()
                    .into_iter()
                    .map(move |(field, socket)| (id, field, socket.id()))
            })
            .collect()
    }

    /// Every input in the graph with the output it resolved to.
    pub fn wiring(&self) -> Vec<Wire> {
        self.nodes
            .iter()
            .flat_map(|node| {
                let id = node.id();
                node.node()
                    .inputs()
                    .into_iter()
                    .map(move |(field, socket)| Wire {
                        node: id,
                        field,
                        source: socket.target(),
                    })
            })
            .collect()
    }

    /// Whether every node has been set up and not yet removed.
    pub fn is_active(&self) -> bool {
        self.nodes.iter().all(|node| node.state() == NodeState::Active)
    }

    /// Set up every `Constructed` node in record order.
    ///
    /// A node that fails still counts as set up and the rest continue; the
    /// first failure is returned.
    pub fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        let mut started = 0usize;
        let mut failures = Vec::new();
        for node in &mut self.nodes {
            if node.state() != NodeState::Constructed {
                continue;
            }
            started += 1;
            if let Err(err) = node.setup(ctx) {
                failures.push((node.id(), err));
            }
        }

        info!(nodes = started, failed = failures.len(), "graph setup");
        first_failure(failures, "setup")
    }

    /// Remove every `Active` node, last set up first.
    pub fn remove(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        let mut stopped = 0usize;
        let mut failures = Vec::new();
        for node in self.nodes.iter_mut().rev() {
            if node.state() != NodeState::Active {
                continue;
            }
            stopped += 1;
            if let Err(err) = node.remove(ctx) {
                failures.push((node.id(), err));
            }
        }

        info!(nodes = stopped, failed = failures.len(), "graph removed");
        first_failure(failures, "remove")
    }
}

fn first_failure(
    failures: Vec<(LocalId, BehaviourError)>,
    operation: &'static str,
) -> Result<(), BehaviourError> {
    let mut failures = failures.into_iter();
    match failures.next() {
        None => Ok(()),
        Some((_, first)) => {
            for (node, err) in failures {
                warn!(%node, operation, error = %err, "node lifecycle failed");
            }
            Err(first)
        }
    }
}
