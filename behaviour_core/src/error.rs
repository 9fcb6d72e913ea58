//! Error taxonomy for unpacking, running, and configuring behaviour graphs.

use stat_rules::StatError;
use thiserror::Error;

use crate::node::{LocalId, NodeState};
use crate::socket::OutputId;

/// A structural failure that aborts a whole unpack call.
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("record {index} ({id}): unknown node kind `{kind}`")]
    UnknownKind {
        index: usize,
        id: LocalId,
        kind: String,
    },

    #[error("record {index} ({id}): payload of `{kind}` must be an object")]
    PayloadNotObject {
        index: usize,
        id: LocalId,
        kind: String,
    },

    #[error("record {index} ({id}): malformed `{kind}` payload: {source}")]
    MalformedPayload {
        index: usize,
        id: LocalId,
        kind: String,
        source: serde_json::Error,
    },

    #[error("record {index} ({id}): input `{field}` must reference an output by name")]
    InvalidReference {
        index: usize,
        id: LocalId,
        field: &'static str,
    },

    #[error("record {index} ({id}): input `{field}` references unknown output `{token}`")]
    UnresolvedInput {
        index: usize,
        id: LocalId,
        field: &'static str,
        token: String,
    },

    #[error("record {index}: node id {id} appears more than once")]
    DuplicateNodeId { index: usize, id: LocalId },

    #[error("malformed graph document: {0}")]
    Document(#[from] serde_json::Error),
}

/// A failure while a graph is live.
#[derive(Debug, Error)]
pub enum BehaviourError {
    #[error("node {node}: cannot {operation} while {state:?}")]
    Lifecycle {
        node: LocalId,
        state: NodeState,
        operation: &'static str,
    },

    #[error("output {output} carries `{actual}`, not `{expected}`")]
    SocketType {
        output: OutputId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("no node with id {0}")]
    UnknownNode(LocalId),

    #[error("node {node} has no {direction} socket `{field}`")]
    UnknownSocket {
        node: LocalId,
        direction: &'static str,
        field: String,
    },

    #[error("{0} is already in use by an outer handler")]
    Reentrant(&'static str),

    #[error(transparent)]
    Stat(#[from] StatError),
}

/// Configuration could not be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
