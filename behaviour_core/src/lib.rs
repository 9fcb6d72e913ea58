//! # Behaviour Core
//!
//! Runtime for data-driven behaviour graphs. Editor-authored graphs arrive as
//! serialized node records; this crate unpacks them into wired node sets,
//! activates them against a host context, and lets socket changes drive stat
//! modifiers on characters from `stat_rules`.
//!
//! ## Core Components
//!
//! - **unpack**: Two-pass graph deserializer, shape registry, and output id cursor
//! - **socket**: Output/input sockets and reactive connection entries
//! - **node**: Node contract, lifecycle states, and the runtime context
//! - **graph**: The live node set with whole-graph setup and removal
//! - **nodes**: Built-in node kinds, including the stat-granting binding node
//!
//! ## Design Philosophy
//!
//! - **Inert until activated**: Unpacking never runs node behaviour
//! - **Deterministic**: The same records and cursor always give the same ids and wiring
//! - **Single-threaded**: All dispatch is synchronous on the caller's thread

pub mod config;
pub mod error;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod socket;
pub mod unpack;

#[cfg(test)]
mod test_support;

pub use config::*;
pub use error::*;
pub use graph::*;
pub use node::*;
pub use nodes::*;
pub use socket::*;
pub use unpack::*;
