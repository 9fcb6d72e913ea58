//! The runtime context a graph is activated against.

use std::any::type_name;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use stat_rules::{EntityId, StatSystem};

use crate::error::BehaviourError;
use crate::socket::{
    Connection, ConnectionEntry, ErasedConnection, InputSocket, OutputId, OutputSocket,
    SocketValue,
};

/// Shared access to the host's stat system.
#[derive(Clone)]
pub struct SharedStats(Rc<RefCell<dyn StatSystem>>);

impl SharedStats {
    pub fn new(stats: Rc<RefCell<dyn StatSystem>>) -> Self {
        Self(stats)
    }

    /// Run `f` with exclusive access to the stat system.
    ///
    /// Fails instead of panicking if the stat system is already borrowed,
    /// e.g. when the host mutates a socket while holding it.
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn StatSystem) -> R) -> Result<R, BehaviourError> {
        let mut stats = self
            .0
            .try_borrow_mut()
            .map_err(|_| BehaviourError::Reentrant("stat system"))?;
        Ok(f(&mut *stats))
    }
}

impl fmt::Debug for SharedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedStats")
    }
}

/// Everything a node can reach while it is active.
///
/// The context owns one connection per output id; every node that reads or
/// writes that output shares it. Dropping the context detaches all handlers.
pub struct BehaviourContext {
    owner: Option<EntityId>,
    stats: SharedStats,
    connections: RefCell<HashMap<OutputId, Rc<dyn ErasedConnection>>>,
}

impl BehaviourContext {
    /// Create a context with no owner.
    pub fn new(stats: Rc<RefCell<dyn StatSystem>>) -> Self {
        Self {
            owner: None,
            stats: SharedStats::new(stats),
            connections: RefCell::new(HashMap::new()),
        }
    }

    /// Set the character this graph runs on behalf of.
    pub fn with_owner(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    /// The entry an input reads from. Unresolved inputs get a detached entry
    /// that reads as `T::default()`.
    pub fn input<T: SocketValue>(
        &self,
        socket: &InputSocket,
    ) -> Result<ConnectionEntry<T>, BehaviourError> {
        match socket.target() {
            Some(output) => self.connection(output),
            None => Ok(ConnectionEntry::detached()),
        }
    }

    /// The entry an output writes to.
    pub fn output<T: SocketValue>(
        &self,
        socket: &OutputSocket,
    ) -> Result<ConnectionEntry<T>, BehaviourError> {
        self.connection(socket.id())
    }

    /// The entry for an output id, created on first access.
    ///
    /// Every access must agree on the value type.
    pub fn connection<T: SocketValue>(
        &self,
        output: OutputId,
    ) -> Result<ConnectionEntry<T>, BehaviourError> {
        let mut table = self.connections.borrow_mut();
        if let Some(existing) = table.get(&output) {
            let actual = existing.value_type();
            return Rc::clone(existing)
                .into_any()
                .downcast::<Connection<T>>()
                .map(ConnectionEntry::from_connection)
                .map_err(|_| BehaviourError::SocketType {
                    output,
                    expected: type_name::<T>(),
                    actual,
                });
        }

        let entry = ConnectionEntry::<T>::bound(output);
        table.insert(output, entry.erased());
        Ok(entry)
    }

    /// Number of outputs with a live connection.
    pub fn connection_count(&self) -> usize {
        self.connections.borrow().len()
    }
}

impl Drop for BehaviourContext {
    fn drop(&mut self) {
        // Handlers capture entries of the connections they observe.
        for connection in self.connections.get_mut().values() {
            connection.clear_handlers();
        }
    }
}

impl fmt::Debug for BehaviourContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviourContext")
            .field("owner", &self.owner)
            .field("connections", &self.connection_count())
            .finish()
    }
}
