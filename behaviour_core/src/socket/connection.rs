//! Connection entries - the live value behind an output plus its change hooks.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::warn;

use super::OutputId;
use crate::error::BehaviourError;

/// Values that can flow through a socket.
///
/// `Default` is what an unconnected input reads as.
pub trait SocketValue: Clone + Default + PartialEq + 'static {}

impl<T: Clone + Default + PartialEq + 'static> SocketValue for T {}

/// Outcome of a change handler.
pub type HandlerResult = Result<(), BehaviourError>;

type Handler = Rc<dyn Fn() -> HandlerResult>;

/// Which side of a value change a handler observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangePhase {
    /// Runs before the value changes; the old value is still visible.
    Before,
    /// Runs after the value changed; the new value is visible.
    After,
}

/// Identity of one attached handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct HandlerSet {
    next_id: Cell<u64>,
    before: RefCell<Vec<(HandlerId, Handler)>>,
    after: RefCell<Vec<(HandlerId, Handler)>>,
}

impl HandlerSet {
    fn list(&self, phase: ChangePhase) -> &RefCell<Vec<(HandlerId, Handler)>> {
        match phase {
            ChangePhase::Before => &self.before,
            ChangePhase::After => &self.after,
        }
    }

    fn attach(&self, phase: ChangePhase, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.list(phase).borrow_mut().push((id, handler));
        id
    }

    fn detach(&self, phase: ChangePhase, id: HandlerId) -> bool {
        let mut list = self.list(phase).borrow_mut();
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        list.len() != before
    }

    /// Handlers as of now. Attaching or detaching during dispatch only
    /// affects the next dispatch.
    fn snapshot(&self, phase: ChangePhase) -> Vec<Handler> {
        self.list(phase)
            .borrow()
            .iter()
            .map(|(_, handler)| Rc::clone(handler))
            .collect()
    }

    fn clear(&self) {
        self.before.borrow_mut().clear();
        self.after.borrow_mut().clear();
    }
}

/// The shared cell behind every [`ConnectionEntry`] for one output.
pub struct Connection<T> {
    output: Option<OutputId>,
    value: RefCell<T>,
    handlers: HandlerSet,
    /// Set while a change is being dispatched.
    dispatching: Cell<bool>,
}

/// Type-erased view of a connection, used by the context's connection table
/// and by subscriptions.
pub(crate) trait ErasedConnection {
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
    fn value_type(&self) -> &'static str;
    fn detach(&self, phase: ChangePhase, id: HandlerId) -> bool;
    fn clear_handlers(&self);
}

impl<T: 'static> ErasedConnection for Connection<T> {
    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }

    fn value_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn detach(&self, phase: ChangePhase, id: HandlerId) -> bool {
        self.handlers.detach(phase, id)
    }

    fn clear_handlers(&self) {
        self.handlers.clear();
    }
}

/// A live view of one output's value.
///
/// Cloning an entry yields another view of the same cell.
pub struct ConnectionEntry<T> {
    inner: Rc<Connection<T>>,
}

impl<T> Clone for ConnectionEntry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: SocketValue> ConnectionEntry<T> {
    pub(crate) fn bound(output: OutputId) -> Self {
        Self {
            inner: Rc::new(Connection {
                output: Some(output),
                value: RefCell::new(T::default()),
                handlers: HandlerSet::default(),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// An entry attached to nothing. It reads as `T::default()` and no
    /// other node can change it.
    pub fn detached() -> Self {
        Self {
            inner: Rc::new(Connection {
                output: None,
                value: RefCell::new(T::default()),
                handlers: HandlerSet::default(),
                dispatching: Cell::new(false),
            }),
        }
    }

    pub(crate) fn from_connection(inner: Rc<Connection<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn erased(&self) -> Rc<dyn ErasedConnection> {
        Rc::clone(&self.inner) as Rc<dyn ErasedConnection>
    }

    /// The output this entry observes, or `None` when detached.
    pub fn output(&self) -> Option<OutputId> {
        self.inner.output
    }

    /// Whether an output is attached. A detached entry still reads as the
    /// default value.
    pub fn is_connected(&self) -> bool {
        self.inner.output.is_some()
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Inspect the current value without cloning it.
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Attach a handler that runs before each change.
    pub fn on_before_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn() -> HandlerResult + 'static,
    {
        self.subscribe(ChangePhase::Before, handler)
    }

    /// Attach a handler that runs after each change.
    pub fn on_after_changed<F>(&self, handler: F) -> Subscription
    where
        F: Fn() -> HandlerResult + 'static,
    {
        self.subscribe(ChangePhase::After, handler)
    }

    fn subscribe<F>(&self, phase: ChangePhase, handler: F) -> Subscription
    where
        F: Fn() -> HandlerResult + 'static,
    {
        let id = self.inner.handlers.attach(phase, Rc::new(handler));
        Subscription {
            connection: self.erased(),
            phase,
            id,
        }
    }

    /// Number of handlers attached for a phase.
    pub fn handler_count(&self, phase: ChangePhase) -> usize {
        self.inner.handlers.list(phase).borrow().len()
    }

    /// Assign a new value.
    ///
    /// Runs every before-handler, stores the value, then runs every
    /// after-handler. Assigning an equal value is not a change and notifies
    /// nobody. Returns whether the value changed.
    ///
    /// A failing handler does not stop the others or the assignment; the
    /// first failure is returned once dispatch completes.
    ///
    /// Assigning from inside this entry's own dispatch, directly or through
    /// a chain of other sockets, is rejected with [`BehaviourError::Reentrant`].
    pub fn set(&self, value: T) -> Result<bool, BehaviourError> {
        if self.inner.dispatching.get() {
            return Err(BehaviourError::Reentrant("socket value"));
        }
        if *self.inner.value.borrow() == value {
            return Ok(false);
        }

        let mut failures = Vec::new();
        self.inner.dispatching.set(true);
        dispatch(self.inner.handlers.snapshot(ChangePhase::Before), &mut failures);
        *self.inner.value.borrow_mut() = value;
        dispatch(self.inner.handlers.snapshot(ChangePhase::After), &mut failures);
        self.inner.dispatching.set(false);

        let mut failures = failures.into_iter();
        match failures.next() {
            None => Ok(true),
            Some(first) => {
                for extra in failures {
                    warn!(output = ?self.inner.output, error = %extra, "socket handler failed");
                }
                Err(first)
            }
        }
    }
}

fn dispatch(handlers: Vec<Handler>, failures: &mut Vec<BehaviourError>) {
    for handler in handlers {
        if let Err(err) = handler() {
            failures.push(err);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ConnectionEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("ConnectionEntry");
        out.field("output", &self.inner.output);
        match self.inner.value.try_borrow() {
            Ok(value) => out.field("value", &*value),
            Err(_) => out.field("value", &"<changing>"),
        };
        out.finish()
    }
}

/// Token for an attached handler.
///
/// Dropping a subscription leaves the handler attached; call
/// [`Subscription::cancel`] to detach it.
#[must_use = "dropping a subscription keeps the handler attached with no way to detach it"]
pub struct Subscription {
    connection: Rc<dyn ErasedConnection>,
    phase: ChangePhase,
    id: HandlerId,
}

impl Subscription {
    pub fn phase(&self) -> ChangePhase {
        self.phase
    }

    /// Detach the handler. Returns false if it was already gone.
    pub fn cancel(self) -> bool {
        self.connection.detach(self.phase, self.id)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("value_type", &self.connection.value_type())
            .field("phase", &self.phase)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stat_rules::StatError;

    type Log = Rc<RefCell<Vec<String>>>;

    fn log_value(log: &Log, entry: &ConnectionEntry<f32>, label: &'static str) -> Subscription {
        let log = Rc::clone(log);
        let observed = entry.clone();
        let record = move || {
            log.borrow_mut().push(format!("{label}:{}", observed.value()));
            Ok(())
        };
        match label {
            l if l.starts_with("before") => entry.on_before_changed(record),
            _ => entry.on_after_changed(record),
        }
    }

    #[test]
    fn test_before_sees_old_after_sees_new() {
        let entry = ConnectionEntry::<f32>::bound(OutputId(1));
        let log: Log = Rc::default();

        let _a = log_value(&log, &entry, "before_a");
        let _b = log_value(&log, &entry, "after_a");
        let _c = log_value(&log, &entry, "before_b");
        let _d = log_value(&log, &entry, "after_b");

        assert_eq!(entry.set(5.0).unwrap(), true);

        assert_eq!(
            *log.borrow(),
            vec!["before_a:0", "before_b:0", "after_a:5", "after_b:5"]
        );
    }

    #[test]
    fn test_equal_value_is_not_a_change() {
        let entry = ConnectionEntry::<bool>::bound(OutputId(1));
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let _sub = entry.on_after_changed(move || {
            counter.set(counter.get() + 1);
            Ok(())
        });

        assert!(entry.set(true).unwrap());
        assert!(!entry.set(true).unwrap());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_attach_during_dispatch_is_deferred() {
        let entry = ConnectionEntry::<f32>::bound(OutputId(1));
        let log: Log = Rc::default();

        let outer_log = Rc::clone(&log);
        let outer_entry = entry.clone();
        let attached = Rc::new(Cell::new(false));
        let _outer = entry.on_after_changed(move || {
            outer_log.borrow_mut().push("outer".to_string());
            if !attached.replace(true) {
                let inner_log = Rc::clone(&outer_log);
                let _inner = outer_entry.on_after_changed(move || {
                    inner_log.borrow_mut().push("inner".to_string());
                    Ok(())
                });
            }
            Ok(())
        });

        entry.set(1.0).unwrap();
        assert_eq!(*log.borrow(), vec!["outer"]);

        entry.set(2.0).unwrap();
        assert_eq!(*log.borrow(), vec!["outer", "outer", "inner"]);
    }

    #[test]
    fn test_cancel_detaches_handler() {
        let entry = ConnectionEntry::<f32>::bound(OutputId(1));
        let log: Log = Rc::default();

        let sub = log_value(&log, &entry, "after");
        assert_eq!(entry.handler_count(ChangePhase::After), 1);
        assert!(sub.cancel());
        assert_eq!(entry.handler_count(ChangePhase::After), 0);

        entry.set(3.0).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_failing_handler_does_not_block_change() {
        let entry = ConnectionEntry::<f32>::bound(OutputId(1));
        let log: Log = Rc::default();

        let _failing = entry.on_before_changed(|| Err(StatError::UnknownHandle(9).into()));
        let _after = log_value(&log, &entry, "after");

        let result = entry.set(4.0);
        assert!(matches!(
            result,
            Err(BehaviourError::Stat(StatError::UnknownHandle(9)))
        ));
        assert_eq!(entry.value(), 4.0);
        assert_eq!(*log.borrow(), vec!["after:4"]);
    }

    #[test]
    fn test_handler_writing_own_socket_is_rejected() {
        let entry = ConnectionEntry::<f32>::bound(OutputId(1));
        let writer = entry.clone();
        let _echo = entry.on_after_changed(move || {
            writer.set(writer.value() + 1.0)?;
            Ok(())
        });

        let result = entry.set(1.0);

        assert!(matches!(result, Err(BehaviourError::Reentrant("socket value"))));
        assert_eq!(entry.value(), 1.0);

        // The entry is usable again once dispatch has finished.
        assert!(matches!(entry.set(5.0), Err(BehaviourError::Reentrant(_))));
        assert_eq!(entry.value(), 5.0);
    }

    #[test]
    fn test_detached_entry_reads_default() {
        let entry = ConnectionEntry::<f32>::detached();
        assert!(!entry.is_connected());
        assert_eq!(entry.output(), None);
        assert_eq!(entry.value(), 0.0);

        let target = ConnectionEntry::<Option<stat_rules::EntityId>>::detached();
        assert_eq!(target.value(), None);
    }

    #[test]
    fn test_clones_share_one_cell() {
        let entry = ConnectionEntry::<f32>::bound(OutputId(2));
        let view = entry.clone();

        entry.set(6.5).unwrap();
        assert_eq!(view.value(), 6.5);
        assert_eq!(view.with_value(|v| *v * 2.0), 13.0);
    }
}
