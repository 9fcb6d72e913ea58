//! Derived-value nodes that recompute whenever an input changes.

use serde::Deserialize;
use std::rc::Rc;

use crate::error::BehaviourError;
use crate::node::{BehaviourContext, Node};
use crate::socket::{InputSocket, OutputSocket, SocketValue, Subscription};
use crate::unpack::{FieldDescriptor, NodeKind};

const BINARY_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::input("a"),
    FieldDescriptor::input("b"),
    FieldDescriptor::output("output"),
];

/// Publish `combine(a, b)` now and again after every change to either input.
///
/// Subscriptions land in `subscriptions` before the first value is published,
/// so they can be cancelled even when that publish fails.
fn derive_binary<A, O>(
    ctx: &BehaviourContext,
    a: &InputSocket,
    b: &InputSocket,
    output: &OutputSocket,
    subscriptions: &mut Vec<Subscription>,
    combine: fn(A, A) -> O,
) -> Result<(), BehaviourError>
where
    A: SocketValue,
    O: SocketValue,
{
    let a = ctx.input::<A>(a)?;
    let b = ctx.input::<A>(b)?;
    let out = ctx.output::<O>(output)?;

    let recompute = {
        let (a, b) = (a.clone(), b.clone());
        Rc::new(move || out.set(combine(a.value(), b.value())).map(|_| ()))
    };

    for input in [&a, &b] {
        let recompute = Rc::clone(&recompute);
        subscriptions.push(input.on_after_changed(move || recompute()));
    }

    recompute()
}

fn cancel_all(subscriptions: &mut Vec<Subscription>) {
    for subscription in subscriptions.drain(..) {
        subscription.cancel();
    }
}

/// `output = a + b`
#[derive(Debug, Deserialize)]
pub struct AddNode {
    pub a: InputSocket,
    pub b: InputSocket,
    pub output: OutputSocket,
    #[serde(skip)]
    subscriptions: Vec<Subscription>,
}

impl Node for AddNode {
    fn inputs(&self) -> Vec<(&'static str, InputSocket)> {
        vec![("a", self.a), ("b", self.b)]
    }

    fn outputs(&self) -> Vec<(&'static str, OutputSocket)> {
        vec![("output", self.output)]
    }

    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        derive_binary::<f32, f32>(
            ctx,
            &self.a,
            &self.b,
            &self.output,
            &mut self.subscriptions,
            |a, b| a + b,
        )
    }

    fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        cancel_all(&mut self.subscriptions);
        Ok(())
    }
}

impl NodeKind for AddNode {
    const KIND: &'static str = "Math/Add";
    const CATEGORY: &'static str = "Math";
    const FIELDS: &'static [FieldDescriptor] = BINARY_FIELDS;
}

/// `output = a > b`
#[derive(Debug, Deserialize)]
pub struct GreaterThanNode {
    pub a: InputSocket,
    pub b: InputSocket,
    pub output: OutputSocket,
    #[serde(skip)]
    subscriptions: Vec<Subscription>,
}

impl Node for GreaterThanNode {
    fn inputs(&self) -> Vec<(&'static str, InputSocket)> {
        vec![("a", self.a), ("b", self.b)]
    }

    fn outputs(&self) -> Vec<(&'static str, OutputSocket)> {
        vec![("output", self.output)]
    }

    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        derive_binary::<f32, bool>(
            ctx,
            &self.a,
            &self.b,
            &self.output,
            &mut self.subscriptions,
            |a, b| a > b,
        )
    }

    fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        cancel_all(&mut self.subscriptions);
        Ok(())
    }
}

impl NodeKind for GreaterThanNode {
    const KIND: &'static str = "Logic/Greater Than";
    const CATEGORY: &'static str = "Logic";
    const FIELDS: &'static [FieldDescriptor] = BINARY_FIELDS;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LocalId;
    use crate::socket::{ChangePhase, OutputId};
    use crate::unpack::{GraphRecord, GraphUnpacker, NodeRegistry, UnpackCursor};
    use serde_json::json;
    use stat_rules::CharacterRoster;
    use std::cell::RefCell;

    fn context() -> BehaviourContext {
        BehaviourContext::new(Rc::new(RefCell::new(CharacterRoster::new())))
    }

    fn add(a: Option<u64>, b: Option<u64>, output: u64) -> AddNode {
        AddNode {
            a: InputSocket::from(a.map(OutputId)),
            b: InputSocket::from(b.map(OutputId)),
            output: OutputSocket::new(OutputId(output)),
            subscriptions: Vec::new(),
        }
    }

    #[test]
    fn test_add_tracks_inputs() {
        let ctx = context();
        let a = ctx.connection::<f32>(OutputId(1)).unwrap();
        let b = ctx.connection::<f32>(OutputId(2)).unwrap();
        a.set(2.0).unwrap();

        let mut node = add(Some(1), Some(2), 3);
        node.setup(&ctx).unwrap();
        let sum = ctx.connection::<f32>(OutputId(3)).unwrap();
        assert_eq!(sum.value(), 2.0);

        b.set(3.5).unwrap();
        assert_eq!(sum.value(), 5.5);
    }

    #[test]
    fn test_unconnected_input_reads_zero() {
        let ctx = context();
        let a = ctx.connection::<f32>(OutputId(1)).unwrap();

        let mut node = add(Some(1), None, 3);
        node.setup(&ctx).unwrap();
        a.set(4.0).unwrap();

        assert_eq!(ctx.connection::<f32>(OutputId(3)).unwrap().value(), 4.0);
    }

    #[test]
    fn test_remove_stops_tracking() {
        let ctx = context();
        let a = ctx.connection::<f32>(OutputId(1)).unwrap();

        let mut node = add(Some(1), None, 3);
        node.setup(&ctx).unwrap();
        assert_eq!(a.handler_count(ChangePhase::After), 1);

        node.remove(&ctx).unwrap();
        assert_eq!(a.handler_count(ChangePhase::After), 0);

        a.set(9.0).unwrap();
        assert_eq!(ctx.connection::<f32>(OutputId(3)).unwrap().value(), 0.0);
    }

    #[test]
    fn test_greater_than_chains_into_bool() {
        let ctx = context();
        let a = ctx.connection::<f32>(OutputId(1)).unwrap();
        let b = ctx.connection::<f32>(OutputId(2)).unwrap();
        b.set(10.0).unwrap();

        let mut node = GreaterThanNode {
            a: InputSocket::new(OutputId(1)),
            b: InputSocket::new(OutputId(2)),
            output: OutputSocket::new(OutputId(3)),
            subscriptions: Vec::new(),
        };
        node.setup(&ctx).unwrap();
        let result = ctx.connection::<bool>(OutputId(3)).unwrap();
        assert!(!result.value());

        a.set(12.0).unwrap();
        assert!(result.value());
    }

    #[test]
    fn test_output_type_clash_fails_setup() {
        let ctx = context();
        ctx.connection::<bool>(OutputId(3)).unwrap();

        let mut node = add(None, None, 3);
        assert!(matches!(
            node.setup(&ctx),
            Err(BehaviourError::SocketType { .. })
        ));
    }

    #[test]
    fn test_self_wired_add_fails_setup_without_recursing() {
        let registry = NodeRegistry::standard();
        let mut cursor = UnpackCursor::new();
        let records = vec![
            GraphRecord::new(LocalId(1), "Value/Float", json!({ "value": 1.0 })),
            GraphRecord::new(
                LocalId(2),
                "Math/Add",
                json!({
                    "a": LocalId(2).output_token("output"),
                    "b": LocalId(1).output_token("output"),
                }),
            ),
        ];
        let mut graph = GraphUnpacker::new(&registry)
            .unpack(&records, &mut cursor)
            .unwrap();
        assert_eq!(
            graph.input_socket(LocalId(2), "a").unwrap().target(),
            Some(OutputId(2))
        );

        let ctx = context();
        let err = graph.setup(&ctx).unwrap_err();
        assert!(matches!(err, BehaviourError::Reentrant("socket value")));

        let float = ctx.connection::<f32>(OutputId(1)).unwrap();
        let sum = ctx.connection::<f32>(OutputId(2)).unwrap();
        assert_eq!(sum.value(), 1.0);

        // Later changes stay bounded too.
        assert!(float.set(3.0).is_err());
        assert_eq!(sum.value(), 4.0);

        graph.remove(&ctx).unwrap();
        assert_eq!(float.handler_count(ChangePhase::After), 0);
        assert_eq!(sum.handler_count(ChangePhase::After), 0);
    }
}
