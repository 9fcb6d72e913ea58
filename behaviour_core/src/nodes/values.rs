//! Source nodes that publish a constant or contextual value.

use serde::Deserialize;
use stat_rules::EntityId;

use crate::error::BehaviourError;
use crate::node::{BehaviourContext, Node};
use crate::socket::OutputSocket;
use crate::unpack::{FieldDescriptor, NodeKind};

/// Publishes a fixed number.
#[derive(Debug, Deserialize)]
pub struct FloatValueNode {
    #[serde(default)]
    pub value: f32,
    pub output: OutputSocket,
}

impl Node for FloatValueNode {
    fn outputs(&self) -> Vec<(&'static str, OutputSocket)> {
        vec![("output", self.output)]
    }

    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        ctx.output::<f32>(&self.output)?.set(self.value)?;
        Ok(())
    }

    fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        Ok(())
    }
}

impl NodeKind for FloatValueNode {
    const KIND: &'static str = "Value/Float";
    const CATEGORY: &'static str = "Value";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::plain("value"),
        FieldDescriptor::output("output"),
    ];
}

/// Publishes a fixed flag.
#[derive(Debug, Deserialize)]
pub struct BoolValueNode {
    #[serde(default)]
    pub value: bool,
    pub output: OutputSocket,
}

impl Node for BoolValueNode {
    fn outputs(&self) -> Vec<(&'static str, OutputSocket)> {
        vec![("output", self.output)]
    }

    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        ctx.output::<bool>(&self.output)?.set(self.value)?;
        Ok(())
    }

    fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        Ok(())
    }
}

impl NodeKind for BoolValueNode {
    const KIND: &'static str = "Value/Bool";
    const CATEGORY: &'static str = "Value";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::plain("value"),
        FieldDescriptor::output("output"),
    ];
}

/// Publishes the character the graph runs for.
///
/// Reads as `None` when the context has no owner.
#[derive(Debug, Deserialize)]
pub struct OwnerNode {
    pub output: OutputSocket,
}

impl Node for OwnerNode {
    fn outputs(&self) -> Vec<(&'static str, OutputSocket)> {
        vec![("output", self.output)]
    }

    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        ctx.output::<Option<EntityId>>(&self.output)?.set(ctx.owner())?;
        Ok(())
    }

    fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        Ok(())
    }
}

impl NodeKind for OwnerNode {
    const KIND: &'static str = "Character/Owner";
    const CATEGORY: &'static str = "Character";
    const FIELDS: &'static [FieldDescriptor] = &[FieldDescriptor::output("output")];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::OutputId;
    use stat_rules::CharacterRoster;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context() -> BehaviourContext {
        BehaviourContext::new(Rc::new(RefCell::new(CharacterRoster::new())))
    }

    #[test]
    fn test_value_nodes_publish_on_setup() {
        let ctx = context();
        let mut float = FloatValueNode {
            value: 2.5,
            output: OutputSocket::new(OutputId(1)),
        };
        let mut flag = BoolValueNode {
            value: true,
            output: OutputSocket::new(OutputId(2)),
        };

        float.setup(&ctx).unwrap();
        flag.setup(&ctx).unwrap();

        assert_eq!(ctx.connection::<f32>(OutputId(1)).unwrap().value(), 2.5);
        assert!(ctx.connection::<bool>(OutputId(2)).unwrap().value());
    }

    #[test]
    fn test_owner_node() {
        let hero = EntityId::new();
        let ctx = context().with_owner(hero);
        let mut owner = OwnerNode {
            output: OutputSocket::new(OutputId(1)),
        };

        owner.setup(&ctx).unwrap();
        let entry = ctx.connection::<Option<EntityId>>(OutputId(1)).unwrap();
        assert_eq!(entry.value(), Some(hero));

        let ownerless = context();
        owner.setup(&ownerless).unwrap();
        assert_eq!(
            ownerless.connection::<Option<EntityId>>(OutputId(1)).unwrap().value(),
            None
        );
    }
}
