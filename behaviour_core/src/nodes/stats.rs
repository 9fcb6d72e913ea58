//! `Character/Grant Stat` - applies a stat modifier to a target while active.

use serde::Deserialize;
use std::cell::RefCell;
use std::rc::Rc;

use stat_rules::{EntityId, ModifierType, StatError, StatKind, StatSystem};

use super::binding::{BindingFailure, BindingInputs, BindingPhase, ModifierBinding};
use crate::error::BehaviourError;
use crate::node::{BehaviourContext, Node, SharedStats};
use crate::socket::{ConnectionEntry, HandlerResult, InputSocket, Subscription};
use crate::unpack::{FieldDescriptor, NodeKind};

fn default_display() -> String {
    "{0}".to_string()
}

/// Grants `effect` points of `stat` to `target` for as long as `active` holds.
///
/// `display` is a description template; `{0}` becomes the rendered modifier.
#[derive(Debug, Deserialize)]
pub struct StatsNode {
    pub target: InputSocket,
    pub active: InputSocket,
    pub effect: InputSocket,

    pub stat: StatKind,
    #[serde(default)]
    pub scaling: ModifierType,
    #[serde(default = "default_display")]
    pub display: String,

    #[serde(skip)]
    reactor: Option<Reactor>,
    #[serde(skip)]
    subscriptions: Vec<Subscription>,
}

/// The live pieces one activation of a [`StatsNode`] works with.
#[derive(Debug, Clone)]
struct Reactor {
    target: ConnectionEntry<Option<EntityId>>,
    active: ConnectionEntry<bool>,
    effect: ConnectionEntry<f32>,
    binding: Rc<RefCell<ModifierBinding>>,
    stats: SharedStats,
}

impl Reactor {
    fn inputs(&self) -> BindingInputs {
        BindingInputs {
            target: self.target.value(),
            active: self.active.value(),
            magnitude: self.effect.value(),
        }
    }

    fn drive(
        &self,
        transition: impl FnOnce(&mut ModifierBinding, &mut dyn StatSystem, BindingInputs) -> Result<(), StatError>,
    ) -> HandlerResult {
        let mut binding = self
            .binding
            .try_borrow_mut()
            .map_err(|_| BehaviourError::Reentrant("modifier binding"))?;
        let inputs = self.inputs();
        match self.stats.with(|stats| transition(&mut binding, stats, inputs)) {
            Ok(result) => result.map_err(BehaviourError::from),
            Err(err) => {
                binding.record_unavailable("stat system");
                Err(err)
            }
        }
    }
}

impl StatsNode {
    pub fn new(target: InputSocket, active: InputSocket, effect: InputSocket, stat: StatKind) -> Self {
        Self {
            target,
            active,
            effect,
            stat,
            scaling: ModifierType::default(),
            display: default_display(),
            reactor: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn with_scaling(mut self, scaling: ModifierType) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    /// Renders `display` with the `effect` value and the `stat` field, e.g.
    /// `Grants +5 Strength`. The target is not consulted, so the text reads the
    /// same whether or not a modifier is currently applied.
    pub fn describe(&self, ctx: &BehaviourContext) -> Result<String, BehaviourError> {
        let magnitude = ctx.input::<f32>(&self.effect)?.value();
        let rendered = self.stat.render_modifier(magnitude, self.scaling);
        Ok(self.display.replace("{0}", &rendered))
    }

    /// `Inactive` until set up, and again once removed.
    pub fn binding_phase(&self) -> BindingPhase {
        self.reactor
            .as_ref()
            .and_then(|reactor| reactor.binding.try_borrow().ok().map(|b| b.phase()))
            .unwrap_or(BindingPhase::Inactive)
    }

    /// The last failure seen while active.
    pub fn last_failure(&self) -> Option<BindingFailure> {
        let reactor = self.reactor.as_ref()?;
        let binding = reactor.binding.try_borrow().ok()?;
        binding.last_failure().cloned()
    }

    /// Re-run the binding against the current socket values. Picks up changes
    /// that were skipped while the stat system was busy. Does nothing unless
    /// the node is active.
    pub fn reevaluate(&self) -> Result<(), BehaviourError> {
        match &self.reactor {
            Some(reactor) => reactor.drive(|binding, stats, inputs| binding.evaluate(stats, inputs)),
            None => Ok(()),
        }
    }
}

impl Node for StatsNode {
    fn inputs(&self) -> Vec<(&'static str, InputSocket)> {
        vec![
            ("target", self.target),
            ("active", self.active),
            ("effect", self.effect),
        ]
    }

    fn setup(&mut self, ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        let reactor = Reactor {
            target: ctx.input(&self.target)?,
            active: ctx.input(&self.active)?,
            effect: ctx.input(&self.effect)?,
            binding: Rc::new(RefCell::new(ModifierBinding::new(self.stat, self.scaling))),
            stats: ctx.stats().clone(),
        };

        let before_target = reactor.clone();
        self.subscriptions.push(reactor.target.on_before_changed(move || {
            before_target.drive(|binding, stats, _| binding.on_target_changing(stats))
        }));

        let after_target = reactor.clone();
        self.subscriptions.push(reactor.target.on_after_changed(move || {
            after_target.drive(|binding, stats, inputs| binding.evaluate(stats, inputs))
        }));

        let after_active = reactor.clone();
        self.subscriptions.push(reactor.active.on_after_changed(move || {
            after_active.drive(|binding, stats, inputs| binding.evaluate(stats, inputs))
        }));

        let after_effect = reactor.clone();
        self.subscriptions.push(reactor.effect.on_after_changed(move || {
            after_effect.drive(|binding, stats, inputs| binding.on_magnitude_changed(stats, inputs))
        }));

        let initial = reactor.drive(|binding, stats, inputs| binding.evaluate(stats, inputs));
        self.reactor = Some(reactor);
        initial
    }

    fn remove(&mut self, _ctx: &BehaviourContext) -> Result<(), BehaviourError> {
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
        match self.reactor.take() {
            Some(reactor) => reactor.drive(|binding, stats, _| binding.release(stats)),
            None => Ok(()),
        }
    }
}

impl NodeKind for StatsNode {
    const KIND: &'static str = "Character/Grant Stat";
    const CATEGORY: &'static str = "Attribute";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::input("target"),
        FieldDescriptor::input("active"),
        FieldDescriptor::input("effect"),
        FieldDescriptor::plain("stat"),
        FieldDescriptor::plain("scaling"),
        FieldDescriptor::plain("display"),
    ];
}
