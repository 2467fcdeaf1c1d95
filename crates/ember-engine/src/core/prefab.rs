//! Mass production and destruction from a template entity.

use std::time::Duration;

use log::debug;

use crate::api::error::{EngineError, Result};
use crate::api::types::ObjectId;
use crate::components::component::Component;
use crate::core::scheduler::{Step, TaskHost, TaskQueue};
use crate::core::world::World;

/// Produces a fresh component for every instantiation.
///
/// Each factory runs once per instance: a component is owned by exactly one
/// entity, so instances never share behavior state.
pub type ComponentFactory = Box<dyn Fn() -> Box<dyn Component>>;

/// A template entity plus the behaviors every instance gets.
///
/// The prefab tracks its instances for bulk destruction but does not own
/// their presentation attachment; scenes still decide what is on screen.
pub struct Prefab {
    template: ObjectId,
    factories: Vec<ComponentFactory>,
    instances: Vec<ObjectId>,
}

impl Prefab {
    pub fn new(world: &World, template: ObjectId) -> Result<Self> {
        if !world.contains(template) {
            return Err(EngineError::validation("template is not a live object"));
        }
        Ok(Self {
            template,
            factories: Vec::new(),
            instances: Vec::new(),
        })
    }

    /// Add a behavior every future instance receives (fresh per instance).
    pub fn with_component(
        mut self,
        factory: impl Fn() -> Box<dyn Component> + 'static,
    ) -> Self {
        self.factories.push(Box::new(factory));
        self
    }

    pub fn template(&self) -> ObjectId {
        self.template
    }

    /// Live tracked instances. Destroyed ones drop out once their deep
    /// removal lands.
    pub fn instances<'a>(&'a self, world: &'a World) -> impl Iterator<Item = ObjectId> + 'a {
        self.instances.iter().copied().filter(|id| world.contains(*id))
    }

    pub fn count(&self, world: &World) -> usize {
        self.instances(world).count()
    }

    pub fn is_instance(&self, world: &World, id: ObjectId) -> bool {
        self.instances.contains(&id) && world.contains(id)
    }

    /// Clone the template, attach one component per factory, and track the
    /// result.
    pub fn instantiate<T: TaskHost>(&mut self, world: &mut World, tasks: &mut T) -> Result<ObjectId> {
        self.instantiate_with(world, tasks, |_, _| Ok(()))
    }

    /// Like [`instantiate`](Self::instantiate), with a setup pass over the
    /// clone before components attach.
    pub fn instantiate_with<T: TaskHost>(
        &mut self,
        world: &mut World,
        tasks: &mut T,
        setup: impl FnOnce(&mut World, ObjectId) -> Result<()>,
    ) -> Result<ObjectId> {
        self.instances.retain(|id| world.contains(*id));

        let instance = world.copy(self.template)?;
        setup(world, instance)?;
        for factory in &self.factories {
            world.attach(tasks, instance, factory())?;
        }
        self.instances.push(instance);
        debug!(
            "prefab instantiated {}:{} ({} live)",
            instance.index(),
            instance.generation(),
            self.instances.len()
        );
        Ok(instance)
    }

    /// Deep-remove a tracked instance after `delay`. No-op when `instance`
    /// is not tracked.
    ///
    /// The removal rides a scheduler task waiting on a timer, so even a zero
    /// delay lands on the next tick rather than synchronously.
    pub fn destroy<T: TaskHost>(
        &mut self,
        world: &mut World,
        tasks: &mut T,
        instance: ObjectId,
        delay: Duration,
    ) {
        if !self.is_instance(world, instance) {
            return;
        }
        debug!(
            "prefab destroying {}:{} in {:?}",
            instance.index(),
            instance.generation(),
            delay
        );
        let mut timer = Some(tasks.timer(delay));
        tasks.start_boxed(
            world,
            Box::new(move |world: &mut World, queue: &mut TaskQueue| match timer.take() {
                Some(timer) => Step::Wait(timer),
                None => {
                    world.remove(queue, instance, true);
                    Step::Done
                }
            }),
        );
    }

    /// Destroy every tracked instance with zero delay.
    pub fn destroy_all<T: TaskHost>(&mut self, world: &mut World, tasks: &mut T) {
        let tracked: Vec<ObjectId> = self.instances(world).collect();
        for instance in tracked {
            self.destroy(world, tasks, instance, Duration::ZERO);
        }
    }
}
