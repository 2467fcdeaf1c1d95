use std::any::Any;
use std::time::Duration;

use crate::api::error::Result;
use crate::api::types::{ComponentId, ObjectId, TaskId};
use crate::core::scheduler::{Routine, TaskHost};
use crate::core::timer::TimerFuture;
use crate::core::world::World;

/// A behavior module attached to exactly one live entity at a time.
///
/// `initialize` runs exactly once, synchronously, when the component is
/// attached; `remove` runs exactly once on detachment. A component that needs
/// per-frame behavior starts its own task in `initialize`, records the
/// handle, and stops it in `remove` — the scheduler never cleans up after a
/// stopped routine, so this pair is where resource lifetimes belong.
///
/// A detached component value may be re-attached to a different entity; its
/// owner reference resets. Attachment moves the value into the
/// [`World`](crate::core::world::World), so one instance can never be live on
/// two entities at once.
pub trait Component: Any {
    fn initialize(&mut self, ctx: &mut ComponentCtx<'_>) -> Result<()>;

    fn remove(&mut self, ctx: &mut ComponentCtx<'_>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Attachment-scoped access handed to `initialize`/`remove`.
pub struct ComponentCtx<'a> {
    world: &'a mut World,
    tasks: &'a mut dyn TaskHost,
    owner: ObjectId,
    id: ComponentId,
}

impl<'a> ComponentCtx<'a> {
    pub(crate) fn new(
        world: &'a mut World,
        tasks: &'a mut dyn TaskHost,
        owner: ObjectId,
        id: ComponentId,
    ) -> Self {
        Self { world, tasks, owner, id }
    }

    /// The entity this component is being attached to / detached from.
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// The component's own registry handle.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn world(&mut self) -> &mut World {
        self.world
    }

    /// Start a task scoped to this attachment. Record the handle and stop it
    /// in `remove`.
    pub fn start(&mut self, routine: impl Routine + 'static) -> TaskId {
        self.tasks.start_boxed(self.world, Box::new(routine))
    }

    pub fn stop(&mut self, task: TaskId) {
        self.tasks.stop(task);
    }

    pub fn timer(&self, duration: Duration) -> TimerFuture {
        self.tasks.timer(duration)
    }
}
