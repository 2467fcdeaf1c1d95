//! Scene load/unload protocol.
//!
//! A scene tracks entities and raw backend nodes without owning their
//! lifetimes. `run` wakes and attaches everything, `kill` soft-removes
//! everything; an external orchestrator (see
//! [`Director`](crate::api::director::Director)) keeps at most one scene
//! playing.

use log::debug;

use crate::api::error::{EngineError, Result};
use crate::api::types::{Lifecycle, NodeId, ObjectId, TaskId};
use crate::core::scheduler::{Routine, Scheduler};
use crate::core::world::World;

/// Tasks a scene is responsible for stopping when it unloads.
///
/// The scheduler itself is never scene-scoped: anything started directly on
/// it keeps running across scene switches. Tasks started through this
/// registry (or adopted into it) are stopped inside `kill` instead, unless
/// the scene opted out with [`Scene::retain_tasks`].
#[derive(Default)]
pub struct SceneTasks {
    handles: Vec<TaskId>,
}

impl SceneTasks {
    /// Start a routine and register its handle with the scene.
    pub fn start(
        &mut self,
        world: &mut World,
        scheduler: &mut Scheduler,
        routine: impl Routine + 'static,
    ) -> TaskId {
        let id = scheduler.start(world, routine);
        self.handles.push(id);
        id
    }

    /// Register a handle started elsewhere.
    pub fn adopt(&mut self, task: TaskId) {
        self.handles.push(task);
    }

    pub fn handles(&self) -> &[TaskId] {
        &self.handles
    }
}

type SceneHook = Box<dyn FnMut(&mut World, &mut Scheduler, &mut SceneTasks)>;

/// A named grouping of entities and raw nodes with an explicit run/kill
/// lifecycle.
#[derive(Default)]
pub struct Scene {
    objects: Vec<ObjectId>,
    nodes: Vec<NodeId>,
    tasks: SceneTasks,
    retain_tasks: bool,
    playing: bool,
    on_load: Option<SceneHook>,
    on_unload: Option<SceneHook>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    /// Track an entity. Attached immediately while playing, buffered until
    /// `run` otherwise. A provided layer must be a positive integer.
    pub fn add_object(
        &mut self,
        world: &mut World,
        id: ObjectId,
        layer: Option<i32>,
    ) -> Result<()> {
        if let Some(layer) = layer {
            if layer <= 0 {
                return Err(EngineError::value(format!(
                    "layer must be a positive integer, got {layer}"
                )));
            }
            world.set_layer(id, layer)?;
        }
        self.objects.push(id);
        if self.playing {
            world.attach_to_root(id)?;
        }
        Ok(())
    }

    /// Track a raw backend node (scene chrome that is not an entity).
    pub fn add_node(&mut self, world: &mut World, node: NodeId, layer: Option<i32>) -> Result<()> {
        if let Some(layer) = layer {
            if layer <= 0 {
                return Err(EngineError::value(format!(
                    "layer must be a positive integer, got {layer}"
                )));
            }
            world.set_stack_order(node, layer);
        }
        self.nodes.push(node);
        if self.playing {
            world.attach_node(node)?;
        }
        Ok(())
    }

    /// Soft-remove an entity and stop tracking it. No-op when untracked.
    pub fn remove_object(&mut self, world: &mut World, scheduler: &mut Scheduler, id: ObjectId) {
        if let Some(index) = self.objects.iter().position(|o| *o == id) {
            self.objects.swap_remove(index);
            world.remove(scheduler, id, false);
        }
    }

    pub fn has_object(&self, id: ObjectId) -> bool {
        self.objects.contains(&id)
    }

    /// Keep scene-registered tasks running after `kill`.
    pub fn retain_tasks(&mut self, retain: bool) {
        self.retain_tasks = retain;
    }

    pub fn tasks_mut(&mut self) -> &mut SceneTasks {
        &mut self.tasks
    }

    pub fn on_load(&mut self, hook: impl FnMut(&mut World, &mut Scheduler, &mut SceneTasks) + 'static) {
        self.on_load = Some(Box::new(hook));
    }

    pub fn on_unload(
        &mut self,
        hook: impl FnMut(&mut World, &mut Scheduler, &mut SceneTasks) + 'static,
    ) {
        self.on_unload = Some(Box::new(hook));
    }

    /// Wake every tracked entity, attach the survivors and all raw nodes
    /// under the mounted root, mark the scene playing, then fire `on_load`.
    ///
    /// Entities that were deep-removed while the scene was idle are silently
    /// dropped from tracking here.
    pub fn run(&mut self, world: &mut World, scheduler: &mut Scheduler) -> Result<()> {
        if world.root().is_none() {
            return Err(EngineError::initialization(
                "no presentation root mounted; call World::mount first",
            ));
        }
        let tracked = std::mem::take(&mut self.objects);
        let mut kept = Vec::with_capacity(tracked.len());
        for id in tracked {
            world.awake(id);
            if world.lifecycle(id) == Lifecycle::DeepRemoved {
                continue;
            }
            world.attach_to_root(id)?;
            kept.push(id);
        }
        self.objects = kept;

        for node in &self.nodes {
            world.attach_node(*node)?;
        }
        self.playing = true;
        debug!("scene running: {} objects, {} nodes", self.objects.len(), self.nodes.len());
        if let Some(hook) = self.on_load.as_mut() {
            hook(world, scheduler, &mut self.tasks);
        }
        Ok(())
    }

    /// Soft-remove every tracked entity, detach raw nodes, stop the scene's
    /// registered tasks (unless retained), then fire `on_unload`.
    pub fn kill(&mut self, world: &mut World, scheduler: &mut Scheduler) {
        for id in &self.objects {
            world.remove(scheduler, *id, false);
        }
        for node in &self.nodes {
            world.detach_node(*node);
        }
        if !self.retain_tasks {
            for task in self.tasks.handles.drain(..) {
                scheduler.stop(task);
            }
        }
        self.playing = false;
        debug!("scene killed");
        if let Some(hook) = self.on_unload.as_mut() {
            hook(world, scheduler, &mut self.tasks);
        }
    }
}
