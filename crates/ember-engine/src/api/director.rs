use std::collections::HashMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::api::error::{EngineError, Result};
use crate::api::types::{ObjectId, TaskId};
use crate::core::scheduler::{Routine, Scheduler};
use crate::core::scene::Scene;
use crate::core::timer::FixedTimestep;
use crate::core::world::World;
use crate::renderer::traits::VisualTree;

/// Host-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// World width in game units.
    pub world_width: f32,
    /// World height in game units.
    pub world_height: f32,
    /// Fixed timestep in seconds driving [`Director::pump`].
    pub fixed_dt: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            world_width: 800.0,
            world_height: 600.0,
            fixed_dt: 1.0 / 60.0,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON config. Unknown fields are ignored, missing
    /// ones take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RuntimeConfig = serde_json::from_str(json)
            .map_err(|err| EngineError::validation(format!("bad runtime config: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            return Err(EngineError::value(format!(
                "fixed_dt must be positive, got {}",
                self.fixed_dt
            )));
        }
        if self.world_width < 0.0 || self.world_height < 0.0 {
            return Err(EngineError::value(format!(
                "world bounds must be non-negative, got {}x{}",
                self.world_width, self.world_height
            )));
        }
        Ok(())
    }
}

/// Owns the world, the scheduler, and the name→scene registry, and enforces
/// the exactly-one-playing invariant: loading a scene kills every scene that
/// is currently playing before running the target.
pub struct Director {
    config: RuntimeConfig,
    world: World,
    scheduler: Scheduler,
    timestep: FixedTimestep,
    scenes: HashMap<String, Scene>,
}

impl Director {
    /// Build a director over a presentation backend. A root node is created
    /// and mounted immediately, so scenes can attach from the first frame.
    pub fn new(tree: impl VisualTree + 'static, config: RuntimeConfig) -> Self {
        let mut world = World::new(tree);
        let root = world.create_node();
        world.mount(root);
        let timestep = FixedTimestep::new(config.fixed_dt);
        Self {
            config,
            world,
            scheduler: Scheduler::new(),
            timestep,
            scenes: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Both halves at once, for calls that need the world and the scheduler
    /// together (component attachment, prefab work).
    pub fn parts(&mut self) -> (&mut World, &mut Scheduler) {
        (&mut self.world, &mut self.scheduler)
    }

    /// Start a task on the shared scheduler. Not scene-scoped.
    pub fn start(&mut self, routine: impl Routine + 'static) -> TaskId {
        self.scheduler.start(&mut self.world, routine)
    }

    // -- Scenes --

    /// Register (or replace) an empty scene under `name`.
    pub fn create_scene(&mut self, name: &str) -> &mut Scene {
        self.scenes.insert(name.to_string(), Scene::new());
        self.scenes.entry(name.to_string()).or_default()
    }

    /// Register a scene assembled elsewhere (or replace one).
    pub fn insert_scene(&mut self, name: &str, scene: Scene) {
        self.scenes.insert(name.to_string(), scene);
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    /// Kill every playing scene, then run the named one. Unknown names fail
    /// with a value error and kill nothing.
    pub fn load(&mut self, name: &str) -> Result<()> {
        if !self.scenes.contains_key(name) {
            return Err(EngineError::value(format!("scene named '{name}' is invalid or null")));
        }
        for scene in self.scenes.values_mut() {
            if scene.playing() {
                scene.kill(&mut self.world, &mut self.scheduler);
            }
        }
        debug!("loading scene '{name}'");
        match self.scenes.get_mut(name) {
            Some(scene) => scene.run(&mut self.world, &mut self.scheduler),
            None => Err(EngineError::value(format!("scene named '{name}' is invalid or null"))),
        }
    }

    // -- Frame driving --

    /// One scheduler tick with an explicit delta.
    pub fn tick(&mut self, dt: f32) {
        self.scheduler.tick(dt, &mut self.world);
    }

    /// Feed a variable frame delta through the fixed-timestep accumulator,
    /// ticking zero or more times. Returns how many ticks ran.
    pub fn pump(&mut self, frame_dt: f32) -> u32 {
        let steps = self.timestep.accumulate(frame_dt);
        for _ in 0..steps {
            self.scheduler.tick(self.timestep.dt(), &mut self.world);
        }
        steps
    }

    /// Whether the entity's box overlaps the configured world bounds at all
    /// (edges count, unlike entity-entity collision).
    pub fn in_bounds(&self, id: ObjectId) -> Result<bool> {
        let entity = self
            .world
            .entity(id)
            .ok_or_else(|| EngineError::validation("expired object handle"))?;
        let position = entity.position();
        let size = entity.size();
        Ok(!(position.x > self.config.world_width
            || position.x + size.width() < 0.0
            || position.y > self.config.world_height
            || position.y + size.height() < 0.0))
    }
}
