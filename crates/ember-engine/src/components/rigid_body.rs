use std::any::Any;

use glam::Vec2;

use crate::api::error::{ensure_finite, ensure_finite_scalar, EngineError, Result};
use crate::api::types::{ComponentId, ObjectId, TaskId};
use crate::components::component::{Component, ComponentCtx};
use crate::core::scheduler::{Step, TaskQueue};
use crate::core::world::World;

/// Below this speed a kinematic body's velocity snaps to exactly zero.
const SLEEP_THRESHOLD: f32 = 0.01;

/// How a body responds to the per-tick update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Gravity-integrated each tick. Unaffected by drag.
    Dynamic,
    /// Drag-damped velocity, no gravity. Snaps to rest below the sleep
    /// threshold.
    Kinematic,
    /// Never moves.
    Static,
}

/// Impulse-driven body integrating the owner's position once per tick.
///
/// All quantities are in per-tick units — the runtime is frame-locked and
/// makes no cross-platform timing guarantee, so there is no dt scaling here.
/// Forces are impulse-only: `add_force` folds straight into velocity and the
/// accumulator is cleared at the top of every update.
#[derive(Debug, Clone)]
pub struct RigidBody {
    mass: f32,
    gravity: Vec2,
    velocity: Vec2,
    force: Vec2,
    kind: BodyKind,
    drag: f32,
    owner: Option<ObjectId>,
    task: Option<TaskId>,
}

impl RigidBody {
    /// Body with mass 1, gravity (0, 9.8) and drag 1, matching the defaults
    /// hosts almost always override.
    pub fn new(kind: BodyKind) -> Self {
        Self {
            mass: 1.0,
            gravity: Vec2::new(0.0, 9.8),
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            kind,
            drag: 1.0,
            owner: None,
            task: None,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Result<Self> {
        self.set_mass(mass)?;
        Ok(self)
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Result<Self> {
        self.set_gravity(gravity)?;
        Ok(self)
    }

    pub fn with_drag(mut self, drag: f32) -> Result<Self> {
        self.set_drag(drag)?;
        Ok(self)
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Result<Self> {
        self.set_velocity(velocity)?;
        Ok(self)
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn drag(&self) -> f32 {
        self.drag
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub fn set_mass(&mut self, mass: f32) -> Result<()> {
        ensure_finite_scalar(mass, "mass")?;
        if mass <= 0.0 {
            return Err(EngineError::value(format!("mass must be positive, got {mass}")));
        }
        self.mass = mass;
        Ok(())
    }

    pub fn set_gravity(&mut self, gravity: Vec2) -> Result<()> {
        ensure_finite(gravity, "gravity")?;
        self.gravity = gravity;
        Ok(())
    }

    pub fn set_drag(&mut self, drag: f32) -> Result<()> {
        ensure_finite_scalar(drag, "drag")?;
        if drag < 0.0 {
            return Err(EngineError::value(format!("drag must be non-negative, got {drag}")));
        }
        self.drag = drag;
        Ok(())
    }

    pub fn set_velocity(&mut self, velocity: Vec2) -> Result<()> {
        ensure_finite(velocity, "velocity")?;
        self.velocity = velocity;
        Ok(())
    }

    /// Accumulate a force and fold it into velocity immediately: the
    /// accumulated force divided by mass lands in velocity at call time, not
    /// integrated over the tick.
    pub fn add_force(&mut self, force: Vec2) -> Result<()> {
        ensure_finite(force, "force")?;
        self.force += force;
        self.velocity += self.force / self.mass;
        Ok(())
    }

    /// Instantaneous velocity change of `impulse / mass`.
    pub fn add_impulse(&mut self, impulse: Vec2) -> Result<()> {
        ensure_finite(impulse, "impulse")?;
        self.velocity += impulse / self.mass;
        Ok(())
    }

    /// One-dimensional elastic impulse between this body and `other`.
    ///
    /// The normal runs from `other`'s position to this body's position.
    /// Separating or parallel pairs are left alone; approaching pairs get an
    /// equal-and-opposite impulse scaled by the inverse masses, so momentum
    /// is conserved. No restitution coefficient, no angular response.
    pub fn resolve_collision(
        &mut self,
        position: Vec2,
        other: &mut RigidBody,
        other_position: Vec2,
    ) {
        let normal = (position - other_position).normalize_or_zero();
        let relative = self.velocity - other.velocity;
        let along = relative.dot(normal);
        if along >= 0.0 {
            return;
        }
        let magnitude = -along / (1.0 / self.mass + 1.0 / other.mass);
        let impulse = normal * magnitude;
        self.velocity += impulse / self.mass;
        other.velocity -= impulse / other.mass;
    }

    /// Per-tick update. Returns whether `position` changed.
    pub(crate) fn integrate(&mut self, position: &mut Vec2) -> bool {
        self.force = Vec2::ZERO;
        match self.kind {
            BodyKind::Static => false,
            BodyKind::Kinematic => {
                let direction = self.velocity.normalize_or_zero();
                let dragged = self.velocity - direction * self.drag;
                // Drag may slow an axis to zero but never flip its sign.
                self.velocity.x = if direction.x > 0.0 {
                    dragged.x.max(0.0)
                } else {
                    dragged.x.min(0.0)
                };
                self.velocity.y = if direction.y > 0.0 {
                    dragged.y.max(0.0)
                } else {
                    dragged.y.min(0.0)
                };
                if self.velocity.length() < SLEEP_THRESHOLD {
                    self.velocity = Vec2::ZERO;
                }
                *position += self.velocity;
                true
            }
            BodyKind::Dynamic => {
                self.velocity += self.gravity;
                *position += self.velocity;
                true
            }
        }
    }
}

impl Component for RigidBody {
    fn initialize(&mut self, ctx: &mut ComponentCtx<'_>) -> Result<()> {
        self.owner = Some(ctx.owner());
        let owner = ctx.owner();
        let id = ctx.id();
        // The component is registered after initialize returns, so this
        // task's synchronous first step finds nothing and integration starts
        // on the next tick.
        self.task = Some(ctx.start(move |world: &mut World, _: &mut TaskQueue| {
            step_body(world, owner, id);
            Step::Frame
        }));
        Ok(())
    }

    fn remove(&mut self, ctx: &mut ComponentCtx<'_>) {
        if let Some(task) = self.task.take() {
            ctx.stop(task);
        }
        self.owner = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn step_body(world: &mut World, owner: ObjectId, comp: ComponentId) {
    let moved = match world.entity_and_component_mut(owner, comp) {
        Some((entity, component)) => match component.as_any_mut().downcast_mut::<RigidBody>() {
            Some(body) => body.integrate(&mut entity.position),
            None => false,
        },
        None => false,
    };
    if moved {
        world.push_bounds(owner);
    }
}

/// Resolve an impulse between the rigid bodies of two entities.
///
/// Fails with a validation error when either entity is stale or carries no
/// [`RigidBody`].
pub fn resolve_bodies(world: &mut World, a: ObjectId, b: ObjectId) -> Result<()> {
    let missing = |which: ObjectId| {
        EngineError::validation(format!(
            "object {}:{} has no rigid body",
            which.index(),
            which.generation()
        ))
    };
    let expired = || EngineError::validation("expired object handle");
    let pos_a = world.entity(a).map(|e| e.position()).ok_or_else(expired)?;
    let pos_b = world.entity(b).map(|e| e.position()).ok_or_else(expired)?;

    // The two bodies live in the same table, so resolve against a snapshot of
    // `a` and write its velocity back afterwards.
    let mut body_a = world
        .component::<RigidBody>(a)
        .cloned()
        .ok_or_else(|| missing(a))?;
    {
        let body_b = world.component_mut::<RigidBody>(b).ok_or_else(|| missing(b))?;
        body_a.resolve_collision(pos_a, body_b, pos_b);
    }
    if let Some(body) = world.component_mut::<RigidBody>(a) {
        body.velocity = body_a.velocity;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::entity::{EntityDesc, Size};
    use crate::core::scheduler::Scheduler;
    use crate::renderer::headless::HeadlessTree;

    fn fixtures() -> (World, Scheduler) {
        (World::new(HeadlessTree::new()), Scheduler::new())
    }

    fn spawn_at(world: &mut World, x: f32, y: f32) -> ObjectId {
        world
            .spawn(
                EntityDesc::new(Size::new(4.0, 4.0).unwrap())
                    .with_position(Vec2::new(x, y)),
            )
            .unwrap()
    }

    fn kinematic(velocity: Vec2, drag: f32) -> RigidBody {
        RigidBody::new(BodyKind::Kinematic)
            .with_gravity(Vec2::ZERO)
            .unwrap()
            .with_drag(drag)
            .unwrap()
            .with_velocity(velocity)
            .unwrap()
    }

    #[test]
    fn constructor_validation() {
        assert!(RigidBody::new(BodyKind::Kinematic).with_mass(0.0).is_err());
        assert!(RigidBody::new(BodyKind::Kinematic).with_mass(-2.0).is_err());
        assert!(RigidBody::new(BodyKind::Kinematic).with_drag(-0.5).is_err());
        assert!(RigidBody::new(BodyKind::Kinematic)
            .with_velocity(Vec2::new(f32::NAN, 0.0))
            .is_err());
        assert!(RigidBody::new(BodyKind::Kinematic).with_drag(0.0).is_ok());
    }

    #[test]
    fn drag_decelerates_to_exact_rest_without_overshoot() {
        let (mut world, mut scheduler) = fixtures();
        let id = spawn_at(&mut world, 0.0, 0.0);
        world
            .attach(
                &mut scheduler,
                id,
                Box::new(kinematic(Vec2::new(10.0, 0.0), 1.0)),
            )
            .unwrap();

        for tick in 1..=10 {
            scheduler.tick(1.0, &mut world);
            let velocity = world.component::<RigidBody>(id).unwrap().velocity();
            let expected = (10 - tick) as f32;
            assert!(
                (velocity.x - expected).abs() < 1e-6,
                "tick {tick}: vx = {}, expected {expected}",
                velocity.x
            );
            assert!(velocity.x >= 0.0, "drag must never flip the sign");
        }
        let body = world.component::<RigidBody>(id).unwrap();
        assert_eq!(body.velocity(), Vec2::ZERO);

        // Drag applies before integration, so x accumulates 9 + 8 + ... + 0.
        let x = world.entity(id).unwrap().position().x;
        assert!((x - 45.0).abs() < 1e-4, "x = {x}");
    }

    #[test]
    fn slow_kinematic_body_snaps_to_zero() {
        let (mut world, mut scheduler) = fixtures();
        let id = spawn_at(&mut world, 0.0, 0.0);
        world
            .attach(
                &mut scheduler,
                id,
                Box::new(kinematic(Vec2::new(0.5, 0.0), 0.495)),
            )
            .unwrap();

        scheduler.tick(1.0, &mut world);
        let body = world.component::<RigidBody>(id).unwrap();
        assert_eq!(
            body.velocity(),
            Vec2::ZERO,
            "residual 0.005 is below the sleep threshold"
        );
    }

    #[test]
    fn static_bodies_never_move() {
        let (mut world, mut scheduler) = fixtures();
        let id = spawn_at(&mut world, 3.0, 3.0);
        let body = RigidBody::new(BodyKind::Static)
            .with_velocity(Vec2::new(100.0, 0.0))
            .unwrap();
        world.attach(&mut scheduler, id, Box::new(body)).unwrap();

        for _ in 0..5 {
            scheduler.tick(1.0, &mut world);
        }
        assert_eq!(world.entity(id).unwrap().position(), Vec2::new(3.0, 3.0));
    }

    #[test]
    fn dynamic_bodies_integrate_gravity() {
        let (mut world, mut scheduler) = fixtures();
        let id = spawn_at(&mut world, 0.0, 0.0);
        let body = RigidBody::new(BodyKind::Dynamic)
            .with_gravity(Vec2::new(0.0, 1.0))
            .unwrap();
        world.attach(&mut scheduler, id, Box::new(body)).unwrap();

        for _ in 0..3 {
            scheduler.tick(1.0, &mut world);
        }
        // v: 1, 2, 3 → y: 1 + 2 + 3
        assert_eq!(world.entity(id).unwrap().position().y, 6.0);
    }

    #[test]
    fn add_force_is_impulse_style() {
        let mut body = RigidBody::new(BodyKind::Kinematic).with_mass(2.0).unwrap();
        body.add_force(Vec2::new(4.0, 0.0)).unwrap();
        assert_eq!(body.velocity(), Vec2::new(2.0, 0.0));

        // The accumulator has not been cleared yet, so a second force within
        // the same tick compounds with the first.
        body.add_force(Vec2::new(4.0, 0.0)).unwrap();
        assert_eq!(body.velocity(), Vec2::new(6.0, 0.0));
    }

    #[test]
    fn add_impulse_scales_by_inverse_mass() {
        let mut body = RigidBody::new(BodyKind::Kinematic).with_mass(4.0).unwrap();
        body.add_impulse(Vec2::new(8.0, -4.0)).unwrap();
        assert_eq!(body.velocity(), Vec2::new(2.0, -1.0));
    }

    #[test]
    fn resolve_collision_conserves_momentum() {
        let mut a = RigidBody::new(BodyKind::Kinematic)
            .with_mass(2.0)
            .unwrap()
            .with_velocity(Vec2::new(-3.0, 0.0))
            .unwrap();
        let mut b = RigidBody::new(BodyKind::Kinematic)
            .with_mass(5.0)
            .unwrap()
            .with_velocity(Vec2::new(4.0, 0.0))
            .unwrap();
        let before = a.mass() * a.velocity() + b.mass() * b.velocity();

        // a sits to the right of b and they approach head-on.
        a.resolve_collision(Vec2::new(10.0, 0.0), &mut b, Vec2::new(0.0, 0.0));

        let after = a.mass() * a.velocity() + b.mass() * b.velocity();
        assert!((before - after).length() < 1e-4, "momentum drifted: {before} -> {after}");
        assert!(a.velocity().x > -3.0, "a was pushed back");
        assert!(b.velocity().x < 4.0, "b was pushed back");
    }

    #[test]
    fn resolve_collision_ignores_separating_bodies() {
        let mut a = RigidBody::new(BodyKind::Kinematic)
            .with_velocity(Vec2::new(5.0, 0.0))
            .unwrap();
        let mut b = RigidBody::new(BodyKind::Kinematic)
            .with_velocity(Vec2::new(-5.0, 0.0))
            .unwrap();

        // a moves right, b moves left, a already on the right: separating.
        a.resolve_collision(Vec2::new(10.0, 0.0), &mut b, Vec2::new(0.0, 0.0));
        assert_eq!(a.velocity(), Vec2::new(5.0, 0.0));
        assert_eq!(b.velocity(), Vec2::new(-5.0, 0.0));
    }

    #[test]
    fn resolve_bodies_requires_rigid_bodies() {
        let (mut world, mut scheduler) = fixtures();
        let a = spawn_at(&mut world, 0.0, 0.0);
        let b = spawn_at(&mut world, 1.0, 0.0);
        assert!(resolve_bodies(&mut world, a, b).is_err());

        world
            .attach(&mut scheduler, a, Box::new(kinematic(Vec2::new(1.0, 0.0), 0.0)))
            .unwrap();
        world
            .attach(&mut scheduler, b, Box::new(kinematic(Vec2::new(-1.0, 0.0), 0.0)))
            .unwrap();
        resolve_bodies(&mut world, b, a).unwrap();
        let va = world.component::<RigidBody>(a).unwrap().velocity();
        let vb = world.component::<RigidBody>(b).unwrap().velocity();
        assert!((va.x - vb.x).abs() < 1e-6, "equal masses swap approach velocity");
    }

    #[test]
    fn detaching_the_body_stops_its_task() {
        let (mut world, mut scheduler) = fixtures();
        let id = spawn_at(&mut world, 0.0, 0.0);
        let comp = world
            .attach(&mut scheduler, id, Box::new(kinematic(Vec2::new(1.0, 0.0), 0.0)))
            .unwrap();
        assert_eq!(scheduler.len(), 1);

        world.detach(&mut scheduler, id, comp);
        assert!(scheduler.is_empty());

        let before = world.entity(id).unwrap().position();
        scheduler.tick(1.0, &mut world);
        assert_eq!(world.entity(id).unwrap().position(), before);
    }
}
