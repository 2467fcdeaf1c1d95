//! Headless demo: two pucks slide toward each other, trade an impulse on
//! contact, and drag brings both to rest. A third puck is destroyed through
//! its prefab mid-run. Run with `cargo run -p bounce`.

use std::time::Duration;

use glam::Vec2;

use ember_engine::{
    resolve_bodies, BodyKind, Director, EngineError, EntityDesc, HeadlessTree, ObjectId, Prefab,
    Result, RigidBody, RuntimeConfig, Scene, Size, Step, TaskQueue, World,
};

const PUCK_SIZE: f32 = 20.0;
const LAUNCH_SPEED: f32 = 6.0;
const DRAG: f32 = 0.05;
const FRAMES: u32 = 240;

fn puck_body() -> RigidBody {
    let mut body = RigidBody::new(BodyKind::Kinematic);
    // Constants are finite and in range; these cannot fail.
    let _ = body.set_gravity(Vec2::ZERO);
    let _ = body.set_drag(DRAG);
    body
}

fn launch(world: &mut World, id: ObjectId, velocity: Vec2) -> Result<()> {
    world
        .component_mut::<RigidBody>(id)
        .ok_or_else(|| EngineError::validation("puck has no rigid body"))?
        .add_impulse(velocity)
}

fn main() -> Result<()> {
    let config = RuntimeConfig::from_json(r#"{"world_width": 400.0, "world_height": 200.0}"#)?;
    let mut director = Director::new(HeadlessTree::new(), config);

    // Template lives outside any scene; the prefab clones it on demand.
    let template = director.world_mut().spawn(
        EntityDesc::new(Size::new(PUCK_SIZE, PUCK_SIZE)?).with_anchor(Vec2::new(0.5, 0.5)),
    )?;
    let mut prefab =
        Prefab::new(director.world(), template)?.with_component(|| Box::new(puck_body()));

    let (world, scheduler) = director.parts();
    let left = prefab.instantiate_with(world, scheduler, |world, id| {
        world.set_position(id, Vec2::new(100.0, 100.0))
    })?;
    let right = prefab.instantiate_with(world, scheduler, |world, id| {
        world.set_position(id, Vec2::new(300.0, 100.0))
    })?;
    let bystander = prefab.instantiate_with(world, scheduler, |world, id| {
        world.set_position(id, Vec2::new(200.0, 30.0))
    })?;

    launch(world, left, Vec2::new(LAUNCH_SPEED, 0.0))?;
    launch(world, right, Vec2::new(-LAUNCH_SPEED, 0.0))?;

    let mut rink = Scene::new();
    for id in [left, right, bystander] {
        rink.add_object(world, id, None)?;
    }
    // Contact watcher lives with the scene and stops with it.
    rink.on_load(move |world, scheduler, tasks| {
        tasks.start(world, scheduler, move |world: &mut World, _: &mut TaskQueue| {
            if let Ok(true) = world.is_collide(left, right) {
                let _ = resolve_bodies(world, left, right);
            }
            Step::Frame
        });
    });
    director.insert_scene("rink", rink);
    director.load("rink")?;

    // The bystander leaves two seconds in.
    let (world, scheduler) = director.parts();
    prefab.destroy(world, scheduler, bystander, Duration::from_secs(2));

    for _ in 0..FRAMES {
        director.pump(1.0 / 60.0);
    }

    let world = director.world();
    for (name, id) in [("left", left), ("right", right)] {
        if let Some(entity) = world.entity(id) {
            let velocity = world
                .component::<RigidBody>(id)
                .map(|body| body.velocity())
                .unwrap_or_default();
            println!("{name:>9}: position {:<18} velocity {}", entity.position().to_string(), velocity);
        }
    }
    println!(
        "bystander: {:?} ({} pucks still tracked)",
        world.lifecycle(bystander),
        prefab.count(world)
    );
    Ok(())
}
