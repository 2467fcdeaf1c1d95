pub mod api;
pub mod components;
pub mod core;
pub mod extensions;
pub mod renderer;

// Re-export key types at crate root for convenience
pub use api::director::{Director, RuntimeConfig};
pub use api::error::{EngineError, Result};
pub use api::types::{ComponentId, Lifecycle, NodeId, ObjectId, TaskId};
pub use components::collider::Collider;
pub use components::component::{Component, ComponentCtx};
pub use components::entity::{Entity, EntityDesc, Size, Transform2D};
pub use components::rigid_body::{resolve_bodies, BodyKind, RigidBody};
pub use core::prefab::{ComponentFactory, Prefab};
pub use core::scene::{Scene, SceneTasks};
pub use core::scheduler::{Routine, Scheduler, Step, TaskHost, TaskQueue};
pub use core::timer::{Clock, FixedTimestep, TimerFuture};
pub use core::world::World;
pub use extensions::{ease, ease_vec2, lerp, lerp_vec2, Easing};
pub use renderer::headless::{HeadlessTree, NodeRecord};
pub use renderer::traits::VisualTree;
