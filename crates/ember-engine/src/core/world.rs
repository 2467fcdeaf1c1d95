//! Generational entity arena.
//!
//! Entities live in slots addressed by [`ObjectId`]; deep removal frees the
//! slot and bumps its generation, so stale handles stop resolving instead of
//! dereferencing a recycled slot. Components live in a side table keyed by
//! [`ComponentId`] so a ticking task can borrow a component and its owner
//! entity at the same time.
//!
//! Every mutation that a presentation backend cares about is pushed through
//! the [`VisualTree`] immediately, while the entity is alive; soft-removed
//! entities keep their state changes to themselves until a scene reattaches
//! them.

use std::collections::HashMap;

use glam::Vec2;
use log::debug;

use crate::api::error::{ensure_finite, ensure_finite_scalar, EngineError, Result};
use crate::api::types::{ComponentId, Lifecycle, NodeId, ObjectId};
use crate::components::component::{Component, ComponentCtx};
use crate::components::entity::{Entity, EntityDesc, Size, Transform2D};
use crate::core::scheduler::TaskHost;
use crate::renderer::traits::VisualTree;

struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

fn expired() -> EngineError {
    EngineError::validation("expired object handle")
}

/// Owns every entity, their components, and the presentation backend.
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    components: HashMap<u32, Box<dyn Component>>,
    next_component: u32,
    tree: Box<dyn VisualTree>,
    root: Option<NodeId>,
}

impl World {
    pub fn new(tree: impl VisualTree + 'static) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            components: HashMap::new(),
            next_component: 0,
            tree: Box::new(tree),
            root: None,
        }
    }

    // -- Presentation plumbing --

    /// The backend, for hosts that need to read it back (see
    /// [`VisualTree::as_any`]).
    pub fn visual(&self) -> &dyn VisualTree {
        self.tree.as_ref()
    }

    /// Create a raw backend node (for scene chrome that is not an entity).
    pub fn create_node(&mut self) -> NodeId {
        self.tree.create_node()
    }

    /// Declare `root` the parent for everything a scene attaches. Scene
    /// attachment fails with an initialization error until this has run.
    pub fn mount(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Parent a raw node under the mounted root.
    pub fn attach_node(&mut self, node: NodeId) -> Result<()> {
        let root = self.root.ok_or_else(|| {
            EngineError::initialization("no presentation root mounted; call World::mount first")
        })?;
        self.tree.attach(node, root);
        Ok(())
    }

    pub fn detach_node(&mut self, node: NodeId) {
        self.tree.detach(node);
    }

    pub fn set_stack_order(&mut self, node: NodeId, order: i32) {
        self.tree.set_stack_order(node, order);
    }

    // -- Spawning and lifecycle --

    /// Create an Active entity. A fresh backend node is created unless the
    /// descriptor supplies one. The entity starts detached; scenes attach it.
    pub fn spawn(&mut self, desc: EntityDesc) -> Result<ObjectId> {
        ensure_finite(desc.position, "position")?;
        ensure_finite(desc.anchor, "anchor")?;
        if !(0.0..=1.0).contains(&desc.anchor.x) || !(0.0..=1.0).contains(&desc.anchor.y) {
            return Err(EngineError::value(format!(
                "anchor must lie in [0, 1] on both axes, got {}",
                desc.anchor
            )));
        }

        let node = match desc.node {
            Some(node) => node,
            None => self.tree.create_node(),
        };
        let entity = Entity {
            position: desc.position,
            size: desc.size,
            anchor: desc.anchor,
            layer: desc.layer,
            transform: Transform2D::default(),
            node: Some(node),
            alive: true,
            attached: false,
            components: Vec::new(),
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entity = Some(entity);
                ObjectId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, entity: Some(entity) });
                ObjectId::new(index, 0)
            }
        };

        // Mirror construction state to the backend up front.
        self.push_bounds(id);
        self.push_layer(id);
        self.push_transform(id);
        Ok(id)
    }

    /// Whether the handle still resolves (Active or SoftRemoved).
    pub fn contains(&self, id: ObjectId) -> bool {
        self.slot_entity(id).is_some()
    }

    pub fn lifecycle(&self, id: ObjectId) -> Lifecycle {
        match self.slot_entity(id) {
            Some(entity) if entity.alive => Lifecycle::Active,
            Some(_) => Lifecycle::SoftRemoved,
            None => Lifecycle::DeepRemoved,
        }
    }

    pub fn entity(&self, id: ObjectId) -> Option<&Entity> {
        self.slot_entity(id)
    }

    /// Entities currently resolving, soft-removed ones included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entity.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The visual node, visible only while the entity is Active.
    pub fn node(&self, id: ObjectId) -> Option<NodeId> {
        self.slot_entity(id).filter(|e| e.alive).and_then(|e| e.node)
    }

    /// SoftRemoved → Active. Anything else is a no-op. Does not reattach the
    /// node to the presentation tree; only a scene's `run` does that in bulk.
    pub fn awake(&mut self, id: ObjectId) -> bool {
        match self.slot_entity_mut(id) {
            Some(entity) if !entity.alive => {
                entity.alive = true;
                true
            }
            _ => false,
        }
    }

    /// Detach all components (running each `remove`), detach the node, and
    /// transition to SoftRemoved. With `deep`, additionally release the node
    /// and free the slot — irreversible, and every outstanding handle to the
    /// entity turns stale.
    pub fn remove<T: TaskHost>(&mut self, tasks: &mut T, id: ObjectId, deep: bool) {
        if !self.contains(id) {
            return;
        }
        let attached: Vec<ComponentId> = self
            .slot_entity(id)
            .map(|e| e.components.clone())
            .unwrap_or_default();
        for comp in attached {
            let _ = self.detach(tasks, id, comp);
        }

        let mut detach_node = None;
        let mut release_node = None;
        if let Some(entity) = self.slot_entity_mut(id) {
            if entity.alive {
                entity.alive = false;
                if entity.attached {
                    entity.attached = false;
                    detach_node = entity.node;
                }
            }
            if deep {
                release_node = entity.node.take();
            }
        }
        if let Some(node) = detach_node {
            self.tree.detach(node);
        }
        if deep {
            if let Some(node) = release_node {
                self.tree.release_node(node);
            }
            if let Some(slot) = self.slots.get_mut(id.index() as usize) {
                slot.entity = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index());
            }
            debug!("object {}:{} deep-removed", id.index(), id.generation());
        }
    }

    /// Clone position/size/anchor/layer and the visual node. Components are
    /// not copied. The copy is Active but unattached.
    pub fn copy(&mut self, id: ObjectId) -> Result<ObjectId> {
        let (position, size, anchor, layer, node) = {
            let entity = self.slot_entity(id).ok_or_else(expired)?;
            let node = entity.node.ok_or_else(expired)?;
            (entity.position, entity.size, entity.anchor, entity.layer, node)
        };
        let clone = self.tree.clone_node(node);
        self.spawn(
            EntityDesc::new(size)
                .with_position(position)
                .with_anchor(anchor)
                .with_layer(layer)
                .with_node(clone),
        )
    }

    // -- Geometry --

    /// Half-open AABB overlap: boxes that merely share an edge do not
    /// collide. Symmetric by construction.
    pub fn is_collide(&self, a: ObjectId, b: ObjectId) -> Result<bool> {
        let ea = self.slot_entity(a).ok_or_else(expired)?;
        let eb = self.slot_entity(b).ok_or_else(expired)?;
        Ok(aabb_overlap(ea.position, ea.size, eb.position, eb.size))
    }

    // -- State setters (push through to the backend while Active) --

    pub fn set_position(&mut self, id: ObjectId, position: Vec2) -> Result<()> {
        ensure_finite(position, "position")?;
        self.slot_entity_mut(id).ok_or_else(expired)?.position = position;
        self.push_bounds(id);
        Ok(())
    }

    pub fn set_size(&mut self, id: ObjectId, size: Size) -> Result<()> {
        self.slot_entity_mut(id).ok_or_else(expired)?.size = size;
        self.push_bounds(id);
        Ok(())
    }

    pub fn set_anchor(&mut self, id: ObjectId, anchor: Vec2) -> Result<()> {
        ensure_finite(anchor, "anchor")?;
        if !(0.0..=1.0).contains(&anchor.x) || !(0.0..=1.0).contains(&anchor.y) {
            return Err(EngineError::value(format!(
                "anchor must lie in [0, 1] on both axes, got {anchor}"
            )));
        }
        self.slot_entity_mut(id).ok_or_else(expired)?.anchor = anchor;
        self.push_bounds(id);
        Ok(())
    }

    pub fn set_layer(&mut self, id: ObjectId, layer: i32) -> Result<()> {
        self.slot_entity_mut(id).ok_or_else(expired)?.layer = layer;
        self.push_layer(id);
        Ok(())
    }

    pub fn set_translation(&mut self, id: ObjectId, translate: Vec2) -> Result<()> {
        ensure_finite(translate, "translate")?;
        self.update_transform(id, |t| t.translate = translate)
    }

    pub fn set_rotation(&mut self, id: ObjectId, degrees: f32) -> Result<()> {
        ensure_finite_scalar(degrees, "rotation")?;
        self.update_transform(id, |t| t.rotate = degrees)
    }

    pub fn set_scale(&mut self, id: ObjectId, scale: Vec2) -> Result<()> {
        ensure_finite(scale, "scale")?;
        self.update_transform(id, |t| t.scale = scale)
    }

    pub fn set_skew(&mut self, id: ObjectId, skew: Vec2) -> Result<()> {
        ensure_finite(skew, "skew")?;
        self.update_transform(id, |t| t.skew = skew)
    }

    /// Transform changes only apply while Active, matching the push-through
    /// contract: a soft-removed entity's transform is frozen.
    fn update_transform(
        &mut self,
        id: ObjectId,
        mutate: impl FnOnce(&mut Transform2D),
    ) -> Result<()> {
        let entity = self.slot_entity_mut(id).ok_or_else(expired)?;
        if !entity.alive {
            return Ok(());
        }
        mutate(&mut entity.transform);
        self.push_transform(id);
        Ok(())
    }

    // -- Components --

    /// Attach, invoking `initialize` exactly once before the component is
    /// registered. On error the component is dropped and nothing is attached.
    pub fn attach<T: TaskHost>(
        &mut self,
        tasks: &mut T,
        owner: ObjectId,
        mut component: Box<dyn Component>,
    ) -> Result<ComponentId> {
        if !self.contains(owner) {
            return Err(expired());
        }
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        {
            let mut ctx = ComponentCtx::new(self, tasks, owner, id);
            component.initialize(&mut ctx)?;
        }
        self.components.insert(id.0, component);
        if let Some(entity) = self.slot_entity_mut(owner) {
            entity.components.push(id);
        }
        Ok(id)
    }

    /// Detach, invoking `remove` exactly once. Returns the component value so
    /// callers may re-attach it elsewhere; `None` when it was not attached.
    pub fn detach<T: TaskHost>(
        &mut self,
        tasks: &mut T,
        owner: ObjectId,
        id: ComponentId,
    ) -> Option<Box<dyn Component>> {
        let present = self
            .slot_entity(owner)
            .is_some_and(|e| e.components.contains(&id));
        if !present {
            return None;
        }
        if let Some(entity) = self.slot_entity_mut(owner) {
            entity.components.retain(|c| *c != id);
        }
        let mut component = self.components.remove(&id.0)?;
        {
            let mut ctx = ComponentCtx::new(self, tasks, owner, id);
            component.remove(&mut ctx);
        }
        Some(component)
    }

    /// First attached component of concrete type `T`.
    pub fn component<T: Component>(&self, id: ObjectId) -> Option<&T> {
        let entity = self.slot_entity(id)?;
        entity.components.iter().find_map(|comp| {
            self.components
                .get(&comp.0)
                .and_then(|boxed| boxed.as_any().downcast_ref::<T>())
        })
    }

    pub fn component_mut<T: Component>(&mut self, id: ObjectId) -> Option<&mut T> {
        let key = self.find_component_id::<T>(id)?;
        self.components
            .get_mut(&key.0)
            .and_then(|boxed| boxed.as_any_mut().downcast_mut::<T>())
    }

    pub fn find_component_id<T: Component>(&self, id: ObjectId) -> Option<ComponentId> {
        let entity = self.slot_entity(id)?;
        entity.components.iter().copied().find(|comp| {
            self.components
                .get(&comp.0)
                .is_some_and(|boxed| boxed.as_any().is::<T>())
        })
    }

    /// Borrow an entity and one of its components at once (they live in
    /// separate tables). Used by per-frame component tasks.
    pub(crate) fn entity_and_component_mut(
        &mut self,
        owner: ObjectId,
        comp: ComponentId,
    ) -> Option<(&mut Entity, &mut dyn Component)> {
        let slot = self.slots.get_mut(owner.index() as usize)?;
        if slot.generation != owner.generation() {
            return None;
        }
        let entity = slot.entity.as_mut()?;
        let component = self.components.get_mut(&comp.0)?;
        Some((entity, component.as_mut()))
    }

    // -- Scene plumbing (crate-internal) --

    /// Parent the entity's node under the mounted root and refresh the pushed
    /// state, which may have gone stale while the entity was soft-removed.
    pub(crate) fn attach_to_root(&mut self, id: ObjectId) -> Result<()> {
        let root = self.root.ok_or_else(|| {
            EngineError::initialization("no presentation root mounted; call World::mount first")
        })?;
        let node = {
            let Some(entity) = self.slot_entity_mut(id) else {
                return Ok(());
            };
            let Some(node) = entity.node else {
                return Ok(());
            };
            entity.attached = true;
            node
        };
        self.tree.attach(node, root);
        self.push_bounds(id);
        self.push_layer(id);
        self.push_transform(id);
        Ok(())
    }

    // -- Backend pushes --

    pub(crate) fn push_bounds(&mut self, id: ObjectId) {
        let Some((node, origin, size)) = self.slot_entity(id).and_then(|e| {
            if !e.alive {
                return None;
            }
            e.node.map(|node| (node, e.bounds_origin(), e.size))
        }) else {
            return;
        };
        self.tree
            .set_bounds(node, origin.x, origin.y, size.width(), size.height());
    }

    fn push_layer(&mut self, id: ObjectId) {
        let Some((node, layer)) = self
            .slot_entity(id)
            .and_then(|e| if e.alive { e.node.map(|n| (n, e.layer)) } else { None })
        else {
            return;
        };
        self.tree.set_stack_order(node, layer);
    }

    fn push_transform(&mut self, id: ObjectId) {
        let Some((node, style)) = self.slot_entity(id).and_then(|e| {
            if !e.alive {
                return None;
            }
            e.node.map(|node| (node, e.transform.to_style_string()))
        }) else {
            return;
        };
        self.tree.set_transform(node, &style);
    }

    // -- Slot access --

    fn slot_entity(&self, id: ObjectId) -> Option<&Entity> {
        let slot = self.slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.as_ref()
    }

    fn slot_entity_mut(&mut self, id: ObjectId) -> Option<&mut Entity> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.entity.as_mut()
    }
}

fn aabb_overlap(pa: Vec2, sa: Size, pb: Vec2, sb: Size) -> bool {
    pa.x < pb.x + sb.width()
        && pa.x + sa.width() > pb.x
        && pa.y < pb.y + sb.height()
        && pa.y + sa.height() > pb.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::Scheduler;
    use crate::renderer::headless::HeadlessTree;

    fn world() -> World {
        World::new(HeadlessTree::new())
    }

    fn spawn_box(world: &mut World, x: f32, y: f32, w: f32, h: f32) -> ObjectId {
        world
            .spawn(
                EntityDesc::new(Size::new(w, h).unwrap()).with_position(Vec2::new(x, y)),
            )
            .unwrap()
    }

    fn headless(world: &World) -> &HeadlessTree {
        world
            .visual()
            .as_any()
            .downcast_ref::<HeadlessTree>()
            .unwrap()
    }

    #[test]
    fn spawn_pushes_initial_state() {
        let mut world = world();
        let id = world
            .spawn(
                EntityDesc::new(Size::new(10.0, 20.0).unwrap())
                    .with_position(Vec2::new(5.0, 6.0))
                    .with_layer(3),
            )
            .unwrap();
        let node = world.node(id).unwrap();
        let record = headless(&world).record(node).unwrap();
        assert_eq!(record.bounds, [5.0, 6.0, 10.0, 20.0]);
        assert_eq!(record.stack_order, 3);
    }

    #[test]
    fn spawn_rejects_bad_anchor() {
        let mut world = world();
        let desc =
            EntityDesc::new(Size::new(1.0, 1.0).unwrap()).with_anchor(Vec2::new(1.5, 0.0));
        assert!(matches!(world.spawn(desc), Err(EngineError::Value(_))));
        let desc =
            EntityDesc::new(Size::new(1.0, 1.0).unwrap()).with_anchor(Vec2::new(f32::NAN, 0.0));
        assert!(matches!(world.spawn(desc), Err(EngineError::Validation(_))));
    }

    #[test]
    fn anchor_offsets_pushed_bounds() {
        let mut world = world();
        let id = world
            .spawn(
                EntityDesc::new(Size::new(10.0, 10.0).unwrap())
                    .with_position(Vec2::new(100.0, 100.0))
                    .with_anchor(Vec2::new(0.5, 0.5)),
            )
            .unwrap();
        let node = world.node(id).unwrap();
        assert_eq!(
            headless(&world).record(node).unwrap().bounds,
            [95.0, 95.0, 10.0, 10.0]
        );
    }

    #[test]
    fn soft_remove_then_awake_is_identity_preserving() {
        let mut world = world();
        let mut scheduler = Scheduler::new();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        let node_before = world.node(id).unwrap();

        world.remove(&mut scheduler, id, false);
        assert_eq!(world.lifecycle(id), Lifecycle::SoftRemoved);
        assert_eq!(world.node(id), None, "node is hidden while soft-removed");

        assert!(world.awake(id));
        assert_eq!(world.lifecycle(id), Lifecycle::Active);
        assert_eq!(world.node(id), Some(node_before));
    }

    #[test]
    fn awake_is_a_no_op_on_active_entities() {
        let mut world = world();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        assert!(!world.awake(id));
        assert_eq!(world.lifecycle(id), Lifecycle::Active);
    }

    #[test]
    fn deep_remove_is_irreversible() {
        let mut world = world();
        let mut scheduler = Scheduler::new();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        let node = world.node(id).unwrap();

        world.remove(&mut scheduler, id, true);
        assert_eq!(world.lifecycle(id), Lifecycle::DeepRemoved);
        assert!(!world.awake(id));
        assert_ne!(world.lifecycle(id), Lifecycle::Active);
        assert!(!headless(&world).exists(node), "node released for good");

        // The handle stays stale even after the slot is reused.
        let replacement = spawn_box(&mut world, 1.0, 1.0, 2.0, 2.0);
        assert_eq!(replacement.index(), id.index());
        assert!(!world.contains(id));
        assert!(world.set_position(id, Vec2::ZERO).is_err());
    }

    #[test]
    fn deep_remove_after_soft_remove_still_releases() {
        let mut world = world();
        let mut scheduler = Scheduler::new();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        world.remove(&mut scheduler, id, false);
        world.remove(&mut scheduler, id, true);
        assert_eq!(world.lifecycle(id), Lifecycle::DeepRemoved);
    }

    #[test]
    fn copy_duplicates_the_node_independently() {
        let mut world = world();
        let id = spawn_box(&mut world, 7.0, 8.0, 4.0, 4.0);
        let copy = world.copy(id).unwrap();

        assert_ne!(world.node(id), world.node(copy));
        let e = world.entity(copy).unwrap();
        assert_eq!(e.position(), Vec2::new(7.0, 8.0));

        // Moving the copy leaves the original's visual alone.
        world.set_position(copy, Vec2::new(50.0, 0.0)).unwrap();
        let original_node = world.node(id).unwrap();
        assert_eq!(
            headless(&world).record(original_node).unwrap().bounds[0],
            7.0
        );
    }

    #[test]
    fn overlap_is_symmetric() {
        let mut world = world();
        let a = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = spawn_box(&mut world, 5.0, 5.0, 10.0, 10.0);
        assert!(world.is_collide(a, b).unwrap());
        assert!(world.is_collide(b, a).unwrap());
    }

    #[test]
    fn edge_adjacent_boxes_do_not_collide() {
        let mut world = world();
        // Touching on x, overlapping on y.
        let a = spawn_box(&mut world, 0.0, 0.0, 10.0, 10.0);
        let b = spawn_box(&mut world, 10.0, 5.0, 10.0, 10.0);
        assert!(!world.is_collide(a, b).unwrap());
        assert!(!world.is_collide(b, a).unwrap());
    }

    #[test]
    fn transform_changes_push_a_style_string() {
        let mut world = world();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        world.set_rotation(id, 45.0).unwrap();
        let node = world.node(id).unwrap();
        assert_eq!(
            headless(&world).record(node).unwrap().transform,
            "translate(0px, 0px) rotate(45deg) scale(1, 1) skew(0deg, 0deg)"
        );
    }

    #[test]
    fn transform_is_frozen_while_soft_removed() {
        let mut world = world();
        let mut scheduler = Scheduler::new();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        world.remove(&mut scheduler, id, false);
        world.set_rotation(id, 90.0).unwrap();
        assert_eq!(world.entity(id).unwrap().transform().rotate, 0.0);
    }

    #[test]
    fn setters_reject_non_finite_values() {
        let mut world = world();
        let id = spawn_box(&mut world, 0.0, 0.0, 4.0, 4.0);
        assert!(matches!(
            world.set_position(id, Vec2::new(f32::INFINITY, 0.0)),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn attach_node_requires_a_mounted_root() {
        let mut world = world();
        let node = world.create_node();
        assert!(matches!(
            world.attach_node(node),
            Err(EngineError::Initialization(_))
        ));
        let root = world.create_node();
        world.mount(root);
        world.attach_node(node).unwrap();
        assert!(headless(&world).is_attached(node));
    }
}
