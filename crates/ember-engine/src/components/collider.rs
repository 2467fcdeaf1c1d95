use std::any::Any;

use glam::Vec2;

use crate::api::error::{ensure_finite, Result};
use crate::api::types::ObjectId;
use crate::components::component::{Component, ComponentCtx};
use crate::components::entity::Size;

/// Axis-aligned overlap region. Pure geometry, no physics.
///
/// The offset is the collider's own origin; it is not summed with the owner's
/// position — collision queries between colliders compare offsets directly.
#[derive(Debug, Clone)]
pub struct Collider {
    offset: Vec2,
    size: Size,
    owner: Option<ObjectId>,
}

impl Collider {
    pub fn new(offset: Vec2, size: Size) -> Result<Self> {
        ensure_finite(offset, "offset")?;
        Ok(Self { offset, size, owner: None })
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn owner(&self) -> Option<ObjectId> {
        self.owner
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Same strict rule as entity overlap: shared edges do not collide.
    pub fn is_collide(&self, other: &Collider) -> bool {
        self.offset.x < other.offset.x + other.size.width()
            && self.offset.x + self.size.width() > other.offset.x
            && self.offset.y < other.offset.y + other.size.height()
            && self.offset.y + self.size.height() > other.offset.y
    }

    /// Point test, edges inclusive.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.offset.x
            && point.x <= self.offset.x + self.size.width()
            && point.y >= self.offset.y
            && point.y <= self.offset.y + self.size.height()
    }

    pub fn move_to(&mut self, offset: Vec2) -> Result<()> {
        ensure_finite(offset, "offset")?;
        self.offset = offset;
        Ok(())
    }
}

impl Component for Collider {
    fn initialize(&mut self, ctx: &mut ComponentCtx<'_>) -> Result<()> {
        self.owner = Some(ctx.owner());
        Ok(())
    }

    fn remove(&mut self, _ctx: &mut ComponentCtx<'_>) {
        self.owner = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
