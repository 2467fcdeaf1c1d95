use glam::Vec2;

use crate::api::error::{ensure_finite_scalar, EngineError, Result};
use crate::api::types::{ComponentId, NodeId};

/// Non-negative 2-D extent.
///
/// Exists instead of a bare `Vec2` so the `width >= 0 && height >= 0`
/// invariant holds by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    width: f32,
    height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Result<Self> {
        ensure_finite_scalar(width, "width")?;
        ensure_finite_scalar(height, "height")?;
        if width < 0.0 || height < 0.0 {
            return Err(EngineError::value(format!(
                "size must be non-negative, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    pub const ZERO: Size = Size { width: 0.0, height: 0.0 };

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_width(&mut self, width: f32) -> Result<()> {
        *self = Size::new(width, self.height)?;
        Ok(())
    }

    pub fn set_height(&mut self, height: f32) -> Result<()> {
        *self = Size::new(self.width, height)?;
        Ok(())
    }
}

/// Decomposed transform state pushed to the presentation backend as a string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    /// Offset in world units, applied on top of the entity position.
    pub translate: Vec2,
    /// Rotation in degrees.
    pub rotate: f32,
    /// Per-axis scale factors.
    pub scale: Vec2,
    /// Per-axis skew in degrees.
    pub skew: Vec2,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            rotate: 0.0,
            scale: Vec2::ONE,
            skew: Vec2::ZERO,
        }
    }
}

impl Transform2D {
    /// Serialize in the order the backend applies: translate, rotate, scale,
    /// skew.
    pub fn to_style_string(&self) -> String {
        format!(
            "translate({}px, {}px) rotate({}deg) scale({}, {}) skew({}deg, {}deg)",
            self.translate.x,
            self.translate.y,
            self.rotate,
            self.scale.x,
            self.scale.y,
            self.skew.x,
            self.skew.y,
        )
    }
}

/// One positioned, visual-bearing object in the arena.
///
/// All mutation goes through [`World`](crate::core::world::World) so state
/// changes reach the presentation backend; this struct is the read surface.
#[derive(Debug)]
pub struct Entity {
    pub(crate) position: Vec2,
    pub(crate) size: Size,
    pub(crate) anchor: Vec2,
    pub(crate) layer: i32,
    pub(crate) transform: Transform2D,
    /// Held until deep removal, hidden from hosts while soft-removed.
    pub(crate) node: Option<NodeId>,
    pub(crate) alive: bool,
    pub(crate) attached: bool,
    pub(crate) components: Vec<ComponentId>,
}

impl Entity {
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Anchor in [0, 1] on both axes; (0, 0) pins the top-left corner.
    pub fn anchor(&self) -> Vec2 {
        self.anchor
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    pub fn component_ids(&self) -> &[ComponentId] {
        &self.components
    }

    /// Top-left corner after anchor adjustment — what the backend sees.
    pub fn bounds_origin(&self) -> Vec2 {
        Vec2::new(
            self.position.x - self.anchor.x * self.size.width(),
            self.position.y - self.anchor.y * self.size.height(),
        )
    }
}

/// Everything needed to spawn an entity.
#[derive(Debug, Clone, Copy)]
pub struct EntityDesc {
    pub position: Vec2,
    pub size: Size,
    pub anchor: Vec2,
    pub layer: i32,
    /// Existing backend node to adopt; a fresh node is created when `None`.
    pub node: Option<NodeId>,
}

impl EntityDesc {
    pub fn new(size: Size) -> Self {
        Self {
            position: Vec2::ZERO,
            size,
            anchor: Vec2::ZERO,
            layer: 0,
            node: None,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_anchor(mut self, anchor: Vec2) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_rejects_negative_extent() {
        assert!(Size::new(-1.0, 4.0).is_err());
        assert!(Size::new(4.0, -0.1).is_err());
        assert!(Size::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn size_setters_keep_the_invariant() {
        let mut size = Size::new(10.0, 20.0).unwrap();
        assert!(size.set_width(-3.0).is_err());
        assert_eq!(size.width(), 10.0, "failed set must not clobber state");
        size.set_height(5.0).unwrap();
        assert_eq!(size.height(), 5.0);
    }

    #[test]
    fn transform_style_string_format() {
        let mut t = Transform2D::default();
        t.translate = Vec2::new(4.0, -2.0);
        t.rotate = 90.0;
        assert_eq!(
            t.to_style_string(),
            "translate(4px, -2px) rotate(90deg) scale(1, 1) skew(0deg, 0deg)"
        );
    }
}
