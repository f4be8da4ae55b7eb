//! Surface materials
//!
//! Materials are immutable once shared. Objects hold a [`MaterialRef`] and
//! swapping a material means swapping the reference, so identity can be
//! checked with `Arc::ptr_eq`.

use glam::Vec4;
use std::sync::Arc;

pub type MaterialRef = Arc<Material>;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Straight (non-premultiplied) RGBA
    pub color: Vec4,
    /// Whether fragments write colour
    pub color_write: bool,
    /// Whether fragments write depth
    pub depth_write: bool,
    /// Vertex skinning enabled
    pub skinning: bool,
}

impl Material {
    /// Opaque unlit material
    pub fn basic(name: impl Into<String>, color: Vec4) -> Self {
        Self {
            name: name.into(),
            color,
            color_write: true,
            depth_write: true,
            skinning: false,
        }
    }

    pub fn with_color_write(mut self, color_write: bool) -> Self {
        self.color_write = color_write;
        self
    }

    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }

    pub fn with_skinning(mut self, skinning: bool) -> Self {
        self.skinning = skinning;
        self
    }

    pub fn shared(self) -> MaterialRef {
        Arc::new(self)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::basic("default", Vec4::ONE)
    }
}
