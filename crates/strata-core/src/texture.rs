//! Render targets
//!
//! A [`RenderTarget`] is a colour plane plus a depth plane. Composers share
//! their targets with downstream stages through [`TextureRef`] handles.

use crate::extent::Extent;
use glam::{Vec2, Vec4};
use parking_lot::RwLock;
use std::sync::Arc;

pub type TextureRef = Arc<RwLock<RenderTarget>>;

/// Depth value of a cleared depth plane
pub const FAR_DEPTH: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Sampling and encoding parameters of a render target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetParams {
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub srgb: bool,
    pub premultiplied_alpha: bool,
}

impl Default for TargetParams {
    fn default() -> Self {
        Self {
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            srgb: true,
            premultiplied_alpha: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderTarget {
    pub name: String,
    pub params: TargetParams,
    size: Extent,
    color: Vec<Vec4>,
    depth: Vec<f32>,
}

impl RenderTarget {
    /// Transparent black colour, far depth
    pub fn new(name: impl Into<String>, size: Extent) -> Self {
        Self {
            name: name.into(),
            params: TargetParams::default(),
            size,
            color: vec![Vec4::ZERO; size.pixel_count()],
            depth: vec![FAR_DEPTH; size.pixel_count()],
        }
    }

    pub fn with_params(mut self, params: TargetParams) -> Self {
        self.params = params;
        self
    }

    pub fn shared(self) -> TextureRef {
        Arc::new(RwLock::new(self))
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Reallocate both planes; contents are discarded
    pub fn resize(&mut self, size: Extent) {
        if self.size == size {
            return;
        }
        self.size = size;
        self.color = vec![Vec4::ZERO; size.pixel_count()];
        self.depth = vec![FAR_DEPTH; size.pixel_count()];
    }

    pub fn clear(&mut self, color: Vec4) {
        self.color.fill(color);
    }

    pub fn clear_depth(&mut self) {
        self.depth.fill(FAR_DEPTH);
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.color[self.index(x, y)]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Vec4) {
        let index = self.index(x, y);
        self.color[index] = color;
    }

    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.depth[self.index(x, y)]
    }

    pub fn set_depth(&mut self, x: u32, y: u32, depth: f32) {
        let index = self.index(x, y);
        self.depth[index] = depth;
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.color
    }

    /// Texture coordinate of a pixel centre. `(0, 0)` is the top-left corner.
    pub fn uv(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.size.width as f32,
            (y as f32 + 0.5) / self.size.height as f32,
        )
    }

    /// Sample with clamp-to-edge addressing, honouring the magnification
    /// filter
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let w = self.size.width as i64;
        let h = self.size.height as i64;
        if w == 0 || h == 0 {
            return Vec4::ZERO;
        }
        let fx = uv.x * w as f32 - 0.5;
        let fy = uv.y * h as f32 - 0.5;

        if self.params.mag_filter == TextureFilter::Nearest {
            let x = (fx.round() as i64).clamp(0, w - 1);
            let y = (fy.round() as i64).clamp(0, h - 1);
            return self.color[(y * w + x) as usize];
        }

        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let fetch = |x: i64, y: i64| -> Vec4 {
            let x = x.clamp(0, w - 1);
            let y = y.clamp(0, h - 1);
            self.color[(y * w + x) as usize]
        };

        let (x0, y0) = (x0 as i64, y0 as i64);
        let top = fetch(x0, y0).lerp(fetch(x0 + 1, y0), tx);
        let bottom = fetch(x0, y0 + 1).lerp(fetch(x0 + 1, y0 + 1), tx);
        top.lerp(bottom, ty)
    }
}
