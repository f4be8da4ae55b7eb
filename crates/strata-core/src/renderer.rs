//! Renderer contract and the CPU reference backend

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::extent::Extent;
use crate::scene::{Object3D, Scene};
use crate::texture::{RenderTarget, TextureRef};
use glam::{Mat4, Vec3, Vec4};

/// Where a scene render lands
#[derive(Clone, Copy)]
pub enum RenderOutput<'a> {
    Target(&'a TextureRef),
    Screen,
}

/// The renderer handle every composer draws through.
///
/// Clear colour and clear alpha are global state; stages that change them
/// are expected to put them back.
pub trait RenderBackend: Send {
    fn size(&self) -> Extent;
    fn set_size(&mut self, size: Extent);

    fn clear_color(&self) -> Vec3;
    fn set_clear_color(&mut self, color: Vec3);
    fn clear_alpha(&self) -> f32;
    fn set_clear_alpha(&mut self, alpha: f32);

    /// The presentation surface
    fn screen(&self) -> TextureRef;

    /// Draw `scene` as seen by `camera`. When `clear` is set the output is
    /// first filled with the scene background, or the clear colour and clear
    /// alpha when the scene has none.
    fn render_scene(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        output: RenderOutput<'_>,
        clear: bool,
    ) -> Result<()>;
}

/// Rasterizes quads into their screen-space bounding rectangle with a depth
/// test. Good enough to check which object landed on which pixel.
pub struct SoftwareRenderer {
    size: Extent,
    clear_color: Vec3,
    clear_alpha: f32,
    screen: TextureRef,
    draw_calls: u64,
}

impl SoftwareRenderer {
    pub fn new(size: Extent) -> Result<Self> {
        let size = size.validate()?;
        Ok(Self {
            size,
            clear_color: Vec3::ZERO,
            clear_alpha: 1.0,
            screen: RenderTarget::new("screen", size).shared(),
            draw_calls: 0,
        })
    }

    /// Objects drawn since creation
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    fn draw_object(
        &mut self,
        target: &mut RenderTarget,
        object: &Object3D,
        parent: Mat4,
        camera: &Camera,
        view_proj: Mat4,
    ) {
        if !object.visible {
            return;
        }
        let world = parent * object.transform;

        if object.is_mesh() && camera.layers.test(object.layers) {
            if let (Some(geometry), Some(material)) = (&object.geometry, &object.material) {
                let corners = geometry.corners().map(|c| view_proj.project_point3(world.transform_point3(c)));
                self.draw_calls += 1;
                rasterize(
                    target,
                    &corners,
                    material.color,
                    material.color_write,
                    material.depth_write,
                );
            }
        }

        for child in object.children() {
            self.draw_object(target, child, world, camera, view_proj);
        }
    }

    fn draw_scene(&mut self, target: &mut RenderTarget, scene: &Scene, camera: &Camera, view_proj: Mat4) {
        for object in scene.objects() {
            self.draw_object(target, object, Mat4::IDENTITY, camera, view_proj);
        }
        for attached in scene.attached() {
            self.draw_scene(target, &attached.read(), camera, view_proj);
        }
    }
}

fn rasterize(target: &mut RenderTarget, ndc: &[Vec3; 4], color: Vec4, color_write: bool, depth_write: bool) {
    let (w, h) = (target.width() as f32, target.height() as f32);

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for p in ndc {
        min = min.min(*p);
        max = max.max(*p);
    }
    let depth = ndc.iter().map(|p| p.z).sum::<f32>() / 4.0;
    if !(0.0..=1.0).contains(&depth) {
        return;
    }

    // NDC y points up, pixel rows go down
    let x0 = ((min.x + 1.0) * 0.5 * w).max(0.0);
    let x1 = ((max.x + 1.0) * 0.5 * w).min(w);
    let y0 = ((1.0 - max.y) * 0.5 * h).max(0.0);
    let y1 = ((1.0 - min.y) * 0.5 * h).min(h);

    let first_x = (x0 - 0.5).ceil().max(0.0) as u32;
    let first_y = (y0 - 0.5).ceil().max(0.0) as u32;

    let mut y = first_y;
    while (y as f32 + 0.5) < y1 {
        let mut x = first_x;
        while (x as f32 + 0.5) < x1 {
            if depth < target.depth(x, y) {
                if color_write {
                    target.set_pixel(x, y, color);
                }
                if depth_write {
                    target.set_depth(x, y, depth);
                }
            }
            x += 1;
        }
        y += 1;
    }
}

impl RenderBackend for SoftwareRenderer {
    fn size(&self) -> Extent {
        self.size
    }

    fn set_size(&mut self, size: Extent) {
        self.size = size;
        self.screen.write().resize(size);
    }

    fn clear_color(&self) -> Vec3 {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: Vec3) {
        self.clear_color = color;
    }

    fn clear_alpha(&self) -> f32 {
        self.clear_alpha
    }

    fn set_clear_alpha(&mut self, alpha: f32) {
        self.clear_alpha = alpha.clamp(0.0, 1.0);
    }

    fn screen(&self) -> TextureRef {
        self.screen.clone()
    }

    fn render_scene(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        output: RenderOutput<'_>,
        clear: bool,
    ) -> Result<()> {
        let handle = match output {
            RenderOutput::Target(texture) => texture.clone(),
            RenderOutput::Screen => self.screen.clone(),
        };
        let mut target = handle.write();
        if target.size().pixel_count() == 0 {
            return Err(Error::InvalidSize {
                width: target.width(),
                height: target.height(),
            });
        }

        if clear {
            let fill = scene
                .background
                .unwrap_or_else(|| self.clear_color.extend(self.clear_alpha));
            target.clear(fill);
            target.clear_depth();
        }

        let view_proj = camera.view_projection();
        self.draw_scene(&mut target, scene, camera, view_proj);
        log::trace!("Rendered scene '{}' into '{}'", scene.name, target.name);
        Ok(())
    }
}
