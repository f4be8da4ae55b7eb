//! Cameras

use crate::layers::LayerMask;
use crate::scene::ObjectId;
use glam::{Mat4, Vec3};
use parking_lot::RwLock;
use std::sync::Arc;

pub type CameraRef = Arc<RwLock<Camera>>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    id: ObjectId,
    pub name: String,
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    /// Channels this camera draws
    pub layers: LayerMask,
}

impl Camera {
    fn with_projection(projection: Projection) -> Self {
        Self {
            id: ObjectId::new(),
            name: String::from("camera"),
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection,
            layers: LayerMask::default(),
        }
    }

    /// `fov_y` in degrees
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Perspective {
            fov_y,
            aspect,
            near,
            far,
        })
    }

    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Orthographic {
            left,
            right,
            bottom,
            top,
            near,
            far,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    pub fn shared(self) -> CameraRef {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Update the aspect ratio of a perspective camera. Orthographic cameras
    /// keep their explicit frustum.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = new_aspect;
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y.to_radians(), aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(50.0, 16.0 / 9.0, 1.0, 10000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orthographic_maps_origin_to_center() {
        let camera = Camera::orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 100.0);
        let clip = camera.view_projection() * glam::Vec4::new(0.5, -0.5, 0.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!((ndc.x - 0.5).abs() < 1e-5);
        assert!((ndc.y + 0.5).abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn test_set_aspect_only_affects_perspective() {
        let mut camera = Camera::default();
        camera.set_aspect(2.0);
        assert!(matches!(camera.projection, Projection::Perspective { aspect, .. } if aspect == 2.0));

        let mut ortho = Camera::orthographic(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
        let before = ortho.projection;
        ortho.set_aspect(3.0);
        assert_eq!(ortho.projection, before);
    }
}
