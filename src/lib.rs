//! Strata - layered scene compositing with selective bloom
//!
//! A [`Viewport`](render::Viewport) stacks layers. Each layer draws its scenes
//! through composers assembled from cached stages, optionally isolating the
//! geometry on the bloom channel and blending a glow over the result.

pub use strata_core as core;
pub use strata_render as render;

pub mod prelude {
    pub use crate::core::{
        Camera, CameraRef, Extent, LayerMask, Material, Object3D, Quad, RenderBackend, Scene, SceneRef,
        SoftwareRenderer,
    };
    pub use crate::render::{
        BloomParams, CompositeParams, ExtraStage, LayerConfig, LayerEvent, RenderMode, StageKind, Viewport,
        ViewportConfig, ViewportLayer,
    };
    pub use glam;
}
