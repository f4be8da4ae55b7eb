//! Strata Core - collaborator contracts for the compositing pipeline
//!
//! The compositing core in `strata-render` never rasterizes anything itself.
//! It orchestrates stages against the contracts defined here:
//!
//! - a scene graph with depth-first traversal and per-object materials
//! - cameras carrying a layer visibility mask
//! - render targets (colour + depth) shared between composers
//! - a renderer handle ([`RenderBackend`]) with clear colour/alpha control
//!
//! [`SoftwareRenderer`] is a small CPU implementation of the renderer contract
//! so pipelines can be executed and inspected without a GPU.

mod error;
mod extent;

pub mod camera;
pub mod layers;
pub mod material;
pub mod renderer;
pub mod scene;
pub mod texture;

pub use camera::{Camera, CameraRef, Projection};
pub use error::{Error, Result};
pub use extent::Extent;
pub use layers::LayerMask;
pub use material::{Material, MaterialRef};
pub use renderer::{RenderBackend, RenderOutput, SoftwareRenderer};
pub use scene::{Object3D, ObjectId, ObjectKind, Quad, Scene, SceneRef};
pub use texture::{RenderTarget, TargetParams, TextureFilter, TextureRef};
