//! Strata Render - layered compositing with selective bloom
//!
//! The pipeline is assembled from small pieces:
//!
//! - [`stages`]: individual render steps and the [`StageRegistry`] that builds them
//! - [`composer`]: ping/pong stage chains, the [`StageCache`] and the [`ComposerBuilder`]
//! - [`masking`]: temporary material swaps used to isolate bloom geometry
//! - [`render`]: groups of composers forming one rendering of a layer
//! - [`layer`] / [`viewport`]: scene stacks, layers and the frame loop
//!
//! Rendering is single-threaded. Hooks that touch shared camera, scene or
//! renderer state restore it before [`Composer::render`] returns, on every
//! exit path.

pub mod composer;
pub mod config;
pub mod layer;
pub mod masking;
pub mod render;
pub mod shaders;
pub mod stages;
pub mod viewport;

pub use composer::{
    CacheKey, CacheStats, Composer, ComposerBuilder, ComposerHooks, NoHooks, RenderContext,
    StageCache,
};
pub use config::{BloomParams, CompositeParams, LayerConfig, ViewportConfig};
pub use layer::{ExtraInput, ExtraStage, ExtraStageArgs, LayerDescriptor, LayerEvent, SceneStack, SceneTarget, ViewportLayer};
pub use masking::{BloomMembership, MaskRegistry, MaskScope, SharedMaskRegistry};
pub use render::{ComposerStrategy, Render, RenderMode};
pub use stages::{
    Stage, StageArgs, StageCategory, StageContext, StageInput, StageKind, StageRef, StageRegistry,
};
pub use viewport::{FrameStats, Viewport};

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while assembling a pipeline. These are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("Unknown stage category: {0}")]
    UnknownCategory(String),

    #[error("Unknown stage kind '{kind}' in category '{category}'")]
    UnknownKind { category: String, kind: String },

    #[error("Stage '{kind}' expects {expected} arguments")]
    ArgumentMismatch { kind: String, expected: &'static str },

    #[error("Composer strategy '{0}' needs an upstream composer")]
    MissingUpstream(String),
}

/// Errors that can occur while building or rendering
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// An after-render hook could not put shared state back
    #[error("State leak: {0}")]
    StateLeak(String),

    #[error("Shader error: {0}")]
    Shader(String),

    #[error("Invalid layer name: '{0}'")]
    InvalidLayerName(String),

    #[error("Layer already exists: {0}")]
    DuplicateLayer(String),

    #[error("Core error: {0}")]
    Core(#[from] strata_core::Error),
}
