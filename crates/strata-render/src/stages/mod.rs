//! Render stages
//!
//! A stage is one step of a composer's chain. It reads the composer's front
//! buffer and either draws into it or writes a new image into the back
//! buffer, in which case it declares [`Stage::needs_swap`].

mod bloom;
mod composite;
mod fxaa;
mod registry;
mod scene;

pub use bloom::InitialBloomStage;
pub use composite::{FinalBloomStage, ObfuscationStage};
pub use fxaa::FxaaStage;
pub use registry::{StageConstructor, StageRegistry};
pub use scene::SceneStage;

use crate::config::{BloomParams, CompositeParams};
use crate::shaders::ShaderProgram;
use crate::{ConstructionError, Result};
use glam::{Vec2, Vec4};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use strata_core::{CameraRef, Extent, RenderBackend, RenderTarget, SceneRef, TextureRef};

/// Shared handle to a stage. A cached stage may sit in several composers.
pub type StageRef = Arc<Mutex<dyn Stage>>;

pub fn shared<S: Stage + 'static>(stage: S) -> StageRef {
    Arc::new(Mutex::new(stage))
}

/// Groups of stage kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageCategory {
    /// Stages sized after the whole viewport
    Viewport,
    /// Scene renders of one layer
    LayerScene,
    /// Blends of the front buffer with another texture
    Texture,
    /// Standalone image filters
    Algorithm,
}

impl StageCategory {
    pub const ALL: [StageCategory; 4] = [
        StageCategory::Viewport,
        StageCategory::LayerScene,
        StageCategory::Texture,
        StageCategory::Algorithm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageCategory::Viewport => "Viewport",
            StageCategory::LayerScene => "ViewportLayer",
            StageCategory::Texture => "Texture",
            StageCategory::Algorithm => "Algorithm",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for StageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in stage kinds. Kind names are unique across categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    InitialBloom,
    Render,
    Obfuscation,
    FinalBloom,
    Fxaa,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::InitialBloom,
        StageKind::Render,
        StageKind::Obfuscation,
        StageKind::FinalBloom,
        StageKind::Fxaa,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::InitialBloom => "InitialBloom",
            StageKind::Render => "Render",
            StageKind::Obfuscation => "Obfuscation",
            StageKind::FinalBloom => "FinalBloom",
            StageKind::Fxaa => "Fxaa",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn category(&self) -> StageCategory {
        match self {
            StageKind::InitialBloom => StageCategory::Viewport,
            StageKind::Render => StageCategory::LayerScene,
            StageKind::Obfuscation | StageKind::FinalBloom => StageCategory::Texture,
            StageKind::Fxaa => StageCategory::Algorithm,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a stage is built from
#[derive(Clone, Default)]
pub enum StageInput {
    #[default]
    None,
    Viewport {
        size: Extent,
        bloom: BloomParams,
    },
    Scene {
        scene: SceneRef,
        camera: CameraRef,
    },
    Texture {
        texture: TextureRef,
        composite: CompositeParams,
    },
}

impl StageInput {
    fn label(&self) -> &'static str {
        match self {
            StageInput::None => "none",
            StageInput::Viewport { .. } => "viewport",
            StageInput::Scene { .. } => "scene",
            StageInput::Texture { .. } => "texture",
        }
    }
}

/// Construction arguments of a stage
#[derive(Clone)]
pub struct StageArgs {
    pub input: StageInput,
    pub enabled: bool,
}

impl StageArgs {
    pub fn none() -> Self {
        Self {
            input: StageInput::None,
            enabled: true,
        }
    }

    pub fn scene(scene: SceneRef, camera: CameraRef) -> Self {
        Self {
            input: StageInput::Scene { scene, camera },
            enabled: true,
        }
    }

    pub fn texture(texture: TextureRef) -> Self {
        Self {
            input: StageInput::Texture {
                texture,
                composite: CompositeParams::default(),
            },
            enabled: true,
        }
    }

    pub fn viewport(size: Extent) -> Self {
        Self {
            input: StageInput::Viewport {
                size,
                bloom: BloomParams::default(),
            },
            enabled: true,
        }
    }

    pub fn with_bloom(mut self, params: BloomParams) -> Self {
        if let StageInput::Viewport { bloom, .. } = &mut self.input {
            *bloom = params;
        }
        self
    }

    pub fn with_composite(mut self, params: CompositeParams) -> Self {
        if let StageInput::Texture { composite, .. } = &mut self.input {
            *composite = params.sanitized();
        }
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub(crate) fn mismatch(&self, kind: &str, expected: &'static str) -> ConstructionError {
        log::debug!("Stage '{}' given {} input", kind, self.input.label());
        ConstructionError::ArgumentMismatch {
            kind: kind.to_string(),
            expected,
        }
    }
}

impl Default for StageArgs {
    fn default() -> Self {
        Self::none()
    }
}

/// Everything a stage sees while it runs
pub struct StageContext<'a> {
    pub renderer: &'a mut dyn RenderBackend,
    /// Front buffer: the most recently written image
    pub read: &'a TextureRef,
    /// Back buffer
    pub write: &'a TextureRef,
    /// This is the last enabled stage of a composer presenting to screen
    pub to_screen: bool,
    /// No stage has written the front buffer yet this pass
    pub fresh: bool,
    pub delta_time: f32,
}

impl StageContext<'_> {
    /// Where a swapping stage writes its result
    pub fn output(&self) -> TextureRef {
        if self.to_screen {
            self.renderer.screen()
        } else {
            self.write.clone()
        }
    }
}

/// Stage trait - implemented by every render step
pub trait Stage: Send + Sync + AsAny {
    fn name(&self) -> &str;

    /// Kind name the stage was registered under
    fn kind(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Whether running this stage makes the back buffer the new front
    fn needs_swap(&self) -> bool;

    /// Resolution changed
    fn set_size(&mut self, size: Extent) {
        let _ = size;
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) -> Result<()>;

    /// GPU form of the stage, for fullscreen stages
    fn program(&self) -> Option<ShaderProgram> {
        None
    }
}

/// Helper trait for downcasting stage trait objects
pub trait AsAny {
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

impl<T: Stage + 'static> AsAny for T {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Run a per-pixel function over the front buffer into the stage output.
///
/// `shade` receives the front buffer and the texture coordinate of the
/// output pixel centre.
pub(crate) fn run_fullscreen<F>(ctx: &StageContext<'_>, shade: F)
where
    F: Fn(&RenderTarget, Vec2) -> Vec4,
{
    let output = ctx.output();
    let input = ctx.read.read();
    let mut out = output.write();
    for y in 0..out.height() {
        for x in 0..out.width() {
            let uv = out.uv(x, y);
            out.set_pixel(x, y, shade(&input, uv));
        }
    }
}

/// Rec. 601 luma
pub(crate) fn luminance(color: Vec4) -> f32 {
    color.truncate().dot(glam::Vec3::new(0.299, 0.587, 0.114))
}
