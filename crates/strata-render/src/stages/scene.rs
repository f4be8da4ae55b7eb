use super::{Stage, StageContext, StageKind};
use crate::Result;
use strata_core::{CameraRef, RenderOutput, SceneRef};

/// Draws one (scene, camera) pair into the front buffer.
///
/// Only the first scene drawn in a pass clears; later scenes of the same
/// stack draw over it.
pub struct SceneStage {
    enabled: bool,
    scene: SceneRef,
    camera: CameraRef,
}

impl SceneStage {
    pub fn new(scene: SceneRef, camera: CameraRef) -> Self {
        Self {
            enabled: true,
            scene,
            camera,
        }
    }

    pub fn scene(&self) -> &SceneRef {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRef {
        &self.camera
    }
}

impl Stage for SceneStage {
    fn name(&self) -> &str {
        "scene"
    }

    fn kind(&self) -> &str {
        StageKind::Render.name()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn needs_swap(&self) -> bool {
        false
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) -> Result<()> {
        let output = if ctx.to_screen {
            RenderOutput::Screen
        } else {
            RenderOutput::Target(ctx.read)
        };
        let scene = self.scene.read();
        let camera = self.camera.read();
        ctx.renderer.render_scene(&scene, &camera, output, ctx.fresh)?;
        Ok(())
    }
}
