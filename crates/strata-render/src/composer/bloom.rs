//! Glow isolation hooks
//!
//! Before the initial bloom composer runs its stages:
//!
//! 1. record camera layers, scene backgrounds and renderer clear alpha
//! 2. mask every mesh outside the glow set, drop the backgrounds and clear
//!    to transparent, then render the obfuscation composer
//! 3. restore the masked materials
//! 4. restrict every camera of the layer to the glow layer
//!
//! After the stages, everything recorded in step 1 is put back exactly.

use super::{Composer, ComposerHooks, RenderContext};
use crate::masking::{BloomMembership, MaskScope, SharedMaskRegistry};
use crate::Result;
use glam::Vec4;
use strata_core::{CameraRef, Extent, LayerMask, RenderBackend, SceneRef};

struct SavedState {
    camera_layers: Vec<(CameraRef, LayerMask)>,
    backgrounds: Vec<(SceneRef, Option<Vec4>)>,
    clear_alpha: f32,
}

impl SavedState {
    fn capture(scene: &SceneRef, cameras: &[CameraRef], renderer: &dyn RenderBackend) -> Self {
        let mut backgrounds = Vec::new();
        collect_backgrounds(scene, &mut backgrounds);
        Self {
            camera_layers: cameras
                .iter()
                .map(|camera| (camera.clone(), camera.read().layers))
                .collect(),
            backgrounds,
            clear_alpha: renderer.clear_alpha(),
        }
    }

    fn restore(self, renderer: &mut dyn RenderBackend) {
        for (camera, layers) in self.camera_layers {
            camera.write().layers = layers;
        }
        for (scene, background) in self.backgrounds {
            scene.write().background = background;
        }
        renderer.set_clear_alpha(self.clear_alpha);
    }
}

fn collect_backgrounds(scene: &SceneRef, out: &mut Vec<(SceneRef, Option<Vec4>)>) {
    if out.iter().any(|(s, _)| std::sync::Arc::ptr_eq(s, scene)) {
        return;
    }
    let attached = {
        let guard = scene.read();
        out.push((scene.clone(), guard.background));
        guard.attached().to_vec()
    };
    for child in &attached {
        collect_backgrounds(child, out);
    }
}

pub struct InitialBloomHooks {
    scene: SceneRef,
    /// Every distinct camera a render stage of the composer draws with
    cameras: Vec<CameraRef>,
    obfuscation: Composer,
    masks: SharedMaskRegistry,
    membership: BloomMembership,
    saved: Option<SavedState>,
}

impl InitialBloomHooks {
    pub fn new(
        scene: SceneRef,
        cameras: Vec<CameraRef>,
        obfuscation: Composer,
        masks: SharedMaskRegistry,
        membership: BloomMembership,
    ) -> Self {
        Self {
            scene,
            cameras,
            obfuscation,
            masks,
            membership,
            saved: None,
        }
    }

    /// The composer rendering the masked scene
    pub fn obfuscation(&self) -> &Composer {
        &self.obfuscation
    }
}

impl ComposerHooks for InitialBloomHooks {
    fn before_render(&mut self, ctx: &mut RenderContext<'_>, delta_time: f32) -> Result<()> {
        let saved = SavedState::capture(&self.scene, &self.cameras, &*ctx.renderer);
        let scenes: Vec<SceneRef> = saved.backgrounds.iter().map(|(s, _)| s.clone()).collect();
        self.saved = Some(saved);

        {
            let _scope = MaskScope::apply(self.masks.clone(), self.scene.clone(), self.membership);
            for scene in &scenes {
                scene.write().background = None;
            }
            ctx.renderer.set_clear_alpha(0.0);
            self.obfuscation.render(ctx, delta_time)?;
        }

        for camera in &self.cameras {
            camera.write().layers = self.membership.mask();
        }
        Ok(())
    }

    fn after_render(&mut self, ctx: &mut RenderContext<'_>, _delta_time: f32) -> Result<()> {
        if let Some(saved) = self.saved.take() {
            saved.restore(&mut *ctx.renderer);
        }
        Ok(())
    }

    fn set_size(&mut self, size: Extent) -> Result<()> {
        self.obfuscation.set_size(size)
    }
}
