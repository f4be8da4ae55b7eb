//! Two-texture blends

use super::{run_fullscreen, Stage, StageContext, StageKind};
use crate::config::CompositeParams;
use crate::shaders::{self, ShaderDefine, ShaderProgram};
use crate::Result;
use glam::Vec4;
use strata_core::TextureRef;

/// Cuts the silhouette held in a mask texture out of the front buffer:
/// `base * (1 - weight * mask.a)`.
pub struct ObfuscationStage {
    enabled: bool,
    mask: TextureRef,
    params: CompositeParams,
}

impl ObfuscationStage {
    pub fn new(mask: TextureRef, params: CompositeParams) -> Self {
        Self {
            enabled: true,
            mask,
            params: params.sanitized(),
        }
    }

    pub fn mask(&self) -> &TextureRef {
        &self.mask
    }

    pub fn params(&self) -> CompositeParams {
        self.params
    }
}

impl Stage for ObfuscationStage {
    fn name(&self) -> &str {
        "obfuscation"
    }

    fn kind(&self) -> &str {
        StageKind::Obfuscation.name()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn needs_swap(&self) -> bool {
        true
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) -> Result<()> {
        let mask = self.mask.read();
        let weight = self.params.obfuscation_weight;
        run_fullscreen(ctx, |base, uv| base.sample(uv) * (1.0 - weight * mask.sample(uv).w));
        Ok(())
    }

    fn program(&self) -> Option<ShaderProgram> {
        Some(ShaderProgram::new(
            "obfuscation",
            shaders::OBFUSCATION,
            &[("OBFUSCATION_WEIGHT", ShaderDefine::F32(self.params.obfuscation_weight))],
        ))
    }
}

/// Screen-style blend of the bloom texture over the front buffer:
/// `base + (1 - base) * bloom / divisor`.
pub struct FinalBloomStage {
    enabled: bool,
    bloom: TextureRef,
    params: CompositeParams,
}

impl FinalBloomStage {
    pub fn new(bloom: TextureRef, params: CompositeParams) -> Self {
        Self {
            enabled: true,
            bloom,
            params: params.sanitized(),
        }
    }

    pub fn bloom(&self) -> &TextureRef {
        &self.bloom
    }

    pub fn params(&self) -> CompositeParams {
        self.params
    }
}

impl Stage for FinalBloomStage {
    fn name(&self) -> &str {
        "final_bloom"
    }

    fn kind(&self) -> &str {
        StageKind::FinalBloom.name()
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn needs_swap(&self) -> bool {
        true
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) -> Result<()> {
        let bloom = self.bloom.read();
        let divisor = self.params.bloom_divisor;
        run_fullscreen(ctx, |base, uv| {
            let base = base.sample(uv);
            base + (Vec4::ONE - base) * bloom.sample(uv) / divisor
        });
        Ok(())
    }

    fn program(&self) -> Option<ShaderProgram> {
        Some(ShaderProgram::new(
            "final_bloom",
            shaders::FINAL_BLOOM,
            &[("BLOOM_DIVISOR", ShaderDefine::F32(self.params.bloom_divisor))],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{Extent, RenderTarget, SoftwareRenderer};

    fn filled(name: &str, color: Vec4) -> TextureRef {
        let mut target = RenderTarget::new(name, Extent::new(2, 2));
        target.clear(color);
        target.shared()
    }

    fn run(stage: &mut dyn Stage, read: &TextureRef) -> Vec4 {
        let mut renderer = SoftwareRenderer::new(Extent::new(2, 2)).unwrap();
        let write = RenderTarget::new("write", Extent::new(2, 2)).shared();
        let mut ctx = StageContext {
            renderer: &mut renderer,
            read,
            write: &write,
            to_screen: false,
            fresh: false,
            delta_time: 0.0,
        };
        stage.render(&mut ctx).unwrap();
        let pixel = write.read().pixel(1, 1);
        pixel
    }

    #[test]
    fn test_obfuscation_cuts_out_mask() {
        let base = filled("base", Vec4::new(0.8, 0.6, 0.4, 1.0));

        let mut opaque = ObfuscationStage::new(filled("mask", Vec4::ONE), CompositeParams::default());
        assert_eq!(run(&mut opaque, &base), Vec4::ZERO);

        let mut half = ObfuscationStage::new(filled("mask", Vec4::new(0.0, 0.0, 0.0, 0.5)), CompositeParams::default());
        let out = run(&mut half, &base);
        assert!((out - Vec4::new(0.4, 0.3, 0.2, 0.5)).abs().max_element() < 1e-6);

        let mut clear = ObfuscationStage::new(filled("mask", Vec4::ZERO), CompositeParams::default());
        assert_eq!(run(&mut clear, &base), Vec4::new(0.8, 0.6, 0.4, 1.0));
    }

    #[test]
    fn test_final_bloom_blend() {
        let base = filled("base", Vec4::new(0.5, 0.0, 1.0, 1.0));
        let mut stage = FinalBloomStage::new(filled("bloom", Vec4::ONE), CompositeParams::default());
        let out = run(&mut stage, &base);
        assert!((out - Vec4::new(0.75, 0.5, 1.0, 1.0)).abs().max_element() < 1e-6);

        let params = CompositeParams {
            bloom_divisor: 1.0,
            ..CompositeParams::default()
        };
        let mut full = FinalBloomStage::new(filled("bloom", Vec4::ONE), params);
        assert_eq!(run(&mut full, &base), Vec4::ONE);
    }

    #[test]
    fn test_programs_carry_constants() {
        let stage = FinalBloomStage::new(filled("bloom", Vec4::ONE), CompositeParams::default());
        let program = stage.program().unwrap();
        assert!(program.source().contains("const BLOOM_DIVISOR: f32 = 2.0;"));
        assert!(program.validate().is_ok());
    }
}
