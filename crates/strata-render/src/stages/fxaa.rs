use super::{luminance, run_fullscreen, Stage, StageContext, StageKind};
use crate::shaders::{self, ShaderDefine, ShaderProgram};
use crate::Result;
use glam::{Vec2, Vec4};
use strata_core::{Extent, RenderTarget};

const REDUCE_MIN: f32 = 1.0 / 128.0;
const REDUCE_MUL: f32 = 1.0 / 8.0;
const SPAN_MAX: f32 = 8.0;

/// Fast approximate anti-aliasing
pub struct FxaaStage {
    enabled: bool,
    /// Reciprocal of the pixel size, updated on resize
    inverse_resolution: Vec2,
}

impl FxaaStage {
    pub fn new() -> Self {
        Self {
            enabled: true,
            inverse_resolution: Vec2::new(1.0 / 1024.0, 1.0 / 512.0),
        }
    }

    pub fn with_size(mut self, size: Extent) -> Self {
        self.set_size(size);
        self
    }

    pub fn inverse_resolution(&self) -> Vec2 {
        self.inverse_resolution
    }
}

impl Default for FxaaStage {
    fn default() -> Self {
        Self::new()
    }
}

fn antialias(input: &RenderTarget, uv: Vec2, texel: Vec2) -> Vec4 {
    let fetch = |offset: Vec2| input.sample(uv + offset);
    let center = input.sample(uv);

    let luma_nw = luminance(fetch(Vec2::new(-1.0, -1.0) * texel));
    let luma_ne = luminance(fetch(Vec2::new(1.0, -1.0) * texel));
    let luma_sw = luminance(fetch(Vec2::new(-1.0, 1.0) * texel));
    let luma_se = luminance(fetch(Vec2::new(1.0, 1.0) * texel));
    let luma_m = luminance(center);

    let luma_min = luma_m.min(luma_nw.min(luma_ne).min(luma_sw.min(luma_se)));
    let luma_max = luma_m.max(luma_nw.max(luma_ne).max(luma_sw.max(luma_se)));

    let dir = Vec2::new(
        -((luma_nw + luma_ne) - (luma_sw + luma_se)),
        (luma_nw + luma_sw) - (luma_ne + luma_se),
    );
    let dir_reduce = ((luma_nw + luma_ne + luma_sw + luma_se) * (0.25 * REDUCE_MUL)).max(REDUCE_MIN);
    let rcp_dir_min = 1.0 / (dir.x.abs().min(dir.y.abs()) + dir_reduce);
    let dir = (dir * rcp_dir_min).clamp(Vec2::splat(-SPAN_MAX), Vec2::splat(SPAN_MAX)) * texel;

    let rgb_a = (fetch(dir * (1.0 / 3.0 - 0.5)) + fetch(dir * (2.0 / 3.0 - 0.5))) * 0.5;
    let rgb_b = rgb_a * 0.5 + (fetch(dir * -0.5) + fetch(dir * 0.5)) * 0.25;

    let luma_b = luminance(rgb_b);
    let rgb = if luma_b < luma_min || luma_b > luma_max { rgb_a } else { rgb_b };
    rgb.truncate().extend(center.w)
}

impl Stage for FxaaStage {
    fn name(&self) -> &str {
        "fxaa"
    }

    fn kind(&self) -> &str {
        StageKind::Fxaa.name()
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

    fn set_size(&mut self, size: Extent) {
        self.inverse_resolution = Vec2::new(1.0 / size.width.max(1) as f32, 1.0 / size.height.max(1) as f32);
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) -> Result<()> {
        let texel = self.inverse_resolution;
        run_fullscreen(ctx, |input, uv| antialias(input, uv, texel));
        Ok(())
    }

    fn program(&self) -> Option<ShaderProgram> {
        Some(ShaderProgram::new(
            "fxaa",
            shaders::FXAA,
            &[
                ("FXAA_REDUCE_MIN", ShaderDefine::F32(REDUCE_MIN)),
                ("FXAA_REDUCE_MUL", ShaderDefine::F32(REDUCE_MUL)),
                ("FXAA_SPAN_MAX", ShaderDefine::F32(SPAN_MAX)),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_size_updates_inverse_resolution() {
        let mut stage = FxaaStage::new();
        assert_eq!(stage.inverse_resolution(), Vec2::new(1.0 / 1024.0, 1.0 / 512.0));
        stage.set_size(Extent::new(800, 600));
        assert_eq!(stage.inverse_resolution(), Vec2::new(1.0 / 800.0, 1.0 / 600.0));
    }

    #[test]
    fn test_flat_image_is_unchanged() {
        let mut input = RenderTarget::new("flat", Extent::new(8, 8));
        input.clear(Vec4::new(0.3, 0.6, 0.9, 1.0));
        let texel = Vec2::splat(1.0 / 8.0);
        let out = antialias(&input, input.uv(4, 4), texel);
        assert!((out - Vec4::new(0.3, 0.6, 0.9, 1.0)).abs().max_element() < 1e-5);
    }

    #[test]
    fn test_hard_edge_is_softened() {
        let mut input = RenderTarget::new("edge", Extent::new(8, 8));
        for y in 0..8 {
            for x in 0..8 {
                // diagonal staircase
                if x > y {
                    input.set_pixel(x, y, Vec4::ONE);
                } else {
                    input.set_pixel(x, y, Vec4::new(0.0, 0.0, 0.0, 1.0));
                }
            }
        }
        let texel = Vec2::splat(1.0 / 8.0);
        let out = antialias(&input, input.uv(4, 4), texel);
        assert!(out.x > 0.0 && out.x < 1.0);
        assert_eq!(out.w, 1.0);
    }
}
