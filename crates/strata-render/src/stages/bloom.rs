//! Threshold + multi-level blur bloom

use super::{luminance, run_fullscreen, Stage, StageContext, StageKind};
use crate::config::BloomParams;
use crate::shaders::{self, ShaderDefine, ShaderProgram};
use crate::Result;
use glam::{Vec2, Vec4};
use strata_core::{Extent, RenderTarget};

pub const MIP_COUNT: usize = 5;

const KERNEL_RADII: [usize; MIP_COUNT] = [3, 5, 7, 9, 11];
const BLOOM_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];
const SMOOTH_WIDTH: f32 = 0.01;

/// Extracts pixels above the luminance threshold, blurs them over a chain
/// of half-size levels and adds the weighted levels back onto the input.
pub struct InitialBloomStage {
    enabled: bool,
    params: BloomParams,
    resolution: Extent,
    mip_sizes: [Extent; MIP_COUNT],
    bright: RenderTarget,
    /// Horizontal pass of each level
    scratch: Vec<RenderTarget>,
    mips: Vec<RenderTarget>,
}

impl InitialBloomStage {
    pub fn new(size: Extent, params: BloomParams) -> Self {
        let mip_sizes = mip_chain(size);
        Self {
            enabled: true,
            params,
            resolution: size,
            mip_sizes,
            bright: RenderTarget::new("bloom_bright", size),
            scratch: level_targets("bloom_scratch", &mip_sizes),
            mips: level_targets("bloom_mip", &mip_sizes),
        }
    }

    pub fn resolution(&self) -> Extent {
        self.resolution
    }

    pub fn mip_sizes(&self) -> [Extent; MIP_COUNT] {
        self.mip_sizes
    }

    pub fn params(&self) -> BloomParams {
        self.params
    }

    pub fn set_params(&mut self, params: BloomParams) {
        self.params = params;
    }

    fn high_pass(&mut self, input: &RenderTarget) {
        let threshold = self.params.threshold;
        for y in 0..self.bright.height() {
            for x in 0..self.bright.width() {
                let texel = input.sample(self.bright.uv(x, y));
                let alpha = smoothstep(threshold, threshold + SMOOTH_WIDTH, luminance(texel));
                self.bright.set_pixel(x, y, texel * alpha);
            }
        }
    }

    fn blur_levels(&mut self) {
        for level in 0..MIP_COUNT {
            let weights = gaussian_weights(KERNEL_RADII[level]);
            let (done, rest) = self.mips.split_at_mut(level);
            let source = if level == 0 { &self.bright } else { &done[level - 1] };
            blur(source, &mut self.scratch[level], Vec2::X, &weights);
            blur(&self.scratch[level], &mut rest[0], Vec2::Y, &weights);
        }
    }
}

impl Stage for InitialBloomStage {
    fn name(&self) -> &str {
        "initial_bloom"
    }

    fn kind(&self) -> &str {
        StageKind::InitialBloom.name()
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
        self.resolution = size;
        self.mip_sizes = mip_chain(size);
        self.bright.resize(size);
        for (level, size) in self.mip_sizes.iter().enumerate() {
            self.scratch[level].resize(*size);
            self.mips[level].resize(*size);
        }
        log::debug!("Bloom resized to {}x{}", size.width, size.height);
    }

    fn render(&mut self, ctx: &mut StageContext<'_>) -> Result<()> {
        {
            let input = ctx.read.read();
            self.high_pass(&input);
        }
        self.blur_levels();

        let strength = self.params.strength;
        let factors = BLOOM_FACTORS.map(|f| lerp_factor(f, self.params.radius) * strength);
        let mips = &self.mips;
        run_fullscreen(ctx, |base, uv| {
            let bloom = mips
                .iter()
                .zip(factors)
                .fold(Vec4::ZERO, |sum, (mip, factor)| sum + mip.sample(uv) * factor);
            (base.sample(uv) + bloom).clamp(Vec4::ZERO, Vec4::ONE)
        });
        Ok(())
    }

    fn program(&self) -> Option<ShaderProgram> {
        Some(ShaderProgram::new(
            "bloom_high_pass",
            shaders::HIGH_PASS,
            &[
                ("LUMINOSITY_THRESHOLD", ShaderDefine::F32(self.params.threshold)),
                ("SMOOTH_WIDTH", ShaderDefine::F32(SMOOTH_WIDTH)),
            ],
        ))
    }
}

fn mip_chain(size: Extent) -> [Extent; MIP_COUNT] {
    let mut sizes = [size; MIP_COUNT];
    let mut current = size;
    for slot in sizes.iter_mut() {
        current = current.halved();
        *slot = current;
    }
    sizes
}

fn level_targets(prefix: &str, sizes: &[Extent]) -> Vec<RenderTarget> {
    sizes
        .iter()
        .enumerate()
        .map(|(level, size)| RenderTarget::new(format!("{}_{}", prefix, level), *size))
        .collect()
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Larger radius shifts weight from the sharp levels to the wide ones
fn lerp_factor(factor: f32, radius: f32) -> f32 {
    factor + (1.2 - factor - factor) * radius
}

/// One-sided Gaussian weights with sigma equal to the radius, normalised so
/// that `w[0] + 2 * sum(w[1..])` is one
pub(crate) fn gaussian_weights(radius: usize) -> Vec<f32> {
    let sigma = radius as f32;
    let pdf = |x: f32| 0.398_94 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma;
    let raw: Vec<f32> = (0..radius).map(|i| pdf(i as f32)).collect();
    let total = raw[0] + 2.0 * raw[1..].iter().sum::<f32>();
    raw.into_iter().map(|w| w / total).collect()
}

fn blur(source: &RenderTarget, target: &mut RenderTarget, direction: Vec2, weights: &[f32]) {
    let texel = direction / Vec2::new(target.width() as f32, target.height() as f32);
    for y in 0..target.height() {
        for x in 0..target.width() {
            let uv = target.uv(x, y);
            let mut sum = source.sample(uv) * weights[0];
            for (i, weight) in weights.iter().enumerate().skip(1) {
                let offset = texel * i as f32;
                sum += (source.sample(uv + offset) + source.sample(uv - offset)) * *weight;
            }
            target.set_pixel(x, y, sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{SoftwareRenderer, TextureRef};

    fn render(stage: &mut InitialBloomStage, read: &TextureRef) -> RenderTarget {
        let size = read.read().size();
        let mut renderer = SoftwareRenderer::new(size).unwrap();
        let write = RenderTarget::new("write", size).shared();
        let mut ctx = StageContext {
            renderer: &mut renderer,
            read,
            write: &write,
            to_screen: false,
            fresh: false,
            delta_time: 0.0,
        };
        stage.render(&mut ctx).unwrap();
        let out = write.read().clone();
        out
    }

    #[test]
    fn test_mip_sizes_follow_resolution() {
        let mut stage = InitialBloomStage::new(Extent::new(64, 64), BloomParams::default());
        stage.set_size(Extent::new(800, 600));
        assert_eq!(stage.resolution(), Extent::new(800, 600));
        assert_eq!(
            stage.mip_sizes(),
            [
                Extent::new(400, 300),
                Extent::new(200, 150),
                Extent::new(100, 75),
                Extent::new(50, 38),
                Extent::new(25, 19),
            ]
        );
    }

    #[test]
    fn test_gaussian_weights_are_normalised() {
        for radius in KERNEL_RADII {
            let weights = gaussian_weights(radius);
            assert_eq!(weights.len(), radius);
            let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
            assert!((total - 1.0).abs() < 1e-5);
            assert!(weights.windows(2).all(|w| w[0] >= w[1]));
        }
    }

    #[test]
    fn test_black_stays_black() {
        let read = RenderTarget::new("read", Extent::new(16, 16)).shared();
        let mut stage = InitialBloomStage::new(Extent::new(16, 16), BloomParams::default());
        let out = render(&mut stage, &read);
        assert!(out.pixels().iter().all(|p| *p == Vec4::ZERO));
    }

    #[test]
    fn test_bright_pixels_glow_into_neighbours() {
        let mut target = RenderTarget::new("read", Extent::new(16, 16));
        for y in 6..10 {
            for x in 6..10 {
                target.set_pixel(x, y, Vec4::ONE);
            }
        }
        let read = target.shared();
        let params = BloomParams::default().with_strength(1.0);
        let mut stage = InitialBloomStage::new(Extent::new(16, 16), params);
        let out = render(&mut stage, &read);

        assert_eq!(out.pixel(7, 7), Vec4::ONE);
        assert!(out.pixel(4, 7).x > 0.0);
        assert!(out.pixel(4, 7).x < 1.0);
    }

    #[test]
    fn test_pixels_below_threshold_do_not_glow() {
        let mut target = RenderTarget::new("read", Extent::new(16, 16));
        target.set_pixel(8, 8, Vec4::new(0.2, 0.2, 0.2, 1.0));
        let read = target.shared();
        let params = BloomParams::default().with_threshold(0.5);
        let mut stage = InitialBloomStage::new(Extent::new(16, 16), params);
        let out = render(&mut stage, &read);

        assert_eq!(out.pixel(8, 8), Vec4::new(0.2, 0.2, 0.2, 1.0));
        assert_eq!(out.pixel(6, 8), Vec4::ZERO);
    }
}
