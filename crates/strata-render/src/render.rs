//! Renders
//!
//! A [`Render`] is one complete rendering of a layer: an ordered list of
//! composers, each built by a [`ComposerStrategy`]. Composers run strictly in
//! list order so later ones can read the targets of earlier ones.

use crate::composer::{Composer, ComposerBuilder, RenderContext};
use crate::layer::LayerDescriptor;
use crate::{ConstructionError, Result};
use std::fmt;
use strata_core::{Extent, TextureRef};

/// Builds one composer of a render
pub trait ComposerStrategy: Send + Sync {
    /// Suffix of the composer name
    fn label(&self) -> &str;

    /// `upstream` holds the composers already built for this render
    fn build(
        &self,
        name: &str,
        builder: &mut ComposerBuilder,
        layer: &LayerDescriptor,
        upstream: &[Composer],
    ) -> Result<Composer>;
}

/// A single simple composer
pub struct SimpleStrategy {
    pub is_final: bool,
}

impl ComposerStrategy for SimpleStrategy {
    fn label(&self) -> &str {
        "simple"
    }

    fn build(
        &self,
        name: &str,
        builder: &mut ComposerBuilder,
        layer: &LayerDescriptor,
        _upstream: &[Composer],
    ) -> Result<Composer> {
        builder.simple_composer(name, layer, self.is_final)
    }
}

pub struct InitialBloomStrategy;

impl ComposerStrategy for InitialBloomStrategy {
    fn label(&self) -> &str {
        "initial-bloom"
    }

    fn build(
        &self,
        name: &str,
        builder: &mut ComposerBuilder,
        layer: &LayerDescriptor,
        _upstream: &[Composer],
    ) -> Result<Composer> {
        builder.initial_bloom_composer(name, layer)
    }
}

/// Blends the target of the previous composer over the layer
pub struct FinalBloomStrategy {
    pub is_final: bool,
}

impl ComposerStrategy for FinalBloomStrategy {
    fn label(&self) -> &str {
        "final-bloom"
    }

    fn build(
        &self,
        name: &str,
        builder: &mut ComposerBuilder,
        layer: &LayerDescriptor,
        upstream: &[Composer],
    ) -> Result<Composer> {
        let bloom = upstream
            .last()
            .map(|composer| composer.target().clone())
            .ok_or_else(|| ConstructionError::MissingUpstream(self.label().to_string()))?;
        builder.final_bloom_composer(name, layer, bloom, self.is_final)
    }
}

/// Visual modes a layer can render in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderMode {
    Normal,
    Bloom,
}

impl RenderMode {
    pub fn name(&self) -> &'static str {
        match self {
            RenderMode::Normal => "normal",
            RenderMode::Bloom => "bloom",
        }
    }

    /// Composer strategies of this mode
    pub fn strategies(&self, is_final: bool) -> Vec<Box<dyn ComposerStrategy>> {
        match self {
            RenderMode::Normal => vec![Box::new(SimpleStrategy { is_final })],
            RenderMode::Bloom => vec![Box::new(InitialBloomStrategy), Box::new(FinalBloomStrategy { is_final })],
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct Render {
    name: String,
    size: Extent,
    composers: Vec<Composer>,
}

impl Render {
    /// Build one composer per strategy, in order
    pub fn build(
        name: impl Into<String>,
        strategies: &[Box<dyn ComposerStrategy>],
        builder: &mut ComposerBuilder,
        layer: &LayerDescriptor,
    ) -> Result<Self> {
        let name = name.into();
        let mut composers = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            let composer_name = format!("{}-{}", name, strategy.label());
            let composer = strategy.build(&composer_name, builder, layer, &composers)?;
            composers.push(composer);
        }
        log::info!("Built render '{}' with {} composers", name, composers.len());
        Ok(Self {
            name,
            size: layer.size,
            composers,
        })
    }

    pub fn normal(name: impl Into<String>, builder: &mut ComposerBuilder, layer: &LayerDescriptor) -> Result<Self> {
        Self::build(name, &RenderMode::Normal.strategies(true), builder, layer)
    }

    pub fn bloom(name: impl Into<String>, builder: &mut ComposerBuilder, layer: &LayerDescriptor) -> Result<Self> {
        Self::build(name, &RenderMode::Bloom.strategies(true), builder, layer)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    /// Resize every composer. Zero-area sizes are rejected before any
    /// composer is touched.
    pub fn set_size(&mut self, size: Extent) -> Result<()> {
        let size = size.validate()?;
        self.size = size;
        for composer in &mut self.composers {
            composer.set_size(size)?;
        }
        Ok(())
    }

    pub fn composers(&self) -> &[Composer] {
        &self.composers
    }

    pub fn composers_mut(&mut self) -> &mut [Composer] {
        &mut self.composers
    }

    /// Target of the last composer
    pub fn output(&self) -> Option<&TextureRef> {
        self.composers.last().map(Composer::target)
    }

    /// Run every composer in order, stopping at the first failure
    pub fn render(&mut self, ctx: &mut RenderContext<'_>, delta_time: f32) -> Result<()> {
        log::trace!("Rendering '{}' (frame {})", self.name, ctx.frame);
        for composer in &mut self.composers {
            composer.render(ctx, delta_time)?;
        }
        Ok(())
    }
}
