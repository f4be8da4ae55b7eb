//! Composer assembly
//!
//! Three topologies are built from the same layer description:
//!
//! - simple: the layer's scene renders plus its extra stages
//! - initial bloom: renders only the glow set, cuts out what the masked
//!   render shows and blurs the rest into a bloom texture
//! - final bloom: the layer's scene renders blended with the bloom texture

use super::{Composer, InitialBloomHooks, StageCache};
use crate::layer::LayerDescriptor;
use crate::masking::{BloomMembership, MaskRegistry, SharedMaskRegistry};
use crate::stages::{StageArgs, StageKind, StageRef, StageRegistry};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use strata_core::TextureRef;

pub type SharedComposerBuilder = Arc<Mutex<ComposerBuilder>>;

/// Builds composers from the stage registry, the stage cache and the mask
/// registry
pub struct ComposerBuilder {
    registry: StageRegistry,
    cache: StageCache,
    masks: SharedMaskRegistry,
    membership: BloomMembership,
}

impl ComposerBuilder {
    pub fn new(registry: StageRegistry) -> Self {
        Self {
            registry,
            cache: StageCache::new(),
            masks: MaskRegistry::new().shared(),
            membership: BloomMembership::default(),
        }
    }

    pub fn with_membership(mut self, membership: BloomMembership) -> Self {
        self.membership = membership;
        self
    }

    pub fn shared(self) -> SharedComposerBuilder {
        Arc::new(Mutex::new(self))
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut StageRegistry {
        &mut self.registry
    }

    pub fn cache(&self) -> &StageCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut StageCache {
        &mut self.cache
    }

    pub fn masks(&self) -> &SharedMaskRegistry {
        &self.masks
    }

    pub fn membership(&self) -> BloomMembership {
        self.membership
    }

    /// Cached stage creation
    pub fn create_stage(&mut self, owner: &str, kind: &str, args: StageArgs) -> Result<StageRef> {
        self.cache.get_or_create(&self.registry, owner, kind, args)
    }

    /// Scene renders of the layer in stack order, then the extra stages
    /// whose final flag matches
    pub fn create_render_stages(&mut self, layer: &LayerDescriptor, is_final: bool) -> Result<Vec<StageRef>> {
        layer
            .stage_requests(is_final)
            .into_iter()
            .map(|request| self.create_stage(&request.owner, &request.kind, request.args))
            .collect()
    }

    /// A composer over the layer's render stages. Final composers present to
    /// screen.
    pub fn simple_composer(&mut self, name: &str, layer: &LayerDescriptor, is_final: bool) -> Result<Composer> {
        let stages = self.create_render_stages(layer, is_final)?;
        let mut composer = Composer::new(name, layer.size);
        composer.set_render_to_screen(is_final);
        for stage in stages {
            composer.add_stage(stage);
        }
        log::info!("Built simple composer '{}' with {} stages", name, composer.stages().len());
        Ok(composer)
    }

    /// The glow isolation composer. Its target holds the bloom texture.
    pub fn initial_bloom_composer(&mut self, name: &str, layer: &LayerDescriptor) -> Result<Composer> {
        let mut stages = self.create_render_stages(layer, false)?;

        let obfuscation = self.simple_composer(&format!("{}-obfuscation", name), layer, false)?;

        stages.push(self.create_stage(
            name,
            StageKind::Obfuscation.name(),
            StageArgs::texture(obfuscation.target().clone()).with_composite(layer.composite),
        )?);
        stages.push(self.create_stage(
            name,
            StageKind::InitialBloom.name(),
            StageArgs::viewport(layer.size).with_bloom(layer.bloom),
        )?);

        let mut composer = Composer::new(name, layer.size);
        for stage in stages {
            composer.add_stage(stage);
        }
        composer.swap_buffers();
        composer.set_hooks(InitialBloomHooks::new(
            layer.master_scene.clone(),
            layer.cameras(),
            obfuscation,
            self.masks.clone(),
            self.membership,
        ));

        log::info!("Built initial bloom composer '{}' with {} stages", name, composer.stages().len());
        Ok(composer)
    }

    /// The layer's render stages blended with `bloom`
    pub fn final_bloom_composer(
        &mut self,
        name: &str,
        layer: &LayerDescriptor,
        bloom: TextureRef,
        is_final: bool,
    ) -> Result<Composer> {
        let mut stages = self.create_render_stages(layer, is_final)?;
        stages.push(self.create_stage(
            name,
            StageKind::FinalBloom.name(),
            StageArgs::texture(bloom).with_composite(layer.composite),
        )?);

        let mut composer = Composer::new(name, layer.size);
        composer.set_render_to_screen(is_final);
        for stage in stages {
            composer.add_stage(stage);
        }

        log::info!("Built final bloom composer '{}' with {} stages", name, composer.stages().len());
        Ok(composer)
    }

    /// Forget cached stages of an owner
    pub fn evict_owner(&mut self, owner: &str) -> usize {
        self.cache.evict_owner(owner)
    }
}

impl Default for ComposerBuilder {
    fn default() -> Self {
        Self::new(StageRegistry::new())
    }
}
