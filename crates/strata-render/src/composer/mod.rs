//! Composers
//!
//! A composer runs an ordered list of stages against a pair of render
//! targets. Stages that produce a new image write the back buffer and the
//! two buffers trade places.

mod bloom;
mod builder;
mod cache;
mod hooks;

pub use bloom::InitialBloomHooks;
pub use builder::{ComposerBuilder, SharedComposerBuilder};
pub use cache::{CacheKey, CacheStats, StageCache};
pub use hooks::{ComposerHooks, NoHooks};

use crate::stages::{StageContext, StageRef};
use crate::{Error, Result};
use std::sync::Arc;
use strata_core::{Extent, RenderBackend, RenderTarget, TargetParams, TextureRef};

/// Per-frame state threaded through hooks and stages
pub struct RenderContext<'a> {
    pub renderer: &'a mut dyn RenderBackend,
    pub frame: u64,
}

impl<'a> RenderContext<'a> {
    pub fn new(renderer: &'a mut dyn RenderBackend, frame: u64) -> Self {
        Self { renderer, frame }
    }
}

pub struct Composer {
    name: String,
    size: Extent,
    /// ping = 0, pong = 1
    buffers: [TextureRef; 2],
    /// Buffer every render starts from
    home: usize,
    /// Buffer written most recently
    front: usize,
    stages: Vec<StageRef>,
    render_to_screen: bool,
    hooks: Box<dyn ComposerHooks>,
}

impl Composer {
    pub fn new(name: impl Into<String>, size: Extent) -> Self {
        Self::with_params(name, size, TargetParams::default())
    }

    pub fn with_params(name: impl Into<String>, size: Extent, params: TargetParams) -> Self {
        let name = name.into();
        let target = |suffix: &str| {
            RenderTarget::new(format!("{}-{}", name, suffix), size)
                .with_params(params)
                .shared()
        };
        let buffers = [target("ping"), target("pong")];
        Self {
            name,
            size,
            buffers,
            home: 0,
            front: 0,
            stages: Vec::new(),
            render_to_screen: false,
            hooks: Box::new(NoHooks),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn render_to_screen(&self) -> bool {
        self.render_to_screen
    }

    pub fn set_render_to_screen(&mut self, render_to_screen: bool) {
        self.render_to_screen = render_to_screen;
    }

    pub fn set_hooks(&mut self, hooks: impl ComposerHooks + 'static) {
        self.hooks = Box::new(hooks);
    }

    pub fn ping(&self) -> &TextureRef {
        &self.buffers[0]
    }

    pub fn pong(&self) -> &TextureRef {
        &self.buffers[1]
    }

    /// Most recently written buffer
    pub fn front(&self) -> &TextureRef {
        &self.buffers[self.front]
    }

    /// Buffer holding the output once `render` returns
    pub fn target(&self) -> &TextureRef {
        let swaps = self
            .stages
            .iter()
            .filter(|stage| {
                let stage = stage.lock();
                stage.is_enabled() && stage.needs_swap()
            })
            .count();
        &self.buffers[(self.home + swaps) % 2]
    }

    /// Start every following render from the other buffer
    pub fn swap_buffers(&mut self) {
        self.home = 1 - self.home;
        self.front = self.home;
    }

    pub fn stages(&self) -> &[StageRef] {
        &self.stages
    }

    pub fn add_stage(&mut self, stage: StageRef) {
        self.stages.push(stage);
    }

    pub fn insert_stage(&mut self, index: usize, stage: StageRef) {
        let index = index.min(self.stages.len());
        self.stages.insert(index, stage);
    }

    /// Remove a stage by identity
    pub fn remove_stage(&mut self, stage: &StageRef) -> bool {
        let before = self.stages.len();
        self.stages.retain(|s| !Arc::ptr_eq(s, stage));
        before != self.stages.len()
    }

    /// Resize both buffers and every stage. Zero-area sizes are rejected
    /// and leave the composer untouched.
    pub fn set_size(&mut self, size: Extent) -> Result<()> {
        let size = size.validate()?;
        self.size = size;
        for buffer in &self.buffers {
            buffer.write().resize(size);
        }
        for stage in &self.stages {
            stage.lock().set_size(size);
        }
        self.hooks.set_size(size)?;
        log::debug!("Composer '{}' resized to {}x{}", self.name, size.width, size.height);
        Ok(())
    }

    /// Run the before hook, the enabled stages and the after hook.
    ///
    /// The after hook runs on every path. If it fails the error is reported
    /// as a state leak, taking precedence over any earlier failure.
    pub fn render(&mut self, ctx: &mut RenderContext<'_>, delta_time: f32) -> Result<()> {
        let result = match self.hooks.before_render(ctx, delta_time) {
            Ok(()) => self.run_stages(ctx, delta_time),
            Err(e) => Err(e),
        };

        if let Err(e) = self.hooks.after_render(ctx, delta_time) {
            if let Err(earlier) = &result {
                log::error!("Composer '{}' failed before its state leaked: {}", self.name, earlier);
            }
            return Err(Error::StateLeak(format!("composer '{}': {}", self.name, e)));
        }

        result
    }

    fn run_stages(&mut self, ctx: &mut RenderContext<'_>, delta_time: f32) -> Result<()> {
        let last_enabled = self.stages.iter().rposition(|stage| stage.lock().is_enabled());

        let mut current = self.home;
        let mut fresh = true;

        for (index, stage) in self.stages.iter().enumerate() {
            let mut stage = stage.lock();
            if !stage.is_enabled() {
                continue;
            }

            log::trace!("Composer '{}' running stage '{}'", self.name, stage.name());

            let mut stage_ctx = StageContext {
                renderer: &mut *ctx.renderer,
                read: &self.buffers[current],
                write: &self.buffers[1 - current],
                to_screen: self.render_to_screen && Some(index) == last_enabled,
                fresh,
                delta_time,
            };
            let outcome = stage.render(&mut stage_ctx);
            if let Err(e) = outcome {
                self.front = current;
                return Err(e);
            }

            if stage.needs_swap() {
                current = 1 - current;
            }
            fresh = false;
        }

        self.front = current;
        Ok(())
    }
}
