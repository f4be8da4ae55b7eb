use super::RenderContext;
use crate::Result;
use strata_core::Extent;

/// Side effects wrapped around one composer render.
///
/// `after_render` runs after every `before_render`, whether or not the
/// before hook or any stage failed, and must leave shared state as it found
/// it.
pub trait ComposerHooks: Send {
    fn before_render(&mut self, ctx: &mut RenderContext<'_>, delta_time: f32) -> Result<()> {
        let _ = (ctx, delta_time);
        Ok(())
    }

    fn after_render(&mut self, ctx: &mut RenderContext<'_>, delta_time: f32) -> Result<()> {
        let _ = (ctx, delta_time);
        Ok(())
    }

    /// The owning composer was resized. `size` is already validated.
    fn set_size(&mut self, size: Extent) -> Result<()> {
        let _ = size;
        Ok(())
    }
}

/// Hooks that do nothing
pub struct NoHooks;

impl ComposerHooks for NoHooks {}
