//! Viewports
//!
//! A [`Viewport`] stacks [`ViewportLayer`]s bottom to top and drives them from
//! a single frame loop. All layers share one [`SharedComposerBuilder`], so
//! stage instances are cached across the whole viewport.

use crate::composer::{ComposerBuilder, SharedComposerBuilder};
use crate::config::{LayerConfig, ViewportConfig};
use crate::layer::ViewportLayer;
use crate::{Error, Result};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use strata_core::{Extent, ObjectId, RenderBackend, SoftwareRenderer};

pub const DEFAULT_NORMAL_LAYER: &str = "Normal";
pub const DEFAULT_BLOOM_LAYER: &str = "Bloom";

/// Rolling frame timings, summarised in the log every period
pub struct FrameStats {
    window: usize,
    period: Duration,
    samples: VecDeque<Duration>,
    last_report: Instant,
    frames: u64,
}

impl FrameStats {
    pub fn new(window: usize, period: Duration) -> Self {
        let window = window.max(1);
        Self {
            window,
            period,
            samples: VecDeque::with_capacity(window),
            last_report: Instant::now(),
            frames: 0,
        }
    }

    pub fn from_config(config: &ViewportConfig) -> Self {
        Self::new(config.timing_window, Duration::from_millis(config.timing_period_ms))
    }

    /// Record one frame. Returns true when a summary was logged.
    pub fn record(&mut self, frame_time: Duration) -> bool {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(frame_time);
        self.frames += 1;

        if self.last_report.elapsed() < self.period {
            return false;
        }
        self.last_report = Instant::now();
        log::info!(
            "Frame time: {:.3} ms average over {} frames ({} total)",
            self.average().as_secs_f64() * 1000.0,
            self.samples.len(),
            self.frames
        );
        true
    }

    /// Mean of the frames currently in the window
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn samples(&self) -> usize {
        self.samples.len()
    }
}

pub struct Viewport {
    name: String,
    size: Extent,
    enabled: bool,
    layers: Vec<ViewportLayer>,
    primary: Option<ObjectId>,
    builder: SharedComposerBuilder,
    config: ViewportConfig,
    stats: Option<FrameStats>,
}

impl Viewport {
    pub fn new(name: impl Into<String>, size: Extent, config: ViewportConfig) -> Result<Self> {
        Self::with_builder(name, size, config, ComposerBuilder::default().shared())
    }

    /// Share a builder, and with it the stage registry and cache
    pub fn with_builder(
        name: impl Into<String>,
        size: Extent,
        config: ViewportConfig,
        builder: SharedComposerBuilder,
    ) -> Result<Self> {
        let size = size.validate()?;
        let name = name.into();
        let stats = config.debug_timing.then(|| FrameStats::from_config(&config));

        log::info!("Created viewport '{}' ({}x{})", name, size.width, size.height);
        Ok(Self {
            name,
            size,
            enabled: config.start_enabled,
            layers: Vec::new(),
            primary: None,
            builder,
            config,
            stats,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn builder(&self) -> &SharedComposerBuilder {
        &self.builder
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn stats(&self) -> Option<&FrameStats> {
        self.stats.as_ref()
    }

    /// Create a layer named `{viewport}-layer-{name}` at `index`, negative
    /// indices counting from the top (`-1` stacks it on top). Index 0 makes
    /// it the bottom layer. The first layer created becomes primary.
    pub fn create_layer(&mut self, name: &str, index: isize, config: LayerConfig) -> Result<&mut ViewportLayer> {
        if name.trim().is_empty() {
            return Err(Error::InvalidLayerName(name.to_string()));
        }
        let layer_name = format!("{}-layer-{}", self.name, name);
        if self.layers.iter().any(|layer| layer.name() == layer_name) {
            return Err(Error::DuplicateLayer(layer_name));
        }

        let mut renderer = SoftwareRenderer::new(self.size)?;
        // layers are transparent where nothing is drawn
        renderer.set_clear_alpha(0.0);

        let layer = ViewportLayer::new(
            layer_name,
            self.name.clone(),
            self.size,
            Box::new(renderer),
            self.builder.clone(),
            config,
        )?;

        let len = self.layers.len() as isize;
        let index = if index < 0 { len + 1 + index } else { index };
        let index = index.clamp(0, len) as usize;

        if self.primary.is_none() {
            self.primary = Some(layer.id());
        }
        log::info!("Added layer '{}' at index {}", layer.name(), index);
        self.layers.insert(index, layer);
        self.update_bottom();

        Ok(&mut self.layers[index])
    }

    pub fn create_normal_layer(&mut self, name: Option<&str>, index: isize) -> Result<&mut ViewportLayer> {
        self.create_layer(name.unwrap_or(DEFAULT_NORMAL_LAYER), index, LayerConfig::default())
    }

    pub fn create_bloomable_layer(&mut self, name: Option<&str>, index: isize) -> Result<&mut ViewportLayer> {
        self.create_layer(name.unwrap_or(DEFAULT_BLOOM_LAYER), index, LayerConfig::bloomable())
    }

    /// Remove a layer and release its cached stages
    pub fn remove_layer(&mut self, name: &str) -> Option<ViewportLayer> {
        let index = self.layers.iter().position(|layer| layer.name() == name)?;
        let mut layer = self.layers.remove(index);
        let evicted = layer.release_stages();
        log::debug!("Removed layer '{}' ({} cached stages released)", name, evicted);

        if self.primary == Some(layer.id()) {
            self.primary = self.layers.first().map(ViewportLayer::id);
        }
        self.update_bottom();
        Some(layer)
    }

    fn update_bottom(&mut self) {
        for (index, layer) in self.layers.iter_mut().enumerate() {
            layer.set_bottom(index == 0);
        }
    }

    /// Bottom to top
    pub fn layers(&self) -> &[ViewportLayer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [ViewportLayer] {
        &mut self.layers
    }

    /// Lookup by full layer name
    pub fn layer(&self, name: &str) -> Option<&ViewportLayer> {
        self.layers.iter().find(|layer| layer.name() == name)
    }

    pub fn layer_mut(&mut self, name: &str) -> Option<&mut ViewportLayer> {
        self.layers.iter_mut().find(|layer| layer.name() == name)
    }

    pub fn primary_layer(&self) -> Option<&ViewportLayer> {
        let primary = self.primary?;
        self.layers.iter().find(|layer| layer.id() == primary)
    }

    pub fn primary_layer_mut(&mut self) -> Option<&mut ViewportLayer> {
        let primary = self.primary?;
        self.layers.iter_mut().find(|layer| layer.id() == primary)
    }

    pub fn set_primary_layer(&mut self, name: &str) -> bool {
        match self.layer(name).map(ViewportLayer::id) {
            Some(id) => {
                self.primary = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn bottom_layer(&self) -> Option<&ViewportLayer> {
        self.layers.first()
    }

    /// Resize every layer
    pub fn set_size(&mut self, size: Extent) -> Result<()> {
        let size = size.validate()?;
        self.size = size;
        for layer in &mut self.layers {
            layer.resize(size)?;
        }
        log::info!("Viewport '{}' resized to {}x{}", self.name, size.width, size.height);
        Ok(())
    }

    /// Render every visible layer bottom to top. A failing layer is logged
    /// and skipped so the others still draw.
    pub fn render(&mut self, delta_time: f32) {
        if !self.enabled {
            return;
        }
        let start = Instant::now();

        for layer in self.layers.iter_mut().filter(|layer| layer.is_visible()) {
            if let Err(err) = layer.render(delta_time) {
                log::error!("Layer '{}' failed to render: {}", layer.name(), err);
            }
        }

        if let Some(stats) = &mut self.stats {
            stats.record(start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderMode;

    fn viewport() -> Viewport {
        Viewport::new("vp", Extent::new(8, 8), ViewportConfig::default()).unwrap()
    }

    fn names(viewport: &Viewport) -> Vec<&str> {
        viewport.layers().iter().map(ViewportLayer::name).collect()
    }

    #[test]
    fn test_layer_names_and_ordering() {
        let mut viewport = viewport();
        viewport.create_normal_layer(None, -1).unwrap();
        viewport.create_bloomable_layer(None, -1).unwrap();
        viewport.create_normal_layer(Some("backdrop"), 0).unwrap();

        assert_eq!(names(&viewport), vec!["vp-layer-backdrop", "vp-layer-Normal", "vp-layer-Bloom"]);
        assert_eq!(viewport.bottom_layer().unwrap().name(), "vp-layer-backdrop");
        assert!(viewport.layers()[0].is_bottom());
        assert!(!viewport.layers()[1].is_bottom());
        assert_eq!(viewport.primary_layer().unwrap().name(), "vp-layer-Normal");
        assert!(viewport.layer("vp-layer-Bloom").unwrap().is_bloomable());
    }

    #[test]
    fn test_create_layer_rejects_bad_names() {
        let mut viewport = viewport();
        viewport.create_normal_layer(None, -1).unwrap();
        assert!(matches!(
            viewport.create_normal_layer(None, -1),
            Err(Error::DuplicateLayer(name)) if name == "vp-layer-Normal"
        ));
        assert!(matches!(
            viewport.create_layer(" ", -1, LayerConfig::default()),
            Err(Error::InvalidLayerName(_))
        ));
    }

    #[test]
    fn test_remove_layer_moves_primary_and_releases_stages() {
        let mut viewport = viewport();
        let first = viewport.create_normal_layer(None, -1).unwrap();
        first.stack_mut().create_scene(None);
        viewport.create_bloomable_layer(None, -1).unwrap();
        viewport.render(0.016);
        assert!(!viewport.builder().lock().cache().is_empty());

        let removed = viewport.remove_layer("vp-layer-Normal").unwrap();
        assert_eq!(removed.name(), "vp-layer-Normal");
        assert_eq!(viewport.primary_layer().unwrap().name(), "vp-layer-Bloom");
        assert!(viewport.layers()[0].is_bottom());
        assert!(!viewport.builder().lock().cache().contains("vp-layer-Normal", "Fxaa"));
        assert!(viewport.remove_layer("missing").is_none());
    }

    #[test]
    fn test_set_size_fans_out() {
        let mut viewport = viewport();
        viewport.create_normal_layer(None, -1).unwrap().stack_mut().create_scene(None);
        viewport.create_bloomable_layer(None, -1).unwrap().stack_mut().create_scene(None);
        viewport.render(0.016);

        viewport.set_size(Extent::new(32, 16)).unwrap();
        for layer in viewport.layers() {
            assert_eq!(layer.size(), Extent::new(32, 16));
            assert_eq!(layer.renderer().size(), Extent::new(32, 16));
            assert_eq!(layer.render_for(RenderMode::Normal).unwrap().size(), Extent::new(32, 16));
        }
        assert!(viewport.set_size(Extent::new(0, 0)).is_err());
    }

    #[test]
    fn test_disabled_viewport_skips_rendering() {
        let config = ViewportConfig {
            start_enabled: false,
            debug_timing: true,
            ..ViewportConfig::default()
        };
        let mut viewport = Viewport::new("vp", Extent::new(8, 8), config).unwrap();
        viewport.create_normal_layer(None, -1).unwrap();

        viewport.render(0.016);
        assert_eq!(viewport.stats().unwrap().frames(), 0);
        assert!(viewport.layers()[0].render_for(RenderMode::Normal).is_none());

        viewport.set_enabled(true);
        viewport.render(0.016);
        assert_eq!(viewport.stats().unwrap().frames(), 1);
        assert!(viewport.layers()[0].render_for(RenderMode::Normal).is_some());
    }

    #[test]
    fn test_frame_stats_window() {
        let mut stats = FrameStats::new(2, Duration::from_secs(3600));
        assert!(!stats.record(Duration::from_millis(10)));
        stats.record(Duration::from_millis(20));
        stats.record(Duration::from_millis(40));
        assert_eq!(stats.samples(), 2);
        assert_eq!(stats.frames(), 3);
        assert_eq!(stats.average(), Duration::from_millis(30));

        let mut eager = FrameStats::new(4, Duration::ZERO);
        assert!(eager.record(Duration::from_millis(1)));
    }
}
