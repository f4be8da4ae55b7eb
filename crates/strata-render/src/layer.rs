//! Viewport layers
//!
//! A layer owns a renderer, a camera and a stack of scenes attached to one
//! master scene. It keeps a [`Render`] per visual mode and rebuilds them
//! lazily when its stack changes.

use crate::composer::{RenderContext, SharedComposerBuilder};
use crate::config::{BloomParams, CompositeParams, LayerConfig};
use crate::render::{Render, RenderMode};
use crate::stages::{StageArgs, StageKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{Camera, CameraRef, Extent, ObjectId, RenderBackend, Scene, SceneRef};

/// One (scene, camera) pair a layer wants drawn
#[derive(Clone)]
pub struct SceneTarget {
    /// Unique name, also the stage cache owner of the scene's render stage
    pub output_name: String,
    pub scene: SceneRef,
    pub camera: CameraRef,
}

/// What an extra stage is constructed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtraInput {
    None,
    /// The layer size and bloom parameters
    #[default]
    Viewport,
    /// The master scene seen by the layer camera
    Scene,
}

/// Construction arguments of an extra stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraStageArgs {
    pub input: ExtraInput,
    pub enabled: bool,
    /// Replaces the layer's bloom parameters for this stage only
    pub bloom: Option<BloomParams>,
}

impl ExtraStageArgs {
    fn stage_args(&self, layer: &LayerDescriptor) -> StageArgs {
        let args = match self.input {
            ExtraInput::None => StageArgs::none(),
            ExtraInput::Viewport => StageArgs::viewport(layer.size).with_bloom(self.bloom.unwrap_or(layer.bloom)),
            ExtraInput::Scene => StageArgs::scene(layer.master_scene.clone(), layer.camera.clone()),
        };
        args.enabled(self.enabled)
    }
}

impl Default for ExtraStageArgs {
    fn default() -> Self {
        Self {
            input: ExtraInput::Viewport,
            enabled: true,
            bloom: None,
        }
    }
}

/// A non-scene stage appended to a layer's composers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraStage {
    pub kind: String,
    /// Appended to the presenting composers rather than the offscreen ones
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub args: ExtraStageArgs,
}

impl ExtraStage {
    pub fn new(kind: impl Into<String>, is_final: bool) -> Self {
        Self {
            kind: kind.into(),
            is_final,
            args: ExtraStageArgs::default(),
        }
    }

    pub fn with_input(mut self, input: ExtraInput) -> Self {
        self.args.input = input;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.args.enabled = enabled;
        self
    }

    pub fn with_bloom(mut self, bloom: BloomParams) -> Self {
        self.args.bloom = Some(bloom);
        self
    }
}

/// A stage the builder should fetch from the cache
pub struct StageRequest {
    pub owner: String,
    pub kind: String,
    pub args: StageArgs,
}

/// Everything the composer builder needs to know about a layer
#[derive(Clone)]
pub struct LayerDescriptor {
    pub name: String,
    pub size: Extent,
    pub master_scene: SceneRef,
    pub camera: CameraRef,
    pub targets: Vec<SceneTarget>,
    pub extra_stages: Vec<ExtraStage>,
    pub bloom: BloomParams,
    pub composite: CompositeParams,
}

impl LayerDescriptor {
    pub fn new(name: impl Into<String>, size: Extent, master_scene: SceneRef, camera: CameraRef) -> Self {
        Self {
            name: name.into(),
            size,
            master_scene,
            camera,
            targets: Vec::new(),
            extra_stages: Vec::new(),
            bloom: BloomParams::default(),
            composite: CompositeParams::default(),
        }
    }

    pub fn with_target(mut self, output_name: impl Into<String>, scene: SceneRef, camera: CameraRef) -> Self {
        self.targets.push(SceneTarget {
            output_name: output_name.into(),
            scene,
            camera,
        });
        self
    }

    pub fn with_extra_stage(mut self, extra: ExtraStage) -> Self {
        self.extra_stages.push(extra);
        self
    }

    pub fn with_bloom(mut self, bloom: BloomParams) -> Self {
        self.bloom = bloom;
        self
    }

    pub fn with_composite(mut self, composite: CompositeParams) -> Self {
        self.composite = composite.sanitized();
        self
    }

    /// The layer camera followed by every other camera a target draws with
    pub fn cameras(&self) -> Vec<CameraRef> {
        let mut cameras = vec![self.camera.clone()];
        for target in &self.targets {
            if !cameras.iter().any(|camera| Arc::ptr_eq(camera, &target.camera)) {
                cameras.push(target.camera.clone());
            }
        }
        cameras
    }

    /// One render stage per target keyed by its output name, then the extra
    /// stages with a matching final flag keyed by the layer name
    pub fn stage_requests(&self, is_final: bool) -> Vec<StageRequest> {
        let renders = self.targets.iter().map(|target| StageRequest {
            owner: target.output_name.clone(),
            kind: StageKind::Render.name().to_string(),
            args: StageArgs::scene(target.scene.clone(), target.camera.clone()),
        });

        let extras = self
            .extra_stages
            .iter()
            .filter(|extra| extra.is_final == is_final)
            .map(|extra| StageRequest {
                owner: self.name.clone(),
                kind: extra.kind.clone(),
                args: extra.args.stage_args(self),
            });

        renders.chain(extras).collect()
    }
}

struct StackEntry {
    scene: SceneRef,
    camera: Option<CameraRef>,
}

/// Ordered scenes of a layer. Every scene in the stack is attached to the
/// master scene.
pub struct SceneStack {
    master: SceneRef,
    entries: Vec<StackEntry>,
}

impl SceneStack {
    pub fn new(master: SceneRef) -> Self {
        Self {
            master,
            entries: Vec::new(),
        }
    }

    pub fn master(&self) -> &SceneRef {
        &self.master
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scenes(&self) -> Vec<SceneRef> {
        self.entries.iter().map(|entry| entry.scene.clone()).collect()
    }

    /// Create an empty scene on top of the stack
    pub fn create_scene(&mut self, name: Option<&str>) -> SceneRef {
        let mut scene = Scene::default();
        scene.name = match name {
            Some(name) => name.to_string(),
            None => format!("scene-{}", scene.id()),
        };
        let scene = scene.shared();
        self.insert_at(scene.clone(), -1);
        scene
    }

    /// Insert at `index`, negative indices counting from the end (`-1`
    /// appends). Out-of-range indices are clamped. A scene already in the
    /// stack is moved. Returns the final position.
    pub fn insert_at(&mut self, scene: SceneRef, index: isize) -> usize {
        let camera = self.take(&scene).and_then(|entry| entry.camera);

        let len = self.entries.len() as isize;
        let index = if index < 0 { len + 1 + index } else { index };
        let index = index.clamp(0, len) as usize;

        self.master.write().attach(scene.clone());
        self.entries.insert(index, StackEntry { scene, camera });
        index
    }

    /// Insert before another scene of the stack, or on top
    pub fn insert(&mut self, scene: SceneRef, before: Option<&SceneRef>) -> Result<usize> {
        let index = match before {
            Some(before) => self
                .index_of(before)
                .ok_or_else(|| strata_core::Error::UnknownObject(before.read().id()))? as isize,
            None => -1,
        };
        Ok(self.insert_at(scene, index))
    }

    /// Remove from the stack and detach from the master scene
    pub fn remove(&mut self, scene: &SceneRef) -> bool {
        if self.take(scene).is_none() {
            return false;
        }
        self.master.write().detach(scene);
        true
    }

    fn take(&mut self, scene: &SceneRef) -> Option<StackEntry> {
        let index = self.index_of(scene)?;
        Some(self.entries.remove(index))
    }

    /// Scene at `index`, negative indices counting from the end
    pub fn at(&self, index: isize) -> Option<&SceneRef> {
        let len = self.entries.len() as isize;
        let index = if index < 0 { len + index } else { index };
        if (0..len).contains(&index) {
            Some(&self.entries[index as usize].scene)
        } else {
            None
        }
    }

    pub fn has(&self, scene: &SceneRef) -> bool {
        self.index_of(scene).is_some()
    }

    pub fn index_of(&self, scene: &SceneRef) -> Option<usize> {
        self.entries.iter().position(|entry| Arc::ptr_eq(&entry.scene, scene))
    }

    /// Draw one scene with its own camera instead of the layer camera
    pub fn set_camera(&mut self, scene: &SceneRef, camera: Option<CameraRef>) -> bool {
        match self.entries.iter_mut().find(|entry| Arc::ptr_eq(&entry.scene, scene)) {
            Some(entry) => {
                entry.camera = camera;
                true
            }
            None => false,
        }
    }

    /// Targets in stack order, named `{prefix}-{scene id}-{camera id}`
    pub fn render_targets(&self, prefix: &str, default_camera: &CameraRef) -> Vec<SceneTarget> {
        self.entries
            .iter()
            .map(|entry| {
                let camera = entry.camera.clone().unwrap_or_else(|| default_camera.clone());
                let output_name = format!("{}-{}-{}", prefix, entry.scene.read().id(), camera.read().id());
                SceneTarget {
                    output_name,
                    scene: entry.scene.clone(),
                    camera,
                }
            })
            .collect()
    }
}

/// Notifications around a layer render
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerEvent {
    BeforeRender { mode: RenderMode, delta_time: f32 },
    Render { mode: RenderMode, delta_time: f32 },
    AfterRender { mode: RenderMode, delta_time: f32 },
}

type Listener = Box<dyn FnMut(&LayerEvent) + Send>;

pub struct ViewportLayer {
    id: ObjectId,
    name: String,
    viewport: String,
    size: Extent,
    renderer: Box<dyn RenderBackend>,
    camera: CameraRef,
    stack: SceneStack,
    config: LayerConfig,
    builder: SharedComposerBuilder,
    renders: BTreeMap<RenderMode, Render>,
    current: RenderMode,
    bloom_enabled: bool,
    visible: bool,
    bottom: bool,
    listeners: Vec<Listener>,
    dirty: bool,
    frame: u64,
}

impl ViewportLayer {
    pub fn new(
        name: impl Into<String>,
        viewport: impl Into<String>,
        size: Extent,
        mut renderer: Box<dyn RenderBackend>,
        builder: SharedComposerBuilder,
        config: LayerConfig,
    ) -> Result<Self> {
        let size = size.validate()?;
        let name = name.into();
        renderer.set_size(size);

        let camera = Camera::perspective(50.0, size.aspect(), 1.0, 10000.0)
            .with_name(format!("{}-camera", name))
            .shared();
        let master = Scene::new(format!("{}-scenemaster-masterscene", name)).shared();

        log::debug!("Created layer '{}' (bloom: {})", name, config.bloom);
        Ok(Self {
            id: ObjectId::new(),
            name,
            viewport: viewport.into(),
            size,
            renderer,
            camera,
            stack: SceneStack::new(master),
            visible: config.start_visible,
            config,
            builder,
            renders: BTreeMap::new(),
            current: RenderMode::Normal,
            bloom_enabled: false,
            bottom: false,
            listeners: Vec::new(),
            dirty: true,
            frame: 0,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn renderer(&self) -> &dyn RenderBackend {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn RenderBackend {
        self.renderer.as_mut()
    }

    pub fn camera(&self) -> &CameraRef {
        &self.camera
    }

    /// Replace the layer camera
    pub fn set_camera(&mut self, camera: CameraRef) {
        camera.write().set_aspect(self.size.aspect());
        self.camera = camera;
        self.dirty = true;
    }

    pub fn master_scene(&self) -> &SceneRef {
        self.stack.master()
    }

    pub fn stack(&self) -> &SceneStack {
        &self.stack
    }

    /// Mutable stack access. Renders are rebuilt before the next frame.
    pub fn stack_mut(&mut self) -> &mut SceneStack {
        self.dirty = true;
        &mut self.stack
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn is_bloomable(&self) -> bool {
        self.config.bloom
    }

    pub fn bloom_enabled(&self) -> bool {
        self.bloom_enabled
    }

    /// Switch to the bloom render. Ignored unless the layer is bloomable.
    pub fn set_bloom_enabled(&mut self, enabled: bool) {
        self.bloom_enabled = self.is_bloomable() && enabled;
        self.current = if self.bloom_enabled {
            RenderMode::Bloom
        } else {
            RenderMode::Normal
        };
    }

    pub fn current_mode(&self) -> RenderMode {
        self.current
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    pub(crate) fn set_bottom(&mut self, bottom: bool) {
        self.bottom = bottom;
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&LayerEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Prefix of the output names of this layer's scene renders
    fn target_prefix(&self) -> String {
        format!("{}-layer-{}", self.viewport, self.id)
    }

    pub fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor {
            name: self.name.clone(),
            size: self.size,
            master_scene: self.stack.master().clone(),
            camera: self.camera.clone(),
            targets: self.stack.render_targets(&self.target_prefix(), &self.camera),
            extra_stages: self.config.extra_stages.clone(),
            bloom: self.config.bloom_params,
            composite: self.config.composite,
        }
    }

    /// Rebuild every render from the current stack
    pub fn rebuild(&mut self) -> Result<()> {
        let descriptor = self.descriptor();
        let mut builder = self.builder.lock();

        // stages bound to textures of the composers being replaced
        builder.evict_owner(&self.name);
        for render in self.renders.values() {
            for composer in render.composers() {
                builder.evict_owner(composer.name());
            }
        }

        let mut renders = BTreeMap::new();
        let mut modes = vec![RenderMode::Normal];
        if self.is_bloomable() {
            modes.push(RenderMode::Bloom);
        }
        for mode in modes {
            let name = format!("{}-{}", self.name, mode);
            let render = Render::build(name, &mode.strategies(true), &mut builder, &descriptor)?;
            renders.insert(mode, render);
        }

        self.renders = renders;
        self.dirty = false;
        Ok(())
    }

    /// Evict every cached stage this layer owns. Returns the eviction count.
    pub fn release_stages(&mut self) -> usize {
        let mut builder = self.builder.lock();
        let mut evicted = builder.evict_owner(&self.name);
        for target in self.stack.render_targets(&self.target_prefix(), &self.camera) {
            evicted += builder.evict_owner(&target.output_name);
        }
        for render in self.renders.values() {
            for composer in render.composers() {
                evicted += builder.evict_owner(composer.name());
            }
        }
        drop(builder);

        self.renders.clear();
        self.dirty = true;
        evicted
    }

    pub fn render_for(&self, mode: RenderMode) -> Option<&Render> {
        self.renders.get(&mode)
    }

    pub fn current_render(&self) -> Option<&Render> {
        self.renders.get(&self.current)
    }

    /// Resize the renderer, every render and the camera aspect
    pub fn resize(&mut self, size: Extent) -> Result<()> {
        let size = size.validate()?;
        self.size = size;
        self.renderer.set_size(size);
        for render in self.renders.values_mut() {
            render.set_size(size)?;
        }
        self.camera.write().set_aspect(size.aspect());
        log::debug!("Layer '{}' resized to {}x{}", self.name, size.width, size.height);
        Ok(())
    }

    fn emit(&mut self, event: LayerEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Render the current mode
    pub fn render(&mut self, delta_time: f32) -> Result<()> {
        if self.dirty {
            self.rebuild()?;
        }
        let mode = self.current;

        self.emit(LayerEvent::BeforeRender { mode, delta_time });
        self.emit(LayerEvent::Render { mode, delta_time });

        let result = match self.renders.get_mut(&mode) {
            Some(render) => {
                let mut ctx = RenderContext::new(self.renderer.as_mut(), self.frame);
                render.render(&mut ctx, delta_time)
            }
            None => Err(Error::Stage {
                stage: mode.name().to_string(),
                message: format!("layer '{}' has no {} render", self.name, mode),
            }),
        };
        self.frame += 1;

        self.emit(LayerEvent::AfterRender { mode, delta_time });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ComposerBuilder;
    use crate::stages::StageInput;
    use parking_lot::Mutex;
    use strata_core::SoftwareRenderer;

    fn scene(name: &str) -> SceneRef {
        Scene::new(name).shared()
    }

    fn layer(config: LayerConfig) -> ViewportLayer {
        let renderer = SoftwareRenderer::new(Extent::new(8, 8)).unwrap();
        ViewportLayer::new(
            "vp-layer-main",
            "vp",
            Extent::new(8, 8),
            Box::new(renderer),
            ComposerBuilder::default().shared(),
            config,
        )
        .unwrap()
    }

    #[test]
    fn test_stack_insert_at_normalises_index() {
        let mut stack = SceneStack::new(scene("master"));
        let (a, b, c, d) = (scene("a"), scene("b"), scene("c"), scene("d"));

        assert_eq!(stack.insert_at(a.clone(), -1), 0);
        assert_eq!(stack.insert_at(b.clone(), 10), 1);
        assert_eq!(stack.insert_at(c.clone(), 0), 0);
        assert_eq!(stack.insert_at(d.clone(), -2), 2);

        let order: Vec<String> = stack.scenes().iter().map(|s| s.read().name.clone()).collect();
        assert_eq!(order, vec!["c", "a", "d", "b"]);
        assert!(Arc::ptr_eq(stack.at(-1).unwrap(), &b));
        assert!(stack.at(4).is_none());
        assert_eq!(stack.master().read().attached().len(), 4);
    }

    #[test]
    fn test_stack_insert_before_and_move() {
        let mut stack = SceneStack::new(scene("master"));
        let (a, b) = (scene("a"), scene("b"));
        stack.insert(a.clone(), None).unwrap();
        assert_eq!(stack.insert(b.clone(), Some(&a)).unwrap(), 0);
        assert_eq!(stack.index_of(&a), Some(1));

        // reinserting moves rather than duplicates
        stack.insert_at(b.clone(), -1);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.index_of(&b), Some(1));

        let stranger = scene("stranger");
        assert!(stack.insert(scene("x"), Some(&stranger)).is_err());
        assert!(stack.remove(&a));
        assert!(!stack.has(&a));
        assert_eq!(stack.master().read().attached().len(), 1);
    }

    #[test]
    fn test_render_target_names_and_camera_override() {
        let mut stack = SceneStack::new(scene("master"));
        let a = stack.create_scene(Some("a"));
        let b = stack.create_scene(None);
        let layer_camera = Camera::default().shared();
        let close_up = Camera::default().shared();
        assert!(stack.set_camera(&b, Some(close_up.clone())));

        let targets = stack.render_targets("vp-layer-7", &layer_camera);
        assert_eq!(
            targets[0].output_name,
            format!("vp-layer-7-{}-{}", a.read().id(), layer_camera.read().id())
        );
        assert!(Arc::ptr_eq(&targets[1].camera, &close_up));
        assert!(b.read().name.starts_with("scene-"));
    }

    #[test]
    fn test_bloom_only_for_bloomable_layers() {
        let mut normal = layer(LayerConfig::default());
        normal.stack_mut().create_scene(None);
        normal.set_bloom_enabled(true);
        assert!(!normal.bloom_enabled());
        assert_eq!(normal.current_mode(), RenderMode::Normal);
        normal.rebuild().unwrap();
        assert!(normal.render_for(RenderMode::Bloom).is_none());

        let mut bloomable = layer(LayerConfig::bloomable());
        bloomable.stack_mut().create_scene(None);
        bloomable.set_bloom_enabled(true);
        assert_eq!(bloomable.current_mode(), RenderMode::Bloom);
        bloomable.rebuild().unwrap();
        assert!(bloomable.render_for(RenderMode::Bloom).is_some());
        bloomable.set_bloom_enabled(false);
        assert_eq!(bloomable.current_mode(), RenderMode::Normal);
    }

    #[test]
    fn test_render_emits_events_in_order() {
        let mut layer = layer(LayerConfig::default());
        layer.stack_mut().create_scene(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        layer.add_listener(move |event| sink.lock().push(*event));

        layer.render(0.5).unwrap();

        let mode = RenderMode::Normal;
        assert_eq!(
            *seen.lock(),
            vec![
                LayerEvent::BeforeRender { mode, delta_time: 0.5 },
                LayerEvent::Render { mode, delta_time: 0.5 },
                LayerEvent::AfterRender { mode, delta_time: 0.5 },
            ]
        );
    }

    #[test]
    fn test_resize_reaches_every_render() {
        let mut layer = layer(LayerConfig::bloomable());
        layer.stack_mut().create_scene(None);
        layer.rebuild().unwrap();
        layer.resize(Extent::new(16, 4)).unwrap();

        for mode in [RenderMode::Normal, RenderMode::Bloom] {
            let render = layer.render_for(mode).unwrap();
            assert_eq!(render.size(), Extent::new(16, 4));
            for composer in render.composers() {
                assert_eq!(composer.ping().read().size(), Extent::new(16, 4));
            }
        }
        assert_eq!(layer.renderer().size(), Extent::new(16, 4));
        assert!(layer.resize(Extent::new(0, 4)).is_err());
    }

    #[test]
    fn test_rebuild_rebinds_obfuscation_texture() {
        let mut layer = layer(LayerConfig::bloomable());
        layer.stack_mut().create_scene(None);
        layer.rebuild().unwrap();
        let first = layer.builder.lock().cache().len();

        layer.stack_mut().create_scene(None);
        layer.rebuild().unwrap();
        let render = layer.render_for(RenderMode::Bloom).unwrap();
        assert_eq!(render.composers()[0].stages().len(), 4);
        assert!(layer.builder.lock().cache().len() > first);
    }

    fn with_extra(extra: ExtraStage) -> LayerDescriptor {
        let master = scene("master");
        let camera = Camera::default().shared();
        LayerDescriptor::new("vp-layer-main", Extent::new(8, 8), master.clone(), camera.clone())
            .with_target("vp-layer-main-scene", master, camera)
            .with_extra_stage(extra)
    }

    #[test]
    fn test_descriptor_cameras_are_distinct() {
        let layer_camera = Camera::default().shared();
        let close_up = Camera::default().shared();
        let (a, b, c) = (scene("a"), scene("b"), scene("c"));
        let descriptor = LayerDescriptor::new("l", Extent::new(4, 4), scene("master"), layer_camera.clone())
            .with_target("a", a, close_up.clone())
            .with_target("b", b, layer_camera.clone())
            .with_target("c", c, close_up.clone());

        let cameras = descriptor.cameras();
        assert_eq!(cameras.len(), 2);
        assert!(Arc::ptr_eq(&cameras[0], &layer_camera));
        assert!(Arc::ptr_eq(&cameras[1], &close_up));
    }

    #[test]
    fn test_extra_stage_args_reach_constructed_stage() {
        let bloom = BloomParams::default().with_strength(0.5);
        let descriptor = with_extra(ExtraStage::new("Fxaa", true).with_enabled(false).with_bloom(bloom));

        let requests = descriptor.stage_requests(true);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].owner, "vp-layer-main");
        assert!(!requests[1].args.enabled);
        assert!(matches!(
            requests[1].args.input,
            StageInput::Viewport { size, bloom: params } if size == Extent::new(8, 8) && params == bloom
        ));
        assert!(descriptor.stage_requests(false).iter().all(|request| request.kind == "Render"));

        let mut builder = ComposerBuilder::default();
        let composer = builder.simple_composer("c", &descriptor, true).unwrap();
        let kinds: Vec<(String, bool)> = composer
            .stages()
            .iter()
            .map(|stage| {
                let stage = stage.lock();
                (stage.kind().to_string(), stage.is_enabled())
            })
            .collect();
        assert_eq!(kinds, vec![("Render".to_string(), true), ("Fxaa".to_string(), false)]);
    }

    #[test]
    fn test_extra_stage_input_must_suit_kind() {
        let descriptor = with_extra(ExtraStage::new("Fxaa", true).with_input(ExtraInput::Scene));
        let mut builder = ComposerBuilder::default();
        assert!(matches!(
            builder.simple_composer("c", &descriptor, true),
            Err(Error::Construction(crate::ConstructionError::ArgumentMismatch { .. }))
        ));

        let descriptor = with_extra(ExtraStage::new("Fxaa", true).with_input(ExtraInput::None));
        assert!(builder.simple_composer("d", &descriptor, true).is_ok());
    }

    #[test]
    fn test_extra_stage_args_load_from_json() {
        let extra: ExtraStage =
            serde_json::from_str(r#"{ "kind": "Fxaa", "is_final": true, "args": { "enabled": false, "input": "None" } }"#)
                .unwrap();
        assert_eq!(extra.kind, "Fxaa");
        assert!(!extra.args.enabled);
        assert_eq!(extra.args.input, ExtraInput::None);
        assert_eq!(extra.args.bloom, None);

        let plain: ExtraStage = serde_json::from_str(r#"{ "kind": "Fxaa" }"#).unwrap();
        assert_eq!(plain, ExtraStage::new("Fxaa", false));
    }
}
