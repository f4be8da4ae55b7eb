//! Stage registry
//!
//! Both lookup forms (by category then kind, and by kind alone) are filled
//! from the same registration call so they cannot drift apart.

use super::{
    shared, FinalBloomStage, FxaaStage, InitialBloomStage, ObfuscationStage, SceneStage, StageArgs,
    StageCategory, StageInput, StageKind, StageRef,
};
use crate::{ConstructionError, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Builds one configured stage from its arguments
pub type StageConstructor = Arc<dyn Fn(StageArgs) -> Result<StageRef> + Send + Sync>;

/// Catalog of constructible stage kinds
pub struct StageRegistry {
    categories: BTreeMap<StageCategory, HashMap<String, StageConstructor>>,
    flat: HashMap<String, (StageCategory, StageConstructor)>,
}

impl StageRegistry {
    /// Registry with no kinds at all
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
            flat: HashMap::new(),
        }
    }

    /// Registry with every built-in kind
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for kind in StageKind::ALL {
            registry.register(kind.category(), kind.name(), builtin(kind));
        }
        registry
    }

    /// Register a stage kind. A kind registered again replaces the previous
    /// constructor, even if it lived in another category.
    pub fn register<F>(&mut self, category: StageCategory, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(StageArgs) -> Result<StageRef> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let constructor: StageConstructor = Arc::new(constructor);

        if let Some((previous, _)) = self.flat.get(&kind) {
            if let Some(kinds) = self.categories.get_mut(previous) {
                kinds.remove(&kind);
            }
        }

        self.categories
            .entry(category)
            .or_default()
            .insert(kind.clone(), constructor.clone());
        log::debug!("Registered stage kind '{}' in category '{}'", kind, category);
        self.flat.insert(kind, (category, constructor));
        self
    }

    /// Create a stage by category name and kind name
    pub fn create_stage(&self, category: &str, kind: &str, args: StageArgs) -> Result<StageRef> {
        let kinds = StageCategory::from_name(category)
            .and_then(|c| self.categories.get(&c))
            .ok_or_else(|| ConstructionError::UnknownCategory(category.to_string()))?;

        let constructor = kinds.get(kind).ok_or_else(|| ConstructionError::UnknownKind {
            category: category.to_string(),
            kind: kind.to_string(),
        })?;

        construct(constructor, args)
    }

    /// Create a stage by kind name alone
    pub fn create(&self, kind: &str, args: StageArgs) -> Result<StageRef> {
        let (category, constructor) = self.flat.get(kind).ok_or_else(|| ConstructionError::UnknownKind {
            category: String::from("*"),
            kind: kind.to_string(),
        })?;
        log::trace!("Creating stage '{}' ({})", kind, category);
        construct(constructor, args)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.flat.contains_key(kind)
    }

    pub fn category_of(&self, kind: &str) -> Option<StageCategory> {
        self.flat.get(kind).map(|(category, _)| *category)
    }

    /// Kind names of one category, sorted
    pub fn kinds(&self, category: StageCategory) -> Vec<&str> {
        let mut kinds: Vec<&str> = self
            .categories
            .get(&category)
            .map(|kinds| kinds.keys().map(String::as_str).collect())
            .unwrap_or_default();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn construct(constructor: &StageConstructor, args: StageArgs) -> Result<StageRef> {
    let enabled = args.enabled;
    let stage = constructor(args)?;
    stage.lock().set_enabled(enabled);
    Ok(stage)
}

fn builtin(kind: StageKind) -> impl Fn(StageArgs) -> Result<StageRef> + Send + Sync + 'static {
    move |args: StageArgs| -> Result<StageRef> {
        let stage = match (kind, &args.input) {
            (StageKind::InitialBloom, StageInput::Viewport { size, bloom }) => {
                shared(InitialBloomStage::new(*size, *bloom))
            }
            (StageKind::InitialBloom, _) => return Err(args.mismatch(kind.name(), "viewport").into()),

            (StageKind::Render, StageInput::Scene { scene, camera }) => {
                shared(SceneStage::new(scene.clone(), camera.clone()))
            }
            (StageKind::Render, _) => return Err(args.mismatch(kind.name(), "scene and camera").into()),

            (StageKind::Obfuscation, StageInput::Texture { texture, composite }) => {
                shared(ObfuscationStage::new(texture.clone(), *composite))
            }
            (StageKind::FinalBloom, StageInput::Texture { texture, composite }) => {
                shared(FinalBloomStage::new(texture.clone(), *composite))
            }
            (StageKind::Obfuscation | StageKind::FinalBloom, _) => {
                return Err(args.mismatch(kind.name(), "texture").into())
            }

            (StageKind::Fxaa, StageInput::None) => shared(FxaaStage::new()),
            (StageKind::Fxaa, StageInput::Viewport { size, .. }) => shared(FxaaStage::new().with_size(*size)),
            (StageKind::Fxaa, _) => return Err(args.mismatch(kind.name(), "no or viewport").into()),
        };
        Ok(stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use strata_core::{Camera, Extent, RenderTarget, Scene};

    fn scene_args() -> StageArgs {
        StageArgs::scene(Scene::new("s").shared(), Camera::default().shared())
    }

    #[test]
    fn test_every_builtin_creates_enabled() {
        let registry = StageRegistry::new();
        let texture = RenderTarget::new("t", Extent::new(4, 4)).shared();
        let cases = [
            (StageKind::InitialBloom, StageArgs::viewport(Extent::new(8, 8))),
            (StageKind::Render, scene_args()),
            (StageKind::Obfuscation, StageArgs::texture(texture.clone())),
            (StageKind::FinalBloom, StageArgs::texture(texture)),
            (StageKind::Fxaa, StageArgs::none()),
        ];

        for (kind, args) in cases {
            let stage = registry
                .create_stage(kind.category().name(), kind.name(), args.clone())
                .unwrap();
            assert!(stage.lock().is_enabled());
            assert_eq!(stage.lock().kind(), kind.name());

            let flat = registry.create(kind.name(), args).unwrap();
            assert!(!Arc::ptr_eq(&stage, &flat));
        }
    }

    #[test]
    fn test_disabled_args_are_honoured() {
        let registry = StageRegistry::new();
        let stage = registry.create("Fxaa", StageArgs::none().enabled(false)).unwrap();
        assert!(!stage.lock().is_enabled());
    }

    #[test]
    fn test_unknown_category_and_kind() {
        let registry = StageRegistry::new();
        assert!(matches!(
            registry.create_stage("Audio", "Render", scene_args()),
            Err(Error::Construction(ConstructionError::UnknownCategory(_)))
        ));
        assert!(matches!(
            registry.create_stage("Texture", "Render", scene_args()),
            Err(Error::Construction(ConstructionError::UnknownKind { .. }))
        ));
        assert!(matches!(
            registry.create("Bokeh", StageArgs::none()),
            Err(Error::Construction(ConstructionError::UnknownKind { .. }))
        ));
    }

    #[test]
    fn test_wrong_input_is_argument_mismatch() {
        let registry = StageRegistry::new();
        let err = registry.create("Render", StageArgs::none()).err();
        assert!(matches!(
            err,
            Some(Error::Construction(ConstructionError::ArgumentMismatch { ref kind, .. })) if kind == "Render"
        ));
    }

    #[test]
    fn test_both_lookups_agree() {
        let registry = StageRegistry::new();
        for category in StageCategory::ALL {
            for kind in registry.kinds(category) {
                assert_eq!(registry.category_of(kind), Some(category));
            }
        }
        assert_eq!(registry.kinds(StageCategory::Texture), vec!["FinalBloom", "Obfuscation"]);
    }

    #[test]
    fn test_register_custom_kind() {
        let mut registry = StageRegistry::new();
        registry.register(StageCategory::Algorithm, "Sharpen", |_| Ok(shared(FxaaStage::new())));
        assert!(registry.create_stage("Algorithm", "Sharpen", StageArgs::none()).is_ok());

        // moving a kind to another category drops it from the old one
        registry.register(StageCategory::Texture, "Sharpen", |_| Ok(shared(FxaaStage::new())));
        assert!(registry.create_stage("Algorithm", "Sharpen", StageArgs::none()).is_err());
        assert_eq!(registry.category_of("Sharpen"), Some(StageCategory::Texture));
    }
}
