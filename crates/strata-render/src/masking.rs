//! Material masking
//!
//! Hides scene objects from one render by swapping their material for a
//! stand-in that writes depth but no colour. The hidden objects still
//! occlude whatever lies behind them.
//!
//! Masking is idempotent: masking a masked object and restoring an
//! unmasked object both do nothing.

use glam::Vec4;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use strata_core::{LayerMask, Material, MaterialRef, Object3D, ObjectId, Scene, SceneRef};

pub type SharedMaskRegistry = Arc<Mutex<MaskRegistry>>;

/// The layer that marks objects as part of the glow set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomMembership(pub LayerMask);

impl BloomMembership {
    pub fn mask(&self) -> LayerMask {
        self.0
    }

    pub fn contains(&self, object: &Object3D) -> bool {
        object.layers.test(self.0)
    }
}

impl Default for BloomMembership {
    fn default() -> Self {
        Self(LayerMask::BLOOM)
    }
}

/// Original materials of currently masked objects
pub struct MaskRegistry {
    entries: HashMap<ObjectId, MaterialRef>,
    stand_in: MaterialRef,
    skinned_stand_in: MaterialRef,
}

impl MaskRegistry {
    pub fn new() -> Self {
        let stand_in = Material::basic("masked", Vec4::ZERO)
            .with_color_write(false)
            .with_depth_write(true);
        Self {
            entries: HashMap::new(),
            skinned_stand_in: stand_in.clone().with_skinning(true).shared(),
            stand_in: stand_in.shared(),
        }
    }

    pub fn shared(self) -> SharedMaskRegistry {
        Arc::new(Mutex::new(self))
    }

    pub fn stand_in(&self, skinned: bool) -> &MaterialRef {
        if skinned {
            &self.skinned_stand_in
        } else {
            &self.stand_in
        }
    }

    /// Swap in the stand-in. Returns false if the object was already masked
    /// or has no material.
    pub fn mask(&mut self, object: &mut Object3D) -> bool {
        if self.entries.contains_key(&object.id()) {
            return false;
        }
        let Some(original) = object.material.clone() else {
            return false;
        };
        self.entries.insert(object.id(), original);
        object.material = Some(self.stand_in(object.is_skinned()).clone());
        true
    }

    /// Put the original material back. Returns false if the object was not
    /// masked.
    pub fn restore(&mut self, object: &mut Object3D) -> bool {
        match self.entries.remove(&object.id()) {
            Some(original) => {
                object.material = Some(original);
                true
            }
            None => false,
        }
    }

    /// Mask every mesh of the scene (and attached scenes) outside the glow
    /// set. Returns the objects this call masked; objects masked earlier
    /// are left out.
    pub fn mask_scene(&mut self, scene: &mut Scene, membership: BloomMembership) -> HashSet<ObjectId> {
        let mut masked = HashSet::new();
        scene.traverse_mut(|object| {
            if object.is_mesh() && !membership.contains(object) && self.mask(object) {
                masked.insert(object.id());
            }
        });
        masked
    }

    /// Restore the objects of `ids` found in the scene
    pub fn restore_scene(&mut self, scene: &mut Scene, ids: &HashSet<ObjectId>) -> usize {
        let mut restored = 0;
        scene.traverse_mut(|object| {
            if ids.contains(&object.id()) && self.restore(object) {
                restored += 1;
            }
        });
        restored
    }

    /// Drop entries without restoring them. Returns how many were dropped.
    pub fn forget<'a>(&mut self, ids: impl IntoIterator<Item = &'a ObjectId>) -> usize {
        ids.into_iter().filter(|id| self.entries.remove(id).is_some()).count()
    }

    pub fn is_masked(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Masks a scene for as long as the scope lives. Only the objects the scope
/// masked itself are restored; other entries of the registry are untouched.
pub struct MaskScope {
    registry: SharedMaskRegistry,
    scene: SceneRef,
    masked: HashSet<ObjectId>,
}

impl MaskScope {
    pub fn apply(registry: SharedMaskRegistry, scene: SceneRef, membership: BloomMembership) -> Self {
        let masked = registry.lock().mask_scene(&mut scene.write(), membership);
        log::trace!("Masked {} objects", masked.len());
        Self {
            registry,
            scene,
            masked,
        }
    }

    pub fn masked(&self) -> usize {
        self.masked.len()
    }
}

impl Drop for MaskScope {
    fn drop(&mut self) {
        let mut registry = self.registry.lock();
        let restored = registry.restore_scene(&mut self.scene.write(), &self.masked);
        if restored != self.masked.len() {
            // the rest left the scene while masked
            let dropped = registry.forget(&self.masked);
            log::warn!(
                "Masked {} objects but restored {}, dropped {} stale entries",
                self.masked.len(),
                restored,
                dropped
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_core::Quad;

    fn mesh(name: &str) -> Object3D {
        Object3D::mesh(name, Quad::square(1.0), Material::basic(name, Vec4::ONE).shared())
    }

    #[test]
    fn test_mask_is_idempotent() {
        let mut registry = MaskRegistry::new();
        let mut object = mesh("a");
        let original = object.material.clone().unwrap();

        assert!(registry.mask(&mut object));
        assert!(!registry.mask(&mut object));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(object.material.as_ref().unwrap(), registry.stand_in(false)));

        assert!(registry.restore(&mut object));
        assert!(Arc::ptr_eq(object.material.as_ref().unwrap(), &original));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_restore_unmasked_is_noop() {
        let mut registry = MaskRegistry::new();
        let mut object = mesh("a");
        let original = object.material.clone().unwrap();

        assert!(!registry.restore(&mut object));
        assert!(Arc::ptr_eq(object.material.as_ref().unwrap(), &original));
    }

    #[test]
    fn test_skinned_meshes_get_skinned_stand_in() {
        let mut registry = MaskRegistry::new();
        let mut skinned = Object3D::skinned_mesh("s", Quad::square(1.0), Material::default().shared());
        registry.mask(&mut skinned);
        let material = skinned.material.unwrap();
        assert!(material.skinning);
        assert!(!material.color_write);
        assert!(material.depth_write);
    }

    #[test]
    fn test_scope_masks_only_non_members() {
        let registry = MaskRegistry::new().shared();
        let member = mesh("glow").with_layers(LayerMask::DEFAULT | LayerMask::BLOOM);
        let member_id = member.id();
        let scene = Scene::new("s")
            .with_object(mesh("a"))
            .with_object(Object3D::group("g").with_child(member))
            .shared();

        {
            let scope = MaskScope::apply(registry.clone(), scene.clone(), BloomMembership::default());
            assert_eq!(scope.masked(), 1);
            assert!(!registry.lock().is_masked(member_id));
            let guard = scene.read();
            let a = &guard.objects()[0];
            assert!(!a.material.as_ref().unwrap().color_write);
        }

        assert!(registry.lock().is_empty());
        let guard = scene.read();
        assert!(guard.objects()[0].material.as_ref().unwrap().color_write);
    }

    #[test]
    fn test_scope_keeps_entries_it_did_not_make() {
        let registry = MaskRegistry::new().shared();
        let mut elsewhere = mesh("elsewhere");
        let mut premasked = mesh("premasked");
        let premasked_id = premasked.id();
        registry.lock().mask(&mut elsewhere);
        registry.lock().mask(&mut premasked);

        let scene = Scene::new("s").with_object(mesh("a")).with_object(premasked).shared();
        {
            let scope = MaskScope::apply(registry.clone(), scene.clone(), BloomMembership::default());
            assert_eq!(scope.masked(), 1);
            assert_eq!(registry.lock().len(), 3);
        }

        let registry = registry.lock();
        assert_eq!(registry.len(), 2);
        assert!(registry.is_masked(elsewhere.id()));
        assert!(registry.is_masked(premasked_id));
        let guard = scene.read();
        assert!(guard.objects()[0].material.as_ref().unwrap().color_write);
        assert!(!guard.object(premasked_id).unwrap().material.as_ref().unwrap().color_write);
    }

    #[test]
    fn test_scope_drops_entries_of_detached_scenes() {
        let registry = MaskRegistry::new().shared();
        let child = Scene::new("child").with_object(mesh("b")).shared();
        let master = Scene::new("master").with_object(mesh("a")).shared();
        master.write().attach(child.clone());

        {
            let scope = MaskScope::apply(registry.clone(), master.clone(), BloomMembership::default());
            assert_eq!(scope.masked(), 2);
            master.write().detach(&child);
        }

        assert!(registry.lock().is_empty());
        assert!(master.read().objects()[0].material.as_ref().unwrap().color_write);
    }
}
