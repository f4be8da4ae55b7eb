//! Scene graph
//!
//! A [`Scene`] owns a forest of [`Object3D`] nodes and may have other scenes
//! attached to it. Attached scenes are shared handles so they can also be
//! rendered on their own; traversal of a scene descends into them.

use crate::layers::LayerMask;
use crate::material::MaterialRef;
use glam::{Mat4, Vec2, Vec3, Vec4};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type SceneRef = Arc<RwLock<Scene>>;

/// Stable identity for objects, scenes and cameras
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct ObjectId(pub u64);

impl ObjectId {
    /// Allocate a fresh process-unique id
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Group,
    Mesh,
    SkinnedMesh,
}

/// Axis-aligned quad in the object's local XY plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub half_extents: Vec2,
}

impl Quad {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            half_extents: Vec2::new(width * 0.5, height * 0.5),
        }
    }

    pub fn square(size: f32) -> Self {
        Self::new(size, size)
    }

    /// Corners in local space, counter-clockwise from bottom-left
    pub fn corners(&self) -> [Vec3; 4] {
        let Vec2 { x, y } = self.half_extents;
        [
            Vec3::new(-x, -y, 0.0),
            Vec3::new(x, -y, 0.0),
            Vec3::new(x, y, 0.0),
            Vec3::new(-x, y, 0.0),
        ]
    }
}

/// A node of the scene graph
#[derive(Debug, Clone)]
pub struct Object3D {
    id: ObjectId,
    kind: ObjectKind,
    pub name: String,
    pub transform: Mat4,
    pub layers: LayerMask,
    pub visible: bool,
    pub material: Option<MaterialRef>,
    pub geometry: Option<Quad>,
    children: Vec<Object3D>,
}

impl Object3D {
    fn with_kind(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            kind,
            name: name.into(),
            transform: Mat4::IDENTITY,
            layers: LayerMask::default(),
            visible: true,
            material: None,
            geometry: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(ObjectKind::Group, name)
    }

    pub fn mesh(name: impl Into<String>, geometry: Quad, material: MaterialRef) -> Self {
        let mut object = Self::with_kind(ObjectKind::Mesh, name);
        object.geometry = Some(geometry);
        object.material = Some(material);
        object
    }

    pub fn skinned_mesh(name: impl Into<String>, geometry: Quad, material: MaterialRef) -> Self {
        let mut object = Self::mesh(name, geometry, material);
        object.kind = ObjectKind::SkinnedMesh;
        object
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform = Mat4::from_translation(position);
        self
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_child(mut self, child: Object3D) -> Self {
        self.children.push(child);
        self
    }

    pub fn add(&mut self, child: Object3D) -> ObjectId {
        let id = child.id;
        self.children.push(child);
        id
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Meshes and skinned meshes
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ObjectKind::Mesh | ObjectKind::SkinnedMesh)
    }

    pub fn is_skinned(&self) -> bool {
        self.kind == ObjectKind::SkinnedMesh
    }

    pub fn children(&self) -> &[Object3D] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Object3D] {
        &mut self.children
    }

    /// Depth-first, parent before children
    pub fn traverse<F: FnMut(&Object3D)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    pub fn traverse_mut<F: FnMut(&mut Object3D)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    fn find(&self, id: ObjectId) -> Option<&Object3D> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    fn find_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

/// Root of a scene graph
#[derive(Debug)]
pub struct Scene {
    id: ObjectId,
    pub name: String,
    /// Background drawn in place of the renderer clear colour. `None` means
    /// the clear colour and clear alpha show through.
    pub background: Option<Vec4>,
    objects: Vec<Object3D>,
    attached: Vec<SceneRef>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            background: None,
            objects: Vec::new(),
            attached: Vec::new(),
        }
    }

    pub fn with_background(mut self, color: Vec4) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_object(mut self, object: Object3D) -> Self {
        self.objects.push(object);
        self
    }

    pub fn shared(self) -> SceneRef {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn add(&mut self, object: Object3D) -> ObjectId {
        let id = object.id();
        self.objects.push(object);
        id
    }

    pub fn objects(&self) -> &[Object3D] {
        &self.objects
    }

    /// Attach another scene beneath this one
    pub fn attach(&mut self, scene: SceneRef) {
        if !self.attached.iter().any(|s| Arc::ptr_eq(s, &scene)) {
            self.attached.push(scene);
        }
    }

    pub fn detach(&mut self, scene: &SceneRef) -> bool {
        let before = self.attached.len();
        self.attached.retain(|s| !Arc::ptr_eq(s, scene));
        before != self.attached.len()
    }

    pub fn attached(&self) -> &[SceneRef] {
        &self.attached
    }

    /// Visit every object, then every object of each attached scene
    pub fn traverse<F: FnMut(&Object3D)>(&self, mut f: F) {
        self.walk(&mut f);
    }

    fn walk<F: FnMut(&Object3D)>(&self, f: &mut F) {
        for object in &self.objects {
            object.traverse(f);
        }
        for scene in &self.attached {
            scene.read().walk(f);
        }
    }

    /// Mutable visit, descending into attached scenes
    pub fn traverse_mut<F: FnMut(&mut Object3D)>(&mut self, mut f: F) {
        self.walk_mut(&mut f);
    }

    fn walk_mut<F: FnMut(&mut Object3D)>(&mut self, f: &mut F) {
        for object in &mut self.objects {
            object.traverse_mut(f);
        }
        for scene in &self.attached {
            scene.write().walk_mut(f);
        }
    }

    /// Lookup among this scene's own objects
    pub fn object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.iter().find_map(|object| object.find(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.iter_mut().find_map(|object| object.find_mut(id))
    }

    pub fn object_count(&self) -> usize {
        let mut count = 0;
        self.traverse(|_| count += 1);
        count
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("scene")
    }
}
