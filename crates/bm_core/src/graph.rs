//! Scene graph sink.
//!
//! The importer never builds objects itself; it drives a [`SceneGraph`].
//! [`MemoryGraph`] is the bundled implementation: an object arena holding
//! names, parent links, local transforms and OBJ-loaded meshes.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bm_math::{Bounds, Mat4, Vec3};
use thiserror::Error;

use crate::material::{AlphaSource, BlendMethod, BlendSetup};
use crate::mesh::{Mesh, MeshError, ObjImport};
use crate::progress::ProgressSink;

/// Errors reported by a scene graph.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("Parenting {child} to {parent} would create a cycle")]
    Cycle { child: ObjectId, parent: ObjectId },

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Handle to an object created by a scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operations the importer needs from a target scene.
pub trait SceneGraph: ProgressSink {
    /// Create an object without geometry.
    fn create_empty(&mut self, name: &str) -> GraphResult<ObjectId>;

    /// Import the OBJ at `path` as one object named `name`.
    ///
    /// `Ok(None)` means the file produced no object.
    fn import_obj(&mut self, path: &Path, name: &str) -> GraphResult<Option<ObjectId>>;

    fn set_parent(&mut self, child: ObjectId, parent: ObjectId) -> GraphResult<()>;

    /// Replace the object's transform relative to its parent.
    fn set_local_transform(&mut self, object: ObjectId, transform: Mat4) -> GraphResult<()>;

    /// Apply a blend setup to the object's material slots bound to
    /// `material_id`.
    fn apply_blend_setup(
        &mut self,
        object: ObjectId,
        material_id: i32,
        setup: &BlendSetup,
    ) -> GraphResult<()>;
}

/// A surface material, as read from an OBJ material library.
#[derive(Clone, Debug)]
pub struct Material {
    /// Decoder names these `"{MaterialId}-{Name}"`
    pub name: String,

    /// Diffuse color (RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Opacity (0=transparent, 1=opaque)
    pub opacity: f32,

    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
    pub specular_texture: Option<String>,

    pub blend: BlendMethod,
    pub alpha: AlphaSource,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::splat(0.8),
            opacity: 1.0,
            diffuse_texture: None,
            normal_texture: None,
            specular_texture: None,
            blend: BlendMethod::Opaque,
            alpha: AlphaSource::Opaque,
        }
    }
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether this slot belongs to sub-meshes of `material_id`.
    pub fn is_bound_to(&self, material_id: i32) -> bool {
        self.name
            .strip_prefix(&material_id.to_string())
            .is_some_and(|rest| rest.starts_with('-'))
    }

    fn from_obj(material: &tobj::Material) -> Self {
        Self {
            name: material.name.clone(),
            diffuse_color: material.diffuse.map(Vec3::from).unwrap_or(Vec3::splat(0.8)),
            opacity: material.dissolve.unwrap_or(1.0),
            diffuse_texture: material.diffuse_texture.clone(),
            normal_texture: material.normal_texture.clone(),
            specular_texture: material.specular_texture.clone(),
            ..Default::default()
        }
    }
}

/// One object in a [`MemoryGraph`].
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: String,
    pub parent: Option<ObjectId>,
    /// Transform relative to the parent
    pub local: Mat4,
    pub mesh: Option<Arc<Mesh>>,
    /// Indices into [`MemoryGraph::materials`], parallel to the mesh's OBJ materials
    pub material_slots: Vec<usize>,
}

impl SceneObject {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parent: None,
            local: Mat4::IDENTITY,
            mesh: None,
            material_slots: Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.mesh.is_none()
    }
}

/// Progress signal received by a [`MemoryGraph`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressEvent {
    Begin { min: f32, max: f32 },
    Update(f32),
    End,
}

/// Vertex data totals over the mesh objects of a [`MemoryGraph`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexStats {
    pub vertices: usize,
    pub triangles: usize,
    /// Meshes whose OBJ carried a normal for every vertex
    pub with_normals: usize,
    /// Meshes whose OBJ carried texture coordinates for every vertex
    pub with_uvs: usize,
}

/// In-memory scene graph.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    objects: Vec<SceneObject>,
    materials: Vec<Material>,
    material_lookup: HashMap<String, usize>,
    progress: Vec<ProgressEvent>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    fn object_mut(&mut self, id: ObjectId) -> GraphResult<&mut SceneObject> {
        self.objects.get_mut(id.0).ok_or(GraphError::UnknownObject(id))
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.objects.iter().filter(|o| !o.is_placeholder()).count()
    }

    pub fn placeholder_count(&self) -> usize {
        self.objects.iter().filter(|o| o.is_placeholder()).count()
    }

    /// First object named `name`.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects().find(|(_, o)| o.name == name).map(|(id, _)| id)
    }

    pub fn roots(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects()
            .filter(|(_, o)| o.parent.is_none())
            .map(|(id, _)| id)
    }

    pub fn children_of(&self, parent: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects()
            .filter(move |(_, o)| o.parent == Some(parent))
            .map(|(id, _)| id)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.material_lookup.get(name).map(|&i| &self.materials[i])
    }

    pub fn progress_events(&self) -> &[ProgressEvent] {
        &self.progress
    }

    /// Object-to-world transform, composing the parent chain.
    pub fn world_transform(&self, id: ObjectId) -> Option<Mat4> {
        let mut object = self.object(id)?;
        let mut world = object.local;
        while let Some(parent) = object.parent {
            object = self.object(parent)?;
            world = object.local * world;
        }
        Some(world)
    }

    pub fn total_triangle_count(&self) -> usize {
        self.objects
            .iter()
            .filter_map(|o| o.mesh.as_ref())
            .map(|mesh| mesh.triangle_count())
            .sum()
    }

    pub fn vertex_stats(&self) -> VertexStats {
        self.objects
            .iter()
            .filter_map(|o| o.mesh.as_deref())
            .fold(VertexStats::default(), |mut stats, mesh| {
                stats.vertices += mesh.vertex_count();
                stats.triangles += mesh.triangle_count();
                stats.with_normals += usize::from(mesh.normals.is_some());
                stats.with_uvs += usize::from(mesh.uvs.is_some());
                stats
            })
    }

    /// World-space bounds of every mesh object.
    pub fn world_bounds(&self) -> Bounds {
        let mut bounds = Bounds::EMPTY;
        for (id, object) in self.objects() {
            let (Some(mesh), Some(matrix)) = (&object.mesh, self.world_transform(id)) else {
                continue;
            };
            if mesh.bounds.is_empty() {
                continue;
            }
            let (min, max) = (mesh.bounds.min, mesh.bounds.max);
            for corner in 0..8 {
                let point = Vec3::new(
                    if corner & 1 == 0 { min.x } else { max.x },
                    if corner & 2 == 0 { min.y } else { max.y },
                    if corner & 4 == 0 { min.z } else { max.z },
                );
                bounds = bounds.extended(matrix.transform_point3(point));
            }
        }
        bounds
    }

    fn intern_material(&mut self, material: &tobj::Material) -> usize {
        if let Some(&index) = self.material_lookup.get(&material.name) {
            return index;
        }
        let index = self.materials.len();
        self.materials.push(Material::from_obj(material));
        self.material_lookup.insert(material.name.clone(), index);
        index
    }

    fn is_ancestor(&self, ancestor: ObjectId, mut of: ObjectId) -> bool {
        loop {
            if of == ancestor {
                return true;
            }
            match self.object(of).and_then(|o| o.parent) {
                Some(parent) => of = parent,
                None => return false,
            }
        }
    }
}

impl ProgressSink for MemoryGraph {
    fn progress_begin(&mut self, min: f32, max: f32) {
        self.progress.push(ProgressEvent::Begin { min, max });
    }

    fn progress_update(&mut self, value: f32) {
        self.progress.push(ProgressEvent::Update(value));
    }

    fn progress_end(&mut self) {
        self.progress.push(ProgressEvent::End);
    }
}

impl SceneGraph for MemoryGraph {
    fn create_empty(&mut self, name: &str) -> GraphResult<ObjectId> {
        let id = ObjectId(self.objects.len());
        self.objects.push(SceneObject::new(name));
        Ok(id)
    }

    fn import_obj(&mut self, path: &Path, name: &str) -> GraphResult<Option<ObjectId>> {
        let Some(ObjImport { mesh, materials }) = Mesh::from_obj(path)? else {
            return Ok(None);
        };

        let material_slots = materials.iter().map(|m| self.intern_material(m)).collect();
        let id = ObjectId(self.objects.len());
        self.objects.push(SceneObject {
            mesh: Some(Arc::new(mesh)),
            material_slots,
            ..SceneObject::new(name)
        });
        Ok(Some(id))
    }

    fn set_parent(&mut self, child: ObjectId, parent: ObjectId) -> GraphResult<()> {
        self.object(parent).ok_or(GraphError::UnknownObject(parent))?;
        if self.is_ancestor(child, parent) {
            return Err(GraphError::Cycle { child, parent });
        }
        self.object_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn set_local_transform(&mut self, object: ObjectId, transform: Mat4) -> GraphResult<()> {
        self.object_mut(object)?.local = transform;
        Ok(())
    }

    fn apply_blend_setup(
        &mut self,
        object: ObjectId,
        material_id: i32,
        setup: &BlendSetup,
    ) -> GraphResult<()> {
        let slots = self.object_mut(object)?.material_slots.clone();
        for slot in slots {
            let material = &mut self.materials[slot];
            if material.is_bound_to(material_id) && material.diffuse_texture.is_some() {
                material.blend = setup.method;
                material.alpha = setup.alpha;
            }
        }
        Ok(())
    }
}
