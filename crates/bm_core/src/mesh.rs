//! Triangle mesh geometry loaded from decoder-written OBJ files.
//!
//! The decoder writes one OBJ per model, with one OBJ object per kept
//! sub-mesh. They are merged into a single [`Mesh`] whose [`MeshPart`]s keep
//! the per-sub-mesh index ranges and material bindings.

use std::ops::Range;
use std::path::Path;

use bm_math::{Bounds, Vec3};
use thiserror::Error;

/// Errors that can occur while loading mesh geometry.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("OBJ load error: {0}")]
    Obj(#[from] tobj::LoadError),
}

pub type MeshResult<T> = Result<T, MeshError>;

/// A run of triangles sharing one material.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshPart {
    /// OBJ object name
    pub name: String,
    /// Index into the materials loaded alongside the mesh
    pub material: Option<usize>,
    /// Range into [`Mesh::indices`]
    pub indices: Range<usize>,
}

/// Geometry plus the OBJ materials it references.
#[derive(Clone, Debug)]
pub struct ObjImport {
    pub mesh: Mesh,
    pub materials: Vec<tobj::Material>,
}

/// Indexed triangle mesh.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,

    /// Per-vertex normals, when every OBJ object carries them
    pub normals: Option<Vec<Vec3>>,

    /// Per-vertex texture coordinates, when every OBJ object carries them
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    pub bounds: Bounds,

    pub parts: Vec<MeshPart>,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Bounds::from_points(&positions);
        let part = MeshPart {
            name: String::new(),
            material: None,
            indices: 0..indices.len(),
        };
        Self {
            positions,
            normals: None,
            uvs: None,
            indices,
            bounds,
            parts: vec![part],
        }
    }

    /// Load an OBJ file, merging all of its objects.
    ///
    /// Returns `Ok(None)` when the file holds no geometry. A missing or
    /// broken material library is logged and the geometry is kept.
    pub fn from_obj<P: AsRef<Path>>(path: P) -> MeshResult<Option<ObjImport>> {
        let path = path.as_ref();
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )?;

        let materials = materials.unwrap_or_else(|e| {
            log::warn!("No materials for {}: {}", path.display(), e);
            Vec::new()
        });

        let mut positions = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();
        let mut indices = Vec::new();
        let mut parts = Vec::with_capacity(models.len());
        let mut complete_normals = true;
        let mut complete_uvs = true;

        for model in &models {
            let m = &model.mesh;
            let base = positions.len() as u32;
            let vertex_count = m.positions.len() / 3;

            positions.extend(m.positions.chunks_exact(3).map(Vec3::from_slice));

            if m.normals.len() == m.positions.len() {
                normals.extend(m.normals.chunks_exact(3).map(Vec3::from_slice));
            } else {
                complete_normals = false;
            }
            if m.texcoords.len() / 2 == vertex_count {
                uvs.extend(m.texcoords.chunks_exact(2).map(|uv| [uv[0], uv[1]]));
            } else {
                complete_uvs = false;
            }

            let start = indices.len();
            indices.extend(m.indices.iter().map(|&i| base + i));
            parts.push(MeshPart {
                name: model.name.clone(),
                material: m.material_id,
                indices: start..indices.len(),
            });
        }

        if positions.is_empty() {
            return Ok(None);
        }

        let bounds = Bounds::from_points(&positions);
        let has_normals = complete_normals && !normals.is_empty();
        let has_uvs = complete_uvs && !uvs.is_empty();
        let mesh = Self {
            positions,
            normals: has_normals.then_some(normals),
            uvs: has_uvs.then_some(uvs),
            indices,
            bounds,
            parts,
        };

        log::debug!(
            "Loaded {}: {} vertices, {} triangles, {} part(s)",
            path.display(),
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.parts.len()
        );

        Ok(Some(ObjImport { mesh, materials }))
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bm_mesh_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const TWO_PARTS: &str = "\
mtllib parts.mtl
o 0
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl 3-floor
f 1/1 2/2 3/3 4/4
o 1
v 0 0 1
v 1 0 1
v 0 1 1
vt 0 0
vt 1 0
vt 0 1
usemtl 5-glass
f 5/5 6/6 7/7
";

    const PARTS_MTL: &str = "\
newmtl 3-floor
Kd 0.8 0.8 0.8
map_Kd Textures/floor.tga
newmtl 5-glass
Kd 1 1 1
d 0.5
";

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.parts.len(), 1);
        assert_eq!(mesh.bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_load_obj_normals() {
        let dir = scratch_dir("normals");
        fs::write(
            dir.join("lit.obj"),
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n",
        )
        .unwrap();

        let mesh = Mesh::from_obj(dir.join("lit.obj")).unwrap().unwrap().mesh;
        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), mesh.vertex_count());
        assert!(normals.iter().all(|n| *n == Vec3::Z));
        assert!(mesh.uvs.is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_obj_parts() {
        let dir = scratch_dir("parts");
        fs::write(dir.join("parts.obj"), TWO_PARTS).unwrap();
        fs::write(dir.join("parts.mtl"), PARTS_MTL).unwrap();

        let ObjImport { mesh, materials } = Mesh::from_obj(dir.join("parts.obj")).unwrap().unwrap();

        // Quad is triangulated
        assert_eq!(mesh.triangle_count(), 3);
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.parts.len(), 2);
        assert_eq!(mesh.parts[0].indices, 0..6);
        assert_eq!(mesh.parts[1].indices, 6..9);
        assert_eq!(mesh.uvs.as_ref().map(Vec::len), Some(7));
        // No vn records
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.bounds.min, Vec3::ZERO);
        assert_eq!(mesh.bounds.max, Vec3::ONE);

        assert_eq!(materials.len(), 2);
        let floor = mesh.parts[0].material.map(|i| &materials[i]).unwrap();
        assert_eq!(floor.name, "3-floor");
        assert_eq!(floor.diffuse_texture.as_deref(), Some("Textures/floor.tga"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_obj_without_mtl() {
        let dir = scratch_dir("no_mtl");
        fs::write(dir.join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let import = Mesh::from_obj(dir.join("tri.obj")).unwrap().unwrap();
        assert!(import.materials.is_empty());
        assert_eq!(import.mesh.triangle_count(), 1);
        assert!(import.mesh.uvs.is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_empty_obj() {
        let dir = scratch_dir("empty");
        fs::write(dir.join("empty.obj"), "# nothing\n").unwrap();
        assert!(Mesh::from_obj(dir.join("empty.obj")).unwrap().is_none());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_obj_is_error() {
        let result = Mesh::from_obj(std::env::temp_dir().join("bm_mesh_does_not_exist.obj"));
        assert!(matches!(result, Err(MeshError::Obj(_))));
    }
}
