//! Decoded scene description.
//!
//! The native decoder emits the level as a flat JSON array of scene nodes
//! (`{"Scene": [...]}`). Nodes reference each other by array position
//! (`Index`); geometry-owning nodes carry a model id and a list of sub-meshes.
//! These types mirror that document so it can be read with `serde_json`.

use bm_math::{basis_remap, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Maximum length of an object name in the target scene graph.
pub const DISPLAY_NAME_LIMIT: usize = 63;

fn absent_texture() -> i32 {
    -1
}

/// An `{X, Y, Z}` float record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisTriple {
    #[serde(rename = "X", default)]
    pub x: f32,
    #[serde(rename = "Y", default)]
    pub y: f32,
    #[serde(rename = "Z", default)]
    pub z: f32,
}

impl AxisTriple {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A node's rotation as three basis axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(rename = "X Axis")]
    pub x_axis: AxisTriple,
    #[serde(rename = "Y Axis")]
    pub y_axis: AxisTriple,
    #[serde(rename = "Z Axis")]
    pub z_axis: AxisTriple,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            x_axis: AxisTriple::new(1.0, 0.0, 0.0),
            y_axis: AxisTriple::new(0.0, 1.0, 0.0),
            z_axis: AxisTriple::new(0.0, 0.0, 1.0),
        }
    }
}

/// Reference from a node to one of its children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    #[serde(rename = "Index")]
    pub index: u32,
    #[serde(rename = "Name", default)]
    pub name: String,
}

/// Texture channels a sub-mesh can reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Normal,
    Specular,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 3] = [TextureSlot::Diffuse, TextureSlot::Normal, TextureSlot::Specular];
}

/// A texture referenced by a sub-mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureRef<'a> {
    pub slot: TextureSlot,
    /// Texture id, `-1` when the slot is unused
    pub id: i32,
    /// Directory relative to the map output directory
    pub path: Option<&'a str>,
    pub file: Option<&'a str>,
}

impl TextureRef<'_> {
    /// Whether the decoder can be asked to write this texture.
    pub fn is_emittable(&self) -> bool {
        self.id > -1 && self.path.is_some() && self.file.is_some()
    }
}

/// One geometry + material binding within a node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubMesh {
    #[serde(rename = "LOD", default, skip_serializing_if = "Option::is_none")]
    pub lod: Option<i64>,

    #[serde(rename = "Material Id", default)]
    pub material_id: i32,

    #[serde(rename = "Material Path", default, skip_serializing_if = "Option::is_none")]
    pub material_path: Option<String>,
    #[serde(rename = "Material File", default, skip_serializing_if = "Option::is_none")]
    pub material_file: Option<String>,

    #[serde(rename = "Diffuse Path", default, skip_serializing_if = "Option::is_none")]
    pub diffuse_path: Option<String>,
    #[serde(rename = "Diffuse File", default, skip_serializing_if = "Option::is_none")]
    pub diffuse_file: Option<String>,
    #[serde(rename = "Normal Path", default, skip_serializing_if = "Option::is_none")]
    pub normal_path: Option<String>,
    #[serde(rename = "Normal File", default, skip_serializing_if = "Option::is_none")]
    pub normal_file: Option<String>,
    #[serde(rename = "Specular Path", default, skip_serializing_if = "Option::is_none")]
    pub specular_path: Option<String>,
    #[serde(rename = "Specular File", default, skip_serializing_if = "Option::is_none")]
    pub specular_file: Option<String>,

    #[serde(rename = "Diffuse Id", default = "absent_texture")]
    pub diffuse_id: i32,
    #[serde(rename = "Normal Id", default = "absent_texture")]
    pub normal_id: i32,
    #[serde(rename = "Specular Id", default = "absent_texture")]
    pub specular_id: i32,
}

impl SubMesh {
    /// The texture bound to `slot`.
    pub fn texture(&self, slot: TextureSlot) -> TextureRef<'_> {
        let (id, path, file) = match slot {
            TextureSlot::Diffuse => (self.diffuse_id, &self.diffuse_path, &self.diffuse_file),
            TextureSlot::Normal => (self.normal_id, &self.normal_path, &self.normal_file),
            TextureSlot::Specular => (self.specular_id, &self.specular_path, &self.specular_file),
        };
        TextureRef {
            slot,
            id,
            path: path.as_deref(),
            file: file.as_deref(),
        }
    }

    /// All three texture slots in diffuse, normal, specular order.
    pub fn textures(&self) -> impl Iterator<Item = TextureRef<'_>> {
        TextureSlot::ALL.into_iter().map(move |slot| self.texture(slot))
    }
}

/// One entry of the flat scene array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    #[serde(rename = "Index")]
    pub index: u32,

    #[serde(rename = "Name", default)]
    pub name: String,

    /// Display name of the parent; `None` only for the scene root
    #[serde(rename = "Parent", default)]
    pub parent: Option<String>,

    #[serde(rename = "Type", default)]
    pub type_name: String,

    #[serde(rename = "Model Id", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<i32>,

    #[serde(rename = "Meshes", default, skip_serializing_if = "Option::is_none")]
    pub meshes: Option<Vec<SubMesh>>,

    #[serde(rename = "Children", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ChildRef>>,

    #[serde(rename = "Rotation", default)]
    pub rotation: Rotation,

    #[serde(rename = "Position", default)]
    pub position: AxisTriple,
}

impl SceneNode {
    /// Name used for the imported object: `"{Index} - {Name}"`, cut to
    /// [`DISPLAY_NAME_LIMIT`] characters.
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.index, self.name)
            .chars()
            .take(DISPLAY_NAME_LIMIT)
            .collect()
    }

    /// Whether the node carries a mesh list (it may still be empty).
    pub fn owns_meshes(&self) -> bool {
        self.meshes.is_some()
    }

    pub fn meshes(&self) -> &[SubMesh] {
        self.meshes.as_deref().unwrap_or_default()
    }

    pub fn children(&self) -> &[ChildRef] {
        self.children.as_deref().unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Local transform built from the node's rotation and position.
    pub fn local_transform(&self) -> Mat4 {
        basis_remap(
            self.rotation.x_axis.to_vec3(),
            self.rotation.y_axis.to_vec3(),
            self.rotation.z_axis.to_vec3(),
            self.position.to_vec3(),
        )
    }
}

/// The decoded scene: a flat array addressed by node index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(rename = "Scene", default)]
    pub nodes: Vec<SceneNode>,
}

impl SceneDocument {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Node at array position `index`.
    pub fn get(&self, index: u32) -> Option<&SceneNode> {
        self.nodes.get(index as usize)
    }

    /// The first node without a parent.
    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.iter().find(|node| node.is_root())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
