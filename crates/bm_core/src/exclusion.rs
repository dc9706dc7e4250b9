//! Node and sub-mesh exclusion rules.
//!
//! Everything here is pure: a node (or sub-mesh) plus [`ImportSettings`]
//! goes in, a verdict comes out. Rules are evaluated in a fixed order and the
//! first match is reported as the reason; the include/exclude outcome does
//! not depend on that order.

use std::fmt;

use crate::config::ImportSettings;
use crate::scene::{SceneNode, SubMesh};

/// Display-name fragments that mark a dynamic subtree.
const DYNAMIC_CONTAINERS: [&str; 2] = ["includes.", "equipment."];

/// Why a whole node was rejected by the node-level rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeExclusion {
    BoundingBox,
    Fog,
    Dust,
    Glow,
    Cover,
    Shadow,
}

/// Why a single sub-mesh was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubMeshExclusion {
    InvalidTexture,
    Collision,
    Dynamic,
    Overlay,
    Fog,
    Dust,
    Glow,
}

/// Why a node ended up as an empty placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderReason {
    /// The node has no mesh list at all
    NoGeometry,
    /// The node sits inside a dynamic subtree
    Meshless,
    /// A node-level rule fired
    Node(NodeExclusion),
    /// Every sub-mesh was excluded (or the mesh list is empty)
    AllSubMeshesExcluded,
    /// The node has meshes but the decoder gave it no model id
    MissingModelId,
}

impl fmt::Display for NodeExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeExclusion::BoundingBox => "bounding box",
            NodeExclusion::Fog => "fog",
            NodeExclusion::Dust => "dust",
            NodeExclusion::Glow => "glow",
            NodeExclusion::Cover => "cover",
            NodeExclusion::Shadow => "shadow",
        };
        f.write_str(s)
    }
}

impl fmt::Display for SubMeshExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubMeshExclusion::InvalidTexture => "invalid texture",
            SubMeshExclusion::Collision => "collision",
            SubMeshExclusion::Dynamic => "dynamic",
            SubMeshExclusion::Overlay => "overlay",
            SubMeshExclusion::Fog => "fog",
            SubMeshExclusion::Dust => "dust",
            SubMeshExclusion::Glow => "glow",
        };
        f.write_str(s)
    }
}

impl fmt::Display for PlaceholderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderReason::NoGeometry => f.write_str("no geometry"),
            PlaceholderReason::Meshless => f.write_str("inside dynamic subtree"),
            PlaceholderReason::Node(reason) => write!(f, "{} node", reason),
            PlaceholderReason::AllSubMeshesExcluded => f.write_str("all sub-meshes excluded"),
            PlaceholderReason::MissingModelId => f.write_str("missing model id"),
        }
    }
}

/// Outcome of classifying one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Materialize the node's model without the listed sub-mesh indices.
    Materialize { model_id: i32, excluded: Vec<u32> },
    /// Create an empty placeholder instead.
    Placeholder(PlaceholderReason),
}

impl Verdict {
    pub fn is_materialized(&self) -> bool {
        matches!(self, Verdict::Materialize { .. })
    }
}

/// Whether `display_name` opens a dynamic subtree.
///
/// Matched against the display name as-is; the fragments are lowercase in
/// shipped levels.
pub fn is_dynamic_container(display_name: &str, settings: &ImportSettings) -> bool {
    settings.exclude_dynamic
        && DYNAMIC_CONTAINERS
            .iter()
            .any(|fragment| display_name.contains(fragment))
}

/// Node-level rules, matched case-insensitively on display name and type.
pub fn classify_node(
    display_name: &str,
    type_name: &str,
    settings: &ImportSettings,
) -> Option<NodeExclusion> {
    let name = display_name.to_lowercase();
    let type_name = type_name.to_lowercase();

    if settings.exclude_bbox && type_name == "zbound" {
        return Some(NodeExclusion::BoundingBox);
    }
    if settings.exclude_fog && name.contains("fog") {
        return Some(NodeExclusion::Fog);
    }
    if settings.exclude_dust && name.contains("dust_") {
        return Some(NodeExclusion::Dust);
    }
    if settings.exclude_glow && name.contains("glow") {
        return Some(NodeExclusion::Glow);
    }
    if settings.exclude_cover && name.contains("_cover_") {
        return Some(NodeExclusion::Cover);
    }
    if settings.exclude_shadow && type_name == "zshadowmeshobj" {
        return Some(NodeExclusion::Shadow);
    }
    None
}

/// Sub-mesh rules, matched case-insensitively on material and texture paths.
pub fn classify_sub_mesh(mesh: &SubMesh, settings: &ImportSettings) -> Option<SubMeshExclusion> {
    let lower = |s: &Option<String>| s.as_deref().unwrap_or_default().to_lowercase();
    let material_path = lower(&mesh.material_path);
    let material_file = lower(&mesh.material_file);
    let either = |fragment: &str| material_path.contains(fragment) || material_file.contains(fragment);

    if settings.exclude_textures && mesh.diffuse_id <= 0 {
        return Some(SubMeshExclusion::InvalidTexture);
    }
    if settings.exclude_collision {
        let diffuse_test = mesh
            .diffuse_path
            .as_deref()
            .is_some_and(|path| path.to_lowercase().contains("_test"));
        if material_path.contains("_glacier") || material_path.contains("_test") || diffuse_test {
            return Some(SubMeshExclusion::Collision);
        }
    }
    if settings.exclude_dynamic && material_path.contains("dynamic") {
        return Some(SubMeshExclusion::Dynamic);
    }
    if settings.exclude_overlay && material_path.contains("screens") {
        return Some(SubMeshExclusion::Overlay);
    }
    if settings.exclude_fog && either("fog") {
        return Some(SubMeshExclusion::Fog);
    }
    if settings.exclude_dust && either("dust_") {
        return Some(SubMeshExclusion::Dust);
    }
    if settings.exclude_glow && either("glow") {
        return Some(SubMeshExclusion::Glow);
    }
    None
}

/// Classify a node visited during traversal.
///
/// `meshless` is the dynamic-subtree flag inherited from (or opened by) the
/// node; when set, geometry is never materialized.
pub fn classify(node: &SceneNode, settings: &ImportSettings, meshless: bool) -> Verdict {
    let Some(meshes) = node.meshes.as_deref() else {
        return Verdict::Placeholder(PlaceholderReason::NoGeometry);
    };
    if meshless {
        return Verdict::Placeholder(PlaceholderReason::Meshless);
    }
    if let Some(reason) = classify_node(&node.display_name(), &node.type_name, settings) {
        return Verdict::Placeholder(PlaceholderReason::Node(reason));
    }

    let mut excluded = Vec::new();
    for (index, mesh) in meshes.iter().enumerate() {
        if let Some(reason) = classify_sub_mesh(mesh, settings) {
            log::trace!("{}: sub-mesh {} excluded ({})", node.display_name(), index, reason);
            excluded.push(index as u32);
        }
    }

    if excluded.len() == meshes.len() {
        return Verdict::Placeholder(PlaceholderReason::AllSubMeshesExcluded);
    }

    match node.model_id {
        Some(model_id) => Verdict::Materialize { model_id, excluded },
        None => Verdict::Placeholder(PlaceholderReason::MissingModelId),
    }
}
