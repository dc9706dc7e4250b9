// Transform construction for decoded scene nodes.
//
// The decoder hands out a rotation basis and a position per node. Both the
// per-node transform and the whole-scene correction are laid out as four
// column-major records, so in glam terms each record is a column.

use glam::{Mat4, Vec3, Vec4};

/// Uniform scale applied to the scene root (game units are centimetres).
pub const SCENE_UNIT_SCALE: f32 = 0.01;

/// Build a node's local transform from its rotation axes and position.
///
/// The records are emitted Z axis first, then Y, then X, followed by the
/// position. No orthonormality check is made; malformed bases pass through.
pub fn basis_remap(x_axis: Vec3, y_axis: Vec3, z_axis: Vec3, position: Vec3) -> Mat4 {
    Mat4::from_cols(
        z_axis.extend(0.0),
        y_axis.extend(0.0),
        x_axis.extend(0.0),
        position.extend(1.0),
    )
}

/// The fixed correction applied to the scene root after import.
///
/// Scales by [`SCENE_UNIT_SCALE`], negates X and swaps Y/Z so that the
/// game's Y-up space lands in a Z-up scene.
pub fn scene_root_correction() -> Mat4 {
    let s = SCENE_UNIT_SCALE;
    Mat4::from_cols(
        Vec4::new(-s, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, s, 0.0),
        Vec4::new(0.0, -s, 0.0, 0.0),
        Vec4::W,
    )
}
