// Re-export glam for convenience
pub use glam::*;

// Scene math types
mod bounds;
mod transform;
pub use bounds::Bounds;
pub use transform::{basis_remap, scene_root_correction, SCENE_UNIT_SCALE};
