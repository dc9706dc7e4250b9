//! Texture emission bookkeeping.
//!
//! Textures are shared between many sub-meshes across a level. The decoder
//! is asked to write each texture id at most once per import.

use std::collections::HashSet;
use std::path::Path;

use crate::decoder::{DecodeResult, Decoder};
use crate::scene::{SubMesh, TextureRef};

/// Set of texture ids already handed to the decoder during one import.
#[derive(Clone, Debug, Default)]
pub struct TextureTracker {
    emitted: HashSet<i32>,
}

impl TextureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_emitted(&self, texture_id: i32) -> bool {
        self.emitted.contains(&texture_id)
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    /// Textures of `meshes` that still need writing, in mesh order and
    /// diffuse/normal/specular order, without duplicates.
    pub fn pending<'a>(&self, meshes: &'a [SubMesh]) -> Vec<TextureRef<'a>> {
        let mut seen = HashSet::new();
        meshes
            .iter()
            .flat_map(SubMesh::textures)
            .filter(|texture| texture.is_emittable())
            .filter(|texture| !self.is_emitted(texture.id) && seen.insert(texture.id))
            .collect()
    }

    /// Ask the decoder to write every pending texture of `meshes` under
    /// `map_dir`. Returns the number of textures requested.
    ///
    /// A texture the decoder declines is logged and still recorded, so it is
    /// not requested again during this import.
    pub fn emit_pending<D: Decoder + ?Sized>(
        &mut self,
        decoder: &mut D,
        map_dir: &Path,
        meshes: &[SubMesh],
    ) -> DecodeResult<usize> {
        let pending = self.pending(meshes);
        for texture in &pending {
            let (Some(path), Some(file)) = (texture.path, texture.file) else {
                continue;
            };
            let dir = map_dir.join(path);
            if !decoder.emit_texture(&dir, file, texture.id)? {
                log::warn!("Decoder could not write texture {} ({})", texture.id, file);
            }
            self.emitted.insert(texture.id);
        }
        Ok(pending.len())
    }
}
