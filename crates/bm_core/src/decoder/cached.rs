//! Replay decoder backed by a previous import's output directory.

use std::fs;
use std::path::{Path, PathBuf};

use super::{model_path, DecodeError, DecodeResult, DecodedArchive, Decoder};
use crate::archive::ArchiveSections;

/// File names of the persisted decoder documents.
pub const SCENE_FILE: &str = "scene.json";
pub const MATERIAL_FILE: &str = "mat.json";
pub const TEXTURE_FILE: &str = "tex.json";

/// Serves decoder requests from files already written under a map directory.
///
/// Archive and texture decoding return the persisted JSON documents; model
/// requests succeed only when `Models/<id>.obj` exists. The OBJ on disk was
/// written with whatever sub-meshes the earlier run excluded, so exclusion
/// lists passed here are not re-applied.
#[derive(Clone, Debug)]
pub struct CachedDecoder {
    map_dir: PathBuf,
}

impl CachedDecoder {
    pub fn new<P: Into<PathBuf>>(map_dir: P) -> Self {
        Self {
            map_dir: map_dir.into(),
        }
    }

    pub fn map_dir(&self) -> &Path {
        &self.map_dir
    }

    fn read_document(&self, name: &str) -> DecodeResult<serde_json::Value> {
        let text = fs::read_to_string(self.map_dir.join(name))?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl Decoder for CachedDecoder {
    fn decode_textures(&mut self, _tex: &[u8]) -> DecodeResult<String> {
        Ok(fs::read_to_string(self.map_dir.join(TEXTURE_FILE))?)
    }

    fn decode_archive(
        &mut self,
        _sections: &ArchiveSections,
        _texture_json: &str,
    ) -> DecodeResult<DecodedArchive> {
        Ok(DecodedArchive {
            scene: self.read_document(SCENE_FILE)?,
            materials: self.read_document(MATERIAL_FILE)?,
        })
    }

    fn materialize_model(
        &mut self,
        map_dir: &Path,
        model_id: i32,
        excluded: &[u32],
    ) -> DecodeResult<PathBuf> {
        let path = model_path(map_dir, model_id);
        if !path.is_file() {
            return Err(DecodeError::MissingModel(path));
        }
        if !excluded.is_empty() {
            log::debug!(
                "Cached model {} served as written; {} exclusion(s) not re-applied",
                model_id,
                excluded.len()
            );
        }
        Ok(path)
    }

    fn emit_texture(&mut self, dir: &Path, file: &str, _texture_id: i32) -> DecodeResult<bool> {
        Ok(dir.join(file).is_file())
    }
}
