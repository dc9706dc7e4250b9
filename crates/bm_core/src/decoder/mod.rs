//! Decoder gateway.
//!
//! Binary decoding of level sections, OBJ emission and texture extraction
//! live in external native libraries. The import pipeline only sees the
//! narrow [`Decoder`] contract below; implementations decide how to reach the
//! actual decoder.
//!
//! - [`CachedDecoder`] replays the files a previous import left on disk
//! - `NativeDecoder` (feature `native`) calls the `bmexport` and
//!   `glaciertex` libraries over FFI

mod cached;
#[cfg(feature = "native")]
mod native;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::ArchiveSections;

pub use cached::{CachedDecoder, MATERIAL_FILE, SCENE_FILE, TEXTURE_FILE};
#[cfg(feature = "native")]
pub use native::NativeDecoder;

/// Errors reported by a decoder implementation.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Decoder returned a null pointer from {0}")]
    NullPointer(&'static str),

    #[error("Decoder call {operation} failed with status {status}")]
    Failed { operation: &'static str, status: i32 },

    #[error("Decoder output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Decoder output contains no JSON object")]
    NoJsonObject,

    #[error("Path or name cannot be passed to the decoder: {0}")]
    InvalidArgument(String),

    #[error("Section too large for the decoder: {0} bytes")]
    SectionTooLarge(usize),

    #[error("Model file not found: {}", .0.display())]
    MissingModel(PathBuf),

    #[error("The native decoder is already in use")]
    Busy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// JSON documents produced by decoding an archive.
#[derive(Clone, Debug)]
pub struct DecodedArchive {
    /// `{"Scene": [...]}` node array
    pub scene: serde_json::Value,
    /// `{"Entries": [...]}` material instances
    pub materials: serde_json::Value,
}

/// Everything the import pipeline needs from the external decoder.
pub trait Decoder {
    /// Decode the packed texture section into texture metadata JSON.
    ///
    /// The returned text may carry framing around the JSON object; callers
    /// cut it down with [`extract_json_object`].
    fn decode_textures(&mut self, tex: &[u8]) -> DecodeResult<String>;

    /// Decode the archive sections into scene and material documents.
    fn decode_archive(
        &mut self,
        sections: &ArchiveSections,
        texture_json: &str,
    ) -> DecodeResult<DecodedArchive>;

    /// Write `Models/<model_id>.obj` under `map_dir`, leaving out the listed
    /// sub-mesh indices. Returns the written path.
    fn materialize_model(
        &mut self,
        map_dir: &Path,
        model_id: i32,
        excluded: &[u32],
    ) -> DecodeResult<PathBuf>;

    /// Write texture `texture_id` as `dir/file`. `Ok(false)` means the
    /// decoder declined (unknown id or unsupported format).
    fn emit_texture(&mut self, dir: &Path, file: &str, texture_id: i32) -> DecodeResult<bool>;
}

/// Location of the OBJ written for `model_id`.
pub fn model_path(map_dir: &Path, model_id: i32) -> PathBuf {
    map_dir.join("Models").join(format!("{model_id}.obj"))
}

/// Cut decoder output down to the span from the first `{` to the first `}`
/// after it.
///
/// Texture metadata is always a flat `{"id": "file", ...}` object and the
/// decoder buffer may be followed by unrelated bytes, so the object ends at
/// its first closing brace.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = start + text[start..].find('}')?;
    Some(&text[start..=end])
}
