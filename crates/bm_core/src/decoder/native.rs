//! Native decoder - Rust FFI wrapper.
//!
//! Safe bindings to the two native libraries shipped with the tools:
//!
//! - `bmexport`: decodes the level sections into scene/material JSON and
//!   writes OBJ files
//! - `glaciertex`: decodes the packed texture section and writes TGA files
//!
//! Both libraries keep their decoded state in process globals, so only one
//! [`NativeDecoder`] may be alive at a time.
//!
//! # Example
//!
//! ```ignore
//! use bm_core::decoder::NativeDecoder;
//!
//! let mut decoder = NativeDecoder::acquire()?;
//! let map = bm_core::load_map(&mut decoder, "M01.zip".as_ref(), &config)?;
//! ```

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::marker::PhantomData;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::atomic::{AtomicBool, Ordering};

use super::{model_path, DecodeError, DecodeResult, DecodedArchive, Decoder};
use crate::archive::{ArchiveSections, SectionKind};

// ============================================================================
// FFI Declarations
// ============================================================================

#[link(name = "bmexport")]
extern "C" {
    fn LoadData(
        buf_data: *const c_char,
        buf_data_size: u32,
        gms_data: *const c_char,
        gms_data_size: u32,
        mat_data: *const c_char,
        mat_data_size: u32,
        prm_data: *const c_char,
        prm_data_size: u32,
        prp_data: *const c_char,
        prp_data_size: u32,
        tex_data: *const c_char,
        tex_data_size: u32,
        tex_json: *const c_char,
        tex_json_size: u32,
    ) -> c_int;

    fn GetSceneJson() -> *const c_char;

    fn GetMaterialJson() -> *const c_char;

    fn WriteObj(
        output_path: *const c_char,
        primitive_id: u32,
        sub_meshes: *const u32,
        sub_meshes_count: u32,
    ) -> c_int;
}

// bmexport also exports a `FreeJson`; it only clears a reused string and is
// never needed here, so only the glaciertex symbol is bound.
#[link(name = "glaciertex")]
extern "C" {
    fn LoadTex(buffer: *const c_void, size: u32) -> *const c_char;

    fn FreeJson() -> c_int;

    fn WriteTga(dir: *const c_char, file: *const c_char, texture_id: i32) -> c_int;
}

static IN_USE: AtomicBool = AtomicBool::new(false);

/// Longest texture table read back from `LoadTex`.
const MAX_TEXTURE_JSON: usize = 64 << 20;

// ============================================================================
// NativeDecoder - Safe Wrapper
// ============================================================================

/// Exclusive handle to the native decoder libraries.
///
/// Released when dropped. Not `Send`: the libraries are not thread-safe.
pub struct NativeDecoder {
    _not_send: PhantomData<*const ()>,
}

impl NativeDecoder {
    /// Take the process-wide decoder handle.
    pub fn acquire() -> DecodeResult<Self> {
        IN_USE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DecodeError::Busy)?;
        Ok(Self {
            _not_send: PhantomData,
        })
    }

    fn section_len(data: &[u8]) -> DecodeResult<u32> {
        u32::try_from(data.len()).map_err(|_| DecodeError::SectionTooLarge(data.len()))
    }

    fn c_string(value: &str) -> DecodeResult<CString> {
        CString::new(value).map_err(|_| DecodeError::InvalidArgument(value.to_string()))
    }

    fn c_path(path: &Path) -> DecodeResult<CString> {
        let s = path
            .to_str()
            .ok_or_else(|| DecodeError::InvalidArgument(path.display().to_string()))?;
        Self::c_string(s)
    }

    /// Copy the texture table returned by `LoadTex`.
    ///
    /// The table is a flat `{"id": "file", ...}` object in a buffer sized to
    /// its exact length, with no NUL terminator. Bytes are read one at a time
    /// up to and including the first `}`; nothing past it is touched. A NUL
    /// before that point ends the read early.
    ///
    /// # Safety
    /// `ptr` must be non-null and every byte up to the first `}` or NUL, at
    /// most [`MAX_TEXTURE_JSON`] bytes, must be readable.
    unsafe fn read_texture_table(ptr: *const c_char) -> DecodeResult<String> {
        let mut bytes = Vec::new();
        let mut opened = false;
        for offset in 0..MAX_TEXTURE_JSON {
            let byte = *ptr.add(offset) as u8;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
            opened |= byte == b'{';
            if opened && byte == b'}' {
                return Ok(String::from_utf8_lossy(&bytes).into_owned());
            }
        }
        Err(DecodeError::NoJsonObject)
    }

    /// Copy a JSON string owned by the library.
    ///
    /// # Safety
    /// `ptr` must be null or point to a NUL-terminated string that stays
    /// valid for the duration of the call.
    unsafe fn read_json(ptr: *const c_char, operation: &'static str) -> DecodeResult<serde_json::Value> {
        if ptr.is_null() {
            return Err(DecodeError::NullPointer(operation));
        }
        let text = CStr::from_ptr(ptr).to_string_lossy();
        Ok(serde_json::from_str(&text)?)
    }
}

impl Drop for NativeDecoder {
    fn drop(&mut self) {
        IN_USE.store(false, Ordering::Release);
    }
}

impl Decoder for NativeDecoder {
    fn decode_textures(&mut self, tex: &[u8]) -> DecodeResult<String> {
        let size = Self::section_len(tex)?;
        // Safety: LoadTex returns null or a buffer that ends with the table's
        // closing brace; it stays valid until FreeJson.
        unsafe {
            let ptr = LoadTex(tex.as_ptr().cast(), size);
            if ptr.is_null() {
                return Err(DecodeError::NullPointer("LoadTex"));
            }
            let text = Self::read_texture_table(ptr);
            FreeJson();
            text
        }
    }

    fn decode_archive(
        &mut self,
        sections: &ArchiveSections,
        texture_json: &str,
    ) -> DecodeResult<DecodedArchive> {
        let buffer = |kind: SectionKind| -> DecodeResult<(*const c_char, u32)> {
            let data = sections.get(kind);
            Ok((data.as_ptr().cast(), Self::section_len(data)?))
        };
        let (buf, buf_len) = buffer(SectionKind::Buf)?;
        let (gms, gms_len) = buffer(SectionKind::Gms)?;
        let (mat, mat_len) = buffer(SectionKind::Mat)?;
        let (prm, prm_len) = buffer(SectionKind::Prm)?;
        let (prp, prp_len) = buffer(SectionKind::Prp)?;
        let (tex, tex_len) = buffer(SectionKind::Tex)?;
        let tex_json_len = Self::section_len(texture_json.as_bytes())?;

        let status = unsafe {
            LoadData(
                buf,
                buf_len,
                gms,
                gms_len,
                mat,
                mat_len,
                prm,
                prm_len,
                prp,
                prp_len,
                tex,
                tex_len,
                texture_json.as_ptr().cast(),
                tex_json_len,
            )
        };
        if status != 0 {
            return Err(DecodeError::Failed {
                operation: "LoadData",
                status,
            });
        }

        // Each getter reuses one library-side string, so copy before the next call
        let scene = unsafe { Self::read_json(GetSceneJson(), "GetSceneJson")? };
        let materials = unsafe { Self::read_json(GetMaterialJson(), "GetMaterialJson")? };

        Ok(DecodedArchive { scene, materials })
    }

    fn materialize_model(
        &mut self,
        map_dir: &Path,
        model_id: i32,
        excluded: &[u32],
    ) -> DecodeResult<PathBuf> {
        let primitive_id = u32::try_from(model_id)
            .map_err(|_| DecodeError::InvalidArgument(format!("model id {model_id}")))?;
        let count = u32::try_from(excluded.len())
            .map_err(|_| DecodeError::SectionTooLarge(excluded.len()))?;

        // The library appends "Models/<id>.obj" to the directory verbatim
        let mut dir = map_dir
            .to_str()
            .ok_or_else(|| DecodeError::InvalidArgument(map_dir.display().to_string()))?
            .to_string();
        if !dir.ends_with(MAIN_SEPARATOR) {
            dir.push(MAIN_SEPARATOR);
        }
        let c_dir = Self::c_string(&dir)?;

        let status = unsafe { WriteObj(c_dir.as_ptr(), primitive_id, excluded.as_ptr(), count) };
        if status != 0 {
            return Err(DecodeError::Failed {
                operation: "WriteObj",
                status,
            });
        }

        Ok(model_path(map_dir, model_id))
    }

    fn emit_texture(&mut self, dir: &Path, file: &str, texture_id: i32) -> DecodeResult<bool> {
        let c_dir = Self::c_path(dir)?;
        let c_file = Self::c_string(file)?;
        let written = unsafe { WriteTga(c_dir.as_ptr(), c_file.as_ptr(), texture_id) };
        Ok(written == 1)
    }
}

// ============================================================================
// Tests
// ============================================================================
