//! BM Core - Blood Money level import.
//!
//! This crate provides:
//!
//! - **Scene model**: the decoded `scene.json` node array and sub-meshes
//! - **Exclusion rules**: which nodes and sub-meshes are skipped on import
//! - **Decoder gateway**: the contract with the native level/texture decoders
//! - **Import pipeline**: archive validation, decoding, and a depth-first
//!   walk that builds the level hierarchy in a [`SceneGraph`]
//!
//! # Example
//!
//! ```ignore
//! use bm_core::{load_map, CachedDecoder, ImportConfig, Importer, MemoryGraph};
//!
//! let config = ImportConfig::load("import.json")?;
//! let mut decoder = CachedDecoder::new("out/M01");
//! let map = load_map(&mut decoder, "M01.zip".as_ref(), &config)?;
//!
//! let mut importer = Importer::new(decoder, MemoryGraph::new(), config.settings);
//! let report = importer.import_map(&map)?;
//! println!("{} objects, {} meshes", report.objects, report.meshes);
//! ```

pub mod archive;
pub mod config;
pub mod decoder;
pub mod exclusion;
pub mod graph;
pub mod importer;
pub mod material;
pub mod mesh;
pub mod progress;
pub mod scene;
pub mod session;
pub mod texture;

// Re-export commonly used types
pub use archive::{ArchiveError, ArchiveSections, SectionKind};
pub use config::{ImportConfig, ImportSettings};
pub use decoder::{CachedDecoder, DecodeError, Decoder};
#[cfg(feature = "native")]
pub use decoder::NativeDecoder;
pub use exclusion::{classify, PlaceholderReason, Verdict};
pub use graph::{MemoryGraph, ObjectId, SceneGraph, VertexStats};
pub use importer::{load_map, ImportError, ImportReport, Importer, LoadedMap, ModelEntry};
pub use material::{BlendSetup, MaterialLibrary};
pub use mesh::Mesh;
pub use progress::ProgressSink;
pub use scene::{SceneDocument, SceneNode, SubMesh};
pub use session::ImportSession;
