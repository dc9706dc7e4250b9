//! Level archive reading.
//!
//! A level ships as a zip holding six binary sections, identified by file
//! extension. All six must be present before anything is decoded.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur while reading a level archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Archive is missing section(s): {}", list_sections(.0))]
    MissingSections(Vec<SectionKind>),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Upper bound on the buffer reserved up front for one entry. Larger
/// sections grow while reading.
const MAX_PREALLOCATION: u64 = 64 << 20;

/// Bytes to reserve for an entry whose header declares `declared` bytes.
fn preallocation(declared: u64) -> usize {
    declared.min(MAX_PREALLOCATION) as usize
}

fn list_sections(kinds: &[SectionKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.extension())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The binary sections of a level archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Property buffer
    Buf,
    /// Geometry scene (object hierarchy)
    Gms,
    /// Material instances
    Mat,
    /// Primitive (mesh) data
    Prm,
    /// Properties
    Prp,
    /// Textures
    Tex,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Buf,
        SectionKind::Gms,
        SectionKind::Mat,
        SectionKind::Prm,
        SectionKind::Prp,
        SectionKind::Tex,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            SectionKind::Buf => "BUF",
            SectionKind::Gms => "GMS",
            SectionKind::Mat => "MAT",
            SectionKind::Prm => "PRM",
            SectionKind::Prp => "PRP",
            SectionKind::Tex => "TEX",
        }
    }

    /// Identify a section from an entry name by case-insensitive extension.
    pub fn from_entry_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        Self::ALL.into_iter().find(|kind| {
            upper
                .strip_suffix(kind.extension())
                .is_some_and(|stem| stem.ends_with('.'))
        })
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The six section buffers of one level.
#[derive(Clone, Debug)]
pub struct ArchiveSections {
    buffers: [Vec<u8>; 6],
}

impl ArchiveSections {
    /// Read the sections of a zip archive on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> ArchiveResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_zip_reader(BufReader::new(file))
    }

    /// Read the sections of a zip archive from any seekable reader.
    pub fn from_zip_reader<R: Read + Seek>(reader: R) -> ArchiveResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut found: [Option<Vec<u8>>; 6] = Default::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let Some(kind) = SectionKind::from_entry_name(entry.name()) else {
                log::debug!("Skipping archive entry {}", entry.name());
                continue;
            };
            let mut data = Vec::with_capacity(preallocation(entry.size()));
            entry.read_to_end(&mut data)?;
            found[kind.slot()] = Some(data);
        }

        Self::from_found(found)
    }

    /// Collect sections from named buffers. Later duplicates win.
    pub fn from_entries<I, S>(entries: I) -> ArchiveResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let mut found: [Option<Vec<u8>>; 6] = Default::default();
        for (name, data) in entries {
            if let Some(kind) = SectionKind::from_entry_name(name.as_ref()) {
                found[kind.slot()] = Some(data);
            }
        }
        Self::from_found(found)
    }

    fn from_found(found: [Option<Vec<u8>>; 6]) -> ArchiveResult<Self> {
        let missing: Vec<SectionKind> = SectionKind::ALL
            .into_iter()
            .filter(|kind| found[kind.slot()].is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ArchiveError::MissingSections(missing));
        }

        Ok(Self {
            buffers: found.map(Option::unwrap_or_default),
        })
    }

    pub fn get(&self, kind: SectionKind) -> &[u8] {
        &self.buffers[kind.slot()]
    }
}

/// Map name for an archive: its file name up to the first `.`.
pub fn map_name(archive: &Path) -> String {
    let file_name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.find('.') {
        Some(dot) => file_name[..dot].to_string(),
        None => file_name,
    }
}
