//! File and image models.

use crate::image::ImageFormat;
use derive_more::Display;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

/// File name patterns matched when none are given: shared libraries and
/// executables.
pub const DEFAULT_SEARCH_PATTERNS: &[&str] = &["*.so", "*.dll", "*.dylib", "*.exe", "*.wasm"];

/// How far below the starting directory a search goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SearchDepth {
    #[default]
    TopDirectoryOnly,
    AllDirectories,
}
impl SearchDepth {
    pub fn recursive(recursive: bool) -> Self {
        if recursive { Self::AllDirectories } else { Self::TopDirectoryOnly }
    }
}

/// A file found on disk.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{}", path.display())]
pub struct FileInfo {
    /// Directory searched, joined with the path below it
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
        }
    }

    pub(crate) fn from_metadata(path: &Path, metadata: &Metadata) -> std::io::Result<Self> {
        let modified = metadata.modified()?.into();
        Ok(Self::new(path, metadata.len(), modified))
    }

    /// The final path component, when it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }
}

/// A file recognized as a binary image.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{file} ({format})")]
pub struct Image {
    pub file: FileInfo,
    pub format: ImageFormat,
}
impl Image {
    pub fn new(file: FileInfo, format: ImageFormat) -> Self {
        Self { file, format }
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

/// A named entry inside a binary image: a section, or an archive member.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("{}: {name}", image.path().display())]
pub struct ImageEntry {
    pub image: Image,
    pub name: String,
}
impl ImageEntry {
    pub fn new(image: Image, name: impl Into<String>) -> Self {
        Self {
            image,
            name: name.into(),
        }
    }
}
