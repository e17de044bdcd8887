//! Binary image detection.

use crate::error::{Error, ErrorKind, Result};
use crate::models::{FileInfo, Image};
use derive_more::Display;
use exn::OptionExt;
use scry_core::{ScanContext, ScanOption};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::instrument;

/// Operation name reported to ignore policies.
pub const READ_IMAGE: &str = "read_image";

const ELF_MAGIC: [u8; 4] = [0x7F, 0x45, 0x4C, 0x46];
const PE_MAGIC: [u8; 2] = [0x4D, 0x5A];
const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
pub(crate) const ARCHIVE_MAGIC: [u8; 8] = *b"!<arch>\n";
const MACHO_MAGIC: [[u8; 4]; 5] = [
    [0xFE, 0xED, 0xFA, 0xCE],
    [0xFE, 0xED, 0xFA, 0xCF],
    [0xCE, 0xFA, 0xED, 0xFE],
    [0xCF, 0xFA, 0xED, 0xFE],
    // Universal ("fat") binary
    [0xCA, 0xFE, 0xBA, 0xBE],
];

/// A recognized binary image format.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImageFormat {
    /// ELF executable or shared object
    #[display("elf")]
    Elf,
    /// PE/COFF executable or DLL
    #[display("pe")]
    Pe,
    /// Mach-O executable, dylib or universal binary
    #[display("macho")]
    MachO,
    /// WebAssembly module
    #[display("wasm")]
    Wasm,
    /// Static library archive
    #[display("archive")]
    Archive,
}
impl ImageFormat {
    /// Detect the image format from a file's leading bytes.
    #[must_use]
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&ELF_MAGIC) {
            return Some(Self::Elf);
        }
        if bytes.starts_with(&WASM_MAGIC) {
            return Some(Self::Wasm);
        }
        if bytes.starts_with(&ARCHIVE_MAGIC) {
            return Some(Self::Archive);
        }
        if MACHO_MAGIC.iter().any(|magic| bytes.starts_with(magic)) {
            return Some(Self::MachO);
        }
        if bytes.starts_with(&PE_MAGIC) {
            return Some(Self::Pe);
        }
        None
    }
}
impl FromStr for ImageFormat {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elf" | "so" => Ok(Self::Elf),
            "pe" | "dll" | "exe" => Ok(Self::Pe),
            "macho" | "mach-o" | "dylib" => Ok(Self::MachO),
            "wasm" => Ok(Self::Wasm),
            "archive" | "ar" | "a" => Ok(Self::Archive),
            _ => exn::bail!(ErrorKind::UnknownFormat(s.to_string())),
        }
    }
}

/// How images are read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Number of leading bytes read to detect the format.
    pub head_bytes: usize,
}
impl Default for ReaderOptions {
    fn default() -> Self {
        Self { head_bytes: 64 }
    }
}
impl ScanOption for ReaderOptions {}

/// Per-context memo of detected formats, keyed by path.
///
/// Files that turned out not to be images are remembered too, so a chain of
/// scans sharing one context reads each file at most once.
#[derive(Debug, Default)]
pub struct ImageCache {
    formats: RefCell<HashMap<PathBuf, Option<ImageFormat>>>,
}
impl ImageCache {
    pub fn get(&self, path: &Path) -> Option<Option<ImageFormat>> {
        self.formats.borrow().get(path).copied()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, format: Option<ImageFormat>) {
        self.formats.borrow_mut().insert(path.into(), format);
    }

    pub fn len(&self) -> usize {
        self.formats.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.borrow().is_empty()
    }
}
impl ScanOption for ImageCache {}

fn detect(path: &Path, head_bytes: usize) -> Result<ImageFormat> {
    let file = File::open(path).map_err(|e| ErrorKind::from_io(e, path))?;
    let mut buffer = Vec::with_capacity(head_bytes);
    file.take(head_bytes as u64).read_to_end(&mut buffer).map_err(|e| ErrorKind::from_io(e, path))?;
    ImageFormat::from_magic_bytes(&buffer).ok_or_raise(|| ErrorKind::BadImageFormat(path.to_path_buf()))
}

/// Identify `file` as a binary image.
///
/// Returns `None` when the file is missing, unreadable or not an image, and
/// also when an installed ignore policy swallows some other fault (reported
/// under [`READ_IMAGE`]). Reader parameters come from the context's
/// [`ReaderOptions`], and results are memoized in its [`ImageCache`]; both
/// are created with defaults if absent.
#[instrument(level = "trace", skip(context), fields(path = %file.path.display()))]
pub fn read_image(context: &ScanContext, file: FileInfo) -> Option<scry_core::Result<Image>> {
    let cache = context.option_or_default::<ImageCache>();
    if let Some(known) = cache.get(&file.path) {
        return known.map(|format| Ok(Image::new(file, format)));
    }
    let options = context.option_or_default::<ReaderOptions>();
    match detect(&file.path, options.head_bytes) {
        Ok(format) => {
            cache.insert(file.path.clone(), Some(format));
            Some(Ok(Image::new(file, format)))
        },
        Err(e) if e.is_expected() => {
            let kind: &ErrorKind = &e;
            if matches!(kind, ErrorKind::BadImageFormat(_)) {
                cache.insert(file.path.clone(), None);
            }
            tracing::debug!(error = %kind, "Skipping file that is not a readable image");
            None
        },
        Err(e) => context.recover(READ_IMAGE, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use scry_core::{IgnoreByType, IgnoreOperations};
    use std::fs;
    use time::OffsetDateTime;

    #[rstest]
    #[case(b"\x7fELF\x02\x01\x01", Some(ImageFormat::Elf))]
    #[case(b"MZ\x90\x00", Some(ImageFormat::Pe))]
    #[case(b"\xcf\xfa\xed\xfe\x07", Some(ImageFormat::MachO))]
    #[case(b"\xca\xfe\xba\xbe", Some(ImageFormat::MachO))]
    #[case(b"\x00asm\x01\x00\x00\x00", Some(ImageFormat::Wasm))]
    #[case(b"!<arch>\nfoo", Some(ImageFormat::Archive))]
    #[case(b"#!/bin/sh", None)]
    #[case(b"\x7fEL", None)]
    #[case(b"", None)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Option<ImageFormat>) {
        assert_eq!(ImageFormat::from_magic_bytes(bytes), expected);
    }

    #[rstest]
    #[case("elf", ImageFormat::Elf)]
    #[case("DLL", ImageFormat::Pe)]
    #[case("mach-o", ImageFormat::MachO)]
    #[case("wasm", ImageFormat::Wasm)]
    #[case("ar", ImageFormat::Archive)]
    fn test_from_str(#[case] input: &str, #[case] expected: ImageFormat) {
        assert_eq!(input.parse::<ImageFormat>().unwrap(), expected);
        assert_eq!(expected.to_string().parse::<ImageFormat>().unwrap(), expected);
    }

    #[test]
    fn test_from_str_invalid() {
        let err = "coff".parse::<ImageFormat>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnknownFormat(name) if name == "coff"));
    }

    fn file(dir: &Path, name: &str, contents: &[u8]) -> FileInfo {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        FileInfo::new(path, contents.len() as u64, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn test_read_image_detects_and_memoizes() {
        let dir = tempfile::tempdir().unwrap();
        let info = file(dir.path(), "libscry.so", b"\x7fELF\x02");
        let ctx = ScanContext::new();

        let image = read_image(&ctx, info.clone()).unwrap().unwrap();
        assert_eq!(image.format, ImageFormat::Elf);
        assert_eq!(ctx.option::<ImageCache>().unwrap().len(), 1);

        // Served from the cache even though the file is gone.
        fs::remove_file(&info.path).unwrap();
        assert_eq!(read_image(&ctx, info.clone()).unwrap().unwrap(), image);
        assert!(read_image(&ScanContext::new(), info).is_none());
    }

    #[test]
    fn test_read_image_skips_expected_faults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ScanContext::new();
        let text = file(dir.path(), "notes.dll", b"plain text");
        let missing = FileInfo::new(dir.path().join("missing.dll"), 0, OffsetDateTime::UNIX_EPOCH);
        assert!(read_image(&ctx, text.clone()).is_none());
        assert!(read_image(&ctx, missing).is_none());
        assert_eq!(ctx.option::<ImageCache>().unwrap().get(&text.path), Some(None));
    }

    #[test]
    fn test_read_image_honors_head_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let info = file(dir.path(), "lib.a", b"!<arch>\n");
        let short = ScanContext::new().with_option(ReaderOptions { head_bytes: 4 });
        assert!(read_image(&short, info.clone()).is_none());
        assert_eq!(read_image(&ScanContext::new(), info).unwrap().unwrap().format, ImageFormat::Archive);
    }

    #[test]
    fn test_unexpected_fault_consults_ignore_policies() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory as a file fails with an I/O error that isn't
        // one of the expected kinds.
        let info = FileInfo::new(dir.path(), 0, OffsetDateTime::UNIX_EPOCH);

        let surfaced = read_image(&ScanContext::new(), info.clone()).unwrap().unwrap_err();
        assert_eq!(*surfaced, scry_core::ErrorKind::Source(READ_IMAGE.to_string()));

        let by_operation = ScanContext::new().with_ignore(IgnoreOperations::new([READ_IMAGE]));
        assert!(read_image(&by_operation, info.clone()).is_none());

        let by_type = ScanContext::new().with_ignore(IgnoreByType::new().with::<ErrorKind>());
        assert!(read_image(&by_type, info).is_none());
    }
}
