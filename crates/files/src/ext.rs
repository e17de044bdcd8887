//! Fluent extensions for file and image pipelines.

use crate::entries::read_entries;
use crate::image::{ImageFormat, read_image};
use crate::models::{FileInfo, Image, ImageEntry};
use crate::rebase::Rebase;
use scry_core::ScannerHandle;
use std::collections::HashSet;
use std::path::PathBuf;

pub trait FileScannerExt {
    /// Identify each file as a binary image, omitting files that aren't.
    /// See [`read_image`] for how faults are handled.
    fn read_images(&self) -> ScannerHandle<Image>;

    /// Keep files whose name starts with `prefix`.
    fn with_name_prefix(&self, prefix: impl Into<String>) -> ScannerHandle<FileInfo>;

    /// Report paths under `from` as if they were under `to`.
    fn rebase(&self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> ScannerHandle<FileInfo>;
}
impl FileScannerExt for ScannerHandle<FileInfo> {
    fn read_images(&self) -> ScannerHandle<Image> {
        self.transform_many_with(|context, file| Box::new(read_image(context, file).into_iter()))
    }

    fn with_name_prefix(&self, prefix: impl Into<String>) -> ScannerHandle<FileInfo> {
        let prefix = prefix.into();
        self.include(move |file| file.file_name().is_some_and(|name| name.starts_with(prefix.as_str())))
    }

    fn rebase(&self, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> ScannerHandle<FileInfo> {
        self.reflect(Rebase::new(from, to))
    }
}

pub trait ImageScannerExt {
    /// Keep images of any of the given formats.
    fn with_format(&self, formats: impl IntoIterator<Item = ImageFormat>) -> ScannerHandle<Image>;

    /// List the sections or members inside each image.
    /// See [`read_entries`] for how partly readable images are handled.
    fn read_entries(&self) -> ScannerHandle<ImageEntry>;
}
impl ImageScannerExt for ScannerHandle<Image> {
    fn with_format(&self, formats: impl IntoIterator<Item = ImageFormat>) -> ScannerHandle<Image> {
        let formats: HashSet<ImageFormat> = formats.into_iter().collect();
        self.include(move |image| formats.contains(&image.format))
    }

    fn read_entries(&self) -> ScannerHandle<ImageEntry> {
        self.transform_many_with(read_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchDepth;
    use crate::sources::files_in_directories;
    use scry_core::mock::MockScanner;
    use scry_core::{Event, ScanContext};
    use std::fs;
    use std::rc::Rc;
    use time::OffsetDateTime;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libscry.so"), b"\x7fELF\x02\x01").unwrap();
        fs::write(dir.path().join("libfake.so"), b"not an image").unwrap();
        fs::write(dir.path().join("scry.exe"), b"MZ\x90\x00").unwrap();
        fs::write(dir.path().join("plugin.wasm"), b"\x00asm\x01\x00\x00\x00").unwrap();
        dir
    }

    fn images(dir: &tempfile::TempDir) -> ScannerHandle<Image> {
        files_in_directories([dir.path()], ["*.so", "*.exe", "*.wasm"], SearchDepth::TopDirectoryOnly)
            .unwrap()
            .read_images()
    }

    #[test]
    fn test_read_images_omits_non_images() {
        let dir = fixture();
        let mut found: Vec<_> = images(&dir)
            .collect(&ScanContext::new())
            .unwrap()
            .into_iter()
            .map(|image| (image.file.file_name().unwrap().to_string(), image.format))
            .collect();
        found.sort();
        assert_eq!(
            found,
            vec![
                ("libscry.so".to_string(), ImageFormat::Elf),
                ("plugin.wasm".to_string(), ImageFormat::Wasm),
                ("scry.exe".to_string(), ImageFormat::Pe),
            ]
        );
    }

    #[test]
    fn test_with_format() {
        let dir = fixture();
        let native = images(&dir).with_format([ImageFormat::Elf, ImageFormat::Pe]);
        let formats: HashSet<_> = native.collect(&ScanContext::new()).unwrap().iter().map(|i| i.format).collect();
        assert_eq!(formats, HashSet::from([ImageFormat::Elf, ImageFormat::Pe]));
        assert!(images(&dir).with_format([]).collect(&ScanContext::new()).unwrap().is_empty());
    }

    #[test]
    fn test_read_entries_across_images() {
        let dir = fixture();
        // A WebAssembly module with a type section, then one cut off mid-section.
        fs::write(dir.path().join("plugin.wasm"), b"\x00asm\x01\x00\x00\x00\x01\x01\x00\x0a\x04").unwrap();
        let entries = images(&dir).with_format([ImageFormat::Wasm]).read_entries();
        let found = entries.collect(&ScanContext::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "type");
        assert_eq!(found[0].image.file.file_name(), Some("plugin.wasm"));
    }

    #[test]
    fn test_with_name_prefix_and_rebase() {
        let mock = MockScanner::new([
            FileInfo::new("/stage/libscry.so", 1, OffsetDateTime::UNIX_EPOCH),
            FileInfo::new("/stage/other.so", 1, OffsetDateTime::UNIX_EPOCH),
        ]);
        let handle = mock.handle().with_name_prefix("lib").rebase("/stage", "/opt");
        let paths: Vec<_> = handle.collect(&ScanContext::new()).unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec![PathBuf::from("/opt/libscry.so")]);
    }

    #[test]
    fn test_leaf_changes_reach_image_pipeline() {
        let mock = Rc::new(MockScanner::new(Vec::<FileInfo>::new()));
        let pipeline = ScannerHandle::from(Rc::clone(&mock)).read_images().cache();
        let hits = Rc::new(std::cell::Cell::new(0));
        let _subscription = {
            let hits = Rc::clone(&hits);
            pipeline.notifier().subscribe(move |_: &Event| hits.set(hits.get() + 1))
        };
        mock.raise(&Event::property("Items"));
        assert_eq!(hits.get(), 1);
    }
}
