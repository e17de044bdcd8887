//! Lazy directory enumeration.

use crate::error::{Error, ErrorKind, Result};
use crate::models::{FileInfo, SearchDepth};
use glob::{MatchOptions, Pattern};
use scry_core::{Items, ScanContext};
use std::fs::{self, DirEntry, ReadDir};
use std::io;
use std::path::{Path, PathBuf};

/// Operation name reported to ignore policies.
pub const ENUMERATE_FILES: &str = "enumerate_files";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Compile search patterns, failing on the first invalid one.
pub fn compile_patterns<S: AsRef<str>>(patterns: impl IntoIterator<Item = S>) -> Result<Vec<Pattern>> {
    patterns
        .into_iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Pattern::new(pattern).map_err(|_| Error::from(ErrorKind::InvalidPattern(pattern.to_string())))
        })
        .collect()
}

/// Enumerate files below `directory` whose names match `pattern`.
///
/// Directories are read one at a time as the sequence is consumed. An empty
/// directory path or pattern yields nothing, as does a directory that doesn't
/// exist or a path that isn't a directory. Unreadable entries are skipped;
/// any other I/O fault is offered to the context's ignore policies under
/// [`ENUMERATE_FILES`] and surfaces as an `Err` element if none swallows it.
pub fn enumerate_files<'c>(
    context: &'c ScanContext,
    directory: &Path,
    pattern: &Pattern,
    depth: SearchDepth,
) -> Items<'c, FileInfo> {
    if directory.as_os_str().is_empty() || pattern.as_str().is_empty() {
        return Box::new(std::iter::empty());
    }
    Box::new(Walk {
        context,
        pattern: pattern.clone(),
        depth,
        stack: vec![directory.to_path_buf()],
        current: None,
    })
}

struct Walk<'c> {
    context: &'c ScanContext,
    pattern: Pattern,
    depth: SearchDepth,
    stack: Vec<PathBuf>,
    current: Option<(PathBuf, ReadDir)>,
}
impl Walk<'_> {
    fn process_entry(&self, entry: DirEntry) -> Result<WalkEntry> {
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| ErrorKind::from_io(e, &path))?;
        if file_type.is_dir() {
            return Ok(match self.depth {
                SearchDepth::AllDirectories => WalkEntry::Descend(path),
                SearchDepth::TopDirectoryOnly => WalkEntry::Skip,
            });
        }
        let name = entry.file_name();
        if !name.to_str().is_some_and(|name| self.pattern.matches_with(name, MATCH_OPTIONS)) {
            return Ok(WalkEntry::Skip);
        }
        // Follows symlinks; a dangling link reports NotFound.
        let metadata = fs::metadata(&path).map_err(|e| ErrorKind::from_io(e, &path))?;
        if !metadata.is_file() {
            return Ok(WalkEntry::Skip);
        }
        let info = FileInfo::from_metadata(&path, &metadata).map_err(|e| ErrorKind::from_io(e, &path))?;
        Ok(WalkEntry::File(info))
    }

    fn fault(&self, error: Error) -> Option<scry_core::Result<FileInfo>> {
        let kind: &ErrorKind = &error;
        if kind.is_expected() {
            tracing::debug!(error = %kind, "Skipping unreadable entry");
            return None;
        }
        self.context.recover(ENUMERATE_FILES, error)
    }
}
impl Iterator for Walk<'_> {
    type Item = scry_core::Result<FileInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some((directory, entries)) = self.current.as_mut() else {
                let directory = self.stack.pop()?;
                match fs::read_dir(&directory) {
                    Ok(entries) => self.current = Some((directory, entries)),
                    // A missing directory, or a path that isn't one, is empty.
                    Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {},
                    Err(e) => {
                        if let Some(fault) = self.fault(Error::from(ErrorKind::from_io(e, &directory))) {
                            return Some(fault);
                        }
                    },
                }
                continue;
            };
            let entry = match entries.next() {
                Some(entry) => entry.map_err(|e| Error::from(ErrorKind::from_io(e, directory))),
                None => {
                    self.current = None;
                    continue;
                },
            };
            match entry.and_then(|entry| self.process_entry(entry)) {
                Ok(WalkEntry::File(info)) => return Some(Ok(info)),
                Ok(WalkEntry::Descend(path)) => self.stack.push(path),
                Ok(WalkEntry::Skip) => {},
                Err(e) => {
                    if let Some(fault) = self.fault(e) {
                        return Some(fault);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libone.so"), b"\x7fELF").unwrap();
        fs::write(dir.path().join("TWO.DLL"), b"MZ").unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        fs::create_dir_all(dir.path().join("plugins/nested")).unwrap();
        fs::write(dir.path().join("plugins/three.so"), b"\x7fELF").unwrap();
        fs::write(dir.path().join("plugins/nested/four.so"), b"\x7fELF").unwrap();
        dir
    }

    fn names(items: Items<'_, FileInfo>) -> BTreeSet<String> {
        items.map(|file| file.unwrap().file_name().unwrap().to_string()).collect()
    }

    #[rstest]
    #[case("*.so", SearchDepth::TopDirectoryOnly, &["libone.so"])]
    #[case("*.so", SearchDepth::AllDirectories, &["four.so", "libone.so", "three.so"])]
    #[case("*.dll", SearchDepth::TopDirectoryOnly, &["TWO.DLL"])]
    #[case("*", SearchDepth::TopDirectoryOnly, &["TWO.DLL", "libone.so", "notes.txt"])]
    #[case("*.wasm", SearchDepth::AllDirectories, &[])]
    fn test_enumerate_files(#[case] pattern: &str, #[case] depth: SearchDepth, #[case] expected: &[&str]) {
        let dir = fixture();
        let ctx = ScanContext::new();
        let pattern = Pattern::new(pattern).unwrap();
        let found = names(enumerate_files(&ctx, dir.path(), &pattern, depth));
        let expected: BTreeSet<String> = expected.iter().map(|name| name.to_string()).collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ScanContext::new();
        let pattern = Pattern::new("*").unwrap();
        assert_eq!(enumerate_files(&ctx, &dir.path().join("nope"), &pattern, SearchDepth::AllDirectories).count(), 0);
    }

    #[test]
    fn test_file_as_directory_is_empty() {
        let dir = fixture();
        let ctx = ScanContext::new();
        let pattern = Pattern::new("*").unwrap();
        let items: Vec<_> =
            enumerate_files(&ctx, &dir.path().join("libone.so"), &pattern, SearchDepth::AllDirectories).collect();
        assert!(items.is_empty());
    }

    #[test]
    fn test_empty_directory_or_pattern_is_empty() {
        let dir = fixture();
        let ctx = ScanContext::new();
        let any = Pattern::new("*").unwrap();
        let empty = Pattern::new("").unwrap();
        assert_eq!(enumerate_files(&ctx, Path::new(""), &any, SearchDepth::TopDirectoryOnly).count(), 0);
        assert_eq!(enumerate_files(&ctx, dir.path(), &empty, SearchDepth::TopDirectoryOnly).count(), 0);
    }

    #[test]
    fn test_file_info_is_populated() {
        let dir = fixture();
        let ctx = ScanContext::new();
        let pattern = Pattern::new("notes.txt").unwrap();
        let files: Vec<_> = enumerate_files(&ctx, dir.path(), &pattern, SearchDepth::TopDirectoryOnly)
            .collect::<scry_core::Result<_>>()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 5);
        assert_eq!(files[0].path, dir.path().join("notes.txt"));
    }

    #[test]
    fn test_compile_patterns() {
        assert_eq!(compile_patterns(["*.so", "lib?.dll"]).unwrap().len(), 2);
        let err = compile_patterns(["*.so", "[unclosed"]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPattern(p) if p == "[unclosed"));
    }

    #[test]
    fn test_walk_is_lazy() {
        let dir = fixture();
        let ctx = ScanContext::new();
        let pattern = Pattern::new("*.so").unwrap();
        let mut items = enumerate_files(&ctx, dir.path(), &pattern, SearchDepth::AllDirectories);
        assert!(items.next().is_some());
        // Removing the remaining directories mid-walk is not an error.
        fs::remove_dir_all(dir.path().join("plugins")).unwrap();
        assert!(items.all(|item| item.is_ok()));
    }
}
