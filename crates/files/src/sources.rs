//! File-system leaf scanners.

use crate::error::{ErrorKind, Result};
use crate::models::{DEFAULT_SEARCH_PATTERNS, FileInfo, SearchDepth};
use crate::walk::{compile_patterns, enumerate_files};
use exn::OptionExt;
use glob::Pattern;
use scry_core::{ScannerHandle, factory};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Environment variable listing extra application search directories,
/// relative to the executable's directory.
pub const SEARCH_PATH_VAR: &str = "SCRY_SEARCH_PATH";

/// Files in `directory` matching [`DEFAULT_SEARCH_PATTERNS`].
pub fn files_in_directory(directory: impl Into<PathBuf>, depth: SearchDepth) -> ScannerHandle<FileInfo> {
    let patterns = DEFAULT_SEARCH_PATTERNS.iter().filter_map(|pattern| Pattern::new(pattern).ok());
    files_matching(std::iter::once(directory.into()), patterns.collect(), depth)
}

/// Files in each of `directories` matching any of `patterns`, directories
/// and patterns visited in the order given.
///
/// Patterns are compiled up front; an invalid one fails here rather than
/// during a scan. A file matching several patterns is yielded once per
/// pattern.
pub fn files_in_directories<D, S>(
    directories: impl IntoIterator<Item = D>,
    patterns: impl IntoIterator<Item = S>,
    depth: SearchDepth,
) -> Result<ScannerHandle<FileInfo>>
where
    D: Into<PathBuf>,
    S: AsRef<str>,
{
    let patterns = compile_patterns(patterns)?;
    Ok(files_matching(directories.into_iter().map(Into::into), patterns.into(), depth))
}

fn files_matching(
    directories: impl IntoIterator<Item = PathBuf>,
    patterns: Rc<[Pattern]>,
    depth: SearchDepth,
) -> ScannerHandle<FileInfo> {
    factory::immutable(directories).transform_many_with(move |context, directory| {
        let patterns = Rc::clone(&patterns);
        Box::new((0..patterns.len()).flat_map(move |index| enumerate_files(context, &directory, &patterns[index], depth)))
    })
}

/// The directories an application searches: `base` alone when `relative` is
/// unset or empty, otherwise each entry of the `relative` path list joined
/// onto `base`.
pub fn search_directories(base: &Path, relative: Option<&OsStr>) -> Vec<PathBuf> {
    match relative.filter(|relative| !relative.is_empty()) {
        None => vec![base.to_path_buf()],
        Some(relative) => std::env::split_paths(relative)
            .filter(|entry| !entry.as_os_str().is_empty())
            .map(|entry| base.join(entry))
            .collect(),
    }
}

/// Files matching `patterns` in the running executable's search directories
/// (see [`search_directories`] and [`SEARCH_PATH_VAR`]).
pub fn app_files<S: AsRef<str>>(
    patterns: impl IntoIterator<Item = S>,
    depth: SearchDepth,
) -> Result<ScannerHandle<FileInfo>> {
    let executable = std::env::current_exe().map_err(ErrorKind::Io)?;
    let base = executable.parent().ok_or_raise(|| ErrorKind::NotFound(executable.clone()))?;
    let relative = std::env::var_os(SEARCH_PATH_VAR);
    let directories = search_directories(base, relative.as_deref());
    tracing::debug!(?directories, "Resolved application search directories");
    files_in_directories(directories, patterns, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scry_core::ScanContext;
    use std::fs;

    fn names(handle: &ScannerHandle<FileInfo>) -> Vec<String> {
        let files = handle.collect(&ScanContext::new()).unwrap();
        files.iter().filter_map(FileInfo::file_name).map(str::to_string).collect()
    }

    #[test]
    fn test_files_in_directory_uses_default_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("libscry.so"), b"").unwrap();
        fs::write(dir.path().join("readme.md"), b"").unwrap();
        assert_eq!(names(&files_in_directory(dir.path(), SearchDepth::TopDirectoryOnly)), vec!["libscry.so"]);
    }

    #[test]
    fn test_files_in_directories_orders_by_directory_then_pattern() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("a.dll"), b"").unwrap();
        fs::write(first.path().join("b.so"), b"").unwrap();
        fs::write(second.path().join("c.so"), b"").unwrap();

        let handle =
            files_in_directories([first.path(), second.path()], ["*.so", "*.dll"], SearchDepth::TopDirectoryOnly)
                .unwrap();
        assert_eq!(names(&handle), vec!["b.so", "a.dll", "c.so"]);
    }

    #[test]
    fn test_files_in_directories_rescans_disk() {
        let dir = tempfile::tempdir().unwrap();
        let handle = files_in_directories([dir.path()], ["*"], SearchDepth::TopDirectoryOnly).unwrap();
        assert!(names(&handle).is_empty());
        fs::write(dir.path().join("late.exe"), b"").unwrap();
        assert_eq!(names(&handle), vec!["late.exe"]);
    }

    #[test]
    fn test_file_given_as_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("libscry.so");
        fs::write(&library, b"\x7fELF").unwrap();
        let handle = files_in_directories([library, dir.path().join("missing")], ["*"], SearchDepth::TopDirectoryOnly)
            .unwrap();
        let results: Vec<_> = handle.scan(&ScanContext::new()).collect();
        assert!(results.is_empty());
    }

    #[test]
    fn test_invalid_pattern_fails_eagerly() {
        let err = files_in_directories(["."], ["[oops"], SearchDepth::TopDirectoryOnly).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPattern(_)));
    }

    #[test]
    fn test_search_directories() {
        let base = Path::new("/opt/app");
        assert_eq!(search_directories(base, None), vec![PathBuf::from("/opt/app")]);
        assert_eq!(search_directories(base, Some(OsStr::new(""))), vec![PathBuf::from("/opt/app")]);

        let relative = std::env::join_paths(["plugins", "lib/extra"]).unwrap();
        assert_eq!(
            search_directories(base, Some(&relative)),
            vec![PathBuf::from("/opt/app/plugins"), PathBuf::from("/opt/app/lib/extra")]
        );
    }
}
