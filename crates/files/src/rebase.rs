use crate::models::FileInfo;
use scry_core::{MetadataContext, ScanContext};
use std::path::PathBuf;

/// Re-roots file paths found under one directory onto another, e.g. to
/// report files from a staging tree as they will appear once installed.
///
/// Files outside `from` pass through unchanged. Only the path is rewritten;
/// size and timestamps still describe the file that was scanned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rebase {
    from: PathBuf,
    to: PathBuf,
}
impl Rebase {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}
impl MetadataContext<FileInfo> for Rebase {
    fn map_item(&self, _context: &ScanContext, mut item: FileInfo) -> FileInfo {
        if let Ok(relative) = item.path.strip_prefix(&self.from) {
            item.path = self.to.join(relative);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::OffsetDateTime;

    #[rstest]
    #[case("/stage/lib/libscry.so", "/usr/lib/libscry.so")]
    #[case("/stage/libscry.so", "/usr/libscry.so")]
    #[case("/elsewhere/libscry.so", "/elsewhere/libscry.so")]
    #[case("/staged/libscry.so", "/staged/libscry.so")]
    fn test_rebase(#[case] path: &str, #[case] expected: &str) {
        let rebase = Rebase::new("/stage", "/usr");
        let file = FileInfo::new(path, 3, OffsetDateTime::UNIX_EPOCH);
        let mapped = rebase.map_item(&ScanContext::new(), file);
        assert_eq!(mapped.path, PathBuf::from(expected));
        assert_eq!(mapped.size, 3);
    }
}
