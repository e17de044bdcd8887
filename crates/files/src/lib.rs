//! File-system and binary image leaves for scry pipelines.
//!
//! ```no_run
//! use scry_files::{FileScannerExt, ImageFormat, ImageScannerExt, SearchDepth};
//!
//! let images = scry_files::files_in_directory("/usr/lib", SearchDepth::AllDirectories)
//!     .read_images()
//!     .with_format([ImageFormat::Elf]);
//! for image in images.scan(&scry_core::factory::context()) {
//!     println!("{}", image.unwrap());
//! }
//! ```

pub mod error;
mod entries;
mod ext;
mod image;
mod models;
mod rebase;
mod sources;
mod walk;

pub use crate::entries::{READ_ENTRIES, read_entries};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::ext::{FileScannerExt, ImageScannerExt};
pub use crate::image::{ImageCache, ImageFormat, READ_IMAGE, ReaderOptions, read_image};
pub use crate::models::{DEFAULT_SEARCH_PATTERNS, FileInfo, Image, ImageEntry, SearchDepth};
pub use crate::rebase::Rebase;
pub use crate::sources::{SEARCH_PATH_VAR, app_files, files_in_directories, files_in_directory, search_directories};
pub use crate::walk::{ENUMERATE_FILES, compile_patterns, enumerate_files};
