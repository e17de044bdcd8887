//! Layered configuration for scry.
//!
//! Sources merge in order, later ones winning: built-in defaults, the user's
//! `config.toml` in the platform config directory, an explicitly named file,
//! then `SCRY_`-prefixed environment variables (`SCRY_READER__HEAD_BYTES=128`
//! sets `reader.head_bytes`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use scry_core::{IgnoreOperations, ScanContext, ScannerHandle};
use scry_files::{DEFAULT_SEARCH_PATTERNS, FileInfo, ReaderOptions, SearchDepth};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SCRY_";
const USER_CONFIG_FILE: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: Search,
    pub reader: Reader,
    pub ignore: Ignore,
}

/// Where files are looked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Search {
    /// Directories to search; the application directories when empty.
    pub directories: Vec<PathBuf>,
    /// File name glob patterns.
    pub patterns: Vec<String>,
    /// Descend into subdirectories.
    pub recursive: bool,
}
impl Default for Search {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            patterns: DEFAULT_SEARCH_PATTERNS.iter().map(|pattern| pattern.to_string()).collect(),
            recursive: false,
        }
    }
}
impl Search {
    pub fn depth(&self) -> SearchDepth {
        SearchDepth::recursive(self.recursive)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reader {
    /// Leading bytes read from each file to detect its image format.
    pub head_bytes: usize,
}
impl Default for Reader {
    fn default() -> Self {
        Self {
            head_bytes: ReaderOptions::default().head_bytes,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ignore {
    /// Operations whose unexpected faults are dropped instead of failing the
    /// scan (`enumerate_files`, `read_image`, `read_entries`).
    pub operations: Vec<String>,
}

impl Config {
    /// Load and validate configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user = ProjectDirs::from("", "", "scry").map(|dirs| dirs.config_dir().join(USER_CONFIG_FILE));
        Self::from_figment(Self::figment(user.as_deref(), explicit)?)
    }

    /// The merged configuration sources. A missing user file is skipped; a
    /// missing explicit file is an error.
    pub fn figment(user: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(user) = user.filter(|user| user.is_file()) {
            tracing::debug!(path = %user.display(), "Merging user configuration");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(explicit) = explicit {
            if !explicit.is_file() {
                exn::bail!(ErrorKind::Invalid(format!("config file not found: {}", explicit.display())));
            }
            tracing::debug!(path = %explicit.display(), "Merging configuration file");
            figment = match explicit.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(explicit)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(explicit)),
                Some("json") => figment.merge(Json::file(explicit)),
                _ => exn::bail!(ErrorKind::Invalid(format!(
                    "unsupported config file format: {}",
                    explicit.display()
                ))),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.search.patterns.is_empty() {
            exn::bail!(ErrorKind::Invalid("search.patterns must not be empty".to_string()));
        }
        if self.reader.head_bytes == 0 {
            exn::bail!(ErrorKind::Invalid("reader.head_bytes must be greater than zero".to_string()));
        }
        scry_files::compile_patterns(&self.search.patterns)
            .or_raise(|| ErrorKind::Invalid("search.patterns contains an invalid glob".to_string()))?;
        Ok(())
    }

    /// A scan context with the reader options and ignore policies installed.
    pub fn context(&self) -> ScanContext {
        let context = ScanContext::new().with_option(ReaderOptions {
            head_bytes: self.reader.head_bytes,
        });
        if self.ignore.operations.is_empty() {
            return context;
        }
        context.with_ignore(IgnoreOperations::new(self.ignore.operations.iter().cloned()))
    }

    /// The file-enumeration leaf for the configured search.
    pub fn files(&self) -> Result<ScannerHandle<FileInfo>> {
        let depth = self.search.depth();
        let files = if self.search.directories.is_empty() {
            scry_files::app_files(&self.search.patterns, depth)
        } else {
            scry_files::files_in_directories(&self.search.directories, &self.search.patterns, depth)
        };
        files.or_raise(|| ErrorKind::Files)
    }
}
