mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use exn::ResultExt;
use scry_config::Config;
use scry_core::{Items, ScannerHandle};
use scry_files::{FileScannerExt, Image, ImageFormat, ImageScannerExt};
use std::fmt::Display;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scry", version, about = "Find and identify binary images")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (repeatable); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SearchArgs {
    /// Directories to search (defaults to the configured or application directories)
    directories: Vec<PathBuf>,
    /// File name glob pattern (repeatable)
    #[arg(short, long = "pattern")]
    patterns: Vec<String>,
    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List matching files
    Files {
        #[command(flatten)]
        search: SearchArgs,
        /// Only files whose name starts with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
    /// List matching files recognized as binary images
    Images {
        #[command(flatten)]
        search: SearchArgs,
        /// Only images of this format (repeatable): elf, pe, macho, wasm, archive
        #[arg(short, long = "format")]
        formats: Vec<String>,
    },
    /// List the sections or archive members inside matching images
    Entries {
        #[command(flatten)]
        search: SearchArgs,
        /// Only images of this format (repeatable): elf, pe, macho, wasm, archive
        #[arg(short, long = "format")]
        formats: Vec<String>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn configure(path: Option<&PathBuf>, search: &SearchArgs) -> Result<Config> {
    let mut config = Config::load(path.map(PathBuf::as_path)).or_raise(|| ErrorKind::Config)?;
    if !search.directories.is_empty() {
        config.search.directories.clone_from(&search.directories);
    }
    if !search.patterns.is_empty() {
        config.search.patterns.clone_from(&search.patterns);
    }
    config.search.recursive |= search.recursive;
    config.validate().or_raise(|| ErrorKind::Config)?;
    Ok(config)
}

/// The configured images, restricted to `formats` when any are given.
fn images(config: &Config, formats: &[String]) -> Result<ScannerHandle<Image>> {
    let formats = formats
        .iter()
        .map(|format| format.parse::<ImageFormat>())
        .collect::<scry_files::Result<Vec<_>>>()
        .or_raise(|| ErrorKind::Argument("--format".to_string()))?;
    let images = config.files().or_raise(|| ErrorKind::Config)?.read_images();
    if formats.is_empty() {
        return Ok(images);
    }
    Ok(images.with_format(formats))
}

/// Print each item as `[n] item`, returning how many errors were seen.
fn display_items<T: Display>(items: Items<'_, T>) -> usize {
    let mut counter = 0;
    let mut errors = 0;
    for item in items {
        match item {
            Ok(item) => {
                counter += 1;
                println!("[{counter}] {item}");
            },
            Err(e) => {
                errors += 1;
                tracing::error!(error = ?e, "Scan yielded an error");
            },
        }
    }
    errors
}

fn run(cli: Cli) -> Result<()> {
    let errors = match &cli.command {
        Command::Files { search, prefix } => {
            let config = configure(cli.config.as_ref(), search)?;
            let mut files = config.files().or_raise(|| ErrorKind::Config)?;
            if let Some(prefix) = prefix {
                files = files.with_name_prefix(prefix.as_str());
            }
            let context = config.context();
            display_items(files.scan(&context))
        },
        Command::Images { search, formats } => {
            let config = configure(cli.config.as_ref(), search)?;
            let images = images(&config, formats)?;
            let context = config.context();
            display_items(images.scan(&context))
        },
        Command::Entries { search, formats } => {
            let config = configure(cli.config.as_ref(), search)?;
            let entries = images(&config, formats)?.read_entries();
            let context = config.context();
            display_items(entries.scan(&context))
        },
    };
    if errors > 0 {
        exn::bail!(ErrorKind::Scan(errors));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scry: {e:?}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["scry", "files", "/usr/lib", "-r", "-p", "*.so", "--prefix", "libc"])]
    #[case(&["scry", "-vv", "images", "-f", "elf", "-f", "pe"])]
    #[case(&["scry", "images", "--config", "scry.toml"])]
    #[case(&["scry", "entries", "/usr/lib", "-f", "archive", "-p", "*.a"])]
    fn test_parses(#[case] args: &[&str]) {
        assert!(Cli::try_parse_from(args).is_ok());
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from(["scry", "-c", "scry.yaml", "files", "a", "b", "-p", "*.dll", "-p", "*.so"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("scry.yaml")));
        let Command::Files { search, prefix } = cli.command else {
            panic!("expected files command");
        };
        assert_eq!(search.directories, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(search.patterns, vec!["*.dll", "*.so"]);
        assert!(!search.recursive);
        assert_eq!(prefix, None);
    }

    #[test]
    fn test_unknown_format_is_an_argument_error() {
        let err = images(&Config::default(), &["coff".to_string()]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Argument(_)));
    }

    #[test]
    fn test_display_items_counts_errors() {
        let items: Items<'_, u8> = Box::new(
            vec![Ok(1), Err(exn::Exn::from(scry_core::ErrorKind::Transform)), Ok(2)].into_iter(),
        );
        assert_eq!(display_items(items), 1);
    }
}
